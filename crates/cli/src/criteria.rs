// Command-line criteria parsing: `field=value`, `field[:asc|:desc]`

use anyhow::{bail, Context, Result};
use schemaless_core::domain::{FieldValue, FindOperator, FindOptions, Order};

/// Parse `field=value`, typing the value as null/bool/integer/real/text.
pub fn parse_assignment(raw: &str) -> Result<(String, FieldValue)> {
    let (field, value) = raw
        .split_once('=')
        .with_context(|| format!("expected field=value, got {:?}", raw))?;
    let field = field.trim();
    if field.is_empty() {
        bail!("missing field name in {:?}", raw);
    }
    Ok((field.to_string(), parse_scalar(value)))
}

/// `null`, `true`/`false`, integers and decimals are typed; anything else is
/// text. Wrap a value in double quotes to force text.
pub fn parse_scalar(raw: &str) -> FieldValue {
    if let Some(text) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return FieldValue::Text(text.to_string());
    }
    match raw {
        "null" => FieldValue::Null,
        "true" => FieldValue::Bool(true),
        "false" => FieldValue::Bool(false),
        _ => {
            if let Ok(i) = raw.parse::<i64>() {
                FieldValue::Integer(i)
            } else if let Ok(f) = raw.parse::<f64>() {
                FieldValue::Real(f)
            } else {
                FieldValue::Text(raw.to_string())
            }
        }
    }
}

/// Parse `field` or `field:desc`.
pub fn parse_order(raw: &str) -> Result<(String, Order)> {
    match raw.rsplit_once(':') {
        Some((field, dir)) => {
            let order = dir.parse::<Order>().map_err(anyhow::Error::msg)?;
            Ok((field.to_string(), order))
        }
        None => Ok((raw.to_string(), Order::Asc)),
    }
}

/// Raw filter flags collected by clap
#[derive(Debug, Default)]
pub struct CriteriaArgs {
    pub equals: Vec<String>,
    pub gt: Vec<String>,
    pub gte: Vec<String>,
    pub lt: Vec<String>,
    pub lte: Vec<String>,
    pub order: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub fn build_find_options(args: &CriteriaArgs) -> Result<FindOptions> {
    let mut options = FindOptions::new();

    for raw in &args.equals {
        let (field, value) = parse_assignment(raw)?;
        options = options.filter(field, value);
    }
    let operators: [(&Vec<String>, fn(FieldValue) -> FindOperator); 4] = [
        (&args.gt, |v| FindOperator::gt(v)),
        (&args.gte, |v| FindOperator::gte(v)),
        (&args.lt, |v| FindOperator::lt(v)),
        (&args.lte, |v| FindOperator::lte(v)),
    ];
    for (raws, make) in operators {
        for raw in raws {
            let (field, value) = parse_assignment(raw)?;
            if value.is_null() {
                bail!("comparison against null is not supported: {}", raw);
            }
            options = options.filter(field, make(value));
        }
    }
    for raw in &args.order {
        let (field, order) = parse_order(raw)?;
        options = options.order_by(field, order);
    }
    if let Some(limit) = args.limit {
        options = options.take(limit);
    }
    if let Some(offset) = args.offset {
        options = options.skip(offset);
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaless_core::domain::{Comparison, Filter};

    #[test]
    fn test_parse_scalar_types() {
        assert_eq!(parse_scalar("null"), FieldValue::Null);
        assert_eq!(parse_scalar("true"), FieldValue::Bool(true));
        assert_eq!(parse_scalar("18"), FieldValue::Integer(18));
        assert_eq!(parse_scalar("1.5"), FieldValue::Real(1.5));
        assert_eq!(parse_scalar("Ann"), FieldValue::from("Ann"));
        assert_eq!(parse_scalar("\"18\""), FieldValue::from("18"));
    }

    #[test]
    fn test_parse_assignment_keeps_equals_in_value() {
        let (field, value) = parse_assignment("expr=a=b").unwrap();
        assert_eq!(field, "expr");
        assert_eq!(value, FieldValue::from("a=b"));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=1").is_err());
    }

    #[test]
    fn test_build_find_options() {
        let args = CriteriaArgs {
            equals: vec!["active=true".to_string()],
            gte: vec!["age=18".to_string()],
            order: vec!["name:desc".to_string(), "age".to_string()],
            limit: Some(10),
            ..CriteriaArgs::default()
        };
        let options = build_find_options(&args).unwrap();

        assert_eq!(options.filters.len(), 2);
        match &options.filters[1].1 {
            Filter::Compare(op) => assert_eq!(op.comparison, Comparison::GreaterOrEqual),
            other => panic!("unexpected filter {:?}", other),
        }
        assert_eq!(
            options.order,
            vec![("name".to_string(), Order::Desc), ("age".to_string(), Order::Asc)]
        );
        assert_eq!(options.take, Some(10));
    }

    #[test]
    fn test_null_comparison_rejected() {
        let args = CriteriaArgs {
            lt: vec!["age=null".to_string()],
            ..CriteriaArgs::default()
        };
        assert!(build_find_options(&args).is_err());
    }
}
