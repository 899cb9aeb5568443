// Query Translator - criteria -> parameterized SQL

use crate::codec::encode_value;
use schemaless_core::domain::{ColumnMap, FieldValue, Filter, FindOptions};
use schemaless_core::error::{AppError, Result};

/// SQL text plus its positional parameters, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

/// Double-quote an identifier. Names are never interpolated unquoted.
pub fn quote_ident(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(AppError::Validation("identifier must not be empty".to_string()));
    }
    if name.chars().any(|c| c == '\0') {
        return Err(AppError::Validation(format!(
            "identifier contains a NUL byte: {:?}",
            name
        )));
    }
    Ok(escape_ident(name))
}

/// Quote without validation, for names already checked at construction.
pub(crate) fn escape_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `SELECT * FROM table [WHERE ...] [ORDER BY ...] [LIMIT ? [OFFSET ?]]`
pub fn build_select(table: &str, criteria: &FindOptions, columns: &ColumnMap) -> Result<SqlStatement> {
    let mut params = Vec::new();
    let mut sql = format!("SELECT * FROM {}", quote_ident(table)?);

    push_where(&mut sql, &mut params, criteria, columns)?;

    if !criteria.order.is_empty() {
        let parts = criteria
            .order
            .iter()
            .map(|(field, order)| Ok(format!("{} {}", quote_ident(field)?, order.as_sql())))
            .collect::<Result<Vec<_>>>()?;
        sql.push_str(" ORDER BY ");
        sql.push_str(&parts.join(", "));
    }

    match (criteria.take, criteria.skip) {
        (Some(take), skip) => {
            sql.push_str(" LIMIT ?");
            params.push(FieldValue::Integer(clamp(take)));
            if let Some(skip) = skip {
                sql.push_str(" OFFSET ?");
                params.push(FieldValue::Integer(clamp(skip)));
            }
        }
        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
        (None, Some(skip)) => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(FieldValue::Integer(clamp(skip)));
        }
        (None, None) => {}
    }

    Ok(SqlStatement { sql, params })
}

/// `SELECT COUNT(*) FROM table [WHERE ...]`; ordering and pagination ignored.
pub fn build_count(table: &str, criteria: &FindOptions, columns: &ColumnMap) -> Result<SqlStatement> {
    let mut params = Vec::new();
    let mut sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table)?);
    push_where(&mut sql, &mut params, criteria, columns)?;
    Ok(SqlStatement { sql, params })
}

/// `INSERT OR REPLACE INTO table (...) VALUES (?, ...)`
pub fn build_upsert(table: &str, fields: Vec<(String, FieldValue)>) -> Result<SqlStatement> {
    let names = fields
        .iter()
        .map(|(name, _)| quote_ident(name))
        .collect::<Result<Vec<_>>>()?;
    let placeholders = vec!["?"; names.len()].join(", ");
    Ok(SqlStatement {
        sql: format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            quote_ident(table)?,
            names.join(", "),
            placeholders
        ),
        params: fields.into_iter().map(|(_, value)| value).collect(),
    })
}

/// `DELETE FROM table WHERE "id" = ?`
pub fn build_delete(table: &str, id: FieldValue) -> Result<SqlStatement> {
    Ok(SqlStatement {
        sql: format!("DELETE FROM {} WHERE \"id\" = ?", quote_ident(table)?),
        params: vec![id],
    })
}

fn push_where(
    sql: &mut String,
    params: &mut Vec<FieldValue>,
    criteria: &FindOptions,
    columns: &ColumnMap,
) -> Result<()> {
    if criteria.filters.is_empty() {
        return Ok(());
    }

    let mut predicates = Vec::with_capacity(criteria.filters.len());
    for (field, filter) in &criteria.filters {
        let column = quote_ident(field)?;
        let meta = columns.get(field);
        match filter {
            // `= NULL` never matches under three-valued logic
            Filter::Equals(FieldValue::Null) => predicates.push(format!("{} IS NULL", column)),
            Filter::Equals(value) => {
                predicates.push(format!("{} = ?", column));
                params.push(encode_value(value, meta));
            }
            Filter::Compare(op) if op.value.is_null() => {
                return Err(AppError::Validation(format!(
                    "cannot compare {} {} NULL",
                    field,
                    op.comparison.as_sql()
                )));
            }
            Filter::Compare(op) => {
                predicates.push(format!("{} {} ?", column, op.comparison.as_sql()));
                params.push(encode_value(&op.value, meta));
            }
        }
    }

    sql.push_str(" WHERE ");
    sql.push_str(&predicates.join(" AND "));
    Ok(())
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
