// Type Inference Engine - column names and storage types for an entity type

use crate::domain::column::{apply_universal_constraints, universal_constraint, BASE_COLUMNS, ID};
use crate::domain::value::parse_timestamp;
use crate::domain::{ColumnMap, ColumnMetadata, DeclaredColumn, Entity, FieldValue};
use crate::port::SchemaRegistry;
use serde_json::{Map, Value};
use std::any::TypeId;
use tracing::{debug, warn};

/// Everything inference may look at for one entity type.
#[derive(Debug, Clone, Default)]
pub struct InferenceSources {
    /// Column names published by an external schema registry
    pub registry_columns: Vec<String>,
    pub declared: Vec<DeclaredColumn>,
    /// Serialized default instance
    pub sample: Option<Map<String, Value>>,
}

impl InferenceSources {
    /// Collect sources for `E`, consulting the registry if one is given.
    pub fn for_entity<E: Entity>(registry: Option<&dyn SchemaRegistry>) -> Self {
        let registry_columns = registry
            .and_then(|r| r.lookup(TypeId::of::<E>()))
            .map(|schema| schema.columns)
            .unwrap_or_default();

        let sample = E::sample().and_then(|instance| match serde_json::to_value(&instance) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => None,
            Err(e) => {
                warn!(entity = E::TYPE_NAME, error = %e, "Sample instance did not serialize");
                None
            }
        });

        Self {
            registry_columns,
            declared: E::declared_columns(),
            sample,
        }
    }
}

/// Infer column metadata for `E`.
pub fn infer_columns<E: Entity>(registry: Option<&dyn SchemaRegistry>) -> ColumnMap {
    let columns = infer_from_sources(&InferenceSources::for_entity::<E>(registry));
    debug!(entity = E::TYPE_NAME, columns = columns.len(), "Inferred column metadata");
    columns
}

/// Pure inference over already-collected sources.
///
/// Property names come from the registry, the declared columns and the
/// sample, in that order. Each property takes its type from the first
/// source that can tell: an explicitly typed declaration, then the sample
/// value, then the name pattern. Universal constraints are applied last.
pub fn infer_from_sources(sources: &InferenceSources) -> ColumnMap {
    let mut names: Vec<&str> = Vec::new();
    for name in &sources.registry_columns {
        push_unique(&mut names, name);
    }
    for declared in &sources.declared {
        push_unique(&mut names, &declared.name);
    }
    if let Some(sample) = &sources.sample {
        for name in sample.keys() {
            push_unique(&mut names, name);
        }
    }
    if names.is_empty() {
        names.extend(BASE_COLUMNS);
    }

    let mut columns = ColumnMap::new();
    for name in names {
        let declared = sources.declared.iter().find(|d| d.name == name);

        let mut meta = declared
            .and_then(|d| d.sql_type)
            .map(|sql_type| ColumnMetadata {
                sql_type,
                ..infer_from_name(name)
            })
            .or_else(|| {
                sources
                    .sample
                    .as_ref()
                    .and_then(|s| s.get(name))
                    .and_then(infer_from_value)
            })
            .unwrap_or_else(|| infer_from_name(name));

        if declared.is_some_and(|d| d.unique) {
            meta.unique = true;
        }
        columns.insert(name.to_string(), meta);
    }

    columns
        .entry(ID.to_string())
        .or_insert_with(ColumnMetadata::text);
    apply_universal_constraints(&mut columns);
    columns
}

fn push_unique<'a>(names: &mut Vec<&'a str>, name: &'a str) {
    if !name.is_empty() && !names.contains(&name) {
        names.push(name);
    }
}

/// Type from a sampled runtime value; `None` for null.
pub fn infer_from_value(value: &Value) -> Option<ColumnMetadata> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(ColumnMetadata::boolean(*b)),
        Value::Number(_) => Some(ColumnMetadata::integer()),
        Value::String(s) if parse_timestamp(s).is_some() => Some(ColumnMetadata::timestamp()),
        Value::String(_) => Some(ColumnMetadata::text()),
        Value::Array(_) | Value::Object(_) => Some(ColumnMetadata::opaque()),
    }
}

/// Type for a field first seen on a value being saved.
///
/// Universal constraints win, then the value's shape; nulls fall back to the
/// name. Boolean columns default to false so rows written before the column
/// existed still read back as booleans.
pub fn infer_from_field(name: &str, value: &FieldValue) -> ColumnMetadata {
    universal_constraint(name)
        .or_else(|| match value {
            FieldValue::Bool(_) => Some(ColumnMetadata::boolean(false)),
            other => infer_from_value(&other.to_json()),
        })
        .unwrap_or_else(|| infer_from_name(name))
}

/// Type from the property name alone.
///
/// Date/time names and secret/hash/token names are TEXT; boolean flag names
/// and counter/magnitude names are INTEGER; everything else is TEXT.
pub fn infer_from_name(name: &str) -> ColumnMetadata {
    let lower = name.to_ascii_lowercase();

    if is_date_like_name(name) {
        return ColumnMetadata::timestamp();
    }
    if ["password", "secret", "hash", "token", "salt"]
        .iter()
        .any(|t| lower.contains(t))
    {
        return ColumnMetadata::text();
    }
    if ["active", "enabled"].iter().any(|t| lower.contains(t))
        || ["is", "has", "can", "should"]
            .iter()
            .any(|p| has_flag_prefix(name, p))
    {
        return ColumnMetadata {
            default: None,
            ..ColumnMetadata::boolean(false)
        };
    }
    if ["count", "number", "amount", "size", "length", "version"]
        .iter()
        .any(|t| lower.contains(t))
    {
        return ColumnMetadata::integer();
    }
    ColumnMetadata::text()
}

/// Names that suggest a date/time value: containing `date`, `time`,
/// `created`, `updated`, `deleted`, or ending in `At` / `_at`.
///
/// A bare `at` substring is not enough, so `status` or `latitude` stay text.
pub fn is_date_like_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ["date", "time", "created", "updated", "deleted"]
        .iter()
        .any(|t| lower.contains(t))
        || name.ends_with("At")
        || lower.ends_with("_at")
}

/// `isActive`, `is_active`, `hasOwner` - but not `issue` or `canvas`.
fn has_flag_prefix(name: &str, prefix: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    if !lower.starts_with(prefix) {
        return false;
    }
    match name[prefix.len()..].chars().next() {
        Some(c) => c.is_ascii_uppercase() || c == '_',
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::column::{DATE_CREATED, DATE_DELETED, VERSION};
    use crate::domain::{FieldValue, SqlType, ValueKind};
    use crate::port::{InMemorySchemaRegistry, RegisteredSchema};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Account {
        id: Option<String>,
        name: String,
        age: i64,
        active: bool,
        tags: Vec<String>,
        date_created: Option<String>,
        nickname: Option<String>,
        login_count: Option<i64>,
        // sampled as a string, forced back to INTEGER
        version: String,
    }

    impl Entity for Account {
        const TYPE_NAME: &'static str = "Account";

        fn declared_columns() -> Vec<DeclaredColumn> {
            vec![DeclaredColumn::new("name").unique()]
        }

        fn sample() -> Option<Self> {
            Some(Self {
                active: true,
                ..Self::default()
            })
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Opaque {
        value: String,
    }

    impl Entity for Opaque {
        const TYPE_NAME: &'static str = "Opaque";
    }

    #[test]
    fn test_sample_values_drive_types() {
        let columns = infer_columns::<Account>(None);

        assert_eq!(columns["name"].sql_type, SqlType::Text);
        assert!(columns["name"].unique);
        assert_eq!(columns["age"].sql_type, SqlType::Integer);
        assert_eq!(columns["active"].kind, ValueKind::Boolean);
        assert_eq!(columns["active"].default, Some(FieldValue::Integer(1)));
        assert_eq!(columns["tags"].kind, ValueKind::Opaque);
        // null samples fall back to the name
        assert_eq!(columns["loginCount"].sql_type, SqlType::Integer);
        assert_eq!(columns["nickname"].sql_type, SqlType::Text);
    }

    #[test]
    fn test_universal_constraints_win_over_samples() {
        let columns = infer_columns::<Account>(None);

        assert_eq!(columns[VERSION].sql_type, SqlType::Integer);
        assert!(!columns[VERSION].nullable);
        assert_eq!(columns[VERSION].default, Some(FieldValue::Integer(1)));
        assert!(!columns[ID].nullable);
        assert!(!columns[DATE_CREATED].nullable);
        assert!(!columns.contains_key(DATE_DELETED));
    }

    #[test]
    fn test_inference_is_deterministic() {
        assert_eq!(infer_columns::<Account>(None), infer_columns::<Account>(None));
    }

    #[test]
    fn test_no_sources_falls_back_to_base_columns() {
        let columns = infer_columns::<Opaque>(None);
        let names: Vec<&str> = columns.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["dateCreated", "dateDeleted", "dateUpdated", "id", "version"]
        );
        assert!(columns[DATE_DELETED].nullable);
    }

    #[test]
    fn test_registry_seeds_property_names() {
        let registry = InMemorySchemaRegistry::new();
        registry.register::<Opaque>(RegisteredSchema {
            table_name: None,
            columns: vec!["value".to_string(), "itemCount".to_string()],
        });

        let columns = infer_columns::<Opaque>(Some(&registry));
        assert_eq!(columns.len(), 3);
        assert_eq!(columns["itemCount"].sql_type, SqlType::Integer);
        assert_eq!(columns[ID].sql_type, SqlType::Text);
    }

    #[test]
    fn test_explicit_declared_type_beats_sample() {
        let sources = InferenceSources {
            registry_columns: vec![],
            declared: vec![DeclaredColumn::typed("code", SqlType::Integer)],
            sample: json!({"code": "abc"}).as_object().cloned(),
        };
        let columns = infer_from_sources(&sources);
        assert_eq!(columns["code"].sql_type, SqlType::Integer);
    }

    #[test]
    fn test_name_patterns() {
        assert_eq!(infer_from_name("updatedAt").kind, ValueKind::Timestamp);
        assert_eq!(infer_from_name("birth_date").kind, ValueKind::Timestamp);
        assert_eq!(infer_from_name("passwordHash").sql_type, SqlType::Text);
        assert_eq!(infer_from_name("isAdmin").kind, ValueKind::Boolean);
        assert_eq!(infer_from_name("has_children").kind, ValueKind::Boolean);
        assert_eq!(infer_from_name("emailEnabled").sql_type, SqlType::Integer);
        assert_eq!(infer_from_name("issue").sql_type, SqlType::Text);
        assert_eq!(infer_from_name("fileSize").sql_type, SqlType::Integer);
        assert_eq!(infer_from_name("title").sql_type, SqlType::Text);
        assert!(is_date_like_name("shippedAt"));
        assert!(!is_date_like_name("status"));
        assert!(!is_date_like_name("latitude"));
    }

    #[test]
    fn test_field_values_type_new_columns() {
        let age = infer_from_field("age", &FieldValue::Integer(7));
        assert_eq!(age.sql_type, SqlType::Integer);
        assert_eq!(age.kind, ValueKind::Number);

        let verified = infer_from_field("verified", &FieldValue::Bool(true));
        assert_eq!(verified.kind, ValueKind::Boolean);
        assert_eq!(verified.default, Some(FieldValue::Integer(0)));

        assert_eq!(infer_from_field("nickname", &FieldValue::from("Rex")).sql_type, SqlType::Text);
        // nulls say nothing, so the name decides
        assert_eq!(infer_from_field("shoeSize", &FieldValue::Null).sql_type, SqlType::Integer);
        assert_eq!(infer_from_field("rating", &FieldValue::Null).sql_type, SqlType::Text);
        // universal constraints beat the value
        assert_eq!(infer_from_field(VERSION, &FieldValue::from("3")).sql_type, SqlType::Integer);
    }
}
