// Value Codec - record fields <-> SQLite primitives

use schemaless_core::application::is_date_like_name;
use schemaless_core::domain::column::VERSION;
use schemaless_core::domain::value::{format_timestamp, parse_timestamp};
use schemaless_core::domain::{ColumnMap, ColumnMetadata, FieldValue, Record, ValueKind};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

/// Decode a full row into a record.
pub fn decode_row(row: &SqliteRow, columns: &ColumnMap) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let raw = read_raw(row, index)?;
        record.insert(name, decode_value(name, raw, columns.get(name)));
    }
    Ok(record)
}

fn read_raw(row: &SqliteRow, index: usize) -> Result<FieldValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(FieldValue::Null);
    }
    // SQLite reports the storage class of the value itself, not the column
    let storage = raw.type_info().name().to_string();
    Ok(match storage.as_str() {
        "INTEGER" => FieldValue::Integer(row.try_get::<i64, _>(index)?),
        "REAL" => FieldValue::Real(row.try_get::<f64, _>(index)?),
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get(index)?;
            FieldValue::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => FieldValue::Text(row.try_get::<String, _>(index)?),
    })
}

/// Row -> entity direction for one column.
///
/// Classification goes by column name (and inferred kind when cached):
/// date-like text becomes a timestamp, `active` and boolean-kind integers
/// become booleans, `version` and everything else pass through.
pub fn decode_value(name: &str, raw: FieldValue, meta: Option<&ColumnMetadata>) -> FieldValue {
    let kind = meta.map(|m| m.kind);
    match raw {
        FieldValue::Null => FieldValue::Null,
        FieldValue::Text(s) if is_date_like_name(name) || kind == Some(ValueKind::Timestamp) => {
            match parse_timestamp(&s) {
                Some(ts) => FieldValue::Timestamp(ts),
                None => FieldValue::Text(s),
            }
        }
        FieldValue::Integer(i) if name == VERSION => FieldValue::Integer(i),
        FieldValue::Integer(i) if name == "active" || kind == Some(ValueKind::Boolean) => {
            FieldValue::Bool(i != 0)
        }
        FieldValue::Real(f) if name == "active" || kind == Some(ValueKind::Boolean) => {
            FieldValue::Bool(f != 0.0)
        }
        other => other,
    }
}

/// Entity -> row direction for one column.
///
/// The result is always one of Null / Integer / Real / Text.
pub fn encode_value(value: &FieldValue, meta: Option<&ColumnMetadata>) -> FieldValue {
    match value {
        FieldValue::Null => FieldValue::Null,
        _ if meta.is_some_and(ColumnMetadata::is_integer) => encode_numeric(value),
        FieldValue::Bool(b) => FieldValue::Integer(i64::from(*b)),
        FieldValue::Timestamp(ts) => FieldValue::Text(format_timestamp(ts)),
        other => other.clone(),
    }
}

fn encode_numeric(value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::Bool(b) => FieldValue::Integer(i64::from(*b)),
        FieldValue::Timestamp(ts) => FieldValue::Integer(ts.timestamp_millis()),
        FieldValue::Text(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                FieldValue::Integer(i)
            } else if let Ok(f) = trimmed.parse::<f64>() {
                FieldValue::Real(f)
            } else {
                // not numeric: let SQLite's affinity keep the text
                FieldValue::Text(s.clone())
            }
        }
        other => other.clone(),
    }
}

/// Bind an encoded value as the next positional parameter.
pub fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: FieldValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        FieldValue::Null => query.bind(None::<String>),
        FieldValue::Bool(b) => query.bind(i64::from(b)),
        FieldValue::Integer(i) => query.bind(i),
        FieldValue::Real(f) => query.bind(f),
        FieldValue::Text(s) => query.bind(s),
        FieldValue::Timestamp(ts) => query.bind(format_timestamp(&ts)),
    }
}
