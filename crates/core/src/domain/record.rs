// Record - an entity flattened to named field values

use crate::domain::FieldValue;
use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field name -> value map for one entity instance.
///
/// This is the form every repository operation works on internally:
/// entities are serialized into a record, stamped and encoded, and rows are
/// decoded back into a record before deserializing the entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(BTreeMap<String, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize an entity. The entity must serialize to a JSON object.
    pub fn from_entity<E: Serialize>(entity: &E) -> Result<Self> {
        match serde_json::to_value(entity)? {
            Value::Object(map) => Ok(Self::from_json_map(&map)),
            other => Err(AppError::Validation(format!(
                "entity must serialize to an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Deserialize an entity from this record.
    pub fn into_entity<E: DeserializeOwned>(self) -> Result<E> {
        Ok(serde_json::from_value(Value::Object(self.to_json_map()))?)
    }

    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        Self(
            map.iter()
                .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                .collect(),
        )
    }

    pub fn to_json_map(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// True when the field is missing or explicitly null.
    pub fn is_absent(&self, field: &str) -> bool {
        self.0.get(field).map_or(true, FieldValue::is_null)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow overlay: every field of `partial` replaces the field here.
    pub fn merge(&mut self, partial: &Record) {
        for (k, v) in &partial.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
