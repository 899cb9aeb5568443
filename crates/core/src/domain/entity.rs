// Entity Contract - what an application type provides to be persisted

use crate::domain::SqlType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A property the entity type declares up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredColumn {
    pub name: String,
    /// Authoritative storage type; `None` defers to sampling and name patterns.
    pub sql_type: Option<SqlType>,
    pub unique: bool,
}

impl DeclaredColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: None,
            unique: false,
        }
    }

    pub fn typed(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            sql_type: Some(sql_type),
            ..Self::new(name)
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// An application record shape persisted by the store.
///
/// Property names are the serialized field names, so
/// `#[serde(rename_all = "camelCase")]` yields `dateCreated` style columns.
/// Everything except `TYPE_NAME` is optional: a type with no declarations
/// and no sample starts from the base columns, and each new field takes its
/// column type from the first value saved for it (the name decides for nulls).
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Default)]
/// #[serde(rename_all = "camelCase")]
/// struct UserProfile {
///     id: Option<String>,
///     name: String,
///     active: bool,
/// }
///
/// impl Entity for UserProfile {
///     const TYPE_NAME: &'static str = "UserProfile";
///     fn sample() -> Option<Self> { Some(Self::default()) }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Type identifier; the table name is derived from it.
    const TYPE_NAME: &'static str;

    fn declared_columns() -> Vec<DeclaredColumn> {
        Vec::new()
    }

    /// A default instance whose field values drive type inference.
    fn sample() -> Option<Self> {
        None
    }
}

/// Dynamic entity: an id plus arbitrary fields.
///
/// Used where the record shape is only known at runtime (the CLI). Pair it
/// with a schema registry entry to choose the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl Entity for Document {
    const TYPE_NAME: &'static str = "Document";
}

/// Derive the table name from a type identifier: split compound
/// capitalized words, join with underscores, lowercase, pluralize.
///
/// `UserProfile` -> `user_profiles`, `Category` -> `categories`.
pub fn table_name_for(type_name: &str) -> String {
    let mut snake = String::with_capacity(type_name.len() + 4);
    let chars: Vec<char> = type_name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // "HTTPServer" -> "http_server"
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !snake.ends_with('_') {
                snake.push('_');
            }
            snake.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' {
            snake.push('_');
        } else {
            snake.push(c);
        }
    }
    pluralize(&snake)
}

fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{}ies", stem);
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{}es", word);
    }
    format!("{}s", word)
}
