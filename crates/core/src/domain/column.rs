// Column Metadata - storage type, nullability and default per field

use crate::domain::FieldValue;
use std::collections::BTreeMap;
use std::fmt;

pub const ID: &str = "id";
pub const DATE_CREATED: &str = "dateCreated";
pub const DATE_UPDATED: &str = "dateUpdated";
pub const DATE_DELETED: &str = "dateDeleted";
pub const VERSION: &str = "version";

/// Fields every entity is assumed to carry when nothing else is known.
pub const BASE_COLUMNS: [&str; 5] = [ID, DATE_CREATED, DATE_UPDATED, DATE_DELETED, VERSION];

/// SQLite storage class used for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }

    /// Classify a declared SQLite column type by affinity rules.
    pub fn from_declared(declared: &str) -> Self {
        if declared.to_ascii_uppercase().contains("INT") {
            SqlType::Integer
        } else {
            SqlType::Text
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// What the application-side value looks like, as far as inference could tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Text,
    Number,
    Boolean,
    Timestamp,
    /// Object/array or otherwise unrecognized shape, stored as opaque text.
    Opaque,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub sql_type: SqlType,
    pub nullable: bool,
    pub unique: bool,
    pub default: Option<FieldValue>,
    pub kind: ValueKind,
}

impl ColumnMetadata {
    pub fn text() -> Self {
        Self {
            sql_type: SqlType::Text,
            nullable: true,
            unique: false,
            default: None,
            kind: ValueKind::Text,
        }
    }

    pub fn integer() -> Self {
        Self {
            sql_type: SqlType::Integer,
            nullable: true,
            unique: false,
            default: None,
            kind: ValueKind::Number,
        }
    }

    pub fn boolean(default: bool) -> Self {
        Self {
            sql_type: SqlType::Integer,
            nullable: true,
            unique: false,
            default: Some(FieldValue::Integer(i64::from(default))),
            kind: ValueKind::Boolean,
        }
    }

    pub fn timestamp() -> Self {
        Self {
            kind: ValueKind::Timestamp,
            ..Self::text()
        }
    }

    pub fn opaque() -> Self {
        Self {
            kind: ValueKind::Opaque,
            ..Self::text()
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<FieldValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn is_integer(&self) -> bool {
        self.sql_type == SqlType::Integer
    }
}

/// Column metadata for one entity type, keyed by property name.
pub type ColumnMap = BTreeMap<String, ColumnMetadata>;

/// Forced metadata for the identity/audit/soft-delete/version convention.
pub fn universal_constraint(name: &str) -> Option<ColumnMetadata> {
    match name {
        ID => Some(ColumnMetadata::text().not_null()),
        DATE_CREATED | DATE_UPDATED => Some(ColumnMetadata::timestamp().not_null()),
        DATE_DELETED => Some(ColumnMetadata::timestamp()),
        VERSION => Some(ColumnMetadata::integer().not_null().with_default(1)),
        _ => None,
    }
}

/// Overwrite the metadata of every universal column present in `columns`.
pub fn apply_universal_constraints(columns: &mut ColumnMap) {
    for (name, meta) in columns.iter_mut() {
        if let Some(forced) = universal_constraint(name) {
            *meta = forced;
        }
    }
}
