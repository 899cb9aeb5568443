// Domain Layer - values, records, column metadata and query criteria

pub mod column;
pub mod entity;
pub mod query;
pub mod record;
pub mod value;

// Re-exports
pub use column::{ColumnMap, ColumnMetadata, SqlType, ValueKind};
pub use entity::{table_name_for, DeclaredColumn, Document, Entity};
pub use query::{gt, gte, lt, lte, Comparison, Filter, FindOperator, FindOptions, Order};
pub use record::Record;
pub use value::FieldValue;
