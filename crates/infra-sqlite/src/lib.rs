// Schemaless Infrastructure - SQLite Adapter
// Implements: Repository (schema inference, additive schema evolution, parameterized queries)

pub mod codec;
mod connection;
mod error;
pub mod query;
mod repository;
mod schema;

pub use connection::{create_pool, Location, StoreConfig, DB_PATH_ENV, MAX_CONNECTIONS_ENV};
pub use error::{describe_sqlx_error, map_sqlx_error};
pub use repository::{RepositoryOptions, SqliteRepository};
pub use schema::{SchemaEvolution, SchemaManager};

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
