// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod repository;
pub mod schema_registry;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use repository::Repository;
pub use schema_registry::{InMemorySchemaRegistry, RegisteredSchema, SchemaRegistry};
pub use time_provider::TimeProvider;
