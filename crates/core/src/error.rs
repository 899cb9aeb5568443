// Central Error Type for the Store

use thiserror::Error;

/// Store-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Table creation failed; the repository could not be constructed.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A write, delete or read against an entity's table failed.
    #[error("Persistence error: {operation} {entity} failed: {cause}")]
    Persistence {
        entity: String,
        operation: &'static str,
        cause: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository is closed")]
    Closed,
}

impl AppError {
    pub fn persistence(
        entity: impl Into<String>,
        operation: &'static str,
        cause: impl Into<String>,
    ) -> Self {
        AppError::Persistence {
            entity: entity.into(),
            operation,
            cause: cause.into(),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by rendering the driver error into the `cause` text
