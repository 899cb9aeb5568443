// Application Layer - Inference and metadata caching

pub mod inference;
pub mod metadata_cache;

// Re-exports
pub use inference::{
    infer_columns, infer_from_field, infer_from_name, is_date_like_name, InferenceSources,
};
pub use metadata_cache::MetadataCache;
