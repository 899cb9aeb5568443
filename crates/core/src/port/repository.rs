// Repository Port (Interface)

use crate::domain::{Entity, FindOptions, Record};
use crate::error::Result;
use async_trait::async_trait;

/// Repository contract consumed by the calling layers.
///
/// Absence is never an error: `find_one` returns `Ok(None)`.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// All entities matching the criteria (possibly empty)
    async fn find(&self, criteria: FindOptions) -> Result<Vec<E>>;

    /// First match, with an implicit limit of one
    async fn find_one(&self, criteria: FindOptions) -> Result<Option<E>>;

    /// In-memory candidate with a fresh id; nothing is persisted
    fn create(&self, partial: Record) -> Result<E>;

    /// Shallow overlay of each partial onto `target`, later partials winning
    fn merge(&self, target: E, partials: &[Record]) -> Result<E>;

    /// Upsert one entity, stamping id/timestamps/version as needed
    async fn save(&self, entity: E) -> Result<E>;

    /// Upsert a batch, one row at a time
    async fn save_many(&self, entities: Vec<E>) -> Result<Vec<E>>;

    /// Delete by id; deleting a missing row is not an error
    async fn remove(&self, entity: E) -> Result<E>;

    async fn remove_many(&self, entities: Vec<E>) -> Result<Vec<E>>;

    /// Release the database handle; later calls fail with `AppError::Closed`
    async fn close(&self);
}
