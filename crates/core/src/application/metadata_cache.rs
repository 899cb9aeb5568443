// Metadata Cache - memoized inference per entity type

use crate::application::inference::infer_columns;
use crate::domain::{ColumnMap, Entity};
use crate::port::SchemaRegistry;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Inferred column metadata keyed by entity type.
///
/// Owned by one repository instance. Entries are only dropped through
/// `invalidate` / `invalidate_all`; schema drift in the live table does not
/// evict anything.
///
/// Columns learned from saved values or from the live table are kept apart
/// from inference and survive invalidation, since they describe columns
/// that already exist. They only fill names inference does not cover.
#[derive(Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<TypeId, Arc<ColumnMap>>>,
    observed: RwLock<HashMap<TypeId, ColumnMap>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata for `E`, inferring and storing it on a miss.
    pub fn get_or_infer<E: Entity>(&self, registry: Option<&dyn SchemaRegistry>) -> Arc<ColumnMap> {
        let key = TypeId::of::<E>();
        if let Some(hit) = self.get(key) {
            return hit;
        }

        debug!(entity = E::TYPE_NAME, "Metadata cache miss");
        let mut inferred = infer_columns::<E>(registry);
        self.fill_observed(key, &mut inferred);
        let inferred = Arc::new(inferred);

        // A concurrent miss may have filled the slot first; keep whichever landed
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(entries.entry(key).or_insert(inferred))
    }

    /// Remember metadata for columns inference did not know about and
    /// return the updated entry. Names already present keep their metadata.
    pub fn observe<E: Entity>(
        &self,
        registry: Option<&dyn SchemaRegistry>,
        learned: ColumnMap,
    ) -> Arc<ColumnMap> {
        let key = TypeId::of::<E>();
        {
            let mut observed = self.observed.write().unwrap_or_else(|e| e.into_inner());
            let slot = observed.entry(key).or_default();
            for (name, meta) in learned {
                slot.entry(name).or_insert(meta);
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let mut columns = match entries.get(&key) {
            Some(current) => ColumnMap::clone(current),
            None => infer_columns::<E>(registry),
        };
        self.fill_observed(key, &mut columns);
        debug!(entity = E::TYPE_NAME, columns = columns.len(), "Observed column metadata");

        let columns = Arc::new(columns);
        entries.insert(key, Arc::clone(&columns));
        columns
    }

    fn fill_observed(&self, key: TypeId, columns: &mut ColumnMap) {
        let observed = self.observed.read().unwrap_or_else(|e| e.into_inner());
        if let Some(learned) = observed.get(&key) {
            for (name, meta) in learned {
                columns.entry(name.clone()).or_insert_with(|| meta.clone());
            }
        }
    }

    pub fn get(&self, key: TypeId) -> Option<Arc<ColumnMap>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&key).cloned()
    }

    pub fn invalidate<E: Entity>(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.remove(&TypeId::of::<E>()).is_some() {
            debug!(entity = E::TYPE_NAME, "Metadata cache entry invalidated");
        }
    }

    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}
