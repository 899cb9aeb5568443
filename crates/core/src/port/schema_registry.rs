// Schema Registry Port - optional externally published column names

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::RwLock;

/// What another mapping layer has declared for an entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisteredSchema {
    /// Overrides the derived table name when set.
    pub table_name: Option<String>,
    pub columns: Vec<String>,
}

/// Read-only lookup keyed by entity type identity.
///
/// Absent registry and absent entry behave the same.
pub trait SchemaRegistry: Send + Sync {
    fn lookup(&self, entity: TypeId) -> Option<RegisteredSchema>;
}

/// Registry backed by a map, filled by the host application.
#[derive(Default)]
pub struct InMemorySchemaRegistry {
    entries: RwLock<HashMap<TypeId, RegisteredSchema>>,
}

impl InMemorySchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: 'static>(&self, schema: RegisteredSchema) {
        // A poisoned lock only means a writer panicked mid-insert; the map is still usable
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(TypeId::of::<E>(), schema);
    }

    pub fn unregister<E: 'static>(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(&TypeId::of::<E>());
    }
}

impl SchemaRegistry for InMemorySchemaRegistry {
    fn lookup(&self, entity: TypeId) -> Option<RegisteredSchema> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&entity).cloned()
    }
}
