// SQLite Repository - the façade composing inference, schema, codec and queries

use crate::codec::{bind_value, decode_row, encode_value};
use crate::error::describe_sqlx_error;
use crate::query::{build_count, build_delete, build_select, build_upsert, quote_ident, SqlStatement};
use crate::schema::SchemaManager;
use async_trait::async_trait;
use schemaless_core::application::{infer_from_field, MetadataCache};
use schemaless_core::domain::column::{DATE_CREATED, DATE_UPDATED, ID, VERSION};
use schemaless_core::domain::{table_name_for, ColumnMap, Entity, FieldValue, FindOptions, Record};
use schemaless_core::error::{AppError, Result};
use schemaless_core::port::id_provider::UuidProvider;
use schemaless_core::port::time_provider::SystemTimeProvider;
use schemaless_core::port::{IdProvider, Repository, SchemaRegistry, TimeProvider};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Row, Sqlite, SqlitePool};
use std::any::TypeId;
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collaborators injected into a repository
#[derive(Clone)]
pub struct RepositoryOptions {
    pub registry: Option<Arc<dyn SchemaRegistry>>,
    pub id_provider: Arc<dyn IdProvider>,
    pub time_provider: Arc<dyn TimeProvider>,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            registry: None,
            id_provider: Arc::new(UuidProvider),
            time_provider: Arc::new(SystemTimeProvider),
        }
    }
}

/// Schema-inferring repository for one entity type over a SQLite pool.
pub struct SqliteRepository<E: Entity> {
    pool: SqlitePool,
    schema: SchemaManager,
    cache: MetadataCache,
    registry: Option<Arc<dyn SchemaRegistry>>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    closed: AtomicBool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqliteRepository<E> {
    /// Create with default collaborators (UUID ids, system clock, no registry).
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        Self::with_options(pool, RepositoryOptions::default()).await
    }

    /// Create the repository and its table. Fails with `AppError::Schema`
    /// when the table cannot be created.
    pub async fn with_options(pool: SqlitePool, options: RepositoryOptions) -> Result<Self> {
        let table = options
            .registry
            .as_deref()
            .and_then(|r| r.lookup(TypeId::of::<E>()))
            .and_then(|schema| schema.table_name)
            .unwrap_or_else(|| table_name_for(E::TYPE_NAME));
        quote_ident(&table).map_err(|e| AppError::Schema(e.to_string()))?;

        let repo = Self {
            schema: SchemaManager::new(pool.clone(), table),
            pool,
            cache: MetadataCache::new(),
            registry: options.registry,
            id_provider: options.id_provider,
            time_provider: options.time_provider,
            closed: AtomicBool::new(false),
            _entity: PhantomData,
        };

        let columns = repo.columns();
        repo.schema.ensure_table(&columns).await?;

        // columns added by earlier runs are only known to the table itself
        let live = repo
            .schema
            .live_metadata()
            .await
            .map_err(|e| AppError::Schema(describe_sqlx_error(&e)))?;
        let learned: ColumnMap = live
            .into_iter()
            .filter(|(name, _)| !columns.contains_key(name))
            .collect();
        if !learned.is_empty() {
            repo.cache.observe::<E>(repo.registry.as_deref(), learned);
        }

        Ok(repo)
    }

    pub fn table_name(&self) -> &str {
        self.schema.table()
    }

    /// Cached inferred metadata (inferring on first use)
    pub fn columns(&self) -> Arc<ColumnMap> {
        self.cache.get_or_infer::<E>(self.registry.as_deref())
    }

    /// Drop the cached metadata so the next call re-infers it
    pub fn invalidate_metadata(&self) {
        self.cache.invalidate::<E>();
    }

    /// Live column names of the backing table
    pub async fn live_columns(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        self.schema
            .live_columns()
            .await
            .map_err(|e| self.persistence_error("inspect", &e))
    }

    pub async fn count(&self, criteria: FindOptions) -> Result<i64> {
        self.ensure_open()?;
        let stmt = build_count(self.table_name(), &criteria, &self.columns())?;
        debug!(sql = %stmt.sql, "Counting");

        bind_all(sqlx::query(&stmt.sql), stmt.params)
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get::<i64, _>(0))
            .map_err(|e| self.persistence_error("count", &e))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(AppError::Closed)
        } else {
            Ok(())
        }
    }

    fn persistence_error(&self, operation: &'static str, err: &sqlx::Error) -> AppError {
        AppError::persistence(E::TYPE_NAME, operation, describe_sqlx_error(err))
    }

    /// Stamp, evolve the schema, upsert. Returns the stamped record.
    async fn save_record(&self, mut record: Record) -> Result<Record> {
        let now = self.time_provider.now();
        if record.is_absent(ID) {
            record.insert(ID, self.id_provider.generate_id());
        }
        if record.is_absent(DATE_CREATED) {
            record.insert(DATE_CREATED, now);
        }
        record.insert(DATE_UPDATED, now);
        if record.is_absent(VERSION) {
            record.insert(VERSION, 1);
        }

        let mut columns = self.columns();
        let learned: ColumnMap = record
            .iter()
            .filter(|(name, _)| !columns.contains_key(*name))
            .map(|(name, value)| (name.to_string(), infer_from_field(name, value)))
            .collect();
        if !learned.is_empty() {
            columns = self.cache.observe::<E>(self.registry.as_deref(), learned);
        }

        let required: BTreeSet<&str> = record
            .field_names()
            .chain(columns.keys().map(String::as_str))
            .collect();

        let evolution = self
            .schema
            .ensure_columns(required, &columns)
            .await
            .map_err(|e| self.persistence_error("save", &e))?;

        let mut fields = Vec::with_capacity(record.len());
        let mut dropped = Vec::new();
        for (name, value) in record.iter() {
            if evolution.live.iter().any(|l| l == name) {
                fields.push((name.to_string(), encode_value(value, columns.get(name))));
            } else {
                dropped.push(name.to_string());
            }
        }
        if !dropped.is_empty() {
            warn!(
                entity = E::TYPE_NAME,
                table = %self.table_name(),
                dropped_fields = ?dropped,
                "Saved without fields whose columns could not be added"
            );
        }

        let stmt = build_upsert(self.table_name(), fields)?;
        self.execute(stmt, "save").await?;

        debug!(entity = E::TYPE_NAME, id = ?record.get(ID), "Saved");
        Ok(record)
    }

    async fn remove_record(&self, record: &Record) -> Result<()> {
        let id = match record.get(ID) {
            Some(id) if !id.is_null() => id.clone(),
            _ => {
                debug!(entity = E::TYPE_NAME, "Remove skipped: entity has no id");
                return Ok(());
            }
        };

        let stmt = build_delete(self.table_name(), encode_value(&id, None))?;
        let affected = self.execute(stmt, "remove").await?;
        debug!(entity = E::TYPE_NAME, id = %id, rows = affected, "Removed");
        Ok(())
    }

    async fn execute(&self, stmt: SqlStatement, operation: &'static str) -> Result<u64> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing");
        let result = bind_all(sqlx::query(&stmt.sql), stmt.params)
            .execute(&self.pool)
            .await
            .map_err(|e| self.persistence_error(operation, &e))?;
        Ok(result.rows_affected())
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: Vec<FieldValue>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in params {
        query = bind_value(query, value);
    }
    query
}

#[async_trait]
impl<E: Entity> Repository<E> for SqliteRepository<E> {
    async fn find(&self, criteria: FindOptions) -> Result<Vec<E>> {
        self.ensure_open()?;
        let columns = self.columns();
        let stmt = build_select(self.table_name(), &criteria, &columns)?;
        debug!(sql = %stmt.sql, params = stmt.params.len(), "Finding");

        let rows = bind_all(sqlx::query(&stmt.sql), stmt.params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.persistence_error("find", &e))?;

        rows.iter()
            .map(|row| {
                decode_row(row, &columns)
                    .map_err(|e| self.persistence_error("find", &e))?
                    .into_entity::<E>()
            })
            .collect()
    }

    async fn find_one(&self, criteria: FindOptions) -> Result<Option<E>> {
        let mut found = self.find(criteria.take(1)).await?;
        Ok(if found.is_empty() { None } else { Some(found.swap_remove(0)) })
    }

    fn create(&self, partial: Record) -> Result<E> {
        self.ensure_open()?;
        let mut record = match E::sample() {
            Some(sample) => Record::from_entity(&sample)?,
            None => Record::new(),
        };
        record.merge(&partial);
        record.insert(ID, self.id_provider.generate_id());
        record.into_entity()
    }

    fn merge(&self, target: E, partials: &[Record]) -> Result<E> {
        self.ensure_open()?;
        let mut record = Record::from_entity(&target)?;
        for partial in partials {
            record.merge(partial);
        }
        record.into_entity()
    }

    async fn save(&self, entity: E) -> Result<E> {
        self.ensure_open()?;
        let record = Record::from_entity(&entity)?;
        self.save_record(record).await?.into_entity()
    }

    async fn save_many(&self, entities: Vec<E>) -> Result<Vec<E>> {
        let mut saved = Vec::with_capacity(entities.len());
        for entity in entities {
            saved.push(self.save(entity).await?);
        }
        Ok(saved)
    }

    async fn remove(&self, entity: E) -> Result<E> {
        self.ensure_open()?;
        let record = Record::from_entity(&entity)?;
        self.remove_record(&record).await?;
        Ok(entity)
    }

    async fn remove_many(&self, entities: Vec<E>) -> Result<Vec<E>> {
        let mut removed = Vec::with_capacity(entities.len());
        for entity in entities {
            removed.push(self.remove(entity).await?);
        }
        Ok(removed)
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.pool.close().await;
        info!(entity = E::TYPE_NAME, table = %self.table_name(), "Repository closed");
    }
}
