// Schema Manager - create the entity table and add missing columns

use crate::error::{describe_sqlx_error, is_duplicate_column};
use crate::query::{escape_ident, quote_ident};
use schemaless_core::application::{infer_from_name, is_date_like_name};
use schemaless_core::domain::column::{universal_constraint, ID};
use schemaless_core::domain::{ColumnMap, ColumnMetadata, FieldValue, SqlType};
use schemaless_core::error::{AppError, Result};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Outcome of one `ensure_columns` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaEvolution {
    /// Columns this pass added
    pub added: Vec<String>,
    /// Required columns that still do not exist afterwards
    pub failed: Vec<String>,
    /// Live column set after the pass
    pub live: Vec<String>,
}

impl SchemaEvolution {
    pub fn is_degraded(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Owns the DDL for one table. Columns are only ever added.
#[derive(Clone)]
pub struct SchemaManager {
    pool: SqlitePool,
    table: String,
}

impl SchemaManager {
    pub fn new(pool: SqlitePool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `CREATE TABLE IF NOT EXISTS` with every inferred column.
    /// Failure here is fatal to repository construction.
    pub async fn ensure_table(&self, columns: &ColumnMap) -> Result<()> {
        let sql = create_table_sql(&self.table, columns)?;
        debug!(sql = %sql, "Ensuring table");

        sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
            AppError::Schema(format!(
                "failed to create table {}: {}",
                self.table,
                describe_sqlx_error(&e)
            ))
        })?;

        info!(table = %self.table, columns = columns.len(), "Table ready");
        Ok(())
    }

    /// Column names as SQLite reports them, in table order.
    pub async fn live_columns(&self) -> std::result::Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
            .bind(&self.table)
            .fetch_all(&self.pool)
            .await
    }

    /// Metadata recoverable from the live table itself, for every column.
    pub async fn live_metadata(&self) -> std::result::Result<ColumnMap, sqlx::Error> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT name, type, dflt_value FROM pragma_table_info(?1) ORDER BY cid",
        )
        .bind(&self.table)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, declared, default)| {
                let meta = metadata_from_live(&name, &declared, default.as_deref());
                (name, meta)
            })
            .collect())
    }

    /// Add every name in `required` that the live table lacks.
    ///
    /// Types come from `cached`, else the universal constraints, else the
    /// name pattern. A failing ALTER is logged and skipped; losing a race
    /// against an identical ALTER is not a failure. Only the introspection
    /// query itself can return an error.
    pub async fn ensure_columns<'a, I>(
        &self,
        required: I,
        cached: &ColumnMap,
    ) -> std::result::Result<SchemaEvolution, sqlx::Error>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let live: HashSet<String> = self.live_columns().await?.into_iter().collect();
        let missing: Vec<&str> = required
            .into_iter()
            .filter(|name| !live.contains(*name))
            .collect();

        if missing.is_empty() {
            return Ok(SchemaEvolution {
                live: live.into_iter().collect(),
                ..SchemaEvolution::default()
            });
        }

        let mut added = Vec::new();
        for name in &missing {
            let meta = cached
                .get(*name)
                .cloned()
                .or_else(|| universal_constraint(name))
                .unwrap_or_else(|| infer_from_name(name));

            let sql = match quote_ident(name) {
                Ok(column) => format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    escape_ident(&self.table),
                    alter_column_def(&column, &meta)
                ),
                Err(e) => {
                    warn!(table = %self.table, column = %name, error = %e, "Skipping unusable column name");
                    continue;
                }
            };

            match sqlx::query(&sql).execute(&self.pool).await {
                Ok(_) => {
                    info!(table = %self.table, column = %name, sql_type = %meta.sql_type, "Added column");
                    added.push(name.to_string());
                }
                Err(e) if is_duplicate_column(&e) => {
                    debug!(table = %self.table, column = %name, "Column already exists");
                }
                Err(e) => {
                    warn!(
                        table = %self.table,
                        column = %name,
                        error = %describe_sqlx_error(&e),
                        "Failed to add column"
                    );
                }
            }
        }

        let live = self.live_columns().await?;
        let failed = missing
            .iter()
            .filter(|name| !live.iter().any(|l| l == *name))
            .map(|name| name.to_string())
            .collect();

        Ok(SchemaEvolution { added, failed, live })
    }
}

fn create_table_sql(table: &str, columns: &ColumnMap) -> Result<String> {
    let mut defs = Vec::with_capacity(columns.len() + 1);
    // id first, as the primary key
    let id_meta = columns.get(ID).cloned().unwrap_or_else(|| ColumnMetadata::text().not_null());
    defs.push(format!("{} {} NOT NULL PRIMARY KEY", quote_ident(ID)?, id_meta.sql_type));

    for (name, meta) in columns.iter().filter(|(name, _)| name.as_str() != ID) {
        let mut def = format!("{} {}", quote_ident(name)?, meta.sql_type);
        if !meta.nullable {
            def.push_str(" NOT NULL");
        }
        if meta.unique {
            def.push_str(" UNIQUE");
        }
        if let Some(default) = &meta.default {
            def.push_str(&format!(" DEFAULT {}", sql_literal(default)));
        }
        defs.push(def);
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table)?,
        defs.join(", ")
    ))
}

/// SQLite cannot ADD a UNIQUE column, nor a NOT NULL one without a default.
fn alter_column_def(column: &str, meta: &ColumnMetadata) -> String {
    let mut def = format!("{} {}", column, meta.sql_type);
    if let Some(default) = &meta.default {
        if !meta.nullable {
            def.push_str(" NOT NULL");
        }
        def.push_str(&format!(" DEFAULT {}", sql_literal(default)));
    }
    def
}

/// Only boolean columns are added with a 0/1 default, which is how they are
/// told apart from plain integers once the table is all that is left.
fn metadata_from_live(name: &str, declared: &str, default: Option<&str>) -> ColumnMetadata {
    if let Some(forced) = universal_constraint(name) {
        return forced;
    }
    match SqlType::from_declared(declared) {
        SqlType::Integer => match default {
            Some("0") => ColumnMetadata::boolean(false),
            Some("1") => ColumnMetadata::boolean(true),
            _ => ColumnMetadata::integer(),
        },
        SqlType::Text if is_date_like_name(name) => ColumnMetadata::timestamp(),
        SqlType::Text => ColumnMetadata::text(),
    }
}

/// DDL cannot take bound parameters, so defaults are rendered as literals.
fn sql_literal(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "NULL".to_string(),
        FieldValue::Bool(b) => i64::from(*b).to_string(),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Real(f) => f.to_string(),
        FieldValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        FieldValue::Timestamp(ts) => format!(
            "'{}'",
            schemaless_core::domain::value::format_timestamp(ts)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, StoreConfig};
    use schemaless_core::application::inference::{infer_from_sources, InferenceSources};
    use schemaless_core::domain::ValueKind;

    fn base_columns() -> ColumnMap {
        infer_from_sources(&InferenceSources::default())
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("users", &base_columns()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"users\" (\"id\" TEXT NOT NULL PRIMARY KEY, \
             \"dateCreated\" TEXT NOT NULL, \"dateDeleted\" TEXT, \"dateUpdated\" TEXT NOT NULL, \
             \"version\" INTEGER NOT NULL DEFAULT 1)"
        );
    }

    #[test]
    fn test_alter_column_def() {
        let version = universal_constraint("version").unwrap();
        assert_eq!(
            alter_column_def("\"version\"", &version),
            "\"version\" INTEGER NOT NULL DEFAULT 1"
        );
        let created = universal_constraint("dateCreated").unwrap();
        assert_eq!(alter_column_def("\"dateCreated\"", &created), "\"dateCreated\" TEXT");
        assert_eq!(sql_literal(&FieldValue::from("it's")), "'it''s'");
    }

    #[test]
    fn test_metadata_from_live() {
        assert_eq!(metadata_from_live("verified", "INTEGER", Some("0")).kind, ValueKind::Boolean);
        assert_eq!(metadata_from_live("age", "INTEGER", None).kind, ValueKind::Number);
        assert_eq!(metadata_from_live("shippedAt", "TEXT", None).kind, ValueKind::Timestamp);
        assert_eq!(metadata_from_live("name", "TEXT", None).kind, ValueKind::Text);
        // version has a default of 1 but is never a boolean
        assert_eq!(metadata_from_live("version", "INTEGER", Some("1")).kind, ValueKind::Number);
    }

    #[tokio::test]
    async fn test_live_metadata_reads_back_added_columns() {
        let pool = create_pool(&StoreConfig::in_memory()).await.unwrap();
        let schema = SchemaManager::new(pool, "things");
        let mut columns = base_columns();
        schema.ensure_table(&columns).await.unwrap();

        columns.insert("verified".to_string(), ColumnMetadata::boolean(false));
        columns.insert("age".to_string(), ColumnMetadata::integer());
        schema.ensure_columns(["verified", "age"], &columns).await.unwrap();

        let live = schema.live_metadata().await.unwrap();
        assert_eq!(live["verified"].kind, ValueKind::Boolean);
        assert_eq!(live["age"].sql_type, SqlType::Integer);
        assert_eq!(live["dateCreated"].kind, ValueKind::Timestamp);
    }

    #[tokio::test]
    async fn test_ensure_columns_adds_missing() {
        let pool = create_pool(&StoreConfig::in_memory()).await.unwrap();
        let schema = SchemaManager::new(pool, "things");
        let columns = base_columns();
        schema.ensure_table(&columns).await.unwrap();

        let evolution = schema
            .ensure_columns(["id", "label", "itemCount"], &columns)
            .await
            .unwrap();
        assert_eq!(evolution.added, vec!["label".to_string(), "itemCount".to_string()]);
        assert!(!evolution.is_degraded());

        let live = schema.live_columns().await.unwrap();
        assert!(live.contains(&"label".to_string()));
        assert!(live.contains(&"itemCount".to_string()));

        // second pass is a no-op
        let again = schema.ensure_columns(["label"], &columns).await.unwrap();
        assert!(again.added.is_empty());
    }

    #[tokio::test]
    async fn test_case_conflicting_column_is_reported_not_fatal() {
        let pool = create_pool(&StoreConfig::in_memory()).await.unwrap();
        let schema = SchemaManager::new(pool, "things");
        let columns = base_columns();
        schema.ensure_table(&columns).await.unwrap();
        schema.ensure_columns(["Label"], &columns).await.unwrap();

        // SQLite column names are case-insensitive: this ALTER must fail
        let evolution = schema
            .ensure_columns(["label", "color"], &columns)
            .await
            .unwrap();
        assert_eq!(evolution.failed, vec!["label".to_string()]);
        assert_eq!(evolution.added, vec!["color".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_alter_is_benign() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::file(dir.path().join("race.db")).with_max_connections(2);
        let pool = create_pool(&config).await.unwrap();
        let columns = base_columns();

        let a = SchemaManager::new(pool.clone(), "things");
        let b = SchemaManager::new(pool, "things");
        a.ensure_table(&columns).await.unwrap();

        let (ra, rb) = tokio::join!(
            a.ensure_columns(["shared"], &columns),
            b.ensure_columns(["shared"], &columns)
        );
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        assert!(ra.failed.is_empty());
        assert!(rb.failed.is_empty());
        assert!(ra.added.len() + rb.added.len() >= 1);
    }
}
