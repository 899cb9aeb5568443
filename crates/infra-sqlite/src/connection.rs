// SQLite Connection Pool Setup

use schemaless_core::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::map_sqlx_error;

pub const DB_PATH_ENV: &str = "SCHEMALESS_DB_PATH";
pub const MAX_CONNECTIONS_ENV: &str = "SCHEMALESS_MAX_CONNECTIONS";

const MEMORY_URL: &str = "sqlite::memory:";

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Memory,
    File(PathBuf),
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub location: Location,

    /// One connection by default: every repository call shares a single
    /// handle and SQLite serializes the I/O.
    pub max_connections: u32,

    pub busy_timeout: Duration,

    /// WAL journal for file databases
    pub wal: bool,

    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: Location::Memory,
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
            wal: true,
            create_if_missing: true,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// `:memory:` or an empty string is in-memory; anything else is a file
    /// path with `~` expanded.
    pub fn from_location(raw: &str) -> Self {
        match raw.trim() {
            "" | ":memory:" => Self::in_memory(),
            path => Self::file(shellexpand::tilde(path).into_owned()),
        }
    }

    /// Read `SCHEMALESS_DB_PATH` (unset means in-memory) and
    /// `SCHEMALESS_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self> {
        let config = match std::env::var(DB_PATH_ENV) {
            Ok(path) => Self::from_location(&path),
            Err(_) => Self::in_memory(),
        };
        config.with_env_overrides()
    }

    /// Apply `SCHEMALESS_MAX_CONNECTIONS` when it is set.
    pub fn with_env_overrides(self) -> Result<Self> {
        match std::env::var(MAX_CONNECTIONS_ENV) {
            Ok(raw) => Ok(self.with_max_connections(parse_max_connections(&raw)?)),
            Err(_) => Ok(self),
        }
    }
}

fn parse_max_connections(raw: &str) -> Result<u32> {
    raw.trim().parse::<u32>().map_err(|e| {
        AppError::Config(format!("{} must be a positive integer: {}", MAX_CONNECTIONS_ENV, e))
    })
}

/// Create SQLite connection pool
pub async fn create_pool(config: &StoreConfig) -> Result<SqlitePool> {
    let mut options = match &config.location {
        // each parse yields a fresh, privately named shared-cache database
        Location::Memory => SqliteConnectOptions::from_str(MEMORY_URL).map_err(map_sqlx_error)?,
        Location::File(path) => SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(config.create_if_missing),
    };
    options = options.busy_timeout(config.busy_timeout);
    if config.wal && config.location != Location::Memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
    if config.location == Location::Memory {
        // dropping the last connection would drop the database
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)?;

    info!(location = ?config.location, max_connections = config.max_connections, "SQLite pool ready");

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool() {
        let pool = create_pool(&StoreConfig::in_memory()).await.unwrap();
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_file_pool_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let pool = create_pool(&StoreConfig::file(&path)).await.unwrap();
        sqlx::query("CREATE TABLE t (x INTEGER)")
            .execute(&pool)
            .await
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_max_connections_floor() {
        assert_eq!(StoreConfig::in_memory().with_max_connections(0).max_connections, 1);
    }

    #[test]
    fn test_from_location() {
        assert_eq!(StoreConfig::from_location(":memory:").location, Location::Memory);
        assert_eq!(StoreConfig::from_location("").location, Location::Memory);
        assert_eq!(
            StoreConfig::from_location("/tmp/store.db").location,
            Location::File(PathBuf::from("/tmp/store.db"))
        );

        match StoreConfig::from_location("~/store.db").location {
            Location::File(path) => {
                assert!(!path.starts_with("~"));
                assert!(path.ends_with("store.db"));
            }
            other => panic!("expected a file location, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_max_connections() {
        assert_eq!(parse_max_connections(" 4 ").unwrap(), 4);
        assert!(matches!(parse_max_connections("many"), Err(AppError::Config(_))));
        assert!(matches!(parse_max_connections("-1"), Err(AppError::Config(_))));
    }

    // the only test in this crate that touches these variables
    #[test]
    fn test_from_env() {
        std::env::set_var(DB_PATH_ENV, ":memory:");
        std::env::set_var(MAX_CONNECTIONS_ENV, "3");
        let config = StoreConfig::from_env().unwrap();
        assert_eq!(config.location, Location::Memory);
        assert_eq!(config.max_connections, 3);

        std::env::set_var(MAX_CONNECTIONS_ENV, "lots");
        assert!(matches!(StoreConfig::from_env(), Err(AppError::Config(_))));

        std::env::remove_var(DB_PATH_ENV);
        std::env::remove_var(MAX_CONNECTIONS_ENV);
        let config = StoreConfig::from_env().unwrap();
        assert_eq!(config.location, Location::Memory);
        assert_eq!(config.max_connections, 1);
    }
}
