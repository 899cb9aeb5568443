// Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use schemaless_core::domain::Entity;
use schemaless_infra_sqlite::{create_pool, SqliteRepository, StoreConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entity with scalar, boolean and date fields plus ad hoc extras
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Option<String>,
    pub name: String,
    pub age: i64,
    pub active: bool,
    pub nickname: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_updated: Option<DateTime<Utc>>,
    pub date_deleted: Option<DateTime<Utc>>,
    pub version: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Member {
    const TYPE_NAME: &'static str = "Member";

    fn sample() -> Option<Self> {
        Some(Self::default())
    }
}

impl Member {
    pub fn new(name: &str, age: i64, active: bool) -> Self {
        Self {
            name: name.to_string(),
            age,
            active,
            ..Self::default()
        }
    }
}

pub async fn member_repo() -> SqliteRepository<Member> {
    let pool = create_pool(&StoreConfig::in_memory()).await.unwrap();
    SqliteRepository::new(pool).await.unwrap()
}
