//! Entities with no sample and no declarations: column types come from the
//! values being saved, and survive a reopen through the live table.

use schemaless_core::domain::{gte, lt, Entity, FindOptions};
use schemaless_core::port::Repository;
use schemaless_infra_sqlite::{create_pool, SqliteRepository, StoreConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Pet {
    id: Option<String>,
    name: String,
    age: i64,
    verified: bool,
}

impl Entity for Pet {
    const TYPE_NAME: &'static str = "Pet";
}

fn pet(name: &str, age: i64, verified: bool) -> Pet {
    Pet {
        id: None,
        name: name.to_string(),
        age,
        verified,
    }
}

async fn pet_repo() -> SqliteRepository<Pet> {
    let pool = create_pool(&StoreConfig::in_memory()).await.unwrap();
    SqliteRepository::new(pool).await.unwrap()
}

#[tokio::test]
async fn test_round_trip_without_sample() {
    let repo = pet_repo().await;
    let saved = repo.save(pet("Rex", 7, true)).await.unwrap();

    let found = repo
        .find_one(FindOptions::by_id(saved.id.clone().unwrap()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found, saved);
    assert_eq!(found.age, 7);
    assert!(found.verified);

    let by_flag = repo
        .find(FindOptions::new().filter("verified", true))
        .await
        .unwrap();
    assert_eq!(by_flag.len(), 1);
}

#[tokio::test]
async fn test_operators_compare_numbers_without_sample() {
    let repo = pet_repo().await;
    repo.save(pet("Rex", 7, true)).await.unwrap();

    // a TEXT column would compare '7' >= 18 as true
    assert_eq!(repo.count(FindOptions::new().filter("age", gte(18))).await.unwrap(), 0);

    repo.save(pet("Max", 30, false)).await.unwrap();
    let adults = repo
        .find(FindOptions::new().filter("age", gte(18)))
        .await
        .unwrap();
    assert_eq!(adults.len(), 1);
    assert_eq!(adults[0].name, "Max");
    assert!(!adults[0].verified);

    let young = repo
        .find(FindOptions::new().filter("age", lt(10)))
        .await
        .unwrap();
    assert_eq!(young.len(), 1);
    assert_eq!(young[0].name, "Rex");
}

#[tokio::test]
async fn test_types_survive_reopen_without_sample() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pets.db");

    let saved = {
        let pool = create_pool(&StoreConfig::file(&path)).await.unwrap();
        let repo: SqliteRepository<Pet> = SqliteRepository::new(pool).await.unwrap();
        let saved = repo.save(pet("Rex", 7, true)).await.unwrap();
        repo.close().await;
        saved
    };

    let pool = create_pool(&StoreConfig::file(&path)).await.unwrap();
    let repo: SqliteRepository<Pet> = SqliteRepository::new(pool).await.unwrap();

    // a fresh cache knows nothing about age or verified until it reads the table
    let found = repo
        .find_one(FindOptions::by_id(saved.id.clone().unwrap()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found, saved);
    assert_eq!(repo.count(FindOptions::new().filter("age", gte(18))).await.unwrap(), 0);
}
