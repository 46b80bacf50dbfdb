//! Document backend integration tests (require a running server).
//!
//! Gated on `TEST_MONGO_URL`; skipped otherwise. Transactions additionally
//! need a replica-set deployment, so the atomic-batch path is only
//! exercised when `TEST_MONGO_REPLSET` is set.
#![cfg(feature = "mongo")]

mod common;

use common::{Player, Rank};
use polystore::storage::{MongoConfig, MongoStorage, Storage};
use polystore::{primary_key_of, StorageError};

macro_rules! require_db {
    ($var:literal) => {
        match std::env::var($var) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(concat!("Skipping test: ", $var, " not set"));
                return;
            }
        }
    };
}

async fn connect(url: &str, database: &str) -> MongoStorage<Player> {
    MongoStorage::connect(&MongoConfig::new(url, database))
        .await
        .unwrap()
}

async fn clear(store: &MongoStorage<Player>) {
    for entity in store.find_all(None, 0).await.unwrap() {
        store.delete_by_id(&primary_key_of(&entity)).await.unwrap();
    }
}

#[tokio::test]
async fn test_mongo_crud() {
    let url = require_db!("TEST_MONGO_URL");
    let store = connect(&url, "polystore_test_crud").await;
    store.init().await.unwrap();
    clear(&store).await;

    // identifier keys auto-generate on this backend
    let mut player = Player::named("arwen");
    player.rank = Rank::Gold;
    store.insert(&mut player).await.unwrap();
    let key = primary_key_of(&player);
    assert!(player.id.is_some());

    let found = store.find_by_id(&key).await.unwrap().unwrap();
    assert_eq!(found.name, "arwen");
    assert_eq!(found.rank, Rank::Gold);

    // duplicate key
    let mut twin = Player::named("elrond");
    twin.id = player.id;
    let err = store.insert(&mut twin).await.unwrap_err();
    assert!(matches!(err, StorageError::DuplicateKey { .. }));

    // update
    player.score = 17;
    store.update(&mut player).await.unwrap();
    let found = store.find_by_id(&key).await.unwrap().unwrap();
    assert_eq!(found.score, 17);

    // update of an absent key
    let mut ghost = Player::named("ghost");
    ghost.id = Some(polystore::ids::random());
    let err = store.update(&mut ghost).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));

    // pagination and count
    store.insert(&mut Player::named("sam")).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);
    let page = store.find_all(Some(1), 1).await.unwrap();
    assert_eq!(page.len(), 1);

    // delete
    assert!(store.delete_by_id(&key).await.unwrap());
    assert!(!store.delete_by_id(&key).await.unwrap());

    clear(&store).await;
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_mongo_index_reconciliation_is_idempotent() {
    let url = require_db!("TEST_MONGO_URL");
    let store = connect(&url, "polystore_test_index").await;
    // recreating an existing index with identical shape is a no-op either
    // way; the catalog check keeps the second init from touching anything
    store.init().await.unwrap();
    store.init().await.unwrap();
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_mongo_batch_save() {
    let url = require_db!("TEST_MONGO_URL");
    let store = connect(&url, "polystore_test_batch").await;
    store.init().await.unwrap();
    clear(&store).await;

    let batch: Vec<Player> = ["frodo", "sam", "merry"].iter().map(|n| Player::named(n)).collect();
    let saved = store.save_all(batch).await.unwrap();
    assert_eq!(saved.len(), 3);
    assert!(saved.iter().all(|p| p.id.is_some()));
    assert_eq!(store.count().await.unwrap(), 3);

    clear(&store).await;
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_mongo_atomic_batch_needs_replica_set() {
    let url = require_db!("TEST_MONGO_REPLSET");
    let store = connect(&url, "polystore_test_replset").await;
    store.init().await.unwrap();
    clear(&store).await;

    let batch: Vec<Player> = ["frodo", "sam"].iter().map(|n| Player::named(n)).collect();
    let saved = store.save_all_atomic(batch).await.unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(store.count().await.unwrap(), 2);

    clear(&store).await;
    store.close().await.unwrap();
}
