//! End-to-end tests of the dedup store over the real backends: SQLite
//! (in-memory) as primary and a JSON file directory as fallback.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use prodex_core::{ProductRecord, RecordKind};
use prodex_store::{
    DedupStore, JsonFileBackend, RecordBackend, SqliteBackend, StoreError, StoredIn,
};

fn product(id: &str, price: &str) -> ProductRecord {
    let mut record = ProductRecord::empty(
        id,
        format!("https://www.costco.com/item.product.{id}.html"),
        "costco",
        Utc.with_ymd_and_hms(2026, 5, 2, 8, 30, 0).unwrap(),
    );
    record.price = Some(price.to_string());
    record.images.push("https://images.costco-static.com/a.jpg".to_string());
    record.insert_spec("Brand", "Acme");
    record
}

#[tokio::test]
async fn sqlite_primary_round_trips_full_records() {
    let dir = tempfile::tempdir().unwrap();
    let primary = Arc::new(SqliteBackend::in_memory().await.unwrap());
    let secondary = Arc::new(JsonFileBackend::new(dir.path()));
    let store: DedupStore<ProductRecord> = DedupStore::new(primary, secondary);

    let record = product("100012345", "$19.99");
    assert_eq!(store.upsert(&record).await.unwrap(), StoredIn::Primary);

    let stored = store.get_by_id("100012345").await.unwrap().unwrap();
    assert_eq!(stored, record);
    assert!(
        !dir.path().join("products.json").exists(),
        "fallback must stay untouched while the primary is healthy"
    );
}

#[tokio::test]
async fn closed_primary_pool_falls_back_to_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteBackend::in_memory().await.unwrap();
    sqlite.pool().close().await;
    let primary = Arc::new(sqlite);
    let secondary = Arc::new(JsonFileBackend::new(dir.path()));
    let store: DedupStore<ProductRecord> = DedupStore::new(primary, secondary.clone());

    let tier = store.upsert(&product("100099999", "$5.49")).await.unwrap();
    assert_eq!(tier, StoredIn::Fallback);

    let on_disk = secondary.list(RecordKind::Product).await.unwrap();
    assert_eq!(on_disk.len(), 1);
    assert_eq!(on_disk[0].record["price"], "$5.49");

    let all = store.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn unwritable_fallback_and_closed_primary_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the fallback directory should be.
    let blocker = dir.path().join("fallback");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let sqlite = SqliteBackend::in_memory().await.unwrap();
    sqlite.pool().close().await;
    let store: DedupStore<ProductRecord> =
        DedupStore::new(Arc::new(sqlite), Arc::new(JsonFileBackend::new(&blocker)));

    let err = store.upsert(&product("1", "$1.00")).await.unwrap_err();
    assert!(matches!(err, StoreError::BothTiersFailed { .. }), "got {err:?}");
}
