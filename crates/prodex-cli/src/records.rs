//! Read and maintenance commands over the local stores.

use prodex_core::KeyedRecord;
use prodex_store::DedupStore;

use crate::{print_json, Stores};

pub(crate) async fn list<R: KeyedRecord>(store: &DedupStore<R>) -> anyhow::Result<()> {
    let records = store.get_all().await?;
    tracing::debug!(kind = %R::KIND, count = records.len(), "listing records");
    print_json(&records)
}

pub(crate) async fn get<R: KeyedRecord>(store: &DedupStore<R>, id: &str) -> anyhow::Result<()> {
    match store.get_by_id(id).await? {
        Some(record) => print_json(&record),
        None => anyhow::bail!("no {} record with id '{id}'", R::KIND),
    }
}

pub(crate) async fn delete<R: KeyedRecord>(
    store: &DedupStore<R>,
    ids: &[String],
) -> anyhow::Result<()> {
    let removed = store.delete_by_ids(ids).await?;
    tracing::info!(kind = %R::KIND, requested = ids.len(), removed, "deleted records");
    print_json(&serde_json::json!({ "removed": removed }))
}

pub(crate) async fn sync_fallback(stores: &Stores) -> anyhow::Result<()> {
    let products = stores.products.sync_fallback().await?;
    let orders = stores.orders.sync_fallback().await?;
    print_json(&serde_json::json!({ "products": products, "orders": orders }))
}
