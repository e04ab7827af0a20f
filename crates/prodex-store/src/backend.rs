use async_trait::async_trait;
use prodex_core::RecordKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::StoreError;

/// A persisted record payload with its dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: String,
    pub record: Value,
}

/// Key-value storage area holding JSON payloads grouped by record kind.
///
/// Implementations must replace an existing entry in place on `upsert` and
/// list entries in the order each id was first written.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    async fn upsert(&self, kind: RecordKind, id: &str, record: &Value) -> Result<(), StoreError>;

    async fn list(&self, kind: RecordKind) -> Result<Vec<StoredEntry>, StoreError>;

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Value>, StoreError>;

    /// Removes the given ids and returns how many entries were deleted.
    async fn delete(&self, kind: RecordKind, ids: &[String]) -> Result<u64, StoreError>;
}
