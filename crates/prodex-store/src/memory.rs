//! In-process record backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use prodex_core::RecordKind;
use serde_json::Value;

use crate::backend::{RecordBackend, StoredEntry};
use crate::StoreError;

#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<RecordKind, Vec<StoredEntry>>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut HashMap<RecordKind, Vec<StoredEntry>>) -> T,
    ) -> Result<T, StoreError> {
        let mut guard = self.entries.lock().map_err(|e| StoreError::Unavailable {
            backend: "memory",
            reason: format!("lock poisoned: {e}"),
        })?;
        Ok(f(&mut guard))
    }
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, kind: RecordKind, id: &str, record: &Value) -> Result<(), StoreError> {
        self.with_entries(|map| {
            let entries = map.entry(kind).or_default();
            match entries.iter_mut().find(|e| e.id == id) {
                Some(existing) => existing.record = record.clone(),
                None => entries.push(StoredEntry {
                    id: id.to_owned(),
                    record: record.clone(),
                }),
            }
        })
    }

    async fn list(&self, kind: RecordKind) -> Result<Vec<StoredEntry>, StoreError> {
        self.with_entries(|map| map.get(&kind).cloned().unwrap_or_default())
    }

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Value>, StoreError> {
        self.with_entries(|map| {
            map.get(&kind)
                .and_then(|entries| entries.iter().find(|e| e.id == id))
                .map(|e| e.record.clone())
        })
    }

    async fn delete(&self, kind: RecordKind, ids: &[String]) -> Result<u64, StoreError> {
        self.with_entries(|map| {
            let Some(entries) = map.get_mut(&kind) else {
                return 0;
            };
            let before = entries.len();
            entries.retain(|e| !ids.contains(&e.id));
            (before - entries.len()) as u64
        })
    }
}
