//! Secondary record backend: one JSON array file per record kind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use prodex_core::RecordKind;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::backend::{RecordBackend, StoredEntry};
use crate::StoreError;

pub struct JsonFileBackend {
    dir: PathBuf,
    // Serializes read-modify-write cycles across concurrent callers.
    lock: Mutex<()>,
}

impl JsonFileBackend {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, kind: RecordKind) -> PathBuf {
        self.dir.join(format!("{}s.json", kind.as_str()))
    }

    async fn read_entries(&self, kind: RecordKind) -> Result<Vec<StoredEntry>, StoreError> {
        let path = self.file_path(kind);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|e| StoreError::Serde {
            kind: kind.to_string(),
            id: path.display().to_string(),
            source: e,
        })
    }

    async fn write_entries(
        &self,
        kind: RecordKind,
        entries: &[StoredEntry],
    ) -> Result<(), StoreError> {
        let io_err = |path: &Path, e: std::io::Error| StoreError::Io {
            path: path.display().to_string(),
            source: e,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_err(&self.dir, e))?;

        let path = self.file_path(kind);
        let tmp_path = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(entries).map_err(|e| StoreError::Serde {
            kind: kind.to_string(),
            id: path.display().to_string(),
            source: e,
        })?;

        tokio::fs::write(&tmp_path, body)
            .await
            .map_err(|e| io_err(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| io_err(&path, e))?;
        Ok(())
    }
}

#[async_trait]
impl RecordBackend for JsonFileBackend {
    fn name(&self) -> &'static str {
        "json-file"
    }

    async fn upsert(&self, kind: RecordKind, id: &str, record: &Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries(kind).await?;
        match entries.iter_mut().find(|e| e.id == id) {
            Some(existing) => existing.record = record.clone(),
            None => entries.push(StoredEntry {
                id: id.to_owned(),
                record: record.clone(),
            }),
        }
        self.write_entries(kind, &entries).await
    }

    async fn list(&self, kind: RecordKind) -> Result<Vec<StoredEntry>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_entries(kind).await
    }

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().await;
        let entries = self.read_entries(kind).await?;
        Ok(entries.into_iter().find(|e| e.id == id).map(|e| e.record))
    }

    async fn delete(&self, kind: RecordKind, ids: &[String]) -> Result<u64, StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries(kind).await?;
        let before = entries.len();
        entries.retain(|e| !ids.contains(&e.id));
        let removed = before - entries.len();
        if removed > 0 {
            self.write_entries(kind, &entries).await?;
        }
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn missing_file_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nested"));
        assert!(backend.list(RecordKind::Product).await.unwrap().is_empty());
        assert!(backend.get(RecordKind::Product, "A").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = JsonFileBackend::new(dir.path());
            backend
                .upsert(RecordKind::Product, "A", &json!({"price": "$1.00"}))
                .await
                .unwrap();
            backend
                .upsert(RecordKind::Product, "A", &json!({"price": "$2.00"}))
                .await
                .unwrap();
        }
        let reopened = JsonFileBackend::new(dir.path());
        let entries = reopened.list(RecordKind::Product).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record["price"], "$2.00");
        assert!(dir.path().join("products.json").exists());
    }

    #[tokio::test]
    async fn delete_only_touches_requested_kind() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path());
        backend
            .upsert(RecordKind::Product, "A", &json!({}))
            .await
            .unwrap();
        backend
            .upsert(RecordKind::Order, "A", &json!({}))
            .await
            .unwrap();
        let removed = backend
            .delete(RecordKind::Product, &["A".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(backend.list(RecordKind::Order).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_serde_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("products.json"), "{not json").unwrap();
        let backend = JsonFileBackend::new(dir.path());
        let err = backend.list(RecordKind::Product).await.unwrap_err();
        assert!(matches!(err, StoreError::Serde { .. }));
    }
}
