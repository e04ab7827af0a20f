//! Primary record backend on SQLite.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use prodex_core::RecordKind;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::backend::{RecordBackend, StoredEntry};
use crate::StoreError;

const DEFAULT_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/prodex-store/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Opens (creating if needed) the database at `database_url`.
    ///
    /// Migrations are not applied; call [`Self::run_migrations`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if the URL is invalid or the database
    /// cannot be opened.
    pub async fn connect(database_url: &str, config: PoolConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Opens a private in-memory database with the schema applied.
    ///
    /// The pool is pinned to a single connection that never expires, since
    /// every SQLite memory connection is its own database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or migrations fail.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let backend = Self { pool };
        backend.run_migrations().await?;
        Ok(backend)
    }

    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run all pending migrations and return how many were applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] if any migration fails.
    pub async fn run_migrations(&self) -> Result<usize, StoreError> {
        // The _sqlx_migrations table does not exist on a fresh database;
        // treat absence as zero applied.
        let applied_before = self.applied_migrations().await;
        MIGRATOR.run(&self.pool).await?;
        let applied_after = self.applied_migrations().await;

        let delta = (applied_after - applied_before).max(0);
        Ok(usize::try_from(delta).unwrap_or(0))
    }

    async fn applied_migrations(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0)
    }
}

fn decode_payload(kind: RecordKind, id: &str, raw: &str) -> Result<Value, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Serde {
        kind: kind.to_string(),
        id: id.to_owned(),
        source: e,
    })
}

#[async_trait]
impl RecordBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn upsert(&self, kind: RecordKind, id: &str, record: &Value) -> Result<(), StoreError> {
        let payload = serde_json::to_string(record).map_err(|e| StoreError::Serde {
            kind: kind.to_string(),
            id: id.to_owned(),
            source: e,
        })?;

        sqlx::query(
            "INSERT INTO scraped_records (kind, external_id, payload) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT (kind, external_id) DO UPDATE SET \
                 payload    = excluded.payload, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        )
        .bind(kind.as_str())
        .bind(id)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, kind: RecordKind) -> Result<Vec<StoredEntry>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT external_id, payload FROM scraped_records \
             WHERE kind = ?1 \
             ORDER BY rowid",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, raw)| {
                let record = decode_payload(kind, &id, &raw)?;
                Ok(StoredEntry { id, record })
            })
            .collect()
    }

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Value>, StoreError> {
        let raw = sqlx::query_scalar::<_, String>(
            "SELECT payload FROM scraped_records WHERE kind = ?1 AND external_id = ?2",
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        raw.map(|raw| decode_payload(kind, id, &raw)).transpose()
    }

    async fn delete(&self, kind: RecordKind, ids: &[String]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0u64;
        for id in ids {
            let result =
                sqlx::query("DELETE FROM scraped_records WHERE kind = ?1 AND external_id = ?2")
                    .bind(kind.as_str())
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            removed += result.rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
    }

    #[tokio::test]
    async fn upsert_replaces_in_place_and_keeps_order() {
        let backend = SqliteBackend::in_memory().await.unwrap();
        backend
            .upsert(RecordKind::Product, "A", &json!({"v": 1}))
            .await
            .unwrap();
        backend
            .upsert(RecordKind::Product, "B", &json!({"v": 2}))
            .await
            .unwrap();
        backend
            .upsert(RecordKind::Product, "A", &json!({"v": 3}))
            .await
            .unwrap();

        let entries = backend.list(RecordKind::Product).await.unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(entries[0].record["v"], 3);
    }

    #[tokio::test]
    async fn kinds_are_isolated() {
        let backend = SqliteBackend::in_memory().await.unwrap();
        backend
            .upsert(RecordKind::Order, "X", &json!({"orderId": "X"}))
            .await
            .unwrap();
        assert!(backend.get(RecordKind::Product, "X").await.unwrap().is_none());
        assert!(backend.get(RecordKind::Order, "X").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_counts_only_existing_rows() {
        let backend = SqliteBackend::in_memory().await.unwrap();
        backend
            .upsert(RecordKind::Product, "A", &json!({}))
            .await
            .unwrap();
        let removed = backend
            .delete(RecordKind::Product, &["A".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(backend.list(RecordKind::Product).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let backend = SqliteBackend::in_memory().await.unwrap();
        assert_eq!(backend.run_migrations().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn connect_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("records.db").display());
        let backend = SqliteBackend::connect(&url, PoolConfig::default())
            .await
            .unwrap();
        assert!(backend.run_migrations().await.unwrap() >= 1);
        backend
            .upsert(RecordKind::Product, "A", &json!({"ok": true}))
            .await
            .unwrap();
        assert!(dir.path().join("records.db").exists());
    }
}
