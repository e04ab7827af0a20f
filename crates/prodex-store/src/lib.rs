//! Duplicate-aware local persistence for scraped records.
//!
//! Records are upserted by their site key into a primary backend (SQLite).
//! When the primary rejects a write, the record lands in a secondary backend
//! instead (a JSON file directory or in-process memory) so a transient
//! storage failure never loses a scraped record.

pub mod backend;
pub mod dedup;
pub mod json_file;
pub mod memory;
pub mod sqlite;

pub use backend::{RecordBackend, StoredEntry};
pub use dedup::{DedupStore, StoredIn};
pub use json_file::JsonFileBackend;
pub use memory::MemoryBackend;
pub use sqlite::{PoolConfig, SqliteBackend};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize {kind} record \"{id}\": {source}")]
    Serde {
        kind: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("record key must be non-empty")]
    EmptyKey,

    #[error("{backend} backend unavailable: {reason}")]
    Unavailable {
        backend: &'static str,
        reason: String,
    },

    #[error("{operation} failed on both storage tiers (primary: {primary}; secondary: {secondary})")]
    BothTiersFailed {
        operation: String,
        primary: Box<StoreError>,
        secondary: Box<StoreError>,
    },
}
