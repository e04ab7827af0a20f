//! Two-tier dedup store keyed by a record's site identifier.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

use prodex_core::KeyedRecord;
use serde_json::Value;

use crate::backend::{RecordBackend, StoredEntry};
use crate::StoreError;

/// Which tier accepted a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredIn {
    Primary,
    Fallback,
}

/// Upserts records by key, replacing any earlier version wholesale.
///
/// Writes go to the primary backend; if that fails they go to the secondary
/// backend and only a failure of both is returned. Each successful write
/// clears the other tier's copy on a best-effort basis. Reads merge both
/// tiers in primary order, with a fallback copy winning over a primary copy
/// of the same key, and degrade to one tier when the other cannot be read.
pub struct DedupStore<R> {
    primary: Arc<dyn RecordBackend>,
    secondary: Arc<dyn RecordBackend>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for DedupStore<R> {
    fn clone(&self) -> Self {
        Self {
            primary: Arc::clone(&self.primary),
            secondary: Arc::clone(&self.secondary),
            _record: PhantomData,
        }
    }
}

impl<R: KeyedRecord> DedupStore<R> {
    #[must_use]
    pub fn new(primary: Arc<dyn RecordBackend>, secondary: Arc<dyn RecordBackend>) -> Self {
        Self {
            primary,
            secondary,
            _record: PhantomData,
        }
    }

    /// Inserts `record`, or fully replaces the stored record with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyKey`] for a blank key,
    /// [`StoreError::Serde`] if the record cannot be encoded, and
    /// [`StoreError::BothTiersFailed`] if neither backend accepts the write.
    pub async fn upsert(&self, record: &R) -> Result<StoredIn, StoreError> {
        let id = record.record_key();
        if id.trim().is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let kind = R::KIND;
        let payload = serde_json::to_value(record).map_err(|e| StoreError::Serde {
            kind: kind.to_string(),
            id: id.to_owned(),
            source: e,
        })?;

        match self.primary.upsert(kind, id, &payload).await {
            Ok(()) => {
                // A stale copy may sit in the fallback from an earlier failed write.
                if let Err(e) = self.secondary.delete(kind, &[id.to_owned()]).await {
                    tracing::debug!(
                        %kind,
                        id,
                        backend = self.secondary.name(),
                        error = %e,
                        "could not clear fallback copy"
                    );
                }
                Ok(StoredIn::Primary)
            }
            Err(primary_err) => {
                tracing::warn!(
                    %kind,
                    id,
                    backend = self.primary.name(),
                    error = %primary_err,
                    "primary store write failed; writing to fallback"
                );
                match self.secondary.upsert(kind, id, &payload).await {
                    Ok(()) => {
                        // An older copy in the primary would otherwise mask this one.
                        if let Err(e) = self.primary.delete(kind, &[id.to_owned()]).await {
                            tracing::debug!(
                                %kind,
                                id,
                                backend = self.primary.name(),
                                error = %e,
                                "could not clear primary copy"
                            );
                        }
                        Ok(StoredIn::Fallback)
                    }
                    Err(secondary_err) => Err(StoreError::BothTiersFailed {
                        operation: format!("upsert {kind} \"{id}\""),
                        primary: Box::new(primary_err),
                        secondary: Box::new(secondary_err),
                    }),
                }
            }
        }
    }

    /// Returns every stored record: primary entries in insertion order (with
    /// any fallback copy of the same key in place of the primary one), then
    /// fallback entries whose key the primary lacks.
    ///
    /// Entries that no longer decode as `R` are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BothTiersFailed`] only when neither tier can be read.
    pub async fn get_all(&self) -> Result<Vec<R>, StoreError> {
        let entries = self.merged_entries().await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match decode::<R>(&entry.id, entry.record) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(
                        id = %entry.id,
                        error = %e,
                        "skipping undecodable stored record"
                    );
                    None
                }
            })
            .collect())
    }

    /// Looks up one record. A fallback copy wins over a primary copy, since
    /// the fallback only holds records written after a failed primary write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serde`] if the stored payload no longer decodes,
    /// or [`StoreError::BothTiersFailed`] when neither tier can be read.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<R>, StoreError> {
        let kind = R::KIND;
        let secondary_err = match self.secondary.get(kind, id).await {
            Ok(Some(value)) => return decode(id, value).map(Some),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    %kind,
                    id,
                    backend = self.secondary.name(),
                    error = %e,
                    "fallback store read failed"
                );
                Some(e)
            }
        };

        match self.primary.get(kind, id).await {
            Ok(value) => value.map(|v| decode(id, v)).transpose(),
            Err(primary_err) => match secondary_err {
                Some(secondary_err) => Err(StoreError::BothTiersFailed {
                    operation: format!("get {kind} \"{id}\""),
                    primary: Box::new(primary_err),
                    secondary: Box::new(secondary_err),
                }),
                None => {
                    tracing::warn!(
                        %kind,
                        id,
                        backend = self.primary.name(),
                        error = %primary_err,
                        "primary store read failed"
                    );
                    Ok(None)
                }
            },
        }
    }

    /// # Errors
    ///
    /// See [`Self::get_by_id`].
    pub async fn contains(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.get_by_id(id).await?.is_some())
    }

    /// Deletes the given keys from both tiers and returns the number of
    /// entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BothTiersFailed`] only when both tiers fail.
    pub async fn delete_by_ids(&self, ids: &[String]) -> Result<u64, StoreError> {
        let kind = R::KIND;
        let primary = self.primary.delete(kind, ids).await;
        let secondary = self.secondary.delete(kind, ids).await;

        match (primary, secondary) {
            (Ok(a), Ok(b)) => Ok(a + b),
            (Ok(n), Err(e)) | (Err(e), Ok(n)) => {
                tracing::warn!(%kind, error = %e, "delete failed on one storage tier");
                Ok(n)
            }
            (Err(primary_err), Err(secondary_err)) => Err(StoreError::BothTiersFailed {
                operation: format!("delete {} {kind} record(s)", ids.len()),
                primary: Box::new(primary_err),
                secondary: Box::new(secondary_err),
            }),
        }
    }

    /// Moves every fallback record into the primary tier and returns how many
    /// were moved.
    ///
    /// # Errors
    ///
    /// Returns the first backend error; records moved before it stay moved.
    pub async fn sync_fallback(&self) -> Result<usize, StoreError> {
        let kind = R::KIND;
        let pending = self.secondary.list(kind).await?;
        let mut moved = 0usize;

        for entry in pending {
            self.primary.upsert(kind, &entry.id, &entry.record).await?;
            self.secondary.delete(kind, &[entry.id.clone()]).await?;
            moved += 1;
        }

        if moved > 0 {
            tracing::info!(%kind, moved, "moved fallback records into primary store");
        }
        Ok(moved)
    }

    async fn merged_entries(&self) -> Result<Vec<StoredEntry>, StoreError> {
        let kind = R::KIND;
        let primary = self.primary.list(kind).await;
        let secondary = self.secondary.list(kind).await;

        let (mut merged, fallback) = match (primary, secondary) {
            (Ok(p), Ok(s)) => (p, s),
            (Ok(p), Err(e)) => {
                tracing::warn!(
                    %kind,
                    backend = self.secondary.name(),
                    error = %e,
                    "fallback store read failed"
                );
                (p, Vec::new())
            }
            (Err(e), Ok(s)) => {
                tracing::warn!(
                    %kind,
                    backend = self.primary.name(),
                    error = %e,
                    "primary store read failed; using fallback only"
                );
                (Vec::new(), s)
            }
            (Err(primary_err), Err(secondary_err)) => {
                return Err(StoreError::BothTiersFailed {
                    operation: format!("list {kind} records"),
                    primary: Box::new(primary_err),
                    secondary: Box::new(secondary_err),
                })
            }
        };

        // Fallback copies replace primary copies in place; the rest append.
        let primary_ids: HashSet<String> = merged.iter().map(|e| e.id.clone()).collect();
        let (shadowing, extra): (Vec<StoredEntry>, Vec<StoredEntry>) = fallback
            .into_iter()
            .partition(|e| primary_ids.contains(&e.id));
        let mut newer: HashMap<String, Value> =
            shadowing.into_iter().map(|e| (e.id, e.record)).collect();
        for entry in &mut merged {
            if let Some(record) = newer.remove(&entry.id) {
                entry.record = record;
            }
        }
        merged.extend(extra);
        Ok(merged)
    }
}

fn decode<R: KeyedRecord>(id: &str, value: Value) -> Result<R, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Serde {
        kind: R::KIND.to_string(),
        id: id.to_owned(),
        source: e,
    })
}

#[cfg(test)]
#[path = "dedup_test.rs"]
mod tests;
