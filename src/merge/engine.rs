//! Selective-merge upsert with batched commits.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::diff::{merge_records, normalize_incoming};
use crate::catalog_store::{CatalogRecord, RecordField, RecordStore};
use crate::error::{SyncError, SyncResult};
use crate::metrics;
use crate::registry::FlagRegistry;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// What an upsert did to the stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The key was not known, the incoming record was staged as new.
    Inserted,
    /// At least one field or flag changed.
    Updated {
        fields: Vec<RecordField>,
        flags_changed: bool,
    },
    /// Nothing differed from the committed baseline, or every differing
    /// field was read-only.
    Unchanged,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Inserted => "inserted",
            UpsertOutcome::Updated { .. } => "updated",
            UpsertOutcome::Unchanged => "unchanged",
        }
    }
}

/// Merges incoming records into a `RecordStore`, committing every
/// `batch_size` upserts.
///
/// `upsert` takes `&mut self`: a whole upsert, from the tracked lookup to
/// the staging write, runs without another upsert interleaving.
pub struct MergeEngine<S: RecordStore> {
    store: S,
    flags: Arc<FlagRegistry>,
    batch_size: u64,
    upserts: u64,
    commits: usize,
    poisoned: bool,
}

impl<S: RecordStore> MergeEngine<S> {
    pub fn new(store: S, flags: Arc<FlagRegistry>) -> Self {
        Self {
            store,
            flags,
            batch_size: DEFAULT_BATCH_SIZE as u64,
            upserts: 0,
            commits: 0,
            poisoned: false,
        }
    }

    /// Commit automatically after every `batch_size` upserts. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1) as u64;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn flags(&self) -> &FlagRegistry {
        &self.flags
    }

    /// Upserts performed over the engine's lifetime.
    pub fn upsert_count(&self) -> u64 {
        self.upserts
    }

    /// Non-empty commits performed over the engine's lifetime.
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Merge `incoming` into the store and stage the result.
    pub fn upsert(&mut self, incoming: CatalogRecord) -> SyncResult<UpsertOutcome> {
        if self.poisoned {
            return Err(SyncError::Poisoned);
        }

        let incoming = normalize_incoming(incoming);
        let (record, outcome) = match self.store.find_tracked(&incoming.key)? {
            None => (incoming, UpsertOutcome::Inserted),
            Some(existing) => {
                let baseline = self.committed_baseline(&incoming.key)?;
                let decision = merge_records(&incoming, &existing, &baseline, &self.flags);
                for field in &decision.protected {
                    debug!(
                        "{}: {} is read-only ({}), keeping stored value",
                        incoming.key,
                        field,
                        self.flags.describe(decision.merged.flags).join("|")
                    );
                    metrics::record_protected_skip(field.as_str());
                }
                for field in &decision.changed {
                    metrics::record_field_written(field.as_str());
                }
                let outcome = if decision.has_changes() {
                    UpsertOutcome::Updated {
                        fields: decision.changed,
                        flags_changed: decision.flags_changed,
                    }
                } else {
                    UpsertOutcome::Unchanged
                };
                (decision.merged, outcome)
            }
        };

        debug!("{}: {}", record.key, outcome.as_str());
        self.store.stage_upsert(record)?;
        metrics::record_upsert(outcome.as_str());
        metrics::set_staged_records(self.store.staged_count());

        self.upserts += 1;
        if self.upserts % self.batch_size == 0 {
            // The record is staged either way: a failed batch stays staged
            // and is retried by the next commit
            if let Err(err) = self.commit() {
                warn!(
                    "Batch commit failed, {} records stay staged: {}",
                    self.store.staged_count(),
                    err
                );
            }
        }
        Ok(outcome)
    }

    /// Commit everything staged so far. Call on shutdown so no staged write is
    /// lost. Also reports a batch that failed to commit during `upsert`.
    pub fn commit(&mut self) -> SyncResult<usize> {
        if self.poisoned {
            return Err(SyncError::Poisoned);
        }
        let written = self.store.commit_batch()?;
        if written > 0 {
            self.commits += 1;
            debug!("Committed batch of {} records", written);
            metrics::record_commit(self.store.staged_count());
        }
        Ok(written)
    }

    /// Committed state of a tracked record. A tracked record without a
    /// committed baseline gets one forced commit; if it is still missing the
    /// store and the tracker disagree and the engine stops.
    fn committed_baseline(&mut self, key: &str) -> SyncResult<CatalogRecord> {
        if let Some(baseline) = self.store.snapshot_committed(key)? {
            return Ok(baseline);
        }

        warn!("{} is tracked but not committed, forcing a commit", key);
        self.commit()?;
        if let Some(baseline) = self.store.snapshot_committed(key)? {
            return Ok(baseline);
        }

        error!("{} is still missing from the committed state", key);
        self.poisoned = true;
        Err(SyncError::StaleTracking {
            key: key.to_string(),
        })
    }
}
