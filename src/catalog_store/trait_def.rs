//! RecordStore trait definition.
//!
//! The merge engine never talks to a database directly. It needs two views
//! of a record: the tracked view, which includes edits staged in the current
//! batch, and the committed view, which only reflects what a previous
//! `commit_batch` made durable.

use anyhow::Result;

use super::models::CatalogRecord;

/// Storage backend for catalog records.
///
/// All operations are synchronous and block until complete.
#[cfg_attr(test, mockall::automock)]
pub trait RecordStore: Send + Sync {
    /// Look up a record, including any uncommitted staged version of it.
    fn find_tracked(&self, key: &str) -> Result<Option<CatalogRecord>>;

    /// Look up the durably committed state of a record, ignoring staged edits.
    fn snapshot_committed(&self, key: &str) -> Result<Option<CatalogRecord>>;

    /// Stage a new or modified record for the next commit. Replaces any
    /// version of the same key staged earlier in the batch.
    fn stage_upsert(&self, record: CatalogRecord) -> Result<()>;

    /// Persist every staged record as one unit. Returns how many records
    /// were written. Once this returns, `snapshot_committed` reflects them.
    fn commit_batch(&self) -> Result<usize>;

    /// Number of records currently staged.
    fn staged_count(&self) -> usize;
}
