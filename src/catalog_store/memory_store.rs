//! In-memory record store.
//!
//! Same contract as the SQLite store without touching disk. Commits are
//! counted so tests can observe when the engine flushes a batch.

use super::models::CatalogRecord;
use super::trait_def::RecordStore;
use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryRecordStore {
    committed: Mutex<HashMap<String, CatalogRecord>>,
    staged: Mutex<BTreeMap<String, CatalogRecord>>,
    commits: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with already committed records.
    pub fn with_committed<I: IntoIterator<Item = CatalogRecord>>(records: I) -> Self {
        let store = Self::new();
        store.committed.lock().unwrap().extend(
            records
                .into_iter()
                .map(|record| (record.key.clone(), record)),
        );
        store
    }

    /// Number of non-empty commits performed so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn committed_len(&self) -> usize {
        self.committed.lock().unwrap().len()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn find_tracked(&self, key: &str) -> Result<Option<CatalogRecord>> {
        if let Some(record) = self.staged.lock().unwrap().get(key) {
            return Ok(Some(record.clone()));
        }
        self.snapshot_committed(key)
    }

    fn snapshot_committed(&self, key: &str) -> Result<Option<CatalogRecord>> {
        Ok(self.committed.lock().unwrap().get(key).cloned())
    }

    fn stage_upsert(&self, record: CatalogRecord) -> Result<()> {
        self.staged.lock().unwrap().insert(record.key.clone(), record);
        Ok(())
    }

    fn commit_batch(&self) -> Result<usize> {
        let mut staged = self.staged.lock().unwrap();
        if staged.is_empty() {
            return Ok(0);
        }
        let written = staged.len();
        self.committed
            .lock()
            .unwrap()
            .extend(std::mem::take(&mut *staged));
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(written)
    }

    fn staged_count(&self) -> usize {
        self.staged.lock().unwrap().len()
    }
}
