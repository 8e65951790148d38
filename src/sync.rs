//! Drives a sync run: link each remote record, upsert the candidates, commit.

use std::sync::Arc;

use tracing::{error, info};

use crate::catalog_store::RecordStore;
use crate::error::SyncResult;
use crate::linker::{HierarchyLinker, LinkerSettings};
use crate::merge::{MergeEngine, UpsertOutcome};
use crate::metadata::MetadataEnvelope;
use crate::registry::{CategoryRegistry, FlagRegistry};

/// Counters for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub records: usize,
    pub candidates: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    /// Records abandoned after a non-fatal error.
    pub failed: usize,
    pub commits: usize,
}

impl SyncStats {
    fn count(&mut self, outcome: &UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated { .. } => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

pub struct CatalogSync<S: RecordStore> {
    linker: HierarchyLinker,
    engine: MergeEngine<S>,
    stats: SyncStats,
}

impl<S: RecordStore> CatalogSync<S> {
    pub fn new(
        store: S,
        flags: Arc<FlagRegistry>,
        categories: Arc<CategoryRegistry>,
        settings: LinkerSettings,
        batch_size: usize,
    ) -> Self {
        let linker = HierarchyLinker::new(flags.clone(), categories, settings);
        let engine = MergeEngine::new(store, flags).with_batch_size(batch_size);
        Self {
            linker,
            engine,
            stats: SyncStats::default(),
        }
    }

    pub fn store(&self) -> &S {
        self.engine.store()
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Link one remote record and upsert everything it produces.
    ///
    /// Linking completes before the first upsert, so a missing protection
    /// flag rejects the whole record without staging any of it.
    pub fn sync_record(&mut self, envelope: &MetadataEnvelope) -> SyncResult<Vec<UpsertOutcome>> {
        self.stats.records += 1;
        let plan = self
            .linker
            .link(&envelope.key, &envelope.metadata, self.engine.store())?;
        self.stats.skipped += plan.skipped;
        self.stats.candidates += plan.candidates.len();

        let mut outcomes = Vec::with_capacity(plan.candidates.len());
        for candidate in plan.candidates {
            let outcome = self.engine.upsert(candidate)?;
            self.stats.count(&outcome);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Sync every envelope. A failing record is logged and skipped; fatal
    /// errors stop the run.
    pub fn sync_all<'a, I>(&mut self, envelopes: I) -> SyncResult<()>
    where
        I: IntoIterator<Item = &'a MetadataEnvelope>,
    {
        for envelope in envelopes {
            match self.sync_record(envelope) {
                Ok(_) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    error!("Failed to sync {}: {}", envelope.key, err);
                    self.stats.failed += 1;
                }
            }
        }
        Ok(())
    }

    /// Commit whatever is still staged and return the run's counters.
    pub fn finish(mut self) -> SyncResult<SyncStats> {
        self.engine.commit()?;
        self.stats.commits = self.engine.commit_count();
        info!(
            "Sync finished: {} records, {} inserted, {} updated, {} unchanged, {} skipped, {} failed, {} commits",
            self.stats.records,
            self.stats.inserted,
            self.stats.updated,
            self.stats.unchanged,
            self.stats.skipped,
            self.stats.failed,
            self.stats.commits
        );
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::{InMemoryRecordStore, MockRecordStore};
    use crate::error::SyncError;
    use crate::metadata::{RemoteEntitlement, RemoteMetadata, RemoteSku};

    const GAME: &str = "EP1234-CUSA00001_00-AAAAAAAAAAAAAAAA";
    const BUNDLE: &str = "EP1234-CUSA00002_00-BUNDLE0000000000";

    fn registries(flags: &[(&str, i64)]) -> (Arc<FlagRegistry>, Arc<CategoryRegistry>) {
        (
            Arc::new(FlagRegistry::from_entries(flags.iter().copied()).unwrap()),
            Arc::new(CategoryRegistry::from_entries([
                ("downloadable_game", 1),
                ("bundle", 3),
            ])),
        )
    }

    fn sync_with<S: RecordStore>(store: S, flags: &[(&str, i64)]) -> CatalogSync<S> {
        let (flags, categories) = registries(flags);
        CatalogSync::new(store, flags, categories, LinkerSettings::default(), 100)
    }

    fn game(name: &str) -> MetadataEnvelope {
        MetadataEnvelope {
            key: GAME.to_string(),
            metadata: RemoteMetadata {
                name: Some(name.to_string()),
                top_category: "downloadable_game".to_string(),
                links: None,
                default_sku: None,
            },
        }
    }

    fn bundle() -> MetadataEnvelope {
        MetadataEnvelope {
            key: BUNDLE.to_string(),
            metadata: RemoteMetadata {
                name: Some("Bundle".to_string()),
                top_category: "bundle".to_string(),
                links: None,
                default_sku: Some(RemoteSku {
                    entitlements: vec![RemoteEntitlement {
                        id: GAME.to_string(),
                        name: Some("Game".to_string()),
                    }],
                }),
            },
        }
    }

    const ALL_FLAGS: &[(&str, i64)] = &[("NAME_RO", 0x1), ("CATEGORY_ID_RO", 0x2)];

    #[test]
    fn test_sync_and_finish() {
        let mut sync = sync_with(InMemoryRecordStore::new(), ALL_FLAGS);
        sync.sync_all([&game("Game"), &bundle()]).unwrap();
        assert_eq!(sync.store().staged_count(), 1);

        let stats = sync.finish().unwrap();
        assert_eq!(
            stats,
            SyncStats {
                records: 2,
                candidates: 2,
                inserted: 1,
                updated: 1,
                // forced commit for the staged title, then the final one
                commits: 2,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_read_only_name_survives_later_sync() {
        let mut sync = sync_with(InMemoryRecordStore::new(), ALL_FLAGS);
        sync.sync_record(&game("Game")).unwrap();
        let outcomes = sync.sync_record(&game("Renamed")).unwrap();
        assert_eq!(outcomes, vec![UpsertOutcome::Unchanged]);

        let stored = sync.store().find_tracked(GAME).unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Game"));
    }

    #[test]
    fn test_unknown_flag_skips_only_that_record() {
        // CATEGORY_ID_RO is not registered, so neither record can be linked
        let mut sync = sync_with(InMemoryRecordStore::new(), &[("NAME_RO", 0x1)]);
        let err = sync.sync_record(&game("Game")).unwrap_err();
        assert!(matches!(err, SyncError::UnknownFlag(_)));
        assert_eq!(sync.store().staged_count(), 0);

        sync.sync_all([&game("Game"), &bundle()]).unwrap();
        assert_eq!(sync.stats().failed, 2);
        assert_eq!(sync.stats().records, 3);
    }

    #[test]
    fn test_fatal_error_stops_run() {
        let mut store = MockRecordStore::new();
        let mut tracked = crate::catalog_store::CatalogRecord::new(GAME);
        tracked.name = Some("Game".to_string());
        store
            .expect_find_tracked()
            .returning(move |_| Ok(Some(tracked.clone())));
        store.expect_snapshot_committed().returning(|_| Ok(None));
        store.expect_commit_batch().returning(|| Ok(0));
        store.expect_staged_count().returning(|| 0);

        let mut sync = sync_with(store, ALL_FLAGS);
        let err = sync.sync_all([&game("Game"), &game("Game")]).unwrap_err();
        assert!(matches!(err, SyncError::StaleTracking { .. }));
        assert_eq!(sync.stats().records, 1);
        assert!(matches!(sync.finish(), Err(SyncError::Poisoned)));
    }
}
