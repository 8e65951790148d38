//! Test catalog databases and metadata builders

use super::constants::*;
use catalog_sync::linker::LinkerSettings;
use catalog_sync::metadata::{
    MetadataEnvelope, RemoteEntitlement, RemoteLink, RemoteMetadata, RemoteSku,
};
use catalog_sync::{CatalogSync, SqliteRecordStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A catalog database in a temporary directory, removed on drop.
pub struct TestCatalog {
    _dir: TempDir,
    pub db_path: PathBuf,
}

impl TestCatalog {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("catalog.db");
        Self { _dir: dir, db_path }
    }

    /// Open the database, creating it on first use, with the test categories.
    pub fn open_store(&self) -> SqliteRecordStore {
        let store = SqliteRecordStore::new(&self.db_path).unwrap();
        store
            .seed_categories([
                (GAME_CATEGORY, GAME_CATEGORY_ID),
                (ADD_ON_CATEGORY, ADD_ON_CATEGORY_ID),
                (BUNDLE_CATEGORY, BUNDLE_CATEGORY_ID),
            ])
            .unwrap();
        store
    }

    /// Start a sync run, as one invocation of the binary would.
    pub fn sync(&self, batch_size: usize) -> CatalogSync<SqliteRecordStore> {
        self.sync_with(LinkerSettings::default(), batch_size)
    }

    pub fn sync_with(
        &self,
        settings: LinkerSettings,
        batch_size: usize,
    ) -> CatalogSync<SqliteRecordStore> {
        let store = self.open_store();
        let flags = Arc::new(store.load_flag_registry().unwrap());
        let categories = Arc::new(store.load_category_registry().unwrap());
        CatalogSync::new(store, flags, categories, settings, batch_size)
    }
}

/// Primary title with add-on links given as (id, name).
pub fn title_envelope(key: &str, name: &str, links: &[(&str, &str)]) -> MetadataEnvelope {
    MetadataEnvelope {
        key: key.to_string(),
        metadata: RemoteMetadata {
            name: Some(name.to_string()),
            top_category: GAME_CATEGORY.to_string(),
            links: Some(
                links
                    .iter()
                    .map(|(id, name)| RemoteLink {
                        id: id.to_string(),
                        name: Some(name.to_string()),
                        top_category: Some(ADD_ON_CATEGORY.to_string()),
                    })
                    .collect(),
            ),
            default_sku: None,
        },
    }
}

/// Bundle whose default configuration holds entitlements given as (id, name).
pub fn bundle_envelope(key: &str, name: &str, entitlements: &[(&str, &str)]) -> MetadataEnvelope {
    MetadataEnvelope {
        key: key.to_string(),
        metadata: RemoteMetadata {
            name: Some(name.to_string()),
            top_category: BUNDLE_CATEGORY.to_string(),
            links: None,
            default_sku: Some(RemoteSku {
                entitlements: entitlements
                    .iter()
                    .map(|(id, name)| RemoteEntitlement {
                        id: id.to_string(),
                        name: Some(name.to_string()),
                    })
                    .collect(),
            }),
        },
    }
}
