//! Catalog Sync Library
//!
//! Merges remote title and bundle metadata into a local catalog database
//! without clobbering fields that were marked read-only.

pub mod catalog_store;
pub mod config;
pub mod error;
pub mod linker;
pub mod merge;
pub mod metadata;
pub mod metrics;
pub mod registry;
pub mod sqlite_persistence;
pub mod sync;

// Re-export commonly used types for convenience
pub use catalog_store::{CatalogRecord, InMemoryRecordStore, RecordStore, SqliteRecordStore};
pub use error::{SyncError, SyncResult};
pub use merge::{MergeEngine, UpsertOutcome};
pub use sync::{CatalogSync, SyncStats};
