mod memory_store;
mod models;
mod schema;
mod store;
mod trait_def;
pub mod validation;

pub use memory_store::InMemoryRecordStore;
pub use models::*;
pub use schema::{CATALOG_VERSIONED_SCHEMAS, DEFAULT_FLAGS};
pub use store::SqliteRecordStore;
#[cfg(test)]
pub use trait_def::MockRecordStore;
pub use trait_def::RecordStore;
