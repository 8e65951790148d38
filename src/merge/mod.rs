//! Selective-merge upsert engine.

mod diff;
mod engine;

pub use diff::{merge_records, normalize_incoming, MergeDecision};
pub use engine::{MergeEngine, UpsertOutcome, DEFAULT_BATCH_SIZE};
