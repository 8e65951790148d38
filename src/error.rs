//! Error types for the sync core.

use thiserror::Error;

/// Errors surfaced by the registries, the merge engine and the hierarchy linker.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A flag name was requested that the registry never loaded.
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    /// The store tracks a record that has no committed baseline, even after a
    /// forced commit. The in-memory state and the database have diverged.
    #[error("record {key} is tracked but has no committed baseline")]
    StaleTracking { key: String },

    /// A previous upsert failed with `StaleTracking`; the engine refuses further work.
    #[error("merge engine is poisoned after a stale tracking failure")]
    Poisoned,

    #[error("flag {name} has value {value:#06x}, expected a single bit")]
    InvalidFlagValue { name: String, value: i64 },

    #[error("flag {name} reuses bit {value:#06x} already taken by {existing}")]
    DuplicateFlagBit {
        name: String,
        existing: String,
        value: u16,
    },

    #[error("flag {0} is registered twice")]
    DuplicateFlagName(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl SyncError {
    /// Whether the process must stop instead of moving on to the next record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::StaleTracking { .. } | SyncError::Poisoned)
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
