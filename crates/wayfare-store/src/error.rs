//! Error types for the store module.

use thiserror::Error;
use wayfare_core::SyncState;

/// Errors that can occur during store operations.
///
/// Every variant is a storage fault: the store could not complete the
/// operation. None of them is ever reported as an empty result.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A record with the same key already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The write would move a reservation along a sync edge that does not
    /// exist, such as out of `synced`.
    #[error("invalid sync state transition: {from} -> {to}")]
    InvalidTransition { from: SyncState, to: SyncState },

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The backend could not run the operation (worker task failed,
    /// lock poisoned, or fault injected by a test wrapper).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this error means the addressed record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Reject a sync state write that is not a permitted edge. Writing the
/// current state again is allowed.
pub(crate) fn check_sync_transition(from: SyncState, to: SyncState) -> Result<()> {
    if from == to || from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition { from, to })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
