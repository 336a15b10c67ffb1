//! Error types for the sync module.

use std::time::Duration;

use thiserror::Error;
use wayfare_core::ReservationId;

/// Errors returned to the caller of a sync operation.
///
/// A rejected push is not one of these: it is recorded on the reservation
/// and in the pass report instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The named reservation does not exist.
    #[error("reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// Store operation failed.
    #[error("store error: {0}")]
    StoreError(#[from] wayfare_store::StoreError),

    /// A sync-state change outside the allowed edges.
    #[error("core error: {0}")]
    CoreError(#[from] wayfare_core::CoreError),
}

/// Why a single push to the remote authority failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The remote authority answered and refused the record.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The remote authority could not be reached.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// No answer within the push timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
