//! Error types for the client.

use thiserror::Error;
use wayfare_core::{ListingId, ReservationId, ValidationError};
use wayfare_store::StoreError;
use wayfare_sync::SyncError;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The booking request is malformed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// The listing is not in the local cache.
    #[error("listing not found: {0}")]
    ListingNotFound(ListingId),

    /// Reservation not found.
    #[error("reservation not found: {0}")]
    ReservationNotFound(ReservationId),
}

impl ClientError {
    /// Whether the error names something that does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::ListingNotFound(_) | ClientError::ReservationNotFound(_) => true,
            ClientError::Store(err) => err.is_not_found(),
            ClientError::Sync(SyncError::ReservationNotFound(_)) => true,
            _ => false,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
