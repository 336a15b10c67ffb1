//! Error types for Wayfare Core.

use thiserror::Error;

use crate::reservation::SyncState;
use crate::types::ListingId;

/// Core errors raised while interpreting model values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown {kind} code: {code}")]
    UnknownCode { kind: &'static str, code: i64 },

    #[error("unknown {kind} name: {name}")]
    UnknownName { kind: &'static str, name: String },

    #[error("invalid sync state transition: {from} -> {to}")]
    InvalidTransition { from: SyncState, to: SyncState },
}

/// Validation errors for reservations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("reservation has no travelers")]
    NoTravelers,

    #[error("too many travelers: {count} (max {max})")]
    TooManyTravelers { count: usize, max: usize },

    #[error("traveler {index} has an empty name")]
    EmptyTravelerName { index: usize },

    #[error("reservation references listing {got}, expected {expected}")]
    ListingMismatch { expected: ListingId, got: ListingId },

    #[error("total amount mismatch: expected {expected}, got {got}")]
    TotalMismatch { expected: u64, got: u64 },

    #[error("total amount overflows for price {price} x {travelers} travelers")]
    TotalOverflow { price: u64, travelers: usize },
}
