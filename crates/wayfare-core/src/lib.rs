//! # Wayfare Core
//!
//! Pure data model for the Wayfare offline-first booking client: listings,
//! reservations, travelers, and the two status axes a reservation carries.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Listing`] - A cached, read-only bookable offering
//! - [`Reservation`] - A booking record, the unit of synchronization
//! - [`SyncState`] - Per-record synchronization state (synced/pending/failed)
//! - [`LifecycleStatus`] - Booking lifecycle (pending/confirmed/cancelled)
//! - [`ReservationPatch`] - Partial merge update for a stored reservation
//!
//! ## Two status axes
//!
//! A reservation's lifecycle status says what happened to the booking;
//! its sync state says whether the remote authority has seen it. The
//! sync state only moves along these edges:
//!
//! ```text
//!   pending ──► synced
//!      │  ▲
//!      ▼  │ (explicit retry)
//!    failed ──► synced
//! ```

pub mod error;
pub mod listing;
pub mod reservation;
pub mod time;
pub mod types;
pub mod validation;

pub use error::{CoreError, ValidationError};
pub use listing::{Category, Listing};
pub use reservation::{
    LifecycleStatus, Reservation, ReservationPatch, Sex, SyncState, Traveler,
};
pub use time::now_millis;
pub use types::{ListingId, ReservationId};
pub use validation::{validate_reservation, MAX_TRAVELERS};
