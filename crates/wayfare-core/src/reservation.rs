//! Reservation: a booking record and the unit of synchronization.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, ValidationError};
use crate::listing::Listing;
use crate::types::{ListingId, ReservationId};
use crate::validation::validate_travelers;

/// Sex category of a traveler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Other,
}

/// One traveler on a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traveler {
    pub name: String,
    pub age: u8,
    pub sex: Sex,
}

impl Traveler {
    pub fn new(name: impl Into<String>, age: u8, sex: Sex) -> Self {
        Self {
            name: name.into(),
            age,
            sex,
        }
    }
}

/// Booking lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LifecycleStatus {
    Pending = 1,
    Confirmed = 2,
    Cancelled = 3,
}

impl LifecycleStatus {
    /// Convert to a storage code.
    pub fn to_code(self) -> u8 {
        self as u8
    }

    /// Try to parse from a storage code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Pending),
            2 => Some(Self::Confirmed),
            3 => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Per-record synchronization state.
///
/// Distinct from [`LifecycleStatus`]: a reservation can be lifecycle
/// `pending` and sync `synced` at the same time (booked online, not yet
/// confirmed by a pass), or lifecycle `confirmed` and sync `synced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SyncState {
    Synced = 1,
    Pending = 2,
    Failed = 3,
}

impl SyncState {
    /// All states, in code order.
    pub const ALL: [SyncState; 3] = [SyncState::Synced, SyncState::Pending, SyncState::Failed];

    /// Convert to a storage code.
    pub fn to_code(self) -> u8 {
        self as u8
    }

    /// Try to parse from a storage code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Synced),
            2 => Some(Self::Pending),
            3 => Some(Self::Failed),
            _ => None,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }

    /// Whether `self -> to` is one of the permitted edges.
    ///
    /// `synced` has no outgoing edges.
    pub fn can_transition_to(self, to: SyncState) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Synced)
                | (Self::Pending, Self::Failed)
                | (Self::Failed, Self::Pending)
                | (Self::Failed, Self::Synced)
        )
    }

    /// Checked transition.
    pub fn transition(self, to: SyncState) -> Result<SyncState, CoreError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Assigned by the store on first persist.
    pub id: Option<ReservationId>,
    pub listing_id: ListingId,
    pub travelers: Vec<Traveler>,
    /// Listing price x traveler count, in minor currency units.
    pub total_amount: u64,
    pub status: LifecycleStatus,
    /// Creation time (Unix ms), set by the store on first persist.
    pub created_at: i64,
    pub sync_state: SyncState,
    /// Number of failed pushes recorded for this reservation.
    pub sync_attempts: u32,
}

impl Reservation {
    /// Draft a new, unpersisted reservation against a listing.
    ///
    /// The total is derived from the listing price and traveler count.
    pub fn new(listing: &Listing, travelers: Vec<Traveler>) -> Result<Self, ValidationError> {
        validate_travelers(&travelers)?;
        let total_amount =
            listing
                .total_for(travelers.len())
                .ok_or(ValidationError::TotalOverflow {
                    price: listing.price,
                    travelers: travelers.len(),
                })?;

        Ok(Self {
            id: None,
            listing_id: listing.id.clone(),
            travelers,
            total_amount,
            status: LifecycleStatus::Pending,
            created_at: 0,
            sync_state: SyncState::Pending,
            sync_attempts: 0,
        })
    }

    /// Whether the reservation has been persisted.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// A partial merge update for a stored reservation.
///
/// Fields left as `None` are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationPatch {
    pub status: Option<LifecycleStatus>,
    pub sync_state: Option<SyncState>,
    pub travelers: Option<Vec<Traveler>>,
    pub total_amount: Option<u64>,
    pub sync_attempts: Option<u32>,
}

impl ReservationPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: LifecycleStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn sync_state(mut self, state: SyncState) -> Self {
        self.sync_state = Some(state);
        self
    }

    pub fn travelers(mut self, travelers: Vec<Traveler>) -> Self {
        self.travelers = Some(travelers);
        self
    }

    pub fn total_amount(mut self, total: u64) -> Self {
        self.total_amount = Some(total);
        self
    }

    pub fn sync_attempts(mut self, attempts: u32) -> Self {
        self.sync_attempts = Some(attempts);
        self
    }

    /// True if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.sync_state.is_none()
            && self.travelers.is_none()
            && self.total_amount.is_none()
            && self.sync_attempts.is_none()
    }

    /// Merge the patch into a reservation.
    pub fn apply(&self, reservation: &mut Reservation) {
        if let Some(status) = self.status {
            reservation.status = status;
        }
        if let Some(state) = self.sync_state {
            reservation.sync_state = state;
        }
        if let Some(travelers) = &self.travelers {
            reservation.travelers = travelers.clone();
        }
        if let Some(total) = self.total_amount {
            reservation.total_amount = total;
        }
        if let Some(attempts) = self.sync_attempts {
            reservation.sync_attempts = attempts;
        }
    }
}
