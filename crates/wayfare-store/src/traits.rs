//! Store trait: the abstract interface for reservation and listing persistence.
//!
//! This trait allows the sync engine and the client to be storage-agnostic.
//! Implementations include SQLite (primary) and in-memory (for tests).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wayfare_core::{
    Category, Listing, ListingId, Reservation, ReservationId, ReservationPatch, SyncState,
};

use crate::error::Result;

/// Read-only aggregate over the store, recomputed on every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub reservation_count: u64,
    pub listing_count: u64,
    /// Reservations whose sync state is `pending`.
    pub pending_sync_count: u64,
    /// Reservations whose sync state is `failed`.
    pub failed_sync_count: u64,
}

/// Secondary lookup over cached listings.
///
/// All set criteria must match. Results are ordered by departure, then id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    /// Inclusive lower bound on departure (Unix ms).
    pub departs_from: Option<i64>,
    /// Exclusive upper bound on departure (Unix ms).
    pub departs_until: Option<i64>,
    pub category: Option<Category>,
}

impl ListingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Restrict to departures in `[from, until)`.
    pub fn departing_between(mut self, from: i64, until: i64) -> Self {
        self.departs_from = Some(from);
        self.departs_until = Some(until);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Check a listing against the query.
    pub fn matches(&self, listing: &Listing) -> bool {
        self.origin.as_ref().map_or(true, |o| &listing.origin == o)
            && self
                .destination
                .as_ref()
                .map_or(true, |d| &listing.destination == d)
            && self.departs_from.map_or(true, |t| listing.departure >= t)
            && self.departs_until.map_or(true, |t| listing.departure < t)
            && self.category.map_or(true, |c| listing.category == c)
    }
}

/// The Store trait: async interface for local persistence.
///
/// All methods are async to support both blocking (SQLite) and in-memory
/// backends. For SQLite, `spawn_blocking` is used internally so a
/// long-running write never stalls unrelated readers on the runtime.
///
/// # Guarantees
///
/// - **Durable writes**: every mutating call has reached durable storage
///   before it returns `Ok`.
/// - **Per-record atomicity**: a call that touches one record either
///   applies fully or not at all. No cross-record transactions.
/// - **Faults surface**: a backend failure is an `Err`, never an empty result.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Reservation Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a reservation exactly as given.
    ///
    /// Assigns a fresh id if `reservation.id` is `None`. Inserting with an
    /// id that already exists fails with `AlreadyExists`.
    async fn insert_reservation(&self, reservation: &Reservation) -> Result<ReservationId>;

    /// Get a reservation by id.
    async fn get_reservation(&self, id: &ReservationId) -> Result<Option<Reservation>>;

    /// List all reservations in insertion (id) order.
    async fn list_reservations(&self) -> Result<Vec<Reservation>>;

    /// List reservations whose sync state is exactly `state`, in id order.
    async fn list_reservations_by_sync_state(&self, state: SyncState) -> Result<Vec<Reservation>>;

    /// Change only the sync state of a reservation.
    ///
    /// Fails with `NotFound` if the id is absent.
    async fn update_sync_state(&self, id: &ReservationId, state: SyncState) -> Result<()>;

    /// Merge a partial update into a reservation and return the result.
    ///
    /// Fails with `NotFound` if the id is absent.
    async fn update_reservation(
        &self,
        id: &ReservationId,
        patch: &ReservationPatch,
    ) -> Result<Reservation>;

    /// Delete a reservation. Returns whether it existed.
    async fn delete_reservation(&self, id: &ReservationId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Listing Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Upsert listings keyed by id. Returns the number written.
    async fn cache_listings(&self, listings: &[Listing]) -> Result<usize>;

    /// List all cached listings in id order.
    async fn list_listings(&self) -> Result<Vec<Listing>>;

    /// Get a cached listing by id.
    async fn get_listing(&self, id: &ListingId) -> Result<Option<Listing>>;

    /// Query cached listings by origin, destination, departure window, and category.
    async fn search_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Remove every reservation and listing.
    async fn clear_all(&self) -> Result<()>;

    /// Compute aggregate counts from the current state.
    async fn stats(&self) -> Result<StoreStats>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Persist a new reservation on behalf of a booking flow.
    ///
    /// Sets the creation time to `now` and the sync state to `synced` when
    /// `online`, `pending` otherwise, then inserts it.
    fn put_reservation(
        &self,
        reservation: &Reservation,
        online: bool,
        now: i64,
    ) -> impl std::future::Future<Output = Result<ReservationId>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn put_reservation(
        &self,
        reservation: &Reservation,
        online: bool,
        now: i64,
    ) -> Result<ReservationId> {
        let mut record = reservation.clone();
        record.created_at = now;
        record.sync_state = if online {
            SyncState::Synced
        } else {
            SyncState::Pending
        };

        let id = self.insert_reservation(&record).await?;
        tracing::debug!(
            reservation_id = %id,
            sync_state = %record.sync_state,
            "reservation persisted"
        );
        Ok(id)
    }
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn insert_reservation(&self, reservation: &Reservation) -> Result<ReservationId> {
        (**self).insert_reservation(reservation).await
    }

    async fn get_reservation(&self, id: &ReservationId) -> Result<Option<Reservation>> {
        (**self).get_reservation(id).await
    }

    async fn list_reservations(&self) -> Result<Vec<Reservation>> {
        (**self).list_reservations().await
    }

    async fn list_reservations_by_sync_state(&self, state: SyncState) -> Result<Vec<Reservation>> {
        (**self).list_reservations_by_sync_state(state).await
    }

    async fn update_sync_state(&self, id: &ReservationId, state: SyncState) -> Result<()> {
        (**self).update_sync_state(id, state).await
    }

    async fn update_reservation(
        &self,
        id: &ReservationId,
        patch: &ReservationPatch,
    ) -> Result<Reservation> {
        (**self).update_reservation(id, patch).await
    }

    async fn delete_reservation(&self, id: &ReservationId) -> Result<bool> {
        (**self).delete_reservation(id).await
    }

    async fn cache_listings(&self, listings: &[Listing]) -> Result<usize> {
        (**self).cache_listings(listings).await
    }

    async fn list_listings(&self) -> Result<Vec<Listing>> {
        (**self).list_listings().await
    }

    async fn get_listing(&self, id: &ListingId) -> Result<Option<Listing>> {
        (**self).get_listing(id).await
    }

    async fn search_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        (**self).search_listings(query).await
    }

    async fn clear_all(&self) -> Result<()> {
        (**self).clear_all().await
    }

    async fn stats(&self) -> Result<StoreStats> {
        (**self).stats().await
    }
}
