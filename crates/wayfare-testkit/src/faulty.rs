//! Fault injection for store-level error paths.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use wayfare_core::{Listing, ListingId, Reservation, ReservationId, ReservationPatch, SyncState};
use wayfare_store::{ListingQuery, Result, Store, StoreError, StoreStats};

/// An operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `list_reservations_by_sync_state`
    ListBySyncState,
    /// `update_reservation` and `update_sync_state`
    Update,
    /// `insert_reservation`
    Insert,
    /// `stats`
    Stats,
}

/// Wraps a store and fails the chosen operations with `Unavailable`.
pub struct FaultyStore<S: Store> {
    inner: S,
    faults: Mutex<HashSet<Fault>>,
}

impl<S: Store> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashSet::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn faults(&self) -> MutexGuard<'_, HashSet<Fault>> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start failing `fault`.
    pub fn inject(&self, fault: Fault) {
        self.faults().insert(fault);
    }

    /// Stop failing `fault`.
    pub fn heal(&self, fault: Fault) {
        self.faults().remove(&fault);
    }

    fn check(&self, fault: Fault) -> Result<()> {
        if self.faults().contains(&fault) {
            Err(StoreError::Unavailable(format!("injected fault: {:?}", fault)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<S: Store> Store for FaultyStore<S> {
    async fn insert_reservation(&self, reservation: &Reservation) -> Result<ReservationId> {
        self.check(Fault::Insert)?;
        self.inner.insert_reservation(reservation).await
    }

    async fn get_reservation(&self, id: &ReservationId) -> Result<Option<Reservation>> {
        self.inner.get_reservation(id).await
    }

    async fn list_reservations(&self) -> Result<Vec<Reservation>> {
        self.inner.list_reservations().await
    }

    async fn list_reservations_by_sync_state(&self, state: SyncState) -> Result<Vec<Reservation>> {
        self.check(Fault::ListBySyncState)?;
        self.inner.list_reservations_by_sync_state(state).await
    }

    async fn update_sync_state(&self, id: &ReservationId, state: SyncState) -> Result<()> {
        self.check(Fault::Update)?;
        self.inner.update_sync_state(id, state).await
    }

    async fn update_reservation(
        &self,
        id: &ReservationId,
        patch: &ReservationPatch,
    ) -> Result<Reservation> {
        self.check(Fault::Update)?;
        self.inner.update_reservation(id, patch).await
    }

    async fn delete_reservation(&self, id: &ReservationId) -> Result<bool> {
        self.inner.delete_reservation(id).await
    }

    async fn cache_listings(&self, listings: &[Listing]) -> Result<usize> {
        self.inner.cache_listings(listings).await
    }

    async fn list_listings(&self) -> Result<Vec<Listing>> {
        self.inner.list_listings().await
    }

    async fn get_listing(&self, id: &ListingId) -> Result<Option<Listing>> {
        self.inner.get_listing(id).await
    }

    async fn search_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        self.inner.search_listings(query).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.inner.clear_all().await
    }

    async fn stats(&self) -> Result<StoreStats> {
        self.check(Fault::Stats)?;
        self.inner.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfare_store::MemoryStore;

    #[tokio::test]
    async fn test_inject_and_heal() {
        let store = FaultyStore::new(MemoryStore::new());

        store.inject(Fault::Stats);
        assert!(matches!(store.stats().await, Err(StoreError::Unavailable(_))));
        assert!(store.list_reservations().await.is_ok());

        store.heal(Fault::Stats);
        assert!(store.stats().await.is_ok());
    }
}
