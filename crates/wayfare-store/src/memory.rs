//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use wayfare_core::{
    Listing, ListingId, Reservation, ReservationId, ReservationPatch, SyncState,
};

use crate::error::{check_sync_transition, Result, StoreError};
use crate::traits::{ListingQuery, Store, StoreStats};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Reservations indexed by id; BTreeMap keeps insertion (id) order.
    reservations: BTreeMap<ReservationId, Reservation>,

    /// Cached listings indexed by id.
    listings: BTreeMap<ListingId, Listing>,

    /// Next id to assign. Never reused, even after deletes or a clear.
    /// `None` once `i64::MAX` has been handed out.
    next_id: Option<i64>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                reservations: BTreeMap::new(),
                listings: BTreeMap::new(),
                next_id: Some(1),
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_reservation(&self, reservation: &Reservation) -> Result<ReservationId> {
        let mut inner = self.write()?;

        let id = match reservation.id {
            Some(id) => {
                if inner.reservations.contains_key(&id) {
                    return Err(StoreError::AlreadyExists(format!("reservation {}", id)));
                }
                if let Some(next) = inner.next_id {
                    if id.get() >= next {
                        inner.next_id = id.get().checked_add(1);
                    }
                }
                id
            }
            None => {
                let raw = inner.next_id.ok_or_else(|| {
                    StoreError::InvalidData("reservation id space exhausted".into())
                })?;
                inner.next_id = raw.checked_add(1);
                ReservationId::new(raw)
            }
        };

        let mut record = reservation.clone();
        record.id = Some(id);
        inner.reservations.insert(id, record);

        Ok(id)
    }

    async fn get_reservation(&self, id: &ReservationId) -> Result<Option<Reservation>> {
        let inner = self.read()?;
        Ok(inner.reservations.get(id).cloned())
    }

    async fn list_reservations(&self) -> Result<Vec<Reservation>> {
        let inner = self.read()?;
        Ok(inner.reservations.values().cloned().collect())
    }

    async fn list_reservations_by_sync_state(&self, state: SyncState) -> Result<Vec<Reservation>> {
        let inner = self.read()?;
        Ok(inner
            .reservations
            .values()
            .filter(|r| r.sync_state == state)
            .cloned()
            .collect())
    }

    async fn update_sync_state(&self, id: &ReservationId, state: SyncState) -> Result<()> {
        let mut inner = self.write()?;
        let record = inner
            .reservations
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("reservation {}", id)))?;
        check_sync_transition(record.sync_state, state)?;
        record.sync_state = state;
        Ok(())
    }

    async fn update_reservation(
        &self,
        id: &ReservationId,
        patch: &ReservationPatch,
    ) -> Result<Reservation> {
        let mut inner = self.write()?;
        let record = inner
            .reservations
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("reservation {}", id)))?;
        if let Some(to) = patch.sync_state {
            check_sync_transition(record.sync_state, to)?;
        }
        patch.apply(record);
        Ok(record.clone())
    }

    async fn delete_reservation(&self, id: &ReservationId) -> Result<bool> {
        let mut inner = self.write()?;
        Ok(inner.reservations.remove(id).is_some())
    }

    async fn cache_listings(&self, listings: &[Listing]) -> Result<usize> {
        let mut inner = self.write()?;
        for listing in listings {
            inner.listings.insert(listing.id.clone(), listing.clone());
        }
        Ok(listings.len())
    }

    async fn list_listings(&self) -> Result<Vec<Listing>> {
        let inner = self.read()?;
        Ok(inner.listings.values().cloned().collect())
    }

    async fn get_listing(&self, id: &ListingId) -> Result<Option<Listing>> {
        let inner = self.read()?;
        Ok(inner.listings.get(id).cloned())
    }

    async fn search_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        let inner = self.read()?;
        let mut found: Vec<Listing> = inner
            .listings
            .values()
            .filter(|l| query.matches(l))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.departure.cmp(&b.departure).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn clear_all(&self) -> Result<()> {
        let mut inner = self.write()?;
        inner.reservations.clear();
        inner.listings.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let inner = self.read()?;
        let count_state = |state: SyncState| {
            inner
                .reservations
                .values()
                .filter(|r| r.sync_state == state)
                .count() as u64
        };

        Ok(StoreStats {
            reservation_count: inner.reservations.len() as u64,
            listing_count: inner.listings.len() as u64,
            pending_sync_count: count_state(SyncState::Pending),
            failed_sync_count: count_state(SyncState::Failed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreExt;
    use wayfare_core::{Category, LifecycleStatus, Sex, Traveler};

    fn make_listing(id: &str, price: u64) -> Listing {
        Listing {
            id: id.into(),
            origin: "Delhi".into(),
            destination: "Jaipur".into(),
            departure: 1_700_000_000_000,
            price,
            category: Category::Bus,
            seats_available: 25,
        }
    }

    fn make_reservation() -> Reservation {
        Reservation::new(
            &make_listing("TKT005", 250),
            vec![Traveler::new("Meera Iyer", 29, Sex::Female)],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();

        let id = store.put_reservation(&make_reservation(), false, 1000).await.unwrap();

        let retrieved = store.get_reservation(&id).await.unwrap().unwrap();
        assert_eq!(retrieved.id, Some(id));
        assert_eq!(retrieved.created_at, 1000);
        assert_eq!(retrieved.sync_state, SyncState::Pending);
    }

    #[tokio::test]
    async fn test_memory_store_ids_never_reused() {
        let store = MemoryStore::new();

        let a = store.insert_reservation(&make_reservation()).await.unwrap();
        store.delete_reservation(&a).await.unwrap();
        store.clear_all().await.unwrap();
        let b = store.insert_reservation(&make_reservation()).await.unwrap();

        assert!(b > a);
    }

    #[tokio::test]
    async fn test_memory_store_max_id() {
        let store = MemoryStore::new();

        let mut last = make_reservation();
        last.id = Some(ReservationId::new(i64::MAX));
        let id = store.insert_reservation(&last).await.unwrap();
        assert_eq!(id, ReservationId::new(i64::MAX));

        // No id is left to assign, and the top id is not handed out again
        store.delete_reservation(&id).await.unwrap();
        let err = store.insert_reservation(&make_reservation()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));

        // Explicit ids below the top still go in
        let mut low = make_reservation();
        low.id = Some(ReservationId::new(7));
        assert_eq!(store.insert_reservation(&low).await.unwrap(), ReservationId::new(7));
    }

    #[tokio::test]
    async fn test_memory_store_synced_is_terminal() {
        let store = MemoryStore::new();
        let id = store.put_reservation(&make_reservation(), true, 0).await.unwrap();

        let err = store
            .update_sync_state(&id, SyncState::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        let patch = ReservationPatch::new().sync_state(SyncState::Failed);
        assert!(store.update_reservation(&id, &patch).await.is_err());
        assert_eq!(
            store.get_reservation(&id).await.unwrap().unwrap().sync_state,
            SyncState::Synced
        );
    }

    #[tokio::test]
    async fn test_memory_store_update_not_found() {
        let store = MemoryStore::new();
        let patch = ReservationPatch::new().status(LifecycleStatus::Cancelled);

        let err = store
            .update_reservation(&ReservationId::new(99), &patch)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_memory_store_listing_upsert() {
        let store = MemoryStore::new();

        store.cache_listings(&[make_listing("TKT005", 250)]).await.unwrap();
        store.cache_listings(&[make_listing("TKT005", 300)]).await.unwrap();

        let listings = store.list_listings().await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].price, 300);
    }

    proptest::proptest! {
        #[test]
        fn prop_ids_strictly_increase(deletes in proptest::collection::vec(proptest::bool::ANY, 1..20)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = MemoryStore::new();
                let mut last = ReservationId::new(0);
                for delete in deletes {
                    let id = store.insert_reservation(&make_reservation()).await.unwrap();
                    assert!(id > last);
                    last = id;
                    if delete {
                        store.delete_reservation(&id).await.unwrap();
                    }
                }
            });
        }
    }
}
