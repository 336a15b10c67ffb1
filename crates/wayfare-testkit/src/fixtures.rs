//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use wayfare_core::{now_millis, Category, Listing, Reservation, ReservationId, Sex, Traveler};
use wayfare_store::{MemoryStore, StoreExt};
use wayfare_sync::{ConnectivityMonitor, MemoryRemote, SyncConfig, SyncEngine};

/// A bus listing with the given id and price.
pub fn listing(id: &str, price: u64) -> Listing {
    Listing {
        id: id.into(),
        origin: "Mumbai".into(),
        destination: "Pune".into(),
        departure: now_millis(),
        price,
        category: Category::Bus,
        seats_available: 35,
    }
}

/// `count` distinct travelers.
pub fn travelers(count: usize) -> Vec<Traveler> {
    (0..count)
        .map(|i| Traveler::new(format!("Traveler {}", i + 1), 20 + i as u8, Sex::Other))
        .collect()
}

/// A memory store and a scriptable remote.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub remote: Arc<MemoryRemote>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            remote: Arc::new(MemoryRemote::new()),
        }
    }

    /// An engine over this fixture with the default config.
    pub fn engine(&self, online: bool) -> SyncEngine<MemoryStore, MemoryRemote> {
        self.engine_with(online, SyncConfig::default())
    }

    pub fn engine_with(
        &self,
        online: bool,
        config: SyncConfig,
    ) -> SyncEngine<MemoryStore, MemoryRemote> {
        SyncEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.remote),
            ConnectivityMonitor::new(online),
            config,
        )
    }

    /// Store `count` reservations as if booked offline.
    pub async fn add_pending(&self, count: usize) -> Vec<ReservationId> {
        let listing = listing("TKT006", 200);
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let reservation =
                Reservation::new(&listing, travelers(1)).expect("fixture reservation is valid");
            let id = self
                .store
                .put_reservation(&reservation, false, now_millis())
                .await
                .expect("memory store accepts insert");
            ids.push(id);
        }
        ids
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfare_core::SyncState;
    use wayfare_store::Store;

    #[tokio::test]
    async fn test_add_pending() {
        let fixture = TestFixture::new();
        let ids = fixture.add_pending(3).await;
        assert_eq!(ids.len(), 3);

        let pending = fixture
            .store
            .list_reservations_by_sync_state(SyncState::Pending)
            .await
            .unwrap();
        assert_eq!(pending.len(), 3);
    }

    #[test]
    fn test_travelers_are_valid() {
        assert!(wayfare_core::validation::validate_travelers(&travelers(5)).is_ok());
    }
}
