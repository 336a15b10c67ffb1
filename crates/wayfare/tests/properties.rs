//! Property tests over the store backends and sync passes.

use std::collections::BTreeSet;

use proptest::prelude::*;
use wayfare::store::{MemoryStore, SqliteStore, Store, StoreExt};
use wayfare::sync::SyncConfig;
use wayfare::{LifecycleStatus, ListingQuery, SyncState};
use wayfare_testkit::generators::{category, city, departure, listing, BookingParams};
use wayfare_testkit::TestFixture;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn query() -> impl Strategy<Value = ListingQuery> {
    (
        proptest::option::of(city()),
        proptest::option::of(city()),
        proptest::option::of((departure(), departure())),
        proptest::option::of(category()),
    )
        .prop_map(|(origin, destination, window, category)| {
            let mut query = ListingQuery::new();
            if let Some(origin) = origin {
                query = query.origin(origin);
            }
            if let Some(destination) = destination {
                query = query.destination(destination);
            }
            if let Some((a, b)) = window {
                query = query.departing_between(a.min(b), a.max(b));
            }
            if let Some(category) = category {
                query = query.category(category);
            }
            query
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_backends_agree_on_listing_search(
        listings in proptest::collection::vec(listing(), 0..24),
        query in query(),
    ) {
        runtime().block_on(async {
            let memory = MemoryStore::new();
            let sqlite = SqliteStore::open_memory().unwrap();
            memory.cache_listings(&listings).await.unwrap();
            sqlite.cache_listings(&listings).await.unwrap();

            let from_memory = memory.search_listings(&query).await.unwrap();
            let from_sqlite = sqlite.search_listings(&query).await.unwrap();

            assert_eq!(from_memory, from_sqlite);
            assert!(from_memory.iter().all(|l| query.matches(l)));
            assert!(from_memory
                .windows(2)
                .all(|w| (w[0].departure, &w[0].id) <= (w[1].departure, &w[1].id)));
        });
    }

    #[test]
    fn test_pass_outcome_follows_remote(
        bookings in proptest::collection::vec(any::<BookingParams>(), 1..10),
        rejects in proptest::collection::vec(any::<bool>(), 10),
    ) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            let engine = fixture.engine_with(true, SyncConfig::default());

            let mut rejected = BTreeSet::new();
            for (i, params) in bookings.iter().enumerate() {
                let id = fixture
                    .store
                    .put_reservation(&params.reservation(), false, 0)
                    .await
                    .unwrap();
                if rejects[i] {
                    fixture.remote.fail(id, "rejected");
                    rejected.insert(id);
                }
            }

            let outcome = engine.sync_now().await;
            assert_eq!(outcome.is_success(), rejected.is_empty());

            for record in fixture.store.list_reservations().await.unwrap() {
                let id = record.id.unwrap();
                if rejected.contains(&id) {
                    assert_eq!(record.sync_state, SyncState::Failed);
                    assert_eq!(record.status, LifecycleStatus::Pending);
                } else {
                    assert_eq!(record.sync_state, SyncState::Synced);
                    assert_eq!(record.status, LifecycleStatus::Confirmed);
                }
            }

            let status = engine.status();
            assert!(!status.is_syncing);
            assert_eq!(status.pending_count, rejected.len() as u64);
            assert_eq!(status.failed_count, rejected.len() as u64);
            assert_eq!(status.sync_errors.len(), rejected.len());

            // A second pass never touches synced records
            let before = fixture.remote.total_pushes();
            engine.sync_now().await;
            assert_eq!(fixture.remote.total_pushes(), before);
        });
    }
}
