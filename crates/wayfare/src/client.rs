//! The Client: the API the presentation layer talks to.
//!
//! The Client owns one store, one connectivity monitor and one sync
//! engine. Presentation code reads and writes bookings through it but can
//! never write a sync state directly; that is the engine's job.

use std::sync::Arc;

use tokio::sync::watch;
use wayfare_core::validation::validate_travelers;
use wayfare_core::{
    now_millis, LifecycleStatus, Listing, ListingId, Reservation, ReservationId,
    ReservationPatch, SyncState, Traveler,
};
use wayfare_store::{ListingQuery, Store, StoreExt, StoreStats};
use wayfare_sync::{
    AutoSync, ConnectivityMonitor, ConnectivitySubscription, ForceSyncOutcome, RemoteSync,
    SyncConfig, SyncEngine, SyncOutcome, SyncStatus, Transition,
};

use crate::error::{ClientError, Result};
use crate::seed::sample_listings;

/// Configuration for the Client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Sync engine configuration.
    pub sync: SyncConfig,
    /// Connectivity reported by the host at startup.
    pub initially_online: bool,
    /// Start the automatic sync triggers on construction.
    pub auto_sync: bool,
}

impl ClientConfig {
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_initially_online(mut self, online: bool) -> Self {
        self.initially_online = online;
        self
    }

    pub fn with_auto_sync(mut self, enabled: bool) -> Self {
        self.auto_sync = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            initially_online: true,
            auto_sync: false,
        }
    }
}

/// Presentation-layer changes to a reservation.
///
/// Sync state is not writable from here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationUpdate {
    pub status: Option<LifecycleStatus>,
    /// Replaces the traveler list; the total is re-derived from the listing.
    pub travelers: Option<Vec<Traveler>>,
}

/// The main Client struct.
pub struct Client<S: Store, R: RemoteSync> {
    store: Arc<S>,
    monitor: ConnectivityMonitor,
    engine: Arc<SyncEngine<S, R>>,
    auto_sync: Option<AutoSync>,
}

impl<S, R> Client<S, R>
where
    S: Store + 'static,
    R: RemoteSync + 'static,
{
    /// Create a client over `store`, pushing to `remote`.
    ///
    /// With `auto_sync` set, the triggers are spawned on the current Tokio
    /// runtime; outside a runtime they are skipped with a warning.
    pub fn new(store: S, remote: R, config: ClientConfig) -> Self {
        Self::from_shared(Arc::new(store), Arc::new(remote), config)
    }

    /// Like [`new`](Self::new), for a store or remote that is shared elsewhere.
    pub fn from_shared(store: Arc<S>, remote: Arc<R>, config: ClientConfig) -> Self {
        let monitor = ConnectivityMonitor::new(config.initially_online);
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&store),
            remote,
            monitor.clone(),
            config.sync,
        ));

        let auto_sync = if config.auto_sync {
            match tokio::runtime::Handle::try_current() {
                Ok(_) => Some(AutoSync::spawn(Arc::clone(&engine))),
                Err(_) => {
                    tracing::warn!("no tokio runtime, auto sync not started");
                    None
                }
            }
        } else {
            None
        };

        Self {
            store,
            monitor,
            engine,
            auto_sync,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn remote(&self) -> &Arc<R> {
        self.engine.remote()
    }

    pub fn engine(&self) -> &Arc<SyncEngine<S, R>> {
        &self.engine
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connectivity
    // ─────────────────────────────────────────────────────────────────────────

    /// Forward a connectivity signal from the host environment.
    pub fn set_online(&self, online: bool) -> Option<Transition> {
        self.monitor.set_online(online)
    }

    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    pub fn subscribe_connectivity(&self) -> ConnectivitySubscription {
        self.monitor.subscribe()
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reservations
    // ─────────────────────────────────────────────────────────────────────────

    /// Book a cached listing for `travelers`.
    ///
    /// The reservation is written locally first: `synced` if online right
    /// now, `pending` otherwise.
    pub async fn book(&self, listing_id: &ListingId, travelers: Vec<Traveler>) -> Result<Reservation> {
        let listing = self
            .store
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| ClientError::ListingNotFound(listing_id.clone()))?;

        let reservation = Reservation::new(&listing, travelers)?;
        let online = self.monitor.is_online();
        let id = self
            .store
            .put_reservation(&reservation, online, now_millis())
            .await?;

        tracing::info!(
            reservation_id = %id,
            listing_id = %listing_id,
            online,
            "reservation booked"
        );

        if !online {
            self.engine.refresh_pending_count().await;
        }

        self.store
            .get_reservation(&id)
            .await?
            .ok_or(ClientError::ReservationNotFound(id))
    }

    /// All reservations, oldest first.
    pub async fn reservations(&self) -> Result<Vec<Reservation>> {
        Ok(self.store.list_reservations().await?)
    }

    pub async fn reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.store.get_reservation(&id).await?)
    }

    pub async fn reservations_by_sync_state(&self, state: SyncState) -> Result<Vec<Reservation>> {
        Ok(self.store.list_reservations_by_sync_state(state).await?)
    }

    /// Apply a presentation-layer change to a stored reservation.
    pub async fn update_reservation(
        &self,
        id: ReservationId,
        update: ReservationUpdate,
    ) -> Result<Reservation> {
        let mut patch = ReservationPatch::new();

        if let Some(status) = update.status {
            patch = patch.status(status);
        }

        if let Some(travelers) = update.travelers {
            validate_travelers(&travelers)?;

            let current = self
                .store
                .get_reservation(&id)
                .await?
                .ok_or(ClientError::ReservationNotFound(id))?;
            let listing = self
                .store
                .get_listing(&current.listing_id)
                .await?
                .ok_or_else(|| ClientError::ListingNotFound(current.listing_id.clone()))?;

            let total = listing.total_for(travelers.len()).ok_or(
                wayfare_core::ValidationError::TotalOverflow {
                    price: listing.price,
                    travelers: travelers.len(),
                },
            )?;
            patch = patch.travelers(travelers).total_amount(total);
        }

        if patch.is_empty() {
            return self
                .store
                .get_reservation(&id)
                .await?
                .ok_or(ClientError::ReservationNotFound(id));
        }

        match self.store.update_reservation(&id, &patch).await {
            Ok(updated) => Ok(updated),
            Err(err) if err.is_not_found() => Err(ClientError::ReservationNotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Mark a reservation cancelled. Its sync state is left alone.
    pub async fn cancel_reservation(&self, id: ReservationId) -> Result<Reservation> {
        let update = ReservationUpdate {
            status: Some(LifecycleStatus::Cancelled),
            ..Default::default()
        };
        let cancelled = self.update_reservation(id, update).await?;
        tracing::info!(reservation_id = %id, "reservation cancelled");
        Ok(cancelled)
    }

    /// Delete a reservation. Returns whether it existed.
    pub async fn delete_reservation(&self, id: ReservationId) -> Result<bool> {
        let existed = self.store.delete_reservation(&id).await?;
        if existed {
            self.engine.refresh_pending_count().await;
        }
        Ok(existed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Listings
    // ─────────────────────────────────────────────────────────────────────────

    /// Upsert listings into the local cache.
    pub async fn cache_listings(&self, listings: &[Listing]) -> Result<usize> {
        let count = self.store.cache_listings(listings).await?;
        tracing::debug!(count, "listings cached");
        Ok(count)
    }

    pub async fn listings(&self) -> Result<Vec<Listing>> {
        Ok(self.store.list_listings().await?)
    }

    pub async fn listing(&self, id: &ListingId) -> Result<Option<Listing>> {
        Ok(self.store.get_listing(id).await?)
    }

    pub async fn search_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        Ok(self.store.search_listings(query).await?)
    }

    /// Cache the sample catalog if nothing is cached yet.
    ///
    /// Returns how many listings were written (zero when the cache was
    /// already populated).
    pub async fn seed_sample_listings(&self) -> Result<usize> {
        if !self.store.list_listings().await?.is_empty() {
            return Ok(0);
        }
        let count = self.store.cache_listings(&sample_listings(now_millis())).await?;
        tracing::info!(count, "sample listings cached");
        Ok(count)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Aggregate counts. A store fault is logged and reported as all zeros.
    pub async fn stats(&self) -> StoreStats {
        match self.store.stats().await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!(error = %err, "could not read store stats");
                StoreStats::default()
            }
        }
    }

    /// Remove every reservation and listing.
    pub async fn clear_all(&self) -> Result<()> {
        self.store.clear_all().await?;
        tracing::info!("local store cleared");
        self.engine.refresh_pending_count().await;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn sync_now(&self) -> SyncOutcome {
        self.engine.sync_now().await
    }

    pub async fn retry_failed(&self) -> SyncOutcome {
        self.engine.retry_failed().await
    }

    pub async fn force_sync(&self, id: ReservationId) -> Result<ForceSyncOutcome> {
        Ok(self.engine.force_sync(id).await?)
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.engine.status()
    }

    pub fn subscribe_sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.engine.subscribe()
    }

    /// Start the automatic triggers. The returned handle stops them on drop.
    pub fn start_auto_sync(&self) -> AutoSync {
        AutoSync::spawn(Arc::clone(&self.engine))
    }

    /// Whether triggers started by [`ClientConfig::auto_sync`] are running.
    pub fn auto_sync_running(&self) -> bool {
        self.auto_sync.as_ref().map_or(false, AutoSync::is_running)
    }
}
