//! The sync engine.
//!
//! Reconciles unsynced reservations with the remote authority, one pass at
//! a time. The engine keeps no copy of record data: every pass re-reads the
//! store, and every per-record result is written back before the pass
//! reports itself finished.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::task::{AbortHandle, JoinHandle};
use wayfare_core::{
    now_millis, LifecycleStatus, Reservation, ReservationId, ReservationPatch, SyncState,
};
use wayfare_store::Store;

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{RemoteError, Result, SyncError};
use crate::remote::RemoteSync;
use crate::status::{ForceSyncOutcome, PassReport, SkipReason, SyncOutcome, SyncStatus};

/// Owns the sync status and runs passes against a store and a remote.
pub struct SyncEngine<S: Store, R: RemoteSync> {
    store: Arc<S>,
    remote: Arc<R>,
    monitor: ConnectivityMonitor,
    config: SyncConfig,
    status: watch::Sender<SyncStatus>,
}

/// Holds `is_syncing` for the lifetime of a pass.
///
/// Dropping it without [`finish`](PassGuard::finish) (the pass future was
/// cancelled) releases the flag so the engine stays retryable.
struct PassGuard<'a> {
    status: &'a watch::Sender<SyncStatus>,
    armed: bool,
}

impl PassGuard<'_> {
    /// Apply the final status of the pass and release the flag in one write.
    fn finish(mut self, update: impl FnOnce(&mut SyncStatus)) {
        self.armed = false;
        self.status.send_modify(|status| {
            update(status);
            status.is_syncing = false;
        });
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("sync pass dropped before completion");
            self.status.send_modify(|status| status.is_syncing = false);
        }
    }
}

struct PushTask {
    id: ReservationId,
    prior_attempts: u32,
    handle: JoinHandle<std::result::Result<(), RemoteError>>,
}

/// Pushes spawned by one pass. Whatever is still running when this is
/// dropped gets aborted.
#[derive(Default)]
struct PushTasks {
    queue: VecDeque<PushTask>,
    aborts: Vec<AbortHandle>,
}

impl PushTasks {
    fn push(&mut self, task: PushTask) {
        self.aborts.push(task.handle.abort_handle());
        self.queue.push_back(task);
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn next(&mut self) -> Option<PushTask> {
        self.queue.pop_front()
    }
}

impl Drop for PushTasks {
    fn drop(&mut self) {
        for abort in &self.aborts {
            abort.abort();
        }
    }
}

/// Push once, retrying per the policy. A push that outlives the timeout
/// is a failure.
async fn push_with_retry<R: RemoteSync + ?Sized>(
    remote: &R,
    reservation: &Reservation,
    config: &SyncConfig,
) -> std::result::Result<(), RemoteError> {
    let attempts = config.retry.attempts_per_push.max(1);
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(config.push_timeout, remote.push(reservation)).await
        {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(config.push_timeout)),
        };

        match result {
            Ok(()) => return Ok(()),
            Err(err) if attempt >= attempts => return Err(err),
            Err(err) => {
                tracing::debug!(attempt, error = %err, "push failed, retrying");
                tokio::time::sleep(config.retry.backoff(attempt)).await;
                attempt += 1;
            }
        }
    }
}

impl<S, R> SyncEngine<S, R>
where
    S: Store + 'static,
    R: RemoteSync + 'static,
{
    pub fn new(
        store: Arc<S>,
        remote: Arc<R>,
        monitor: ConnectivityMonitor,
        config: SyncConfig,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            store,
            remote,
            monitor,
            config,
            status,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Snapshot of the current status.
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Watch the status. The receiver sees the latest value on every change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Triggers
    // ─────────────────────────────────────────────────────────────────────────

    /// Run one pass over every `pending` reservation.
    ///
    /// Returns `NotStarted` without touching anything if a pass is already
    /// running or the device is offline.
    pub async fn sync_now(&self) -> SyncOutcome {
        match self.try_begin() {
            Ok(guard) => self.run_pass(guard).await,
            Err(reason) => self.skipped(reason),
        }
    }

    /// Reset `failed` reservations to `pending`, then run a pass.
    ///
    /// Reservations that have reached the retry cap stay `failed`. The reset
    /// and the pass run under the same guard.
    pub async fn retry_failed(&self) -> SyncOutcome {
        let guard = match self.try_begin() {
            Ok(guard) => guard,
            Err(reason) => return self.skipped(reason),
        };

        let failed = match self
            .store
            .list_reservations_by_sync_state(SyncState::Failed)
            .await
        {
            Ok(failed) => failed,
            Err(err) => {
                return Self::abort(guard, format!("failed to read failed reservations: {}", err))
            }
        };

        let mut reset = 0usize;
        for record in failed {
            let Some(id) = record.id else { continue };

            if !self.config.retry.allows_retry(record.sync_attempts) {
                tracing::debug!(
                    reservation_id = %id,
                    attempts = record.sync_attempts,
                    "retry cap reached, leaving failed"
                );
                continue;
            }

            match self.store.update_sync_state(&id, SyncState::Pending).await {
                Ok(()) => reset += 1,
                Err(err) => {
                    tracing::warn!(reservation_id = %id, error = %err, "could not reset reservation")
                }
            }
        }
        tracing::info!(reset, "failed reservations reset to pending");

        self.run_pass(guard).await
    }

    /// Push one named reservation outside of a pass.
    ///
    /// Does not take the pass guard. Afterwards the status counts are
    /// refreshed from the store.
    pub async fn force_sync(&self, id: ReservationId) -> Result<ForceSyncOutcome> {
        if !self.monitor.is_online() {
            tracing::debug!(reservation_id = %id, "force sync skipped, offline");
            return Ok(ForceSyncOutcome::Offline);
        }

        let record = self
            .store
            .get_reservation(&id)
            .await?
            .ok_or(SyncError::ReservationNotFound(id))?;

        if record.sync_state == SyncState::Synced {
            return Ok(ForceSyncOutcome::AlreadySynced);
        }
        record.sync_state.transition(SyncState::Synced)?;

        let outcome = match push_with_retry(self.remote.as_ref(), &record, &self.config).await {
            Ok(()) => {
                self.mark_synced(id).await?;
                tracing::info!(reservation_id = %id, "reservation force-synced");
                ForceSyncOutcome::Synced
            }
            Err(err) => {
                self.mark_failed(id, record.sync_attempts).await?;
                tracing::warn!(reservation_id = %id, error = %err, "force sync failed");
                ForceSyncOutcome::Failed(err.to_string())
            }
        };

        self.refresh_pending_count().await;
        Ok(outcome)
    }

    /// Recompute the status counts from the store.
    ///
    /// Best effort: a store fault is logged and leaves the status alone.
    pub async fn refresh_pending_count(&self) -> Option<u64> {
        match self.store.stats().await {
            Ok(stats) => {
                self.status.send_modify(|status| {
                    status.pending_count = stats.pending_sync_count;
                    status.failed_count = stats.failed_sync_count;
                });
                Some(stats.pending_sync_count)
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not refresh pending count");
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pass internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Atomically check both entry conditions and claim the flag.
    fn try_begin(&self) -> std::result::Result<PassGuard<'_>, SkipReason> {
        let mut skip = None;

        self.status.send_if_modified(|status| {
            if status.is_syncing {
                skip = Some(SkipReason::AlreadySyncing);
                return false;
            }
            if !self.monitor.is_online() {
                skip = Some(SkipReason::Offline);
                return false;
            }
            status.is_syncing = true;
            status.sync_errors.clear();
            true
        });

        match skip {
            Some(reason) => Err(reason),
            None => Ok(PassGuard {
                status: &self.status,
                armed: true,
            }),
        }
    }

    fn skipped(&self, reason: SkipReason) -> SyncOutcome {
        tracing::debug!(?reason, "sync not started");
        SyncOutcome::NotStarted(reason)
    }

    fn abort(guard: PassGuard<'_>, message: String) -> SyncOutcome {
        tracing::error!(error = %message, "sync pass aborted");
        let recorded = message.clone();
        guard.finish(|status| status.sync_errors = vec![recorded]);
        SyncOutcome::Aborted(message)
    }

    async fn run_pass(&self, guard: PassGuard<'_>) -> SyncOutcome {
        let pending = match self
            .store
            .list_reservations_by_sync_state(SyncState::Pending)
            .await
        {
            Ok(pending) => pending,
            Err(err) => {
                return Self::abort(guard, format!("failed to read pending reservations: {}", err))
            }
        };

        if pending.is_empty() {
            guard.finish(|status| {
                status.last_sync_time = Some(now_millis());
                status.pending_count = 0;
            });
            tracing::debug!("sync pass found nothing pending");
            return SyncOutcome::Completed(PassReport::default());
        }

        tracing::info!(pending = pending.len(), "sync pass started");

        let mut report = PassReport::default();
        let limiter = Arc::new(Semaphore::new(
            self.config
                .max_concurrent_pushes
                .clamp(1, Semaphore::MAX_PERMITS),
        ));
        let mut tasks = PushTasks::default();

        for record in pending {
            let Some(id) = record.id else {
                report.attempted += 1;
                report.failed += 1;
                report.errors.push("reservation has no id".into());
                continue;
            };

            let remote = Arc::clone(&self.remote);
            let limiter = Arc::clone(&limiter);
            let config = self.config.clone();
            let prior_attempts = record.sync_attempts;

            let handle = tokio::spawn(async move {
                let _permit = limiter
                    .acquire_owned()
                    .await
                    .map_err(|_| RemoteError::Unreachable("push limiter closed".into()))?;
                push_with_retry(remote.as_ref(), &record, &config).await
            });

            tasks.push(PushTask {
                id,
                prior_attempts,
                handle,
            });
        }
        report.attempted += tasks.len();

        while let Some(task) = tasks.next() {
            let result = match task.handle.await {
                Ok(result) => result,
                Err(err) => Err(RemoteError::Unreachable(format!("push task failed: {}", err))),
            };

            match self.record_result(task.id, task.prior_attempts, result).await {
                Ok(()) => report.succeeded += 1,
                Err(message) => {
                    report.failed += 1;
                    report.errors.push(message);
                }
            }
        }

        let failed = report.failed as u64;
        let errors = report.errors.clone();
        guard.finish(|status| {
            status.last_sync_time = Some(now_millis());
            status.pending_count = failed;
            status.failed_count = failed;
            status.sync_errors = errors;
        });

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "sync pass completed"
        );
        SyncOutcome::Completed(report)
    }

    /// Write one push result back to the store. `Err` carries the message
    /// for the pass's error list.
    async fn record_result(
        &self,
        id: ReservationId,
        prior_attempts: u32,
        result: std::result::Result<(), RemoteError>,
    ) -> std::result::Result<(), String> {
        match result {
            Ok(()) => match self.mark_synced(id).await {
                Ok(()) => {
                    tracing::debug!(reservation_id = %id, "reservation synced");
                    Ok(())
                }
                Err(err) => {
                    tracing::warn!(reservation_id = %id, error = %err, "could not record sync");
                    Err(format!(
                        "reservation {}: pushed but could not record result: {}",
                        id, err
                    ))
                }
            },
            Err(push_err) => {
                tracing::warn!(reservation_id = %id, error = %push_err, "push failed");
                let mut message = format!("reservation {}: {}", id, push_err);
                if let Err(err) = self.mark_failed(id, prior_attempts).await {
                    message.push_str(&format!(" (could not record failure: {})", err));
                }
                Err(message)
            }
        }
    }

    async fn mark_synced(&self, id: ReservationId) -> Result<()> {
        let patch = ReservationPatch::new()
            .sync_state(SyncState::Synced)
            .status(LifecycleStatus::Confirmed);
        self.store.update_reservation(&id, &patch).await?;
        Ok(())
    }

    async fn mark_failed(&self, id: ReservationId, prior_attempts: u32) -> Result<()> {
        let patch = ReservationPatch::new()
            .sync_state(SyncState::Failed)
            .sync_attempts(prior_attempts.saturating_add(1));
        self.store.update_reservation(&id, &patch).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::remote::memory::MemoryRemote;
    use std::time::Duration;
    use wayfare_core::{Category, Listing, Sex, Traveler};
    use wayfare_store::{MemoryStore, StoreExt};

    type Engine = SyncEngine<MemoryStore, MemoryRemote>;

    fn listing() -> Listing {
        Listing {
            id: "TKT002".into(),
            origin: "Delhi".into(),
            destination: "Bangalore".into(),
            departure: 0,
            price: 800,
            category: Category::Train,
            seats_available: 120,
        }
    }

    fn engine(online: bool, config: SyncConfig) -> Engine {
        SyncEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryRemote::new()),
            ConnectivityMonitor::new(online),
            config,
        )
    }

    async fn add_pending(engine: &Engine) -> ReservationId {
        let reservation =
            Reservation::new(&listing(), vec![Traveler::new("Asha Rao", 31, Sex::Female)]).unwrap();
        engine
            .store()
            .put_reservation(&reservation, false, now_millis())
            .await
            .unwrap()
    }

    async fn get(engine: &Engine, id: ReservationId) -> Reservation {
        engine.store().get_reservation(&id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_offline_pass_touches_nothing() {
        let engine = engine(false, SyncConfig::default());
        let id = add_pending(&engine).await;

        let outcome = engine.sync_now().await;

        assert_eq!(outcome, SyncOutcome::NotStarted(SkipReason::Offline));
        assert_eq!(engine.remote().total_pushes(), 0);
        assert_eq!(get(&engine, id).await.sync_state, SyncState::Pending);
        assert_eq!(engine.status(), SyncStatus::default());
    }

    #[tokio::test]
    async fn test_one_success_one_failure() {
        let engine = engine(true, SyncConfig::default());
        let r1 = add_pending(&engine).await;
        let r2 = add_pending(&engine).await;
        engine.remote().fail(r2, "inventory mismatch");

        let outcome = engine.sync_now().await;
        assert!(!outcome.is_success());
        let report = outcome.report().unwrap();
        assert_eq!((report.attempted, report.succeeded, report.failed), (2, 1, 1));

        let first = get(&engine, r1).await;
        assert_eq!(first.sync_state, SyncState::Synced);
        assert_eq!(first.status, LifecycleStatus::Confirmed);

        let second = get(&engine, r2).await;
        assert_eq!(second.sync_state, SyncState::Failed);
        assert_eq!(second.status, LifecycleStatus::Pending);
        assert_eq!(second.sync_attempts, 1);

        let status = engine.status();
        assert!(!status.is_syncing);
        assert!(status.last_sync_time.is_some());
        assert_eq!(status.pending_count, 1);
        assert_eq!(status.failed_count, 1);
        assert_eq!(status.sync_errors.len(), 1);
        assert!(status.sync_errors[0].contains("inventory mismatch"));
    }

    #[tokio::test]
    async fn test_empty_pass_still_records_time() {
        let engine = engine(true, SyncConfig::default());

        let outcome = engine.sync_now().await;

        assert!(outcome.is_success());
        let status = engine.status();
        assert!(status.last_sync_time.is_some());
        assert_eq!(status.pending_count, 0);
        assert!(!status.is_syncing);
    }

    #[tokio::test]
    async fn test_second_trigger_is_not_started() {
        let engine = Arc::new(engine(true, SyncConfig::default()));
        let id = add_pending(&engine).await;
        engine.remote().pause();

        let running = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.sync_now().await })
        };

        let mut rx = engine.subscribe();
        rx.wait_for(|s| s.is_syncing).await.unwrap();

        assert_eq!(
            engine.sync_now().await,
            SyncOutcome::NotStarted(SkipReason::AlreadySyncing)
        );
        assert_eq!(
            engine.retry_failed().await,
            SyncOutcome::NotStarted(SkipReason::AlreadySyncing)
        );

        engine.remote().resume();
        assert!(running.await.unwrap().is_success());
        assert_eq!(engine.remote().push_count(id), 1);
        assert!(!engine.status().is_syncing);
    }

    #[tokio::test]
    async fn test_retry_failed_attempts_each_once() {
        let engine = engine(true, SyncConfig::default());
        let ids = [
            add_pending(&engine).await,
            add_pending(&engine).await,
            add_pending(&engine).await,
        ];
        engine.remote().fail_all("down for maintenance");
        engine.sync_now().await;
        for id in ids {
            assert_eq!(get(&engine, id).await.sync_state, SyncState::Failed);
        }

        engine.remote().clear_failures();
        engine.remote().fail(ids[2], "still rejected");
        let outcome = engine.retry_failed().await;

        let report = outcome.report().unwrap();
        assert_eq!((report.attempted, report.succeeded, report.failed), (3, 2, 1));
        for id in ids {
            assert_eq!(engine.remote().push_count(id), 2);
        }
        assert_eq!(get(&engine, ids[0]).await.sync_state, SyncState::Synced);
        assert_eq!(get(&engine, ids[1]).await.sync_state, SyncState::Synced);
        assert_eq!(get(&engine, ids[2]).await.sync_state, SyncState::Failed);
        assert_eq!(get(&engine, ids[2]).await.sync_attempts, 2);
    }

    #[tokio::test]
    async fn test_retry_cap_leaves_record_failed() {
        let retry = RetryPolicy {
            max_sync_attempts: Some(1),
            ..RetryPolicy::default()
        };
        let engine = engine(true, SyncConfig::default().with_retry(retry));
        let id = add_pending(&engine).await;
        engine.remote().fail(id, "no");

        engine.sync_now().await;
        engine.remote().clear_failures();
        let outcome = engine.retry_failed().await;

        assert_eq!(outcome.report().unwrap().attempted, 0);
        assert_eq!(engine.remote().push_count(id), 1);
        assert_eq!(get(&engine, id).await.sync_state, SyncState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_timeout_counts_as_failure() {
        let config = SyncConfig::default().with_push_timeout(Duration::from_secs(2));
        let engine = engine(true, config);
        let id = add_pending(&engine).await;
        engine.remote().pause();

        let outcome = engine.sync_now().await;

        assert!(!outcome.is_success());
        assert_eq!(get(&engine, id).await.sync_state, SyncState::Failed);
        let status = engine.status();
        assert!(!status.is_syncing);
        assert!(status.sync_errors[0].contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_retries_within_pass() {
        let retry = RetryPolicy {
            attempts_per_push: 3,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_secs(1),
            max_sync_attempts: None,
        };
        let engine = engine(true, SyncConfig::default().with_retry(retry));
        let id = add_pending(&engine).await;
        engine.remote().fail(id, "flaky");

        let outcome = engine.sync_now().await;

        assert!(!outcome.is_success());
        assert_eq!(engine.remote().push_count(id), 3);
        assert_eq!(get(&engine, id).await.sync_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let engine = engine(true, SyncConfig::default().with_max_concurrent_pushes(2));
        for _ in 0..6 {
            add_pending(&engine).await;
        }
        engine.remote().set_latency(Duration::from_millis(50));

        assert!(engine.sync_now().await.is_success());
        assert_eq!(engine.remote().accepted_count(), 6);
        assert_eq!(engine.remote().max_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_unbounded_concurrency_is_clamped() {
        let unbounded = engine(true, SyncConfig::default().with_max_concurrent_pushes(usize::MAX));
        let id = add_pending(&unbounded).await;

        assert!(unbounded.sync_now().await.is_success());
        assert_eq!(get(&unbounded, id).await.sync_state, SyncState::Synced);

        let zero = engine(true, SyncConfig::default().with_max_concurrent_pushes(0));
        add_pending(&zero).await;
        assert!(zero.sync_now().await.is_success());
        assert_eq!(zero.remote().max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_pass_releases_guard() {
        let engine = Arc::new(engine(true, SyncConfig::default()));
        add_pending(&engine).await;
        engine.remote().pause();

        let running = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.sync_now().await })
        };
        let mut rx = engine.subscribe();
        rx.wait_for(|s| s.is_syncing).await.unwrap();

        running.abort();
        assert!(running.await.unwrap_err().is_cancelled());

        assert!(!engine.status().is_syncing);
        engine.remote().resume();
        assert!(engine.sync_now().await.was_started());
    }

    #[tokio::test]
    async fn test_force_sync() {
        let engine = engine(true, SyncConfig::default());
        let id = add_pending(&engine).await;
        let other = add_pending(&engine).await;

        let missing = engine.force_sync(ReservationId::new(999)).await.unwrap_err();
        assert!(matches!(missing, SyncError::ReservationNotFound(_)));

        assert_eq!(engine.force_sync(id).await.unwrap(), ForceSyncOutcome::Synced);
        assert_eq!(get(&engine, id).await.status, LifecycleStatus::Confirmed);
        assert_eq!(engine.status().pending_count, 1);
        assert_eq!(get(&engine, other).await.sync_state, SyncState::Pending);

        assert_eq!(
            engine.force_sync(id).await.unwrap(),
            ForceSyncOutcome::AlreadySynced
        );
        assert_eq!(engine.remote().push_count(id), 1);

        engine.remote().fail(other, "gone");
        assert!(matches!(
            engine.force_sync(other).await.unwrap(),
            ForceSyncOutcome::Failed(_)
        ));
        assert_eq!(get(&engine, other).await.sync_state, SyncState::Failed);
        assert_eq!(engine.status().failed_count, 1);

        engine.monitor().set_online(false);
        assert_eq!(engine.force_sync(other).await.unwrap(), ForceSyncOutcome::Offline);
    }
}
