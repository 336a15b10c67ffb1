//! Remote-sync abstraction.
//!
//! The sync engine pushes each unsynced reservation to a remote authority
//! through [`RemoteSync`]. Implementations must tolerate repeated pushes of
//! the same record: pushing an already accepted reservation again must not
//! corrupt anything on the remote side.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use wayfare_core::Reservation;

use crate::error::RemoteError;

/// Result type for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;

/// The push capability the sync engine depends on.
///
/// Implementations must be thread-safe (Send + Sync). The engine bounds
/// each call with its own timeout, so an implementation need not.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Hand one reservation to the remote authority.
    async fn push(&self, reservation: &Reservation) -> Result<()>;
}

#[async_trait]
impl<R: RemoteSync + ?Sized> RemoteSync for Arc<R> {
    async fn push(&self, reservation: &Reservation) -> Result<()> {
        (**self).push(reservation).await
    }
}

/// Stand-in remote that accepts most pushes after a fixed delay.
///
/// Placeholder until a real backend exists. Outcomes are random.
#[derive(Debug, Clone)]
pub struct SimulatedRemote {
    success_rate: f64,
    latency: Duration,
}

impl SimulatedRemote {
    pub const DEFAULT_SUCCESS_RATE: f64 = 0.95;
    pub const DEFAULT_LATENCY: Duration = Duration::from_secs(1);

    /// `success_rate` is clamped to `[0, 1]`.
    pub fn new(success_rate: f64, latency: Duration) -> Self {
        let success_rate = if success_rate.is_nan() {
            0.0
        } else {
            success_rate.clamp(0.0, 1.0)
        };
        Self {
            success_rate,
            latency,
        }
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

impl Default for SimulatedRemote {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SUCCESS_RATE, Self::DEFAULT_LATENCY)
    }
}

#[async_trait]
impl RemoteSync for SimulatedRemote {
    async fn push(&self, reservation: &Reservation) -> Result<()> {
        tokio::time::sleep(self.latency).await;

        let accepted = rand::thread_rng().gen_bool(self.success_rate);
        if accepted {
            Ok(())
        } else {
            let id = reservation
                .id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unsaved".into());
            Err(RemoteError::Rejected(format!(
                "simulated remote rejected reservation {}",
                id
            )))
        }
    }
}

/// A scriptable in-memory remote for testing.
///
/// Accepted records are kept keyed by reservation id, so pushing the same
/// record twice is harmless.
pub mod memory {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use tokio::sync::watch;
    use wayfare_core::ReservationId;

    #[derive(Default)]
    struct State {
        accepted: BTreeMap<ReservationId, Reservation>,
        failures: HashMap<ReservationId, RemoteError>,
        fail_all: Option<RemoteError>,
        pushes: HashMap<ReservationId, u32>,
        latency: Duration,
    }

    /// In-memory remote authority.
    pub struct MemoryRemote {
        state: Mutex<State>,
        paused: watch::Sender<bool>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    /// Decrements the in-flight gauge even if the push is dropped.
    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl MemoryRemote {
        pub fn new() -> Self {
            let (paused, _) = watch::channel(false);
            Self {
                state: Mutex::new(State::default()),
                paused,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn state(&self) -> MutexGuard<'_, State> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Reject every push of `id` with `message` until cleared.
        pub fn fail(&self, id: ReservationId, message: impl Into<String>) {
            self.state()
                .failures
                .insert(id, RemoteError::Rejected(message.into()));
        }

        /// Fail every push of `id` with a specific error.
        pub fn fail_with(&self, id: ReservationId, error: RemoteError) {
            self.state().failures.insert(id, error);
        }

        /// Reject every push regardless of id.
        pub fn fail_all(&self, message: impl Into<String>) {
            self.state().fail_all = Some(RemoteError::Rejected(message.into()));
        }

        pub fn clear_failures(&self) {
            let mut state = self.state();
            state.failures.clear();
            state.fail_all = None;
        }

        /// Delay applied to every push before it settles.
        pub fn set_latency(&self, latency: Duration) {
            self.state().latency = latency;
        }

        /// Hold every push until [`resume`](Self::resume).
        pub fn pause(&self) {
            self.paused.send_replace(true);
        }

        pub fn resume(&self) {
            self.paused.send_replace(false);
        }

        /// Pushes received for `id`, accepted or not.
        pub fn push_count(&self, id: ReservationId) -> u32 {
            self.state().pushes.get(&id).copied().unwrap_or(0)
        }

        pub fn total_pushes(&self) -> u32 {
            self.state().pushes.values().sum()
        }

        pub fn accepted(&self, id: ReservationId) -> Option<Reservation> {
            self.state().accepted.get(&id).cloned()
        }

        pub fn accepted_count(&self) -> usize {
            self.state().accepted.len()
        }

        /// Pushes currently between arrival and settlement.
        pub fn in_flight(&self) -> usize {
            self.in_flight.load(Ordering::SeqCst)
        }

        /// Highest number of pushes ever in flight at once.
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    impl Default for MemoryRemote {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl RemoteSync for MemoryRemote {
        async fn push(&self, reservation: &Reservation) -> Result<()> {
            let id = reservation
                .id
                .ok_or_else(|| RemoteError::Rejected("reservation has no id".into()))?;

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let _in_flight = InFlight(&self.in_flight);

            *self.state().pushes.entry(id).or_insert(0) += 1;

            let mut paused = self.paused.subscribe();
            let resumed = paused.wait_for(|p| !*p).await.is_ok();
            if !resumed {
                return Err(RemoteError::Unreachable("remote shut down".into()));
            }

            let latency = self.state().latency;
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let mut state = self.state();
            if let Some(err) = state.fail_all.clone() {
                return Err(err);
            }
            if let Some(err) = state.failures.get(&id).cloned() {
                return Err(err);
            }
            state.accepted.insert(id, reservation.clone());
            Ok(())
        }
    }
}
