//! Automatic sync triggers.
//!
//! Starts a pass when connectivity comes back and on a fixed period while
//! online. A zero period leaves only the connectivity trigger. Passes are
//! spawned rather than awaited in the loop, so a trigger that lands during a
//! running pass hits the engine's guard and is dropped.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use wayfare_store::Store;

use crate::engine::SyncEngine;
use crate::remote::RemoteSync;

/// Handle to a running auto-sync task. Dropping it stops the task.
#[derive(Debug)]
pub struct AutoSync {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl AutoSync {
    /// Start watching connectivity and the periodic timer for `engine`.
    pub fn spawn<S, R>(engine: Arc<SyncEngine<S, R>>) -> Self
    where
        S: Store + 'static,
        R: RemoteSync + 'static,
    {
        let mut connectivity = engine.monitor().subscribe();
        let period = engine.config().auto_sync_interval;
        let (shutdown, mut stop) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut ticker = if period.is_zero() {
                tracing::debug!("periodic sync disabled");
                None
            } else {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Some(ticker)
            };

            loop {
                tokio::select! {
                    _ = &mut stop => break,

                    transition = connectivity.recv() => {
                        let Some(first) = transition else { break };
                        let latest = connectivity.latest(first);
                        if latest.online {
                            tracing::info!(seq = latest.seq, "back online, starting sync");
                            Self::trigger(&engine);
                        }
                    }

                    _ = tick(&mut ticker) => {
                        if engine.monitor().is_online() {
                            tracing::debug!("periodic sync triggered");
                            Self::trigger(&engine);
                        }
                    }
                }
            }

            tracing::debug!("auto sync stopped");
        });

        Self {
            shutdown: Some(shutdown),
            handle,
        }
    }

    fn trigger<S, R>(engine: &Arc<SyncEngine<S, R>>)
    where
        S: Store + 'static,
        R: RemoteSync + 'static,
    {
        let engine = Arc::clone(engine);
        tokio::spawn(async move {
            engine.sync_now().await;
        });
    }

    /// Stop the task and wait for it to exit. A pass already running is
    /// left to finish on its own.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.handle).await;
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Wait for the next periodic tick, or forever when there is no timer.
async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
