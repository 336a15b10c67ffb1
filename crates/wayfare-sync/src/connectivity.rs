//! Connectivity monitor.
//!
//! Holds the current online/offline value and fans every change out to
//! subscribers. Each subscriber owns an unbounded channel, so transitions
//! arrive in the order they happened and a slow consumer never causes
//! another to miss one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use wayfare_core::now_millis;

/// One change of the online/offline value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// The value after the change.
    pub online: bool,
    /// Monotonic sequence number, starting at 1 for the first change.
    pub seq: u64,
    /// When the change was observed (Unix ms).
    pub at: i64,
}

struct MonitorInner {
    online: bool,
    seq: u64,
    subscribers: Vec<mpsc::UnboundedSender<Transition>>,
}

/// Current connectivity plus transition notifications.
///
/// Cheap to clone; all clones share one value.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Mutex<MonitorInner>>,
}

impl ConnectivityMonitor {
    /// Create a monitor seeded with the host's current state.
    pub fn new(online: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MonitorInner {
                online,
                seq: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    // Nothing panics while holding the lock, so a poisoned value is still sound.
    fn lock(&self) -> MutexGuard<'_, MonitorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current value.
    pub fn is_online(&self) -> bool {
        self.lock().online
    }

    /// Record a signal from the host environment.
    ///
    /// Returns the transition if the value changed; repeating the current
    /// value is not a transition and notifies nobody.
    pub fn set_online(&self, online: bool) -> Option<Transition> {
        let mut inner = self.lock();
        if inner.online == online {
            return None;
        }

        inner.online = online;
        inner.seq += 1;
        let transition = Transition {
            online,
            seq: inner.seq,
            at: now_millis(),
        };

        // Dispatch under the lock so concurrent changes reach every
        // subscriber in the same order.
        inner.subscribers.retain(|tx| tx.send(transition).is_ok());

        tracing::info!(online, seq = transition.seq, "connectivity changed");
        Some(transition)
    }

    /// Subscribe to every transition after this call.
    pub fn subscribe(&self) -> ConnectivitySubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        ConnectivitySubscription { rx }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|tx| !tx.is_closed());
        inner.subscribers.len()
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ConnectivityMonitor")
            .field("online", &inner.online)
            .field("seq", &inner.seq)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Ordered stream of transitions for one consumer.
#[derive(Debug)]
pub struct ConnectivitySubscription {
    rx: mpsc::UnboundedReceiver<Transition>,
}

impl ConnectivitySubscription {
    /// Wait for the next transition. `None` once the monitor is gone.
    pub async fn recv(&mut self) -> Option<Transition> {
        self.rx.recv().await
    }

    /// Take the next transition if one is already queued.
    pub fn try_recv(&mut self) -> Option<Transition> {
        self.rx.try_recv().ok()
    }

    /// Drain everything queued and return the most recent transition.
    ///
    /// A later transition supersedes earlier ones still waiting.
    pub fn latest(&mut self, first: Transition) -> Transition {
        let mut latest = first;
        while let Some(next) = self.try_recv() {
            latest = next;
        }
        latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_online_only_reports_changes() {
        let monitor = ConnectivityMonitor::new(false);
        assert!(!monitor.is_online());

        assert!(monitor.set_online(false).is_none());

        let t = monitor.set_online(true).unwrap();
        assert!(t.online);
        assert_eq!(t.seq, 1);
        assert!(monitor.is_online());

        assert!(monitor.set_online(true).is_none());
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_every_transition_in_order() {
        let monitor = ConnectivityMonitor::new(false);
        let mut a = monitor.subscribe();
        let mut b = monitor.subscribe();

        monitor.set_online(true);
        monitor.set_online(false);
        monitor.set_online(true);

        for sub in [&mut a, &mut b] {
            let seen: Vec<_> = [
                sub.recv().await.unwrap(),
                sub.recv().await.unwrap(),
                sub.recv().await.unwrap(),
            ]
            .iter()
            .map(|t| (t.seq, t.online))
            .collect();
            assert_eq!(seen, vec![(1, true), (2, false), (3, true)]);
        }
    }

    #[tokio::test]
    async fn test_latest_collapses_queue() {
        let monitor = ConnectivityMonitor::new(false);
        let mut sub = monitor.subscribe();

        monitor.set_online(true);
        monitor.set_online(false);

        let first = sub.recv().await.unwrap();
        let latest = sub.latest(first);
        assert!(!latest.online);
        assert_eq!(latest.seq, 2);
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let monitor = ConnectivityMonitor::new(true);
        let keep = monitor.subscribe();
        drop(monitor.subscribe());

        monitor.set_online(false);
        assert_eq!(monitor.subscriber_count(), 1);
        drop(keep);
        assert_eq!(monitor.subscriber_count(), 0);
    }
}
