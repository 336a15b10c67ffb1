//! # Wayfare Sync
//!
//! Offline-first reconciliation for Wayfare: a connectivity monitor, the
//! sync engine that pushes unsynced reservations to the remote authority,
//! and the automatic triggers that drive it.
//!
//! ## Overview
//!
//! Bookings are always written to the local store first. While offline
//! they are left `pending`; the [`SyncEngine`] later pushes every pending
//! reservation through a [`RemoteSync`] implementation and writes each
//! result back to the store.
//!
//! ## Key Properties
//!
//! - **One pass at a time**: the busy check, the online check and claiming
//!   the flag happen in a single atomic step
//! - **Isolated pushes**: pushes run concurrently; one failure never
//!   touches another record
//! - **Bounded**: every push has a timeout, and a timeout is a failure
//! - **Store first**: `is_syncing` drops only after every record update of
//!   the pass has been written
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wayfare_store::SqliteStore;
//! use wayfare_sync::{AutoSync, ConnectivityMonitor, SimulatedRemote, SyncConfig, SyncEngine};
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("wayfare.db").unwrap());
//!     let monitor = ConnectivityMonitor::new(true);
//!     let engine = Arc::new(SyncEngine::new(
//!         store,
//!         Arc::new(SimulatedRemote::default()),
//!         monitor.clone(),
//!         SyncConfig::default(),
//!     ));
//!
//!     // Sync on reconnect and every five minutes while online
//!     let auto = AutoSync::spawn(Arc::clone(&engine));
//!
//!     // Or on demand
//!     let outcome = engine.sync_now().await;
//!     println!("success: {}", outcome.is_success());
//!
//!     auto.shutdown().await;
//! }
//! ```
//!
//! ## Pass Flow
//!
//! ```text
//!  trigger ──► guard (busy? offline?) ──► NotStarted
//!                 │
//!                 ▼
//!          read pending ──(fault)──► Aborted
//!                 │
//!                 ▼
//!      push each (concurrent, timed) ──► write synced/failed per record
//!                 │
//!                 ▼
//!       final status, is_syncing = false ──► Completed(report)
//! ```

pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod remote;
pub mod scheduler;
pub mod status;

pub use config::{RetryPolicy, SyncConfig};
pub use connectivity::{ConnectivityMonitor, ConnectivitySubscription, Transition};
pub use engine::SyncEngine;
pub use error::{RemoteError, Result, SyncError};
pub use remote::{memory::MemoryRemote, RemoteSync, SimulatedRemote};
pub use scheduler::AutoSync;
pub use status::{ForceSyncOutcome, PassReport, SkipReason, SyncOutcome, SyncStatus};
