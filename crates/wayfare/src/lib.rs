//! # Wayfare
//!
//! An offline-first booking client. Reservations are always written to a
//! local store first and reconciled with a remote authority whenever the
//! device is online.
//!
//! ## Overview
//!
//! Wayfare provides:
//!
//! - **Local store**: Durable reservations and a cached listing catalog
//! - **Connectivity**: An online/offline value with ordered transition events
//! - **Sync**: One-pass-at-a-time reconciliation of unsynced reservations
//! - **Auto sync**: Passes on reconnect and on a fixed period while online
//!
//! ## Key Concepts
//!
//! - **Lifecycle status**: pending, confirmed or cancelled. What happened to the booking.
//! - **Sync state**: synced, pending or failed. Whether the remote authority has it.
//! - **Pass**: One run of the engine over every pending reservation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wayfare::{Client, ClientConfig};
//! use wayfare::core::{Sex, Traveler};
//! use wayfare::store::SqliteStore;
//! use wayfare::sync::SimulatedRemote;
//!
//! async fn example() {
//!     let store = SqliteStore::open("wayfare.db").unwrap();
//!     let client = Client::new(store, SimulatedRemote::default(), ClientConfig::default());
//!
//!     client.seed_sample_listings().await.unwrap();
//!
//!     // Book while offline: the reservation is kept as pending
//!     client.set_online(false);
//!     let reservation = client
//!         .book(&"TKT001".into(), vec![Traveler::new("Asha Rao", 31, Sex::Female)])
//!         .await
//!         .unwrap();
//!
//!     // Back online: push it
//!     client.set_online(true);
//!     let outcome = client.sync_now().await;
//!     println!("{:?} -> {:?}", reservation.id, outcome);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `wayfare::core` - Data model (Listing, Reservation, SyncState, etc.)
//! - `wayfare::store` - Storage abstraction and SQLite
//! - `wayfare::sync` - Connectivity monitor and sync engine

pub mod client;
pub mod error;
pub mod seed;

// Re-export component crates
pub use wayfare_core as core;
pub use wayfare_store as store;
pub use wayfare_sync as sync;

// Re-export main types for convenience
pub use client::{Client, ClientConfig, ReservationUpdate};
pub use error::{ClientError, Result};
pub use seed::sample_listings;

// Re-export commonly used types
pub use wayfare_core::{
    Category, LifecycleStatus, Listing, ListingId, Reservation, ReservationId, Sex, SyncState,
    Traveler,
};
pub use wayfare_store::{ListingQuery, StoreStats};
pub use wayfare_sync::{ForceSyncOutcome, PassReport, SkipReason, SyncOutcome, SyncStatus};
