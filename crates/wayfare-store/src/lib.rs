//! # Wayfare Store
//!
//! Local persistence for Wayfare. Provides a trait-based interface for
//! reservation and listing storage with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store is the single source of truth for the client: every booking
//! lands here first, whether or not the device is online. The sync engine
//! reads unsynced records from it and writes sync results back. The
//! primary implementation is [`SqliteStore`], with [`MemoryStore`] for tests.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`StoreExt`] - Booking-flow helpers built on top of [`Store`]
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`StoreStats`] - Aggregate counts, recomputed per call
//! - [`ListingQuery`] - Secondary lookups over cached listings
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wayfare_store::{SqliteStore, Store, StoreExt};
//! use wayfare_core::{now_millis, SyncState};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("wayfare.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     // Everything still waiting for the remote authority
//!     let pending = store
//!         .list_reservations_by_sync_state(SyncState::Pending)
//!         .await
//!         .unwrap();
//!     # let _ = (pending, now_millis());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Durable before return**: SQLite runs in WAL mode with `synchronous=FULL`
//! - **Ids are never reused**: `AUTOINCREMENT` survives deletes and `clear_all`
//! - **Travelers as CBOR**: the traveler list is one opaque blob per record
//! - **Faults are errors**: a failed read never looks like an empty table

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{ListingQuery, Store, StoreExt, StoreStats};
