//! # Wayfare Testkit
//!
//! Testing utilities for Wayfare.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A memory store and scriptable remote wired to an engine
//! - **Generators**: Proptest strategies for listings, travelers and bookings
//! - **Fault injection**: A store wrapper that fails chosen operations
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use wayfare_testkit::generators::BookingParams;
//!
//! proptest! {
//!     #[test]
//!     fn total_is_derived(params: BookingParams) {
//!         let r = params.reservation();
//!         prop_assert_eq!(r.total_amount, params.listing.price * r.travelers.len() as u64);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use wayfare_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let engine = fixture.engine(true);
//! assert!(engine.monitor().is_online());
//! ```

pub mod faulty;
pub mod fixtures;
pub mod generators;

pub use faulty::{Fault, FaultyStore};
pub use fixtures::{listing, travelers, TestFixture};
pub use generators::BookingParams;
