//! Sample catalog for first launch.

use wayfare_core::time::DAY_MILLIS;
use wayfare_core::{Category, Listing, ListingId};

/// The built-in sample listings, departing one to three days after `now`.
pub fn sample_listings(now: i64) -> Vec<Listing> {
    let listing = |id: &str,
                   origin: &str,
                   destination: &str,
                   days_ahead: i64,
                   price: u64,
                   category: Category,
                   seats_available: u32| Listing {
        id: ListingId::new(id),
        origin: origin.into(),
        destination: destination.into(),
        departure: now + days_ahead * DAY_MILLIS,
        price,
        category,
        seats_available,
    };

    vec![
        listing("TKT001", "Delhi", "Mumbai", 1, 1500, Category::Flight, 45),
        listing("TKT002", "Delhi", "Bangalore", 2, 800, Category::Train, 120),
        listing("TKT003", "Mumbai", "Goa", 3, 350, Category::Bus, 30),
        listing("TKT004", "Bangalore", "Chennai", 1, 600, Category::Train, 80),
        listing("TKT005", "Delhi", "Jaipur", 2, 250, Category::Bus, 25),
        listing("TKT006", "Mumbai", "Pune", 1, 200, Category::Bus, 35),
        listing("TKT007", "Chennai", "Kochi", 3, 950, Category::Train, 90),
        listing("TKT008", "Hyderabad", "Bangalore", 1, 1200, Category::Flight, 55),
    ]
}
