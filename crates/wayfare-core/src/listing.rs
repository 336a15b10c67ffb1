//! Listing: an immutable catalog entry cached locally.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::ListingId;

/// Category of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Category {
    Flight = 1,
    Train = 2,
    Bus = 3,
}

impl Category {
    /// All categories, in code order.
    pub const ALL: [Category; 3] = [Category::Flight, Category::Train, Category::Bus];

    /// Convert to a storage code.
    pub fn to_code(self) -> u8 {
        self as u8
    }

    /// Try to parse from a storage code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Flight),
            2 => Some(Self::Train),
            3 => Some(Self::Bus),
            _ => None,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Train => "train",
            Self::Bus => "bus",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bookable offering.
///
/// Listings are created by a bulk-cache operation and never mutated once
/// cached; re-caching the same id overwrites the previous entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub origin: String,
    pub destination: String,
    /// Departure time (Unix ms).
    pub departure: i64,
    /// Price per traveler, in minor currency units.
    pub price: u64,
    pub category: Category,
    pub seats_available: u32,
}

impl Listing {
    /// Total for a booking of `travelers` seats, or `None` on overflow.
    pub fn total_for(&self, travelers: usize) -> Option<u64> {
        self.price.checked_mul(travelers as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_code_roundtrip() {
        for category in Category::ALL {
            assert_eq!(Category::from_code(category.to_code()), Some(category));
        }
        assert_eq!(Category::from_code(0), None);
    }

    #[test]
    fn test_category_serde_lowercase() {
        let json = serde_json::to_string(&Category::Train).unwrap();
        assert_eq!(json, "\"train\"");
    }

    #[test]
    fn test_total_for() {
        let listing = Listing {
            id: "TKT001".into(),
            origin: "Delhi".into(),
            destination: "Mumbai".into(),
            departure: 0,
            price: 1500,
            category: Category::Flight,
            seats_available: 45,
        };
        assert_eq!(listing.total_for(3), Some(4500));
        assert_eq!(listing.total_for(0), Some(0));
    }
}
