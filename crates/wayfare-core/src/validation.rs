//! Structural validation for reservations.
//!
//! This checks the invariants the sync engine and store rely on: a
//! reservation has at least one traveler and its total is derived from the
//! listing it references. Presentation-level input rules are not checked here.

use crate::error::ValidationError;
use crate::listing::Listing;
use crate::reservation::{Reservation, Traveler};

/// Maximum travelers on a single reservation.
pub const MAX_TRAVELERS: usize = 5;

/// Validate a traveler list.
pub fn validate_travelers(travelers: &[Traveler]) -> Result<(), ValidationError> {
    if travelers.is_empty() {
        return Err(ValidationError::NoTravelers);
    }
    if travelers.len() > MAX_TRAVELERS {
        return Err(ValidationError::TooManyTravelers {
            count: travelers.len(),
            max: MAX_TRAVELERS,
        });
    }
    if let Some(index) = travelers.iter().position(|t| t.name.trim().is_empty()) {
        return Err(ValidationError::EmptyTravelerName { index });
    }
    Ok(())
}

/// Validate a reservation against the listing it references.
pub fn validate_reservation(
    reservation: &Reservation,
    listing: &Listing,
) -> Result<(), ValidationError> {
    if reservation.listing_id != listing.id {
        return Err(ValidationError::ListingMismatch {
            expected: listing.id.clone(),
            got: reservation.listing_id.clone(),
        });
    }

    validate_travelers(&reservation.travelers)?;

    let expected = listing
        .total_for(reservation.travelers.len())
        .ok_or(ValidationError::TotalOverflow {
            price: listing.price,
            travelers: reservation.travelers.len(),
        })?;
    if reservation.total_amount != expected {
        return Err(ValidationError::TotalMismatch {
            expected,
            got: reservation.total_amount,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::Category;
    use crate::reservation::Sex;

    fn listing(price: u64) -> Listing {
        Listing {
            id: "TKT003".into(),
            origin: "Mumbai".into(),
            destination: "Goa".into(),
            departure: 0,
            price,
            category: Category::Bus,
            seats_available: 30,
        }
    }

    fn travelers(n: usize) -> Vec<Traveler> {
        (0..n)
            .map(|i| Traveler::new(format!("Traveler {}", i), 30, Sex::Other))
            .collect()
    }

    #[test]
    fn test_valid_reservation() {
        let l = listing(350);
        let r = Reservation::new(&l, travelers(2)).unwrap();
        assert!(validate_reservation(&r, &l).is_ok());
    }

    #[test]
    fn test_too_many_travelers() {
        let err = validate_travelers(&travelers(MAX_TRAVELERS + 1)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooManyTravelers {
                count: MAX_TRAVELERS + 1,
                max: MAX_TRAVELERS
            }
        );
    }

    #[test]
    fn test_blank_name() {
        let mut t = travelers(2);
        t[1].name = "   ".into();
        assert_eq!(
            validate_travelers(&t).unwrap_err(),
            ValidationError::EmptyTravelerName { index: 1 }
        );
    }

    #[test]
    fn test_total_mismatch() {
        let l = listing(350);
        let mut r = Reservation::new(&l, travelers(2)).unwrap();
        r.total_amount = 1;
        assert_eq!(
            validate_reservation(&r, &l).unwrap_err(),
            ValidationError::TotalMismatch {
                expected: 700,
                got: 1
            }
        );
    }

    #[test]
    fn test_listing_mismatch() {
        let l = listing(350);
        let r = Reservation::new(&l, travelers(1)).unwrap();
        let mut other = listing(350);
        other.id = "TKT999".into();
        assert!(matches!(
            validate_reservation(&r, &other),
            Err(ValidationError::ListingMismatch { .. })
        ));
    }

    #[test]
    fn test_overflow() {
        let l = listing(u64::MAX);
        assert!(matches!(
            Reservation::new(&l, travelers(2)),
            Err(ValidationError::TotalOverflow { .. })
        ));
    }
}
