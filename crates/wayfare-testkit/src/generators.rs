//! Proptest generators for property-based testing.

use proptest::prelude::*;

use wayfare_core::{
    Category, Listing, ListingId, Reservation, Sex, SyncState, Traveler, MAX_TRAVELERS,
};

/// Generate a Category.
pub fn category() -> impl Strategy<Value = Category> {
    prop_oneof![
        Just(Category::Flight),
        Just(Category::Train),
        Just(Category::Bus),
    ]
}

/// Generate a SyncState.
pub fn sync_state() -> impl Strategy<Value = SyncState> {
    prop_oneof![
        Just(SyncState::Synced),
        Just(SyncState::Pending),
        Just(SyncState::Failed),
    ]
}

pub fn sex() -> impl Strategy<Value = Sex> {
    prop_oneof![Just(Sex::Male), Just(Sex::Female), Just(Sex::Other)]
}

/// Generate a listing id like `TKT042`.
pub fn listing_id() -> impl Strategy<Value = ListingId> {
    (0u32..1000).prop_map(|n| ListingId::new(format!("TKT{:03}", n)))
}

/// Generate a city from a small fixed set, so queries have hits.
pub fn city() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "Delhi",
        "Mumbai",
        "Bangalore",
        "Chennai",
        "Goa",
        "Pune",
        "Kochi",
    ])
    .prop_map(String::from)
}

/// Generate a reasonable departure timestamp (Unix ms).
pub fn departure() -> impl Strategy<Value = i64> {
    1_600_000_000_000i64..1_900_000_000_000
}

/// Generate a valid traveler.
pub fn traveler() -> impl Strategy<Value = Traveler> {
    ("[A-Z][a-z]{1,11}", 0u8..100, sex()).prop_map(|(name, age, sex)| Traveler::new(name, age, sex))
}

/// Generate a valid, non-empty traveler list.
pub fn travelers() -> impl Strategy<Value = Vec<Traveler>> {
    prop::collection::vec(traveler(), 1..=MAX_TRAVELERS)
}

/// Generate a listing.
pub fn listing() -> impl Strategy<Value = Listing> {
    (
        listing_id(),
        city(),
        city(),
        departure(),
        0u64..100_000,
        category(),
        0u32..500,
    )
        .prop_map(
            |(id, origin, destination, departure, price, category, seats_available)| Listing {
                id,
                origin,
                destination,
                departure,
                price,
                category,
                seats_available,
            },
        )
}

/// A listing and a valid traveler list for booking it.
#[derive(Debug, Clone)]
pub struct BookingParams {
    pub listing: Listing,
    pub travelers: Vec<Traveler>,
}

impl BookingParams {
    /// The reservation this booking would create.
    pub fn reservation(&self) -> Reservation {
        Reservation::new(&self.listing, self.travelers.clone())
            .expect("generated bookings are valid")
    }
}

impl Arbitrary for BookingParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (listing(), travelers())
            .prop_map(|(listing, travelers)| BookingParams { listing, travelers })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfare_core::validate_reservation;

    proptest! {
        #[test]
        fn generated_bookings_validate(params: BookingParams) {
            let reservation = params.reservation();
            prop_assert!(validate_reservation(&reservation, &params.listing).is_ok());
            prop_assert_eq!(
                reservation.total_amount,
                params.listing.price * reservation.travelers.len() as u64
            );
        }

        #[test]
        fn synced_is_terminal(to in sync_state()) {
            prop_assert!(!SyncState::Synced.can_transition_to(to));
        }
    }
}
