//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for Wayfare. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use wayfare_core::{
    Category, CoreError, LifecycleStatus, Listing, ListingId, Reservation, ReservationId,
    ReservationPatch, SyncState, Traveler,
};

use crate::error::{check_sync_transition, Result, StoreError};
use crate::migration;
use crate::traits::{ListingQuery, Store, StoreStats};

const RESERVATION_COLUMNS: &str =
    "id, listing_id, travelers, total_amount, status, created_at, sync_state, sync_attempts";

const LISTING_COLUMNS: &str =
    "id, origin, destination, departure, price, category, seats_available";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::configure(&conn)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

// Helper to convert a row to Reservation
fn row_to_reservation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reservation> {
    let travelers_cbor: Vec<u8> = row.get("travelers")?;
    let travelers: Vec<Traveler> =
        ciborium::from_reader(&travelers_cbor[..]).map_err(|e| conversion_error(2, Type::Blob, e))?;

    let status_code: u8 = row.get("status")?;
    let status = LifecycleStatus::from_code(status_code).ok_or_else(|| {
        conversion_error(
            4,
            Type::Integer,
            CoreError::UnknownCode {
                kind: "lifecycle status",
                code: status_code as i64,
            },
        )
    })?;

    let state_code: u8 = row.get("sync_state")?;
    let sync_state = SyncState::from_code(state_code).ok_or_else(|| {
        conversion_error(
            6,
            Type::Integer,
            CoreError::UnknownCode {
                kind: "sync state",
                code: state_code as i64,
            },
        )
    })?;

    Ok(Reservation {
        id: Some(ReservationId::new(row.get("id")?)),
        listing_id: ListingId::new(row.get::<_, String>("listing_id")?),
        travelers,
        total_amount: row.get::<_, i64>("total_amount")? as u64,
        status,
        created_at: row.get("created_at")?,
        sync_state,
        sync_attempts: row.get("sync_attempts")?,
    })
}

// Helper to convert a row to Listing
fn row_to_listing(row: &rusqlite::Row<'_>) -> rusqlite::Result<Listing> {
    let category_code: u8 = row.get("category")?;
    let category = Category::from_code(category_code).ok_or_else(|| {
        conversion_error(
            5,
            Type::Integer,
            CoreError::UnknownCode {
                kind: "category",
                code: category_code as i64,
            },
        )
    })?;

    Ok(Listing {
        id: ListingId::new(row.get::<_, String>("id")?),
        origin: row.get("origin")?,
        destination: row.get("destination")?,
        departure: row.get("departure")?,
        price: row.get::<_, i64>("price")? as u64,
        category,
        seats_available: row.get("seats_available")?,
    })
}

// Helper to encode travelers to CBOR
fn encode_travelers(travelers: &[Traveler]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(travelers, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn to_sql_amount(amount: u64) -> Result<i64> {
    i64::try_from(amount)
        .map_err(|_| StoreError::InvalidData(format!("amount {} exceeds storage range", amount)))
}

fn select_reservation(conn: &Connection, id: ReservationId) -> Result<Option<Reservation>> {
    conn.query_row(
        &format!("SELECT {} FROM reservations WHERE id = ?1", RESERVATION_COLUMNS),
        params![id.get()],
        row_to_reservation,
    )
    .optional()
    .map_err(StoreError::from)
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_reservation(&self, reservation: &Reservation) -> Result<ReservationId> {
        let reservation = reservation.clone();

        self.run(move |conn| {
            let travelers = encode_travelers(&reservation.travelers)?;
            let total = to_sql_amount(reservation.total_amount)?;

            if let Some(id) = reservation.id {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM reservations WHERE id = ?1)",
                    params![id.get()],
                    |row| row.get(0),
                )?;
                if exists {
                    return Err(StoreError::AlreadyExists(format!("reservation {}", id)));
                }
            }

            conn.execute(
                "INSERT INTO reservations (
                    id, listing_id, travelers, total_amount, status,
                    created_at, sync_state, sync_attempts
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    reservation.id.map(|id| id.get()),
                    reservation.listing_id.as_str(),
                    travelers,
                    total,
                    reservation.status.to_code(),
                    reservation.created_at,
                    reservation.sync_state.to_code(),
                    reservation.sync_attempts,
                ],
            )?;

            Ok(ReservationId::new(conn.last_insert_rowid()))
        })
        .await
    }

    async fn get_reservation(&self, id: &ReservationId) -> Result<Option<Reservation>> {
        let id = *id;
        self.run(move |conn| select_reservation(conn, id)).await
    }

    async fn list_reservations(&self) -> Result<Vec<Reservation>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM reservations ORDER BY id",
                RESERVATION_COLUMNS
            ))?;
            let reservations = stmt
                .query_map([], row_to_reservation)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(reservations)
        })
        .await
    }

    async fn list_reservations_by_sync_state(&self, state: SyncState) -> Result<Vec<Reservation>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM reservations WHERE sync_state = ?1 ORDER BY id",
                RESERVATION_COLUMNS
            ))?;
            let reservations = stmt
                .query_map(params![state.to_code()], row_to_reservation)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(reservations)
        })
        .await
    }

    async fn update_sync_state(&self, id: &ReservationId, state: SyncState) -> Result<()> {
        let id = *id;

        self.run(move |conn| {
            let tx = conn.transaction()?;

            let current = select_reservation(&tx, id)?
                .ok_or_else(|| StoreError::NotFound(format!("reservation {}", id)))?
                .sync_state;
            check_sync_transition(current, state)?;

            tx.execute(
                "UPDATE reservations SET sync_state = ?2 WHERE id = ?1",
                params![id.get(), state.to_code()],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn update_reservation(
        &self,
        id: &ReservationId,
        patch: &ReservationPatch,
    ) -> Result<Reservation> {
        let id = *id;
        let patch = patch.clone();

        self.run(move |conn| {
            let tx = conn.transaction()?;

            let mut record = select_reservation(&tx, id)?
                .ok_or_else(|| StoreError::NotFound(format!("reservation {}", id)))?;
            if let Some(to) = patch.sync_state {
                check_sync_transition(record.sync_state, to)?;
            }
            patch.apply(&mut record);

            tx.execute(
                "UPDATE reservations SET
                    travelers = ?2,
                    total_amount = ?3,
                    status = ?4,
                    sync_state = ?5,
                    sync_attempts = ?6
                 WHERE id = ?1",
                params![
                    id.get(),
                    encode_travelers(&record.travelers)?,
                    to_sql_amount(record.total_amount)?,
                    record.status.to_code(),
                    record.sync_state.to_code(),
                    record.sync_attempts,
                ],
            )?;

            tx.commit()?;
            Ok(record)
        })
        .await
    }

    async fn delete_reservation(&self, id: &ReservationId) -> Result<bool> {
        let id = *id;

        self.run(move |conn| {
            let changed = conn.execute("DELETE FROM reservations WHERE id = ?1", params![id.get()])?;
            Ok(changed > 0)
        })
        .await
    }

    async fn cache_listings(&self, listings: &[Listing]) -> Result<usize> {
        let listings = listings.to_vec();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO listings (
                        id, origin, destination, departure, price, category, seats_available
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(id) DO UPDATE SET
                        origin = excluded.origin,
                        destination = excluded.destination,
                        departure = excluded.departure,
                        price = excluded.price,
                        category = excluded.category,
                        seats_available = excluded.seats_available",
                )?;

                for listing in &listings {
                    stmt.execute(params![
                        listing.id.as_str(),
                        &listing.origin,
                        &listing.destination,
                        listing.departure,
                        to_sql_amount(listing.price)?,
                        listing.category.to_code(),
                        listing.seats_available,
                    ])?;
                }
            }
            tx.commit()?;

            Ok(listings.len())
        })
        .await
    }

    async fn list_listings(&self) -> Result<Vec<Listing>> {
        self.run(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {} FROM listings ORDER BY id", LISTING_COLUMNS))?;
            let listings = stmt
                .query_map([], row_to_listing)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(listings)
        })
        .await
    }

    async fn get_listing(&self, id: &ListingId) -> Result<Option<Listing>> {
        let id = id.clone();

        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM listings WHERE id = ?1", LISTING_COLUMNS),
                params![id.as_str()],
                row_to_listing,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn search_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        let query = query.clone();

        self.run(move |conn| {
            let mut clauses: Vec<&str> = Vec::new();
            let mut values: Vec<Value> = Vec::new();

            if let Some(origin) = query.origin {
                clauses.push("origin = ?");
                values.push(Value::Text(origin));
            }
            if let Some(destination) = query.destination {
                clauses.push("destination = ?");
                values.push(Value::Text(destination));
            }
            if let Some(from) = query.departs_from {
                clauses.push("departure >= ?");
                values.push(Value::Integer(from));
            }
            if let Some(until) = query.departs_until {
                clauses.push("departure < ?");
                values.push(Value::Integer(until));
            }
            if let Some(category) = query.category {
                clauses.push("category = ?");
                values.push(Value::Integer(category.to_code() as i64));
            }

            let filter = if clauses.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", clauses.join(" AND "))
            };

            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM listings {} ORDER BY departure, id",
                LISTING_COLUMNS, filter
            ))?;
            let listings = stmt
                .query_map(params_from_iter(values), row_to_listing)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(listings)
        })
        .await
    }

    async fn clear_all(&self) -> Result<()> {
        self.run(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM reservations", [])?;
            tx.execute("DELETE FROM listings", [])?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn stats(&self) -> Result<StoreStats> {
        self.run(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM reservations),
                    (SELECT COUNT(*) FROM listings),
                    (SELECT COUNT(*) FROM reservations WHERE sync_state = ?1),
                    (SELECT COUNT(*) FROM reservations WHERE sync_state = ?2)",
                params![SyncState::Pending.to_code(), SyncState::Failed.to_code()],
                |row| {
                    Ok(StoreStats {
                        reservation_count: row.get::<_, i64>(0)? as u64,
                        listing_count: row.get::<_, i64>(1)? as u64,
                        pending_sync_count: row.get::<_, i64>(2)? as u64,
                        failed_sync_count: row.get::<_, i64>(3)? as u64,
                    })
                },
            )?;
            Ok(stats)
        })
        .await
    }
}
