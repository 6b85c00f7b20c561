use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::idempotency::{IdempotencyRecord, InsertOutcome};
use crate::models::{
    NewReservation, NewSeat, Page, Reservation, ReservationQuery, Seat, SeatCounts, SeatQuery,
};

#[derive(Debug, Clone, PartialEq)]
pub enum CreateReservation {
    Created(Reservation),
    /// The seat already has a PENDING reservation (or the idempotency key is taken).
    DuplicateActive,
}

/// Durable store of seats and reservations.
///
/// Reads outside a transaction see committed state only. All status changes go through
/// [`StoreTransaction`].
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    async fn get_seat(&self, id: Uuid) -> StoreResult<Option<Seat>>;

    async fn find_seat_by_number(&self, seat_number: &str) -> StoreResult<Option<Seat>>;

    async fn list_seats(&self, query: &SeatQuery) -> StoreResult<Page<Seat>>;

    async fn count_seats_by_status(&self) -> StoreResult<SeatCounts>;

    /// Fails with `StoreError::Constraint` when the seat number is taken.
    async fn create_seat(&self, seat: NewSeat) -> StoreResult<Seat>;

    async fn get_reservation(&self, id: Uuid) -> StoreResult<Option<Reservation>>;

    async fn list_reservations(&self, query: &ReservationQuery) -> StoreResult<Page<Reservation>>;

    /// PENDING reservations whose hold window ended before `now`.
    async fn count_overdue(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// One multi-record transaction. Every transition is a compare-and-swap: `None` means
/// the precondition did not hold and nothing was written.
///
/// Dropping the transaction without `commit` rolls it back.
#[async_trait]
pub trait StoreTransaction: Send {
    /// AVAILABLE -> RESERVED, stamps the owning reservation and hold expiry.
    async fn reserve_seat(
        &mut self,
        seat_id: Uuid,
        reservation_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<Seat>>;

    /// RESERVED -> CONFIRMED, clears the expiry.
    async fn confirm_seat(&mut self, seat_id: Uuid) -> StoreResult<Option<Seat>>;

    /// RESERVED -> AVAILABLE, clears expiry and owner.
    async fn release_seat(&mut self, seat_id: Uuid) -> StoreResult<Option<Seat>>;

    /// CONFIRMED -> AVAILABLE. Administrative only.
    async fn reset_seat(&mut self, seat_id: Uuid) -> StoreResult<Option<Seat>>;

    async fn create_reservation(&mut self, reservation: NewReservation) -> StoreResult<CreateReservation>;

    /// Reads a reservation and holds it for the rest of the transaction.
    async fn find_reservation(&mut self, id: Uuid) -> StoreResult<Option<Reservation>>;

    /// PENDING -> CONFIRMED, only for the owner and only before `expires_at`.
    async fn confirm_reservation(
        &mut self,
        id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Reservation>>;

    /// PENDING -> CANCELLED, only for the owner.
    async fn cancel_reservation(
        &mut self,
        id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Reservation>>;

    /// Every PENDING reservation with `expires_at < cutoff` -> EXPIRED. Returns them.
    async fn expire_overdue(&mut self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Reservation>>;

    /// RESERVED -> AVAILABLE for seats currently held by one of `reservation_ids`.
    /// Returns the released seat ids.
    async fn release_seats_held_by(&mut self, reservation_ids: &[Uuid]) -> StoreResult<Vec<Uuid>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Durable tier of the idempotency cache.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn find(&self, key: &str) -> StoreResult<Option<IdempotencyRecord>>;

    /// First writer wins. An expired record under the same key is replaced.
    async fn insert(&self, record: IdempotencyRecord) -> StoreResult<InsertOutcome>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Removes records that expired before `now`; returns how many.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}
