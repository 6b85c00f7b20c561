pub mod cache;
pub mod error;
pub mod idempotency;
pub mod models;
pub mod repository;

pub use cache::{AdvisoryLock, CacheError, CacheResult, FastCache, LockAttempt, LockToken};
pub use error::{messages, ReservationError, ReservationResult, StoreError, StoreResult};
pub use idempotency::{IdempotencyRecord, InsertOutcome, StoredResponse};
pub use models::{
    NewReservation, NewSeat, Page, Reservation, ReservationQuery, ReservationStatus, Seat,
    SeatCounts, SeatQuery, SeatStatus,
};
pub use repository::{CreateReservation, IdempotencyStore, StateStore, StoreTransaction};
