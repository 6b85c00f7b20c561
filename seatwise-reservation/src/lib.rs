pub mod coordinator;
pub mod idempotency;
pub mod inventory;
pub mod lock;
pub mod response;
pub mod sweeper;

pub use coordinator::{
    CancelRequest, ConfirmRequest, ReservationCoordinator, ReservationRules, ReserveRequest,
};
pub use idempotency::IdempotencyCache;
pub use inventory::SeatInventory;
pub use lock::{CacheLock, LockCoordinator, NoopLock};
pub use response::{Reply, ReservationView, SeatView};
pub use sweeper::{ExpirationSweeper, SweepReport, SweepStats};
