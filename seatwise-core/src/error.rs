/// User-facing messages shared by every transport.
pub mod messages {
    pub const SEAT_NOT_FOUND: &str = "Seat not found";
    pub const SEAT_NOT_AVAILABLE: &str = "Seat is not available for reservation";
    pub const SEAT_NOT_HELD: &str = "Seat is no longer held by this reservation";
    pub const SEAT_NOT_CONFIRMED: &str = "Only confirmed seats can be reset";
    pub const SEAT_NUMBER_TAKEN: &str = "Seat number already exists";

    pub const RESERVATION_NOT_FOUND: &str = "Reservation not found";
    pub const RESERVATION_EXPIRED: &str = "Reservation has expired";
    pub const RESERVATION_ALREADY_CONFIRMED: &str = "Reservation is already confirmed";
    pub const RESERVATION_ALREADY_CANCELLED: &str = "Reservation is already cancelled";
    pub const RESERVATION_USER_MISMATCH: &str = "Reservation does not belong to this user";

    pub const IDEMPOTENCY_KEY_REQUIRED: &str = "Idempotency-Key header is required";
    pub const IDEMPOTENCY_KEY_TOO_LONG: &str = "Idempotency-Key must not exceed 255 characters";
    pub const INVALID_USER_ID: &str = "Invalid user ID";
    pub const HOLD_OUT_OF_RANGE: &str = "Configured hold duration is out of range";

    pub const REQUEST_TIMED_OUT: &str = "Request timed out, outcome unknown; retry with the same Idempotency-Key";
}

/// Failures of the durable State Store. Every variant except `Constraint` is transient.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("State store unavailable: {0}")]
    Unavailable(String),
    #[error("State store timed out")]
    Timeout,
    #[error("Database error: {0}")]
    Database(String),
    #[error("Constraint violated: {0}")]
    Constraint(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Timeout | StoreError::Database(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome taxonomy of every mutating reservation operation.
///
/// `Conflict`, `NotFound`, `Gone` and `Forbidden` are expected results under load, not
/// faults. `Transient` and `Timeout` are retryable; after a `Timeout` the transaction may
/// or may not have committed.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Gone(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Transient(#[from] StoreError),
    #[error("Operation timed out")]
    Timeout,
}

impl ReservationError {
    pub fn conflict(msg: &str) -> Self {
        ReservationError::Conflict(msg.to_string())
    }

    pub fn not_found(msg: &str) -> Self {
        ReservationError::NotFound(msg.to_string())
    }

    pub fn gone(msg: &str) -> Self {
        ReservationError::Gone(msg.to_string())
    }

    pub fn forbidden(msg: &str) -> Self {
        ReservationError::Forbidden(msg.to_string())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ReservationError::Conflict(_) => 409,
            ReservationError::NotFound(_) => 404,
            ReservationError::Gone(_) => 410,
            ReservationError::Forbidden(_) => 403,
            ReservationError::Validation(_) => 400,
            ReservationError::Transient(StoreError::Constraint(_)) => 409,
            ReservationError::Transient(StoreError::Corrupt(_)) => 500,
            ReservationError::Transient(_) => 503,
            ReservationError::Timeout => 504,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ReservationError::Transient(e) => e.is_transient(),
            ReservationError::Timeout => true,
            _ => false,
        }
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;
