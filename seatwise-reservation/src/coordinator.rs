use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use seatwise_core::idempotency::MAX_KEY_LENGTH;
use seatwise_core::{
    messages, CreateReservation, NewReservation, Reservation, ReservationError,
    ReservationResult, ReservationStatus, StateStore, StoreTransaction, StoredResponse,
};
use seatwise_store::app_config::BusinessRules;

use crate::idempotency::{CompletedRequest, IdempotencyCache};
use crate::lock::LockCoordinator;
use crate::response::{self, Reply, ReservationOutcome, ReservationView, SeatView};

pub const RESERVE_PATH: &str = "/api/seats/reserve";
pub const CONFIRM_PATH: &str = "/api/reservations/confirm";

#[derive(Debug, Clone)]
pub struct ReservationRules {
    pub hold_duration: Duration,
    pub lock_ttl: Duration,
}

impl Default for ReservationRules {
    fn default() -> Self {
        Self {
            hold_duration: Duration::from_secs(120),
            lock_ttl: Duration::from_secs(10),
        }
    }
}

impl From<&BusinessRules> for ReservationRules {
    fn from(rules: &BusinessRules) -> Self {
        Self {
            hold_duration: rules.hold_duration(),
            lock_ttl: rules.lock_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReserveRequest {
    pub seat_id: Uuid,
    pub user_id: String,
    #[serde(skip)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmRequest {
    pub reservation_id: Uuid,
    pub user_id: String,
    #[serde(skip)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelRequest {
    pub reservation_id: Uuid,
    pub user_id: String,
}

pub fn validate_user_id(user_id: &str) -> ReservationResult<()> {
    if user_id.trim().is_empty() {
        return Err(ReservationError::Validation(messages::INVALID_USER_ID.to_string()));
    }
    Ok(())
}

pub fn validate_idempotency_key(key: &str) -> ReservationResult<()> {
    if key.is_empty() {
        return Err(ReservationError::Validation(messages::IDEMPOTENCY_KEY_REQUIRED.to_string()));
    }
    if key.chars().count() > MAX_KEY_LENGTH {
        return Err(ReservationError::Validation(messages::IDEMPOTENCY_KEY_TOO_LONG.to_string()));
    }
    Ok(())
}

/// Decides whether `user_id` may confirm `reservation` at `now`.
fn check_confirmable(reservation: &Reservation, user_id: &str, now: DateTime<Utc>) -> ReservationResult<()> {
    if reservation.user_id != user_id {
        return Err(ReservationError::forbidden(messages::RESERVATION_USER_MISMATCH));
    }
    match reservation.status {
        ReservationStatus::Confirmed => Err(ReservationError::conflict(messages::RESERVATION_ALREADY_CONFIRMED)),
        ReservationStatus::Cancelled => Err(ReservationError::conflict(messages::RESERVATION_ALREADY_CANCELLED)),
        ReservationStatus::Expired => Err(ReservationError::gone(messages::RESERVATION_EXPIRED)),
        ReservationStatus::Pending if reservation.is_past_expiry(now) => {
            Err(ReservationError::gone(messages::RESERVATION_EXPIRED))
        }
        ReservationStatus::Pending => Ok(()),
    }
}

/// Someone else's reservation is reported as absent.
fn check_cancellable(reservation: &Reservation, user_id: &str) -> ReservationResult<()> {
    if reservation.user_id != user_id {
        return Err(ReservationError::not_found(messages::RESERVATION_NOT_FOUND));
    }
    match reservation.status {
        ReservationStatus::Confirmed => Err(ReservationError::conflict(messages::RESERVATION_ALREADY_CONFIRMED)),
        ReservationStatus::Cancelled => Err(ReservationError::conflict(messages::RESERVATION_ALREADY_CANCELLED)),
        ReservationStatus::Expired => Err(ReservationError::gone(messages::RESERVATION_EXPIRED)),
        ReservationStatus::Pending => Ok(()),
    }
}

async fn abort<T>(tx: Box<dyn StoreTransaction>, err: ReservationError) -> ReservationResult<T> {
    if let Err(e) = tx.rollback().await {
        warn!("Rollback after '{}' failed: {}", err, e);
    }
    Err(err)
}

async fn bounded<T>(timeout: Duration, op: impl Future<Output = ReservationResult<T>>) -> ReservationResult<T> {
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Operation exceeded {:?}; outcome unknown", timeout);
            Err(ReservationError::Timeout)
        }
    }
}

/// Orchestrates reserve, confirm and cancel over the idempotency cache, the advisory lock
/// and the store's conditional transitions. Never retries internally.
pub struct ReservationCoordinator {
    store: Arc<dyn StateStore>,
    idempotency: Arc<IdempotencyCache>,
    locks: LockCoordinator,
    rules: ReservationRules,
}

impl ReservationCoordinator {
    pub fn new(
        store: Arc<dyn StateStore>,
        idempotency: Arc<IdempotencyCache>,
        locks: LockCoordinator,
        rules: ReservationRules,
    ) -> Self {
        Self { store, idempotency, locks, rules }
    }

    pub fn rules(&self) -> &ReservationRules {
        &self.rules
    }

    pub async fn reserve(&self, req: ReserveRequest, timeout: Duration) -> ReservationResult<Reply> {
        bounded(timeout, async {
            validate_user_id(&req.user_id)?;
            let key = req.idempotency_key.as_deref();
            if let Some(reply) = self.replay(key).await? {
                return Ok(reply);
            }

            let lock_key = format!("seat:{}", req.seat_id);
            let outcome = self
                .locks
                .with_lock(&lock_key, self.rules.lock_ttl, || self.reserve_transition(&req))
                .await;

            self.settle(key, RESERVE_PATH, &req.user_id, outcome).await
        })
        .await
    }

    pub async fn confirm(&self, req: ConfirmRequest, timeout: Duration) -> ReservationResult<Reply> {
        bounded(timeout, async {
            validate_user_id(&req.user_id)?;
            let key = req.idempotency_key.as_deref();
            if let Some(reply) = self.replay(key).await? {
                return Ok(reply);
            }

            let outcome = self.confirm_transition(&req).await;
            self.settle(key, CONFIRM_PATH, &req.user_id, outcome).await
        })
        .await
    }

    pub async fn cancel(&self, req: CancelRequest, timeout: Duration) -> ReservationResult<Reply> {
        bounded(timeout, async {
            validate_user_id(&req.user_id)?;
            let response = self.cancel_transition(&req).await?;
            Ok(Reply::fresh(response))
        })
        .await
    }

    async fn replay(&self, key: Option<&str>) -> ReservationResult<Option<Reply>> {
        let Some(key) = key else {
            return Ok(None);
        };
        validate_idempotency_key(key)?;

        let cached = self.idempotency.lookup(key).await?;
        if cached.is_some() {
            info!("Idempotent replay for key {}", key);
        }
        Ok(cached.map(Reply::replayed))
    }

    /// Caches successes. A conflict under a key may be a concurrent duplicate of a request
    /// that already won, so the key is consulted once more before reporting it.
    async fn settle(
        &self,
        key: Option<&str>,
        path: &'static str,
        user_id: &str,
        outcome: ReservationResult<StoredResponse>,
    ) -> ReservationResult<Reply> {
        match (outcome, key) {
            (Ok(response), Some(key)) => {
                let completed = CompletedRequest {
                    method: "POST",
                    path,
                    user_id: Some(user_id),
                    response,
                };
                Ok(Reply::fresh(self.idempotency.store(key, completed).await))
            }
            (Ok(response), None) => Ok(Reply::fresh(response)),
            (Err(ReservationError::Conflict(msg)), Some(key)) => match self.idempotency.lookup(key).await {
                Ok(Some(cached)) => {
                    debug!("Conflict for key {} resolved to an earlier success", key);
                    Ok(Reply::replayed(cached))
                }
                _ => Err(ReservationError::Conflict(msg)),
            },
            (Err(e), _) => Err(e),
        }
    }

    async fn reserve_transition(&self, req: &ReserveRequest) -> ReservationResult<StoredResponse> {
        let now = Utc::now();
        let expires_at = chrono::Duration::from_std(self.rules.hold_duration)
            .ok()
            .and_then(|hold| now.checked_add_signed(hold))
            .ok_or_else(|| ReservationError::Validation(messages::HOLD_OUT_OF_RANGE.to_string()))?;
        let reservation_id = Uuid::new_v4();

        let mut tx = self.store.begin().await?;
        let Some(seat) = tx.reserve_seat(req.seat_id, reservation_id, expires_at).await? else {
            if let Err(e) = tx.rollback().await {
                warn!("Rollback failed: {}", e);
            }
            return Err(self.seat_unavailable(req.seat_id, &req.user_id).await);
        };

        let created = tx
            .create_reservation(NewReservation {
                id: reservation_id,
                seat_id: req.seat_id,
                user_id: req.user_id.clone(),
                expires_at,
                idempotency_key: req.idempotency_key.clone(),
                metadata: req.metadata.clone(),
            })
            .await?;

        let reservation = match created {
            CreateReservation::Created(reservation) => reservation,
            CreateReservation::DuplicateActive => {
                debug!("Seat {} already has an active reservation (user {})", req.seat_id, req.user_id);
                return abort(tx, ReservationError::conflict(messages::SEAT_NOT_AVAILABLE)).await;
            }
        };

        tx.commit().await?;
        info!(
            "Seat {} reserved by {} (reservation {}, expires {})",
            seat.seat_number, req.user_id, reservation.id, expires_at
        );

        response::success(
            201,
            "Seat reserved successfully",
            ReservationOutcome {
                reservation: ReservationView::at(reservation, now),
                seat: Some(SeatView::at(seat, now)),
            },
        )
    }

    /// Tells a lost race apart from a seat that is not offered at all.
    async fn seat_unavailable(&self, seat_id: Uuid, user_id: &str) -> ReservationError {
        match self.store.get_seat(seat_id).await {
            Ok(Some(seat)) if seat.is_active => {
                debug!("Seat {} not available for {} (status {})", seat_id, user_id, seat.status);
                ReservationError::conflict(messages::SEAT_NOT_AVAILABLE)
            }
            Ok(_) => ReservationError::not_found(messages::SEAT_NOT_FOUND),
            Err(e) => e.into(),
        }
    }

    async fn confirm_transition(&self, req: &ConfirmRequest) -> ReservationResult<StoredResponse> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let Some(reservation) = tx.find_reservation(req.reservation_id).await? else {
            return abort(tx, ReservationError::not_found(messages::RESERVATION_NOT_FOUND)).await;
        };
        if let Err(e) = check_confirmable(&reservation, &req.user_id, now) {
            debug!("Confirm of {} by {} refused: {}", reservation.id, req.user_id, e);
            return abort(tx, e).await;
        }

        let Some(confirmed) = tx.confirm_reservation(reservation.id, &req.user_id, now).await? else {
            return abort(tx, ReservationError::gone(messages::RESERVATION_EXPIRED)).await;
        };
        let Some(seat) = tx.confirm_seat(reservation.seat_id).await? else {
            warn!("Seat {} not RESERVED while confirming {}", reservation.seat_id, reservation.id);
            return abort(tx, ReservationError::conflict(messages::SEAT_NOT_HELD)).await;
        };

        tx.commit().await?;
        info!("Reservation {} confirmed by {} (seat {})", confirmed.id, req.user_id, seat.seat_number);

        response::success(
            200,
            "Reservation confirmed successfully",
            ReservationOutcome {
                reservation: ReservationView::at(confirmed, now),
                seat: Some(SeatView::at(seat, now)),
            },
        )
    }

    async fn cancel_transition(&self, req: &CancelRequest) -> ReservationResult<StoredResponse> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let Some(reservation) = tx.find_reservation(req.reservation_id).await? else {
            return abort(tx, ReservationError::not_found(messages::RESERVATION_NOT_FOUND)).await;
        };
        if let Err(e) = check_cancellable(&reservation, &req.user_id) {
            debug!("Cancel of {} by {} refused: {}", reservation.id, req.user_id, e);
            return abort(tx, e).await;
        }

        let Some(cancelled) = tx.cancel_reservation(reservation.id, &req.user_id, now).await? else {
            return abort(tx, ReservationError::not_found(messages::RESERVATION_NOT_FOUND)).await;
        };
        let seat = tx.release_seat(reservation.seat_id).await?;
        if seat.is_none() {
            warn!("Seat {} was not RESERVED when cancelling {}", reservation.seat_id, reservation.id);
        }

        tx.commit().await?;
        info!("Reservation {} cancelled by {}, seat released", cancelled.id, req.user_id);

        response::success(
            200,
            "Reservation cancelled successfully",
            ReservationOutcome {
                reservation: ReservationView::at(cancelled, now),
                seat: seat.map(|s| SeatView::at(s, now)),
            },
        )
    }
}
