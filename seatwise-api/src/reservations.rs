use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use seatwise_core::ReservationQuery;
use seatwise_reservation::{CancelRequest, ConfirmRequest};

use crate::error::AppError;
use crate::reply::{self, idempotency_key};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/reservations", get(list_reservations))
        .route("/api/reservations/confirm", post(confirm_reservation))
        .route("/api/reservations/cancel", post(cancel_reservation))
        .route("/api/reservations/{id}", get(get_reservation))
}

async fn list_reservations(
    State(state): State<AppState>,
    Query(query): Query<ReservationQuery>,
) -> Result<Response, AppError> {
    let page = state.inventory.list_reservations(&query).await?;
    reply::ok(200, "Reservations retrieved successfully", page)
}

async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let reservation = state.inventory.get_reservation(id).await?;
    reply::ok(200, "Reservation retrieved successfully", reservation)
}

async fn confirm_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut req): Json<ConfirmRequest>,
) -> Result<Response, AppError> {
    req.idempotency_key = Some(idempotency_key(&headers)?);
    info!("Confirm request for reservation {} by {}", req.reservation_id, req.user_id);

    let result = state.coordinator.confirm(req, state.request_timeout).await?;
    Ok(reply::into_response(result))
}

// Cancelling twice is already a conflict, so no key is needed.
async fn cancel_reservation(
    State(state): State<AppState>,
    Json(req): Json<CancelRequest>,
) -> Result<Response, AppError> {
    info!("Cancel request for reservation {} by {}", req.reservation_id, req.user_id);

    let result = state.coordinator.cancel(req, state.request_timeout).await?;
    Ok(reply::into_response(result))
}
