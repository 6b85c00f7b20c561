use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use seatwise_core::{NewSeat, SeatQuery};
use seatwise_reservation::ReserveRequest;

use crate::error::AppError;
use crate::reply::{self, idempotency_key};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/seats", get(list_seats).post(create_seat))
        .route("/api/seats/stats", get(seat_stats))
        .route("/api/seats/reserve", post(reserve_seat))
        .route("/api/seats/number/{seat_number}", get(get_seat_by_number))
        .route("/api/seats/{id}", get(get_seat))
        .route("/api/seats/{id}/reset", post(reset_seat))
}

async fn list_seats(
    State(state): State<AppState>,
    Query(query): Query<SeatQuery>,
) -> Result<Response, AppError> {
    let page = state.inventory.list_seats(&query).await?;
    reply::ok(200, "Seats retrieved successfully", page)
}

async fn seat_stats(State(state): State<AppState>) -> Result<Response, AppError> {
    let stats = state.inventory.seat_stats().await?;
    reply::ok(200, "Seat statistics retrieved successfully", stats)
}

async fn get_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let seat = state.inventory.get_seat(id).await?;
    reply::ok(200, "Seat retrieved successfully", seat)
}

async fn get_seat_by_number(
    State(state): State<AppState>,
    Path(seat_number): Path<String>,
) -> Result<Response, AppError> {
    let seat = state.inventory.find_seat_by_number(&seat_number).await?;
    reply::ok(200, "Seat retrieved successfully", seat)
}

async fn create_seat(
    State(state): State<AppState>,
    Json(req): Json<NewSeat>,
) -> Result<Response, AppError> {
    let seat = state.inventory.create_seat(req).await?;
    reply::ok(201, "Seat created successfully", seat)
}

async fn reset_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let seat = state.inventory.reset_seat(id).await?;
    reply::ok(200, "Seat reset successfully", seat)
}

async fn reserve_seat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut req): Json<ReserveRequest>,
) -> Result<Response, AppError> {
    req.idempotency_key = Some(idempotency_key(&headers)?);
    info!("Reserve request for seat {} by {}", req.seat_id, req.user_id);

    let result = state.coordinator.reserve(req, state.request_timeout).await?;
    Ok(reply::into_response(result))
}
