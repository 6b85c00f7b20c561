use axum::{
    extract::State,
    http::Method,
    response::Response,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod reply;
pub mod reservations;
pub mod seats;
pub mod state;

pub use state::AppState;

use crate::error::AppError;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
            reply::IDEMPOTENCY_KEY,
        ])
        .expose_headers([reply::IDEMPOTENT_REPLAYED]);

    Router::new()
        .merge(seats::routes())
        .merge(reservations::routes())
        .route("/api/expiration/stats", get(expiration_stats))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn expiration_stats(State(state): State<AppState>) -> Result<Response, AppError> {
    let stats = state.sweeper.stats().await?;
    reply::ok(200, "Expiration stats retrieved successfully", stats)
}

async fn health(State(state): State<AppState>) -> Result<Response, AppError> {
    let seats = state.inventory.seat_stats().await?;
    reply::ok(200, "OK", serde_json::json!({ "status": "ok", "seats": seats }))
}
