use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use seatwise_core::{messages, ReservationError, StoreError};

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    GoneError(String),
    ForbiddenError(String),
    ServiceUnavailable(String),
    GatewayTimeout(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::GoneError(msg) => (StatusCode::GONE, msg),
            AppError::ForbiddenError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable, retry later".to_string())
            }
            AppError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "success": false,
            "status_code": status.as_u16(),
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Conflict(msg) => AppError::ConflictError(msg),
            ReservationError::NotFound(msg) => AppError::NotFoundError(msg),
            ReservationError::Gone(msg) => AppError::GoneError(msg),
            ReservationError::Forbidden(msg) => AppError::ForbiddenError(msg),
            ReservationError::Validation(msg) => AppError::ValidationError(msg),
            ReservationError::Transient(StoreError::Constraint(msg)) => AppError::ConflictError(msg),
            ReservationError::Transient(e) if e.is_transient() => AppError::ServiceUnavailable(e.to_string()),
            ReservationError::Transient(e) => AppError::InternalServerError(e.to_string()),
            ReservationError::Timeout => AppError::GatewayTimeout(messages::REQUEST_TIMED_OUT.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::from(ReservationError::from(err))
    }
}
