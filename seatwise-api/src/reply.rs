use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use seatwise_core::messages;
use seatwise_reservation::coordinator::validate_idempotency_key;
use seatwise_reservation::response;
use seatwise_reservation::Reply;

use crate::error::AppError;

pub const IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("idempotency-key");
pub const IDEMPOTENT_REPLAYED: HeaderName = HeaderName::from_static("idempotent-replayed");

/// Writes the stored body verbatim so replays stay byte-identical.
pub fn into_response(reply: Reply) -> Response {
    let status = StatusCode::from_u16(reply.status_code).unwrap_or(StatusCode::OK);
    let mut response = (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        reply.body,
    )
        .into_response();

    if reply.replayed {
        response
            .headers_mut()
            .insert(IDEMPOTENT_REPLAYED, HeaderValue::from_static("true"));
    }
    response
}

pub fn ok<T: Serialize>(status_code: u16, message: &str, data: T) -> Result<Response, AppError> {
    let stored = response::success(status_code, message, data)?;
    Ok(into_response(Reply::fresh(stored)))
}

pub fn idempotency_key(headers: &HeaderMap) -> Result<String, AppError> {
    let key = headers
        .get(&IDEMPOTENCY_KEY)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::ValidationError(messages::IDEMPOTENCY_KEY_REQUIRED.to_string()))?;

    validate_idempotency_key(key)?;
    Ok(key.to_string())
}
