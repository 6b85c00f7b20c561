use chrono::{DateTime, Utc};
use serde::Serialize;

use seatwise_core::{
    Reservation, ReservationError, ReservationResult, Seat, StoreError, StoredResponse,
};

#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub success: bool,
    pub status_code: u16,
    pub message: &'a str,
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

/// Serialises a success envelope exactly once; the resulting body is what gets cached.
pub fn success<T: Serialize>(status_code: u16, message: &str, data: T) -> ReservationResult<StoredResponse> {
    let envelope = Envelope {
        success: true,
        status_code,
        message,
        data,
        timestamp: Utc::now(),
    };
    let body = serde_json::to_string(&envelope)
        .map_err(|e| ReservationError::Transient(StoreError::Corrupt(e.to_string())))?;
    Ok(StoredResponse { status_code, body })
}

/// Outcome of a successful mutating call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status_code: u16,
    pub body: String,
    /// Served from the idempotency cache without touching the store.
    pub replayed: bool,
}

impl Reply {
    pub fn fresh(response: StoredResponse) -> Self {
        Self {
            status_code: response.status_code,
            body: response.body,
            replayed: false,
        }
    }

    pub fn replayed(response: StoredResponse) -> Self {
        Self {
            status_code: response.status_code,
            body: response.body,
            replayed: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    #[serde(flatten)]
    pub seat: Seat,
    pub remaining_seconds: Option<i64>,
}

impl SeatView {
    pub fn at(seat: Seat, now: DateTime<Utc>) -> Self {
        let remaining_seconds = seat.remaining_seconds(now);
        Self { seat, remaining_seconds }
    }
}

impl From<Seat> for SeatView {
    fn from(seat: Seat) -> Self {
        Self::at(seat, Utc::now())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationView {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub remaining_seconds: Option<i64>,
}

impl ReservationView {
    pub fn at(reservation: Reservation, now: DateTime<Utc>) -> Self {
        let remaining_seconds = reservation.remaining_seconds(now);
        Self { reservation, remaining_seconds }
    }
}

impl From<Reservation> for ReservationView {
    fn from(reservation: Reservation) -> Self {
        Self::at(reservation, Utc::now())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationOutcome {
    pub reservation: ReservationView,
    pub seat: Option<SeatView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatwise_core::NewSeat;

    #[test]
    fn test_envelope_shape() {
        let seat = NewSeat {
            seat_number: "B7".to_string(),
            row: "B".to_string(),
            section: None,
            price: Some(900),
        }
        .into_seat(Utc::now());

        let response = success(201, "Seat reserved", SeatView::from(seat)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&response.body).unwrap();

        assert_eq!(response.status_code, 201);
        assert_eq!(value["success"], true);
        assert_eq!(value["status_code"], 201);
        assert_eq!(value["data"]["seat_number"], "B7");
        assert_eq!(value["data"]["status"], "AVAILABLE");
        assert!(value["data"]["remaining_seconds"].is_null());
        assert!(value["timestamp"].is_string());
    }
}
