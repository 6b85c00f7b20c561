use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const DEFAULT_SECTION: &str = "STANDARD";
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Reserved,
    Confirmed,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "AVAILABLE",
            SeatStatus::Reserved => "RESERVED",
            SeatStatus::Confirmed => "CONFIRMED",
        }
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AVAILABLE" => Ok(SeatStatus::Available),
            "RESERVED" => Ok(SeatStatus::Reserved),
            "CONFIRMED" => Ok(SeatStatus::Confirmed),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ReservationStatus::Pending),
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            "EXPIRED" => Ok(ReservationStatus::Expired),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown status: {0}")]
pub struct UnknownStatus(pub String);

/// The contended resource. Mutated only through [`crate::repository::StoreTransaction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub seat_number: String,
    pub row: String,
    pub section: String,
    pub status: SeatStatus,
    /// Incremented by exactly one on every successful status transition.
    pub version: i64,
    /// Set iff `status == Reserved`.
    pub expires_at: Option<DateTime<Utc>>,
    pub current_reservation_id: Option<Uuid>,
    /// Minor currency units.
    pub price: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Seat {
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|at| (at - now).num_seconds().max(0))
    }
}

/// Administrative seat definition; normalised by [`NewSeat::normalized`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewSeat {
    pub seat_number: String,
    pub row: String,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
}

impl NewSeat {
    pub fn normalized(&self) -> NewSeat {
        let section = self
            .section
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SECTION);

        NewSeat {
            seat_number: self.seat_number.trim().to_uppercase(),
            row: self.row.trim().to_uppercase(),
            section: Some(section.to_string()),
            price: Some(self.price.unwrap_or(0).max(0)),
        }
    }

    /// Builds the initial AVAILABLE record for a normalised definition.
    pub fn into_seat(self, now: DateTime<Utc>) -> Seat {
        let def = self.normalized();
        Seat {
            id: Uuid::new_v4(),
            seat_number: def.seat_number,
            row: def.row,
            section: def.section.unwrap_or_else(|| DEFAULT_SECTION.to_string()),
            status: SeatStatus::Available,
            version: 0,
            expires_at: None,
            current_reservation_id: None,
            price: def.price.unwrap_or(0),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub seat_id: Uuid,
    pub user_id: String,
    pub status: ReservationStatus,
    pub expires_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub idempotency_key: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        (self.status == ReservationStatus::Pending)
            .then(|| (self.expires_at - now).num_seconds().max(0))
    }
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub id: Uuid,
    pub seat_id: Uuid,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub idempotency_key: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewReservation {
    pub fn into_pending(self, now: DateTime<Utc>) -> Reservation {
        Reservation {
            id: self.id,
            seat_id: self.seat_id,
            user_id: self.user_id,
            status: ReservationStatus::Pending,
            expires_at: self.expires_at,
            confirmed_at: None,
            cancelled_at: None,
            idempotency_key: self.idempotency_key,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeatQuery {
    pub status: Option<SeatStatus>,
    pub row: Option<String>,
    pub section: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl SeatQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(50).clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }

    pub fn row_filter(&self) -> Option<String> {
        self.row.as_deref().map(|r| r.trim().to_uppercase())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationQuery {
    pub status: Option<ReservationStatus>,
    pub user_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ReservationQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(20).clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatCounts {
    pub available: u64,
    pub reserved: u64,
    pub confirmed: u64,
    pub total: u64,
}

impl SeatCounts {
    pub fn add(&mut self, status: SeatStatus, count: u64) {
        match status {
            SeatStatus::Available => self.available += count,
            SeatStatus::Reserved => self.reserved += count,
            SeatStatus::Confirmed => self.confirmed += count,
        }
        self.total += count;
    }
}
