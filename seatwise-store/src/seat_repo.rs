use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use seatwise_core::{
    CreateReservation, NewReservation, NewSeat, Page, Reservation, ReservationQuery, Seat,
    SeatCounts, SeatQuery, StateStore, StoreError, StoreResult, StoreTransaction,
};

use crate::database::{is_unique_violation, store_error};

macro_rules! seat_columns {
    () => {
        "id, seat_number, seat_row, section, status, version, expires_at, current_reservation_id, price, is_active, created_at, updated_at"
    };
}

macro_rules! reservation_columns {
    () => {
        "id, seat_id, user_id, status, expires_at, confirmed_at, cancelled_at, idempotency_key, metadata, created_at, updated_at"
    };
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct SeatRow {
    id: Uuid,
    seat_number: String,
    seat_row: String,
    section: String,
    status: String,
    version: i64,
    expires_at: Option<DateTime<Utc>>,
    current_reservation_id: Option<Uuid>,
    price: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SeatRow> for Seat {
    type Error = StoreError;

    fn try_from(row: SeatRow) -> Result<Self, Self::Error> {
        Ok(Seat {
            id: row.id,
            seat_number: row.seat_number,
            row: row.seat_row,
            section: row.section,
            status: row.status.parse().map_err(|e| StoreError::Corrupt(format!("seat {}: {}", row.id, e)))?,
            version: row.version,
            expires_at: row.expires_at,
            current_reservation_id: row.current_reservation_id,
            price: row.price,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    seat_id: Uuid,
    user_id: String,
    status: String,
    expires_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    idempotency_key: Option<String>,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = StoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Reservation {
            id: row.id,
            seat_id: row.seat_id,
            user_id: row.user_id,
            status: row.status.parse().map_err(|e| StoreError::Corrupt(format!("reservation {}: {}", row.id, e)))?,
            expires_at: row.expires_at,
            confirmed_at: row.confirmed_at,
            cancelled_at: row.cancelled_at,
            idempotency_key: row.idempotency_key,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn seat(row: Option<SeatRow>) -> StoreResult<Option<Seat>> {
    row.map(Seat::try_from).transpose()
}

fn reservation(row: Option<ReservationRow>) -> StoreResult<Option<Reservation>> {
    row.map(Reservation::try_from).transpose()
}

fn push_seat_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &SeatQuery) {
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(row) = query.row_filter() {
        qb.push(" AND seat_row = ").push_bind(row);
    }
    if let Some(section) = query.section.clone() {
        qb.push(" AND section = ").push_bind(section);
    }
}

fn push_reservation_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ReservationQuery) {
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(user_id) = query.user_id.clone() {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
}

/// Postgres-backed [`StateStore`].
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn get_seat(&self, id: Uuid) -> StoreResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(concat!("SELECT ", seat_columns!(), " FROM seats WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        seat(row)
    }

    async fn find_seat_by_number(&self, seat_number: &str) -> StoreResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(concat!(
            "SELECT ", seat_columns!(), " FROM seats WHERE seat_number = $1 AND is_active = TRUE"
        ))
        .bind(seat_number.trim().to_uppercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        seat(row)
    }

    async fn list_seats(&self, query: &SeatQuery) -> StoreResult<Page<Seat>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM seats WHERE is_active = TRUE");
        push_seat_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        let mut select = QueryBuilder::<Postgres>::new(concat!(
            "SELECT ", seat_columns!(), " FROM seats WHERE is_active = TRUE"
        ));
        push_seat_filters(&mut select, query);
        select
            .push(" ORDER BY seat_number LIMIT ")
            .push_bind(i64::from(query.limit()))
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);

        let rows: Vec<SeatRow> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(Page {
            items: rows.into_iter().map(Seat::try_from).collect::<StoreResult<_>>()?,
            total: total.max(0) as u64,
            page: query.page(),
            limit: query.limit(),
        })
    }

    async fn count_seats_by_status(&self) -> StoreResult<SeatCounts> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM seats WHERE is_active = TRUE GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        let mut counts = SeatCounts::default();
        for (status, count) in rows {
            let status = status.parse().map_err(|e| StoreError::Corrupt(format!("seat status: {}", e)))?;
            counts.add(status, count.max(0) as u64);
        }
        Ok(counts)
    }

    async fn create_seat(&self, new_seat: NewSeat) -> StoreResult<Seat> {
        let s = new_seat.into_seat(Utc::now());
        let row = sqlx::query_as::<_, SeatRow>(concat!(
            r#"
            INSERT INTO seats (id, seat_number, seat_row, section, status, version, price, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 0, $6, TRUE, $7, $7)
            RETURNING "#,
            seat_columns!()
        ))
        .bind(s.id)
        .bind(&s.seat_number)
        .bind(&s.row)
        .bind(&s.section)
        .bind(s.status.as_str())
        .bind(s.price)
        .bind(s.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        Seat::try_from(row)
    }

    async fn get_reservation(&self, id: Uuid) -> StoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(concat!(
            "SELECT ", reservation_columns!(), " FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        reservation(row)
    }

    async fn list_reservations(&self, query: &ReservationQuery) -> StoreResult<Page<Reservation>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reservations WHERE TRUE");
        push_reservation_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        let mut select = QueryBuilder::<Postgres>::new(concat!(
            "SELECT ", reservation_columns!(), " FROM reservations WHERE TRUE"
        ));
        push_reservation_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(query.limit()))
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);

        let rows: Vec<ReservationRow> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(Page {
            items: rows.into_iter().map(Reservation::try_from).collect::<StoreResult<_>>()?,
            total: total.max(0) as u64,
            page: query.page(),
            limit: query.limit(),
        })
    }

    async fn count_overdue(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE status = 'PENDING' AND expires_at < $1",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(count.max(0) as u64)
    }
}

/// Every method is a single conditional statement; the `WHERE` clause is the precondition.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn reserve_seat(
        &mut self,
        seat_id: Uuid,
        reservation_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(concat!(
            r#"
            UPDATE seats
            SET status = 'RESERVED', expires_at = $2, current_reservation_id = $3,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND status = 'AVAILABLE' AND is_active = TRUE
            RETURNING "#,
            seat_columns!()
        ))
        .bind(seat_id)
        .bind(expires_at)
        .bind(reservation_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error)?;
        seat(row)
    }

    async fn confirm_seat(&mut self, seat_id: Uuid) -> StoreResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(concat!(
            r#"
            UPDATE seats
            SET status = 'CONFIRMED', expires_at = NULL, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND status = 'RESERVED'
            RETURNING "#,
            seat_columns!()
        ))
        .bind(seat_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error)?;
        seat(row)
    }

    async fn release_seat(&mut self, seat_id: Uuid) -> StoreResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(concat!(
            r#"
            UPDATE seats
            SET status = 'AVAILABLE', expires_at = NULL, current_reservation_id = NULL,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND status = 'RESERVED'
            RETURNING "#,
            seat_columns!()
        ))
        .bind(seat_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error)?;
        seat(row)
    }

    async fn reset_seat(&mut self, seat_id: Uuid) -> StoreResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(concat!(
            r#"
            UPDATE seats
            SET status = 'AVAILABLE', expires_at = NULL, current_reservation_id = NULL,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND status = 'CONFIRMED'
            RETURNING "#,
            seat_columns!()
        ))
        .bind(seat_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error)?;
        seat(row)
    }

    async fn create_reservation(&mut self, new_reservation: NewReservation) -> StoreResult<CreateReservation> {
        let r = new_reservation.into_pending(Utc::now());
        let result = sqlx::query_as::<_, ReservationRow>(concat!(
            r#"
            INSERT INTO reservations (id, seat_id, user_id, status, expires_at, idempotency_key, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING "#,
            reservation_columns!()
        ))
        .bind(r.id)
        .bind(r.seat_id)
        .bind(&r.user_id)
        .bind(r.status.as_str())
        .bind(r.expires_at)
        .bind(&r.idempotency_key)
        .bind(&r.metadata)
        .bind(r.created_at)
        .fetch_one(&mut *self.tx)
        .await;

        match result {
            Ok(row) => Ok(CreateReservation::Created(Reservation::try_from(row)?)),
            Err(e) if is_unique_violation(&e) => {
                debug!("Duplicate active reservation for seat {}: {}", r.seat_id, e);
                Ok(CreateReservation::DuplicateActive)
            }
            Err(e) => Err(store_error(e)),
        }
    }

    async fn find_reservation(&mut self, id: Uuid) -> StoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(concat!(
            "SELECT ", reservation_columns!(), " FROM reservations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error)?;
        reservation(row)
    }

    async fn confirm_reservation(
        &mut self,
        id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(concat!(
            r#"
            UPDATE reservations
            SET status = 'CONFIRMED', confirmed_at = $3, updated_at = $3
            WHERE id = $1 AND user_id = $2 AND status = 'PENDING' AND expires_at > $3
            RETURNING "#,
            reservation_columns!()
        ))
        .bind(id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error)?;
        reservation(row)
    }

    async fn cancel_reservation(
        &mut self,
        id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(concat!(
            r#"
            UPDATE reservations
            SET status = 'CANCELLED', cancelled_at = $3, updated_at = $3
            WHERE id = $1 AND user_id = $2 AND status = 'PENDING'
            RETURNING "#,
            reservation_columns!()
        ))
        .bind(id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error)?;
        reservation(row)
    }

    async fn expire_overdue(&mut self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(concat!(
            r#"
            UPDATE reservations
            SET status = 'EXPIRED', updated_at = NOW()
            WHERE status = 'PENDING' AND expires_at < $1
            RETURNING "#,
            reservation_columns!()
        ))
        .bind(cutoff)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn release_seats_held_by(&mut self, reservation_ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        if reservation_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE seats
            SET status = 'AVAILABLE', expires_at = NULL, current_reservation_id = NULL,
                version = version + 1, updated_at = NOW()
            WHERE status = 'RESERVED' AND current_reservation_id = ANY($1)
            RETURNING id
            "#,
        )
        .bind(reservation_ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_error)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_error)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(|e| {
            warn!("Rollback failed: {}", e);
            store_error(e)
        })
    }
}
