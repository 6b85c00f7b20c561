use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use seatwise_core::{
    IdempotencyRecord, IdempotencyStore, InsertOutcome, StoreError, StoreResult, StoredResponse,
};

use crate::database::store_error;

#[derive(sqlx::FromRow)]
struct IdempotencyRow {
    key: String,
    method: String,
    path: String,
    response: String,
    status_code: i32,
    user_id: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<IdempotencyRow> for IdempotencyRecord {
    type Error = StoreError;

    fn try_from(row: IdempotencyRow) -> Result<Self, Self::Error> {
        let status_code = u16::try_from(row.status_code)
            .map_err(|_| StoreError::Corrupt(format!("idempotency {}: status {}", row.key, row.status_code)))?;

        Ok(IdempotencyRecord {
            key: row.key,
            method: row.method,
            path: row.path,
            response: StoredResponse {
                status_code,
                body: row.response,
            },
            user_id: row.user_id,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

const COLUMNS: &str = "key, method, path, response, status_code, user_id, expires_at, created_at";

pub struct PgIdempotencyStore {
    pool: PgPool,
}

impl PgIdempotencyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, key: &str) -> StoreResult<Option<IdempotencyRecord>> {
        let sql = format!("SELECT {} FROM idempotency_records WHERE key = $1", COLUMNS);
        let row = sqlx::query_as::<_, IdempotencyRow>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        row.map(IdempotencyRecord::try_from).transpose()
    }
}

#[async_trait]
impl IdempotencyStore for PgIdempotencyStore {
    async fn find(&self, key: &str) -> StoreResult<Option<IdempotencyRecord>> {
        self.fetch(key).await
    }

    async fn insert(&self, record: IdempotencyRecord) -> StoreResult<InsertOutcome> {
        // A lapsed record no longer guards the key
        sqlx::query("DELETE FROM idempotency_records WHERE key = $1 AND expires_at <= $2")
            .bind(&record.key)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        let sql = format!(
            r#"
            INSERT INTO idempotency_records (key, method, path, response, status_code, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (key) DO NOTHING
            RETURNING {}
            "#,
            COLUMNS
        );
        let inserted = sqlx::query_as::<_, IdempotencyRow>(&sql)
            .bind(&record.key)
            .bind(&record.method)
            .bind(&record.path)
            .bind(&record.response.body)
            .bind(i32::from(record.response.status_code))
            .bind(&record.user_id)
            .bind(record.expires_at)
            .bind(record.created_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        if let Some(row) = inserted {
            return Ok(InsertOutcome::Inserted(IdempotencyRecord::try_from(row)?));
        }

        match self.fetch(&record.key).await? {
            Some(existing) => Ok(InsertOutcome::Existing(existing)),
            // Winner was purged between the two statements
            None => Err(StoreError::Database(format!(
                "idempotency record {} vanished during insert",
                record.key
            ))),
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM idempotency_records WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM idempotency_records WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected())
    }
}
