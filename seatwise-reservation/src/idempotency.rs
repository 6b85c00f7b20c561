use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use seatwise_core::cache::IDEMPOTENCY_PREFIX;
use seatwise_core::{
    FastCache, IdempotencyRecord, IdempotencyStore, InsertOutcome, StoreResult, StoredResponse,
};

/// Read-through, write-through idempotency cache over a fast tier and a durable tier.
///
/// The fast tier is an optimisation: its failures are logged and the durable tier answers.
/// Durable lookup failures are returned, since a miss there would re-execute side effects.
pub struct IdempotencyCache {
    fast: Arc<dyn FastCache>,
    durable: Arc<dyn IdempotencyStore>,
    ttl: Duration,
}

/// What a completed request leaves behind for its key.
#[derive(Debug, Clone)]
pub struct CompletedRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub user_id: Option<&'a str>,
    pub response: StoredResponse,
}

fn fast_key(key: &str) -> String {
    format!("{}{}", IDEMPOTENCY_PREFIX, key)
}

fn remaining(record: &IdempotencyRecord) -> Option<Duration> {
    (record.expires_at - Utc::now())
        .to_std()
        .ok()
        .filter(|d| !d.is_zero())
}

impl IdempotencyCache {
    pub fn new(fast: Arc<dyn FastCache>, durable: Arc<dyn IdempotencyStore>, ttl: Duration) -> Self {
        Self { fast, durable, ttl }
    }

    pub async fn lookup(&self, key: &str) -> StoreResult<Option<StoredResponse>> {
        match self.fast.get(&fast_key(key)).await {
            Ok(Some(raw)) => match serde_json::from_str::<IdempotencyRecord>(&raw) {
                Ok(record) if !record.is_expired(Utc::now()) => {
                    debug!("Idempotency hit (fast tier) for {}", key);
                    return Ok(Some(record.response));
                }
                Ok(_) => {}
                Err(e) => warn!("Undecodable idempotency entry for {}: {}", key, e),
            },
            Ok(None) => {}
            Err(e) => warn!("Idempotency fast tier unavailable, using durable tier: {}", e),
        }

        let Some(record) = self.durable.find(key).await? else {
            return Ok(None);
        };
        if record.is_expired(Utc::now()) {
            return Ok(None);
        }

        debug!("Idempotency hit (durable tier) for {}", key);
        self.backfill(&record).await;
        Ok(Some(record.response))
    }

    /// Records a response for `key` and returns the response that owns the key, which is
    /// an earlier writer's if one got there first.
    pub async fn store(&self, key: &str, completed: CompletedRequest<'_>) -> StoredResponse {
        let now = Utc::now();
        // Saturates for absurd TTLs
        let expires_at = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let fresh = IdempotencyRecord {
            key: key.to_string(),
            method: completed.method.to_string(),
            path: completed.path.to_string(),
            response: completed.response,
            user_id: completed.user_id.map(str::to_string),
            expires_at,
            created_at: now,
        };

        let winner = match self.durable.insert(fresh.clone()).await {
            Ok(InsertOutcome::Inserted(record)) => record,
            Ok(InsertOutcome::Existing(record)) => {
                debug!("Idempotency key {} already recorded, keeping first response", key);
                record
            }
            Err(e) => {
                error!("Failed to persist idempotency record {}: {}", key, e);
                fresh
            }
        };

        self.backfill(&winner).await;
        winner.response
    }

    pub async fn delete(&self, key: &str) -> StoreResult<()> {
        if let Err(e) = self.fast.del(&fast_key(key)).await {
            warn!("Failed to evict idempotency key {} from fast tier: {}", key, e);
        }
        self.durable.delete(key).await
    }

    async fn backfill(&self, record: &IdempotencyRecord) {
        let Some(ttl) = remaining(record) else {
            return;
        };
        let raw = match serde_json::to_string(record) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to encode idempotency record {}: {}", record.key, e);
                return;
            }
        };
        if let Err(e) = self.fast.set_ex(&fast_key(&record.key), &raw, ttl).await {
            warn!("Failed to warm idempotency fast tier for {}: {}", record.key, e);
        }
    }
}
