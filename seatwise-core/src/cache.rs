use async_trait::async_trait;
use std::time::Duration;

pub const LOCK_PREFIX: &str = "lock:";
pub const IDEMPOTENCY_PREFIX: &str = "idempotency:";

/// Failures of the shared fast cache. Callers degrade on these, they never fail a request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
    #[error("Cache operation timed out")]
    Timeout,
    #[error("Cache value could not be decoded: {0}")]
    Decode(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Low-latency key-value store with per-key expiry.
#[async_trait]
pub trait FastCache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Sets only if absent. `true` when this call created the key.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool>;

    async fn del(&self, key: &str) -> CacheResult<()>;

    /// Deletes only while the key still holds `expected`. `true` when deleted.
    async fn del_if_eq(&self, key: &str, expected: &str) -> CacheResult<bool>;
}

/// Proof of an acquired advisory lock, needed to release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAttempt {
    Acquired(LockToken),
    /// Someone else holds the marker.
    Contended,
    /// The backing cache could not be reached.
    Unavailable,
}

/// Best-effort, TTL-bounded mutual exclusion hint. Never authoritative.
#[async_trait]
pub trait AdvisoryLock: Send + Sync {
    async fn acquire(&self, key: &str, ttl: Duration) -> LockAttempt;

    async fn release(&self, token: LockToken);
}
