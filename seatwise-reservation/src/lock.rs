use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use seatwise_core::cache::LOCK_PREFIX;
use seatwise_core::{AdvisoryLock, FastCache, LockAttempt, LockToken};

/// Advisory lock backed by the shared fast cache.
pub struct CacheLock {
    cache: Arc<dyn FastCache>,
}

impl CacheLock {
    pub fn new(cache: Arc<dyn FastCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl AdvisoryLock for CacheLock {
    async fn acquire(&self, key: &str, ttl: Duration) -> LockAttempt {
        let token = LockToken {
            key: format!("{}{}", LOCK_PREFIX, key),
            value: Uuid::new_v4().to_string(),
        };

        match self.cache.set_nx_ex(&token.key, &token.value, ttl).await {
            Ok(true) => LockAttempt::Acquired(token),
            Ok(false) => LockAttempt::Contended,
            Err(e) => {
                warn!("Lock cache unavailable for {}: {}", token.key, e);
                LockAttempt::Unavailable
            }
        }
    }

    async fn release(&self, token: LockToken) {
        match self.cache.del_if_eq(&token.key, &token.value).await {
            Ok(true) => {}
            Ok(false) => debug!("Lock {} already lapsed or taken over", token.key),
            Err(e) => warn!("Failed to release lock {}: {}", token.key, e),
        }
    }
}

/// Used when no shared cache is configured.
pub struct NoopLock;

#[async_trait]
impl AdvisoryLock for NoopLock {
    async fn acquire(&self, _key: &str, _ttl: Duration) -> LockAttempt {
        LockAttempt::Unavailable
    }

    async fn release(&self, _token: LockToken) {}
}

/// Runs work under a best-effort lock. Lock failures never reach the caller.
#[derive(Clone)]
pub struct LockCoordinator {
    lock: Arc<dyn AdvisoryLock>,
}

impl LockCoordinator {
    pub fn new(lock: Arc<dyn AdvisoryLock>) -> Self {
        Self { lock }
    }

    pub async fn with_lock<T, F, Fut>(&self, key: &str, ttl: Duration, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let started = Instant::now();
        let token = match self.lock.acquire(key, ttl).await {
            LockAttempt::Acquired(token) => Some(token),
            LockAttempt::Contended => {
                debug!("Lock {} contended, proceeding unlocked", key);
                None
            }
            LockAttempt::Unavailable => {
                debug!("Lock {} unavailable, proceeding unlocked", key);
                None
            }
        };

        let result = work().await;

        if let Some(token) = token {
            if started.elapsed() < ttl {
                self.lock.release(token).await;
            } else {
                debug!("Lock {} outlived its TTL, not releasing", key);
            }
        }

        result
    }
}
