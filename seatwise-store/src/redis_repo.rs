use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use seatwise_core::{CacheError, CacheResult, FastCache};

use crate::app_config::RedisConfig;

const COMPARE_AND_DELETE: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("DEL", KEYS[1])
    else
        return 0
    end
"#;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
    conn: Arc<Mutex<Option<MultiplexedConnection>>>,
    operation_timeout: Duration,
}

impl RedisClient {
    pub fn new(config: &RedisConfig) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(config.url.as_str())?;
        info!("Redis client configured for {}", config.url);
        Ok(Self {
            client,
            conn: Arc::new(Mutex::new(None)),
            operation_timeout: config.operation_timeout(),
        })
    }

    pub async fn ping(&self) -> bool {
        self.run(|mut conn| async move { redis::cmd("PING").query_async::<String>(&mut conn).await })
            .await
            .is_ok()
    }

    async fn connection(&self) -> redis::RedisResult<MultiplexedConnection> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_multiplexed_async_connection().await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Runs one round trip on the shared connection under the operation timeout.
    /// Any failure drops the connection so the next call reconnects.
    async fn run<T, F, Fut>(&self, op: F) -> CacheResult<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let attempt = async {
            let conn = self.connection().await?;
            op(conn).await
        };

        let result = match tokio::time::timeout(self.operation_timeout, attempt).await {
            Ok(result) => result.map_err(cache_error),
            Err(_) => Err(CacheError::Timeout),
        };

        if let Err(e) = &result {
            debug!("Redis operation failed, resetting connection: {}", e);
            *self.conn.lock().await = None;
        }
        result
    }
}

fn cache_error(err: redis::RedisError) -> CacheError {
    if err.is_timeout() {
        CacheError::Timeout
    } else {
        CacheError::Unavailable(err.to_string())
    }
}

fn millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl FastCache for RedisClient {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.run(|mut conn| async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.run(|mut conn| async move {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(millis(ttl))
                .query_async::<()>(&mut conn)
                .await
        })
        .await
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        // SET NX: Only set if key does not exist
        let result: Option<String> = self
            .run(|mut conn| async move {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("PX")
                    .arg(millis(ttl))
                    .query_async(&mut conn)
                    .await
            })
            .await?;

        debug!("SET NX {} -> {}", key, result.is_some());
        Ok(result.is_some())
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.run(|mut conn| async move { conn.del::<_, ()>(key).await })
            .await
    }

    async fn del_if_eq(&self, key: &str, expected: &str) -> CacheResult<bool> {
        let deleted: i64 = self
            .run(|mut conn| async move {
                redis::Script::new(COMPARE_AND_DELETE)
                    .key(key)
                    .arg(expected)
                    .invoke_async(&mut conn)
                    .await
            })
            .await?;

        Ok(deleted == 1)
    }
}
