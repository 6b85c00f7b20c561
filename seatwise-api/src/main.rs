use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use seatwise_api::{app, state::AppState};
use seatwise_core::{AdvisoryLock, FastCache};
use seatwise_reservation::{CacheLock, NoopLock};
use seatwise_store::{
    app_config::Config, DbClient, MemoryCache, PgIdempotencyStore, PgStateStore, RedisClient,
};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "seatwise_api=debug,seatwise_reservation=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    for warning in config.warnings() {
        tracing::warn!("Config: {}", warning);
    }
    tracing::info!("Starting Seatwise API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;
    let store = Arc::new(PgStateStore::new(db.pool.clone()));
    let idempotency_store = Arc::new(PgIdempotencyStore::new(db.pool.clone()));

    // Redis is optional: without it locking is skipped and idempotency is served by Postgres
    let (cache, lock): (Arc<dyn FastCache>, Arc<dyn AdvisoryLock>) = if config.redis.enabled {
        let redis = RedisClient::new(&config.redis).context("Invalid Redis URL")?;
        if !redis.ping().await {
            tracing::warn!("Redis not reachable at startup; continuing degraded");
        }
        let cache: Arc<dyn FastCache> = Arc::new(redis);
        (cache.clone(), Arc::new(CacheLock::new(cache)))
    } else {
        tracing::warn!("Redis disabled; running without advisory locks");
        (Arc::new(MemoryCache::offline()), Arc::new(NoopLock))
    };

    let app_state = AppState::new(&config, store, idempotency_store, cache, lock);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(app_state.sweeper.clone().run(shutdown_rx));

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::error!("Expiration sweeper task failed: {}", e);
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
