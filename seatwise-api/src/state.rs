use std::sync::Arc;
use std::time::Duration;

use seatwise_core::{AdvisoryLock, FastCache, IdempotencyStore, StateStore};
use seatwise_reservation::{
    ExpirationSweeper, IdempotencyCache, LockCoordinator, ReservationCoordinator,
    ReservationRules, SeatInventory,
};
use seatwise_store::app_config::Config;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ReservationCoordinator>,
    pub inventory: SeatInventory,
    pub sweeper: Arc<ExpirationSweeper>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Wires the engine over whichever backends were selected.
    pub fn new(
        config: &Config,
        store: Arc<dyn StateStore>,
        idempotency_store: Arc<dyn IdempotencyStore>,
        cache: Arc<dyn FastCache>,
        lock: Arc<dyn AdvisoryLock>,
    ) -> Self {
        let rules = &config.reservation;
        let idempotency = Arc::new(IdempotencyCache::new(
            cache,
            idempotency_store.clone(),
            rules.idempotency_ttl(),
        ));

        let coordinator = Arc::new(ReservationCoordinator::new(
            store.clone(),
            idempotency,
            LockCoordinator::new(lock),
            ReservationRules::from(rules),
        ));
        let sweeper = Arc::new(ExpirationSweeper::new(
            store.clone(),
            idempotency_store,
            config.expiration.sweep_interval(),
        ));

        Self {
            coordinator,
            inventory: SeatInventory::new(store),
            sweeper,
            request_timeout: rules.request_timeout(),
        }
    }
}
