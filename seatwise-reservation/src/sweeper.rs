use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use seatwise_core::{IdempotencyStore, StateStore, StoreResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired_reservations: u64,
    pub released_seats: u64,
    pub purged_idempotency_records: u64,
    /// Another cycle was still running in this process.
    pub skipped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    pub pending_expired: u64,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Reclaims seats whose hold window lapsed without a confirm.
///
/// The running flag only stops overlapping cycles inside one process. Sweepers in
/// different processes may overlap; every statement they issue is precondition-guarded.
pub struct ExpirationSweeper {
    store: Arc<dyn StateStore>,
    idempotency: Arc<dyn IdempotencyStore>,
    interval: Duration,
    running: AtomicBool,
}

impl ExpirationSweeper {
    pub fn new(store: Arc<dyn StateStore>, idempotency: Arc<dyn IdempotencyStore>, interval: Duration) -> Self {
        Self {
            store,
            idempotency,
            interval,
            running: AtomicBool::new(false),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn run_cycle(&self) -> StoreResult<SweepReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// One sweep treating everything that expired before `cutoff` as overdue.
    pub async fn run_cycle_at(&self, cutoff: DateTime<Utc>) -> StoreResult<SweepReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Expiration sweep already running, skipping");
            return Ok(SweepReport {
                skipped: true,
                ..Default::default()
            });
        }
        let _guard = RunningGuard(&self.running);
        let started = Instant::now();

        let mut tx = self.store.begin().await?;
        let expired = tx.expire_overdue(cutoff).await?;
        let ids: Vec<Uuid> = expired.iter().map(|r| r.id).collect();
        let released = tx.release_seats_held_by(&ids).await?;
        tx.commit().await?;

        for reservation in &expired {
            debug!("Reservation {} expired (seat {})", reservation.id, reservation.seat_id);
        }
        if released.len() != expired.len() {
            warn!(
                "Expired {} reservations but released {} seats",
                expired.len(),
                released.len()
            );
        }

        let purged = match self.idempotency.purge_expired(cutoff).await {
            Ok(purged) => purged,
            Err(e) => {
                warn!("Failed to purge expired idempotency records: {}", e);
                0
            }
        };

        let report = SweepReport {
            expired_reservations: expired.len() as u64,
            released_seats: released.len() as u64,
            purged_idempotency_records: purged,
            skipped: false,
        };

        if report.expired_reservations > 0 {
            info!(
                "Sweep done in {:?} | Expired: {} | Released seats: {} | Purged keys: {}",
                started.elapsed(),
                report.expired_reservations,
                report.released_seats,
                report.purged_idempotency_records
            );
        } else {
            debug!("Sweep done in {:?} | Nothing to clean", started.elapsed());
        }

        Ok(report)
    }

    pub async fn stats(&self) -> StoreResult<SweepStats> {
        let pending_expired = self.store.count_overdue(Utc::now()).await?;
        Ok(SweepStats { pending_expired })
    }

    /// Sweeps immediately, then once per interval until `shutdown` flips to true.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("Expiration sweeper started, interval {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!("Expiration sweep failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Expiration sweeper stopping");
                        break;
                    }
                }
            }
        }
    }
}
