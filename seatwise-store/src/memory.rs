//! In-process backends with the same contracts as Postgres and Redis.
//!
//! Used when the fast cache is disabled and by every test that needs a store without
//! infrastructure. A [`MemoryTransaction`] holds the table lock for its whole lifetime,
//! so transactions are fully serialized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use uuid::Uuid;

use seatwise_core::{
    messages, CacheError, CacheResult, CreateReservation, FastCache, IdempotencyRecord,
    IdempotencyStore, InsertOutcome, NewReservation, NewSeat, Page, Reservation,
    ReservationQuery, ReservationStatus, Seat, SeatCounts, SeatQuery, SeatStatus, StateStore,
    StoreError, StoreResult, StoreTransaction,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    seats: HashMap<Uuid, Seat>,
    reservations: HashMap<Uuid, Reservation>,
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("memory store switched off".to_string())
}

fn paginate<T>(mut items: Vec<T>, page: u32, limit: u32, offset: u64) -> Page<T> {
    let total = items.len() as u64;
    let start = (offset as usize).min(items.len());
    let end = (start + limit as usize).min(items.len());
    let items = items.drain(start..end).collect();
    Page { items, total, page, limit }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While unavailable every call fails with `StoreError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    /// Writes a seat as-is, bypassing every precondition.
    pub async fn put_seat(&self, seat: Seat) {
        self.tables.lock().await.seats.insert(seat.id, seat);
    }

    /// Writes a reservation as-is, bypassing every precondition.
    pub async fn put_reservation(&self, reservation: Reservation) {
        self.tables.lock().await.reservations.insert(reservation.id, reservation);
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        self.check()?;
        let guard = self.tables.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            snapshot: Some(snapshot),
            offline: self.offline.clone(),
        }))
    }

    async fn get_seat(&self, id: Uuid) -> StoreResult<Option<Seat>> {
        self.check()?;
        Ok(self.tables.lock().await.seats.get(&id).cloned())
    }

    async fn find_seat_by_number(&self, seat_number: &str) -> StoreResult<Option<Seat>> {
        self.check()?;
        let wanted = seat_number.trim().to_uppercase();
        let tables = self.tables.lock().await;
        Ok(tables
            .seats
            .values()
            .find(|s| s.is_active && s.seat_number == wanted)
            .cloned())
    }

    async fn list_seats(&self, query: &SeatQuery) -> StoreResult<Page<Seat>> {
        self.check()?;
        let row = query.row_filter();
        let tables = self.tables.lock().await;
        let mut seats: Vec<Seat> = tables
            .seats
            .values()
            .filter(|s| s.is_active)
            .filter(|s| query.status.map_or(true, |status| s.status == status))
            .filter(|s| row.as_deref().map_or(true, |r| s.row == r))
            .filter(|s| query.section.as_deref().map_or(true, |sec| s.section == sec))
            .cloned()
            .collect();
        seats.sort_by(|a, b| a.seat_number.cmp(&b.seat_number));

        Ok(paginate(seats, query.page(), query.limit(), query.offset()))
    }

    async fn count_seats_by_status(&self) -> StoreResult<SeatCounts> {
        self.check()?;
        let tables = self.tables.lock().await;
        let mut counts = SeatCounts::default();
        for seat in tables.seats.values().filter(|s| s.is_active) {
            counts.add(seat.status, 1);
        }
        Ok(counts)
    }

    async fn create_seat(&self, new_seat: NewSeat) -> StoreResult<Seat> {
        self.check()?;
        let seat = new_seat.into_seat(Utc::now());
        let mut tables = self.tables.lock().await;
        if tables.seats.values().any(|s| s.seat_number == seat.seat_number) {
            return Err(StoreError::Constraint(messages::SEAT_NUMBER_TAKEN.to_string()));
        }
        tables.seats.insert(seat.id, seat.clone());
        Ok(seat)
    }

    async fn get_reservation(&self, id: Uuid) -> StoreResult<Option<Reservation>> {
        self.check()?;
        Ok(self.tables.lock().await.reservations.get(&id).cloned())
    }

    async fn list_reservations(&self, query: &ReservationQuery) -> StoreResult<Page<Reservation>> {
        self.check()?;
        let tables = self.tables.lock().await;
        let mut reservations: Vec<Reservation> = tables
            .reservations
            .values()
            .filter(|r| query.status.map_or(true, |status| r.status == status))
            .filter(|r| query.user_id.as_deref().map_or(true, |u| r.user_id == u))
            .cloned()
            .collect();
        reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(paginate(reservations, query.page(), query.limit(), query.offset()))
    }

    async fn count_overdue(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Pending && r.expires_at < now)
            .count() as u64)
    }
}

/// Holds the table lock; uncommitted changes are undone on rollback or drop.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    snapshot: Option<Tables>,
    offline: Arc<AtomicBool>,
}

impl MemoryTransaction {
    fn check(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    fn transition_seat(
        &mut self,
        seat_id: Uuid,
        from: SeatStatus,
        update: impl FnOnce(&mut Seat),
    ) -> StoreResult<Option<Seat>> {
        self.check()?;
        let Some(seat) = self.guard.seats.get_mut(&seat_id) else {
            return Ok(None);
        };
        if seat.status != from {
            return Ok(None);
        }
        update(seat);
        seat.version += 1;
        seat.updated_at = Utc::now();
        Ok(Some(seat.clone()))
    }

    fn transition_reservation(
        &mut self,
        id: Uuid,
        precondition: impl FnOnce(&Reservation) -> bool,
        update: impl FnOnce(&mut Reservation),
    ) -> StoreResult<Option<Reservation>> {
        self.check()?;
        let Some(reservation) = self.guard.reservations.get_mut(&id) else {
            return Ok(None);
        };
        if reservation.status != ReservationStatus::Pending || !precondition(reservation) {
            return Ok(None);
        }
        update(reservation);
        Ok(Some(reservation.clone()))
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn reserve_seat(
        &mut self,
        seat_id: Uuid,
        reservation_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<Seat>> {
        if self.guard.seats.get(&seat_id).is_some_and(|s| !s.is_active) {
            return Ok(None);
        }
        self.transition_seat(seat_id, SeatStatus::Available, |seat| {
            seat.status = SeatStatus::Reserved;
            seat.expires_at = Some(expires_at);
            seat.current_reservation_id = Some(reservation_id);
        })
    }

    async fn confirm_seat(&mut self, seat_id: Uuid) -> StoreResult<Option<Seat>> {
        self.transition_seat(seat_id, SeatStatus::Reserved, |seat| {
            seat.status = SeatStatus::Confirmed;
            seat.expires_at = None;
        })
    }

    async fn release_seat(&mut self, seat_id: Uuid) -> StoreResult<Option<Seat>> {
        self.transition_seat(seat_id, SeatStatus::Reserved, |seat| {
            seat.status = SeatStatus::Available;
            seat.expires_at = None;
            seat.current_reservation_id = None;
        })
    }

    async fn reset_seat(&mut self, seat_id: Uuid) -> StoreResult<Option<Seat>> {
        self.transition_seat(seat_id, SeatStatus::Confirmed, |seat| {
            seat.status = SeatStatus::Available;
            seat.expires_at = None;
            seat.current_reservation_id = None;
        })
    }

    async fn create_reservation(&mut self, new_reservation: NewReservation) -> StoreResult<CreateReservation> {
        self.check()?;
        let reservation = new_reservation.into_pending(Utc::now());

        if !self.guard.seats.contains_key(&reservation.seat_id) {
            return Err(StoreError::Constraint(format!(
                "reservation references unknown seat {}",
                reservation.seat_id
            )));
        }

        let duplicate = self.guard.reservations.values().any(|existing| {
            (existing.seat_id == reservation.seat_id && existing.status == ReservationStatus::Pending)
                || (reservation.idempotency_key.is_some()
                    && existing.idempotency_key == reservation.idempotency_key)
        });
        if duplicate {
            return Ok(CreateReservation::DuplicateActive);
        }

        self.guard.reservations.insert(reservation.id, reservation.clone());
        Ok(CreateReservation::Created(reservation))
    }

    async fn find_reservation(&mut self, id: Uuid) -> StoreResult<Option<Reservation>> {
        self.check()?;
        Ok(self.guard.reservations.get(&id).cloned())
    }

    async fn confirm_reservation(
        &mut self,
        id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Reservation>> {
        self.transition_reservation(
            id,
            |r| r.user_id == user_id && r.expires_at > now,
            |r| {
                r.status = ReservationStatus::Confirmed;
                r.confirmed_at = Some(now);
                r.updated_at = now;
            },
        )
    }

    async fn cancel_reservation(
        &mut self,
        id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Reservation>> {
        self.transition_reservation(
            id,
            |r| r.user_id == user_id,
            |r| {
                r.status = ReservationStatus::Cancelled;
                r.cancelled_at = Some(now);
                r.updated_at = now;
            },
        )
    }

    async fn expire_overdue(&mut self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Reservation>> {
        self.check()?;
        let now = Utc::now();
        let mut expired = Vec::new();
        for reservation in self.guard.reservations.values_mut() {
            if reservation.status == ReservationStatus::Pending && reservation.expires_at < cutoff {
                reservation.status = ReservationStatus::Expired;
                reservation.updated_at = now;
                expired.push(reservation.clone());
            }
        }
        Ok(expired)
    }

    async fn release_seats_held_by(&mut self, reservation_ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        self.check()?;
        let now = Utc::now();
        let mut released = Vec::new();
        for seat in self.guard.seats.values_mut() {
            let held = seat
                .current_reservation_id
                .is_some_and(|id| reservation_ids.contains(&id));
            if seat.status == SeatStatus::Reserved && held {
                seat.status = SeatStatus::Available;
                seat.expires_at = None;
                seat.current_reservation_id = None;
                seat.version += 1;
                seat.updated_at = now;
                released.push(seat.id);
            }
        }
        Ok(released)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.check()?;
        let mut tx = self;
        tx.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        // Drop restores the snapshot
        Ok(())
    }
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

const MAX_CACHE_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl).unwrap_or(now + MAX_CACHE_TTL)
}

/// Process-local [`FastCache`]. `offline()` builds one that is permanently unreachable.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        let cache = Self::default();
        cache.set_available(false);
        cache
    }

    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> CacheResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("memory cache switched off".to_string()))
        } else {
            Ok(())
        }
    }

    /// Live keys, for assertions.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl FastCache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check()?;
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.check()?;
        self.entries.lock().await.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: deadline(Instant::now(), ttl),
            },
        );
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        self.check()?;
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        if entries.get(key).is_some_and(|e| e.expires_at > now) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: deadline(now, ttl),
            },
        );
        Ok(true)
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.check()?;
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn del_if_eq(&self, key: &str, expected: &str) -> CacheResult<bool> {
        self.check()?;
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now && entry.value == expected => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryIdempotencyStore {
    records: Arc<Mutex<HashMap<String, IdempotencyRecord>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory idempotency store switched off".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl IdempotencyStore for MemoryIdempotencyStore {
    async fn find(&self, key: &str) -> StoreResult<Option<IdempotencyRecord>> {
        self.check()?;
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn insert(&self, record: IdempotencyRecord) -> StoreResult<InsertOutcome> {
        self.check()?;
        let mut records = self.records.lock().await;
        let now = Utc::now();
        if let Some(existing) = records.get(&record.key) {
            if !existing.is_expired(now) {
                return Ok(InsertOutcome::Existing(existing.clone()));
            }
        }
        records.insert(record.key.clone(), record.clone());
        Ok(InsertOutcome::Inserted(record))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check()?;
        self.records.lock().await.remove(key);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.check()?;
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, r| r.expires_at >= now);
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatwise_core::StoredResponse;

    async fn seeded() -> (MemoryStore, Seat) {
        let store = MemoryStore::new();
        let seat = store
            .create_seat(NewSeat {
                seat_number: "a1".to_string(),
                row: "a".to_string(),
                section: None,
                price: Some(2500),
            })
            .await
            .unwrap();
        (store, seat)
    }

    fn pending_for(seat_id: Uuid, key: Option<&str>) -> NewReservation {
        NewReservation {
            id: Uuid::new_v4(),
            seat_id,
            user_id: "user-1".to_string(),
            expires_at: Utc::now() + chrono::Duration::seconds(120),
            idempotency_key: key.map(str::to_string),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_reserve_is_compare_and_swap() {
        let (store, seat) = seeded().await;
        let expires_at = Utc::now() + chrono::Duration::seconds(120);

        let mut tx = store.begin().await.unwrap();
        let held = tx.reserve_seat(seat.id, Uuid::new_v4(), expires_at).await.unwrap().unwrap();
        assert_eq!(held.status, SeatStatus::Reserved);
        assert_eq!(held.version, seat.version + 1);
        assert!(tx.reserve_seat(seat.id, Uuid::new_v4(), expires_at).await.unwrap().is_none());
        tx.commit().await.unwrap();

        let stored = store.get_seat(seat.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.expires_at, Some(expires_at));
    }

    #[tokio::test]
    async fn test_uncommitted_changes_are_discarded() {
        let (store, seat) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        tx.reserve_seat(seat.id, Uuid::new_v4(), Utc::now()).await.unwrap();
        tx.create_reservation(pending_for(seat.id, None)).await.unwrap();
        tx.rollback().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.reserve_seat(seat.id, Uuid::new_v4(), Utc::now()).await.unwrap();
            // dropped without commit
        }

        let stored = store.get_seat(seat.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SeatStatus::Available);
        assert_eq!(stored.version, 0);
        assert_eq!(store.list_reservations(&ReservationQuery::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_one_pending_reservation_per_seat() {
        let (store, seat) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let first = tx.create_reservation(pending_for(seat.id, Some("k1"))).await.unwrap();
        assert!(matches!(first, CreateReservation::Created(_)));
        let second = tx.create_reservation(pending_for(seat.id, Some("k2"))).await.unwrap();
        assert_eq!(second, CreateReservation::DuplicateActive);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_seat_numbers_are_unique() {
        let (store, _) = seeded().await;
        let err = store
            .create_seat(NewSeat {
                seat_number: "A1 ".to_string(),
                row: "A".to_string(),
                section: None,
                price: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_sweep_statements_release_only_matching_holds() {
        let (store, seat) = seeded().await;
        let past = Utc::now() - chrono::Duration::seconds(5);
        let mut overdue = pending_for(seat.id, None);
        overdue.expires_at = past;
        let overdue_id = overdue.id;

        let mut tx = store.begin().await.unwrap();
        tx.reserve_seat(seat.id, overdue_id, past).await.unwrap();
        tx.create_reservation(overdue).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let expired = tx.expire_overdue(Utc::now()).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert!(tx.release_seats_held_by(&[Uuid::new_v4()]).await.unwrap().is_empty());
        assert_eq!(tx.release_seats_held_by(&[overdue_id]).await.unwrap(), vec![seat.id]);
        tx.commit().await.unwrap();

        let stored = store.get_seat(seat.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SeatStatus::Available);
        assert_eq!(stored.version, 2);
        assert!(stored.current_reservation_id.is_none());
    }

    #[tokio::test]
    async fn test_offline_store_reports_unavailable() {
        let (store, seat) = seeded().await;
        store.set_available(false);

        let err = store.get_seat(seat.id).await.unwrap_err();
        assert!(err.is_transient());
        assert!(store.begin().await.is_err());

        store.set_available(true);
        assert!(store.get_seat(seat.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_listing_filters_and_pages() {
        let store = MemoryStore::new();
        for (number, row) in [("A1", "A"), ("A2", "A"), ("B1", "B")] {
            store
                .create_seat(NewSeat {
                    seat_number: number.to_string(),
                    row: row.to_string(),
                    section: None,
                    price: None,
                })
                .await
                .unwrap();
        }

        let page = store
            .list_seats(&SeatQuery { row: Some("a".to_string()), limit: Some(1), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].seat_number, "A1");

        let counts = store.count_seats_by_status().await.unwrap();
        assert_eq!(counts.available, 3);
        assert_eq!(counts.total, 3);
    }

    #[tokio::test]
    async fn test_cache_respects_ttl_and_owner() {
        let cache = MemoryCache::new();
        assert!(cache.set_nx_ex("lock:s1", "owner-a", Duration::from_secs(5)).await.unwrap());
        assert!(!cache.set_nx_ex("lock:s1", "owner-b", Duration::from_secs(5)).await.unwrap());
        assert!(!cache.del_if_eq("lock:s1", "owner-b").await.unwrap());
        assert!(cache.del_if_eq("lock:s1", "owner-a").await.unwrap());

        cache.set_ex("k", "v", Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);

        let offline = MemoryCache::offline();
        assert!(matches!(offline.get("k").await, Err(CacheError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_idempotency_first_writer_wins() {
        let store = MemoryIdempotencyStore::new();
        let now = Utc::now();
        let record = |body: &str, expires_at| IdempotencyRecord {
            key: "key-1".to_string(),
            method: "POST".to_string(),
            path: "/api/seats/reserve".to_string(),
            response: StoredResponse { status_code: 201, body: body.to_string() },
            user_id: Some("user-1".to_string()),
            expires_at,
            created_at: now,
        };

        let first = store.insert(record("first", now + chrono::Duration::hours(1))).await.unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));
        let second = store.insert(record("second", now + chrono::Duration::hours(1))).await.unwrap();
        assert_eq!(second.into_record().response.body, "first");

        assert_eq!(store.purge_expired(now + chrono::Duration::hours(2)).await.unwrap(), 1);
        assert!(store.is_empty().await);
    }
}
