use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use seatwise_core::{
    messages, NewSeat, Page, ReservationError, ReservationQuery, ReservationResult, SeatCounts,
    SeatQuery, StateStore, StoreError,
};

use crate::response::{ReservationView, SeatView};

/// Read side of the store plus the administrative seat operations.
#[derive(Clone)]
pub struct SeatInventory {
    store: Arc<dyn StateStore>,
}

impl SeatInventory {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub async fn list_seats(&self, query: &SeatQuery) -> ReservationResult<Page<SeatView>> {
        let now = Utc::now();
        let page = self.store.list_seats(query).await?;
        Ok(page.map(|seat| SeatView::at(seat, now)))
    }

    pub async fn get_seat(&self, id: Uuid) -> ReservationResult<SeatView> {
        self.store
            .get_seat(id)
            .await?
            .map(SeatView::from)
            .ok_or_else(|| ReservationError::not_found(messages::SEAT_NOT_FOUND))
    }

    pub async fn find_seat_by_number(&self, seat_number: &str) -> ReservationResult<SeatView> {
        self.store
            .find_seat_by_number(seat_number)
            .await?
            .map(SeatView::from)
            .ok_or_else(|| ReservationError::not_found(messages::SEAT_NOT_FOUND))
    }

    pub async fn seat_stats(&self) -> ReservationResult<SeatCounts> {
        Ok(self.store.count_seats_by_status().await?)
    }

    pub async fn list_reservations(&self, query: &ReservationQuery) -> ReservationResult<Page<ReservationView>> {
        let now = Utc::now();
        let page = self.store.list_reservations(query).await?;
        Ok(page.map(|r| ReservationView::at(r, now)))
    }

    pub async fn get_reservation(&self, id: Uuid) -> ReservationResult<ReservationView> {
        self.store
            .get_reservation(id)
            .await?
            .map(ReservationView::from)
            .ok_or_else(|| ReservationError::not_found(messages::RESERVATION_NOT_FOUND))
    }

    pub async fn create_seat(&self, seat: NewSeat) -> ReservationResult<SeatView> {
        if seat.seat_number.trim().is_empty() || seat.row.trim().is_empty() {
            return Err(ReservationError::Validation(
                "Seat number and row are required".to_string(),
            ));
        }

        match self.store.create_seat(seat).await {
            Ok(created) => {
                info!("Seat {} created in row {} ({})", created.seat_number, created.row, created.section);
                Ok(SeatView::from(created))
            }
            Err(StoreError::Constraint(_)) => Err(ReservationError::conflict(messages::SEAT_NUMBER_TAKEN)),
            Err(e) => Err(e.into()),
        }
    }

    /// CONFIRMED -> AVAILABLE. The only way a sold seat returns to sale.
    pub async fn reset_seat(&self, id: Uuid) -> ReservationResult<SeatView> {
        let mut tx = self.store.begin().await?;
        if let Some(seat) = tx.reset_seat(id).await? {
            tx.commit().await?;
            info!("Seat {} reset to AVAILABLE (version {})", seat.seat_number, seat.version);
            return Ok(SeatView::from(seat));
        }
        if let Err(e) = tx.rollback().await {
            warn!("Rollback failed: {}", e);
        }

        match self.store.get_seat(id).await? {
            Some(_) => Err(ReservationError::conflict(messages::SEAT_NOT_CONFIRMED)),
            None => Err(ReservationError::not_found(messages::SEAT_NOT_FOUND)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatwise_core::models::DEFAULT_SECTION;
    use seatwise_core::{ReservationStatus, SeatStatus};
    use seatwise_store::MemoryStore;

    fn new_seat(number: &str) -> NewSeat {
        NewSeat {
            seat_number: number.to_string(),
            row: number[..1].to_string(),
            section: None,
            price: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_read_seats() {
        let inventory = SeatInventory::new(Arc::new(MemoryStore::new()));

        let created = inventory.create_seat(new_seat("c3")).await.unwrap();
        assert_eq!(created.seat.seat_number, "C3");
        assert_eq!(created.seat.section, DEFAULT_SECTION);

        let err = inventory.create_seat(new_seat("C3")).await.unwrap_err();
        assert_eq!(err.to_string(), messages::SEAT_NUMBER_TAKEN);

        let found = inventory.find_seat_by_number("c3").await.unwrap();
        assert_eq!(found.seat.id, created.seat.id);
        assert!(inventory.get_seat(Uuid::new_v4()).await.is_err());

        let stats = inventory.seat_stats().await.unwrap();
        assert_eq!(stats.available, 1);
    }

    #[tokio::test]
    async fn test_blank_seat_definition_is_rejected() {
        let inventory = SeatInventory::new(Arc::new(MemoryStore::new()));
        let err = inventory
            .create_seat(NewSeat {
                seat_number: " ".to_string(),
                row: "A".to_string(),
                section: None,
                price: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_reset_only_applies_to_confirmed_seats() {
        let store = MemoryStore::new();
        let inventory = SeatInventory::new(Arc::new(store.clone()));
        let seat = inventory.create_seat(new_seat("A1")).await.unwrap().seat;

        let err = inventory.reset_seat(seat.id).await.unwrap_err();
        assert_eq!(err.to_string(), messages::SEAT_NOT_CONFIRMED);
        let err = inventory.reset_seat(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ReservationError::NotFound(_)));

        let mut sold = seat.clone();
        sold.status = SeatStatus::Confirmed;
        sold.version = 2;
        sold.current_reservation_id = Some(Uuid::new_v4());
        store.put_seat(sold).await;

        let reset = inventory.reset_seat(seat.id).await.unwrap();
        assert_eq!(reset.seat.status, SeatStatus::Available);
        assert_eq!(reset.seat.version, 3);
        assert!(reset.seat.current_reservation_id.is_none());
    }

    #[tokio::test]
    async fn test_reservation_listing_defaults() {
        let inventory = SeatInventory::new(Arc::new(MemoryStore::new()));
        let page = inventory
            .list_reservations(&ReservationQuery {
                status: Some(ReservationStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.limit, 20);
        assert_eq!(page.page, 1);
    }
}
