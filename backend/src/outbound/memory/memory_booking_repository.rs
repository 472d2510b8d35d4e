//! In-memory `BookingRepository` for local runs and integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::availability::windows_overlap;
use crate::domain::ports::{BookingRepository, BookingRepositoryError};
use crate::domain::Booking;

/// Shared-map booking store. Holds the lock across the overlap check and the
/// insert, which gives it the same no-overlap atomicity the Postgres
/// exclusion constraint provides.
#[derive(Default)]
pub struct MemoryBookingRepository {
    bookings: Mutex<HashMap<Uuid, Booking>>,
}

impl MemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Booking>>, BookingRepositoryError> {
        self.bookings
            .lock()
            .map_err(|_| BookingRepositoryError::connection("booking store lock poisoned"))
    }
}

fn overlaps_active(
    booking: &Booking,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> bool {
    if exclude == Some(booking.id) {
        return false;
    }
    booking.status.occupies()
        && windows_overlap(booking.starts_at, booking.ends_at, starts_at, ends_at)
}

#[async_trait]
impl BookingRepository for MemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), BookingRepositoryError> {
        let mut store = self.lock()?;
        let clash = store.values().any(|existing| {
            existing.room_id == booking.room_id
                && overlaps_active(existing, booking.starts_at, booking.ends_at, Some(booking.id))
        });
        if clash {
            return Err(BookingRepositoryError::active_overlap(booking.room_id));
        }
        store.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn update(&self, booking: &Booking) -> Result<Booking, BookingRepositoryError> {
        let mut store = self.lock()?;
        let stored = store
            .get_mut(&booking.id)
            .filter(|stored| stored.version == booking.version)
            .ok_or_else(|| BookingRepositoryError::version_conflict(booking.id))?;
        let mut next = booking.clone();
        next.version = booking.version + 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn find_by_id(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, BookingRepositoryError> {
        Ok(self.lock()?.get(&booking_id).cloned())
    }

    async fn active_overlapping_for_room(
        &self,
        room_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        Ok(self
            .lock()?
            .values()
            .filter(|booking| {
                booking.room_id == room_id
                    && overlaps_active(booking, starts_at, ends_at, exclude)
            })
            .cloned()
            .collect())
    }

    async fn active_overlapping_using_equipment(
        &self,
        equipment_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        Ok(self
            .lock()?
            .values()
            .filter(|booking| {
                overlaps_active(booking, starts_at, ends_at, exclude)
                    && booking
                        .equipment
                        .iter()
                        .any(|item| item.equipment_id == equipment_id)
            })
            .cloned()
            .collect())
    }

    async fn active_overlapping_using_makeup_room(
        &self,
        makeup_room_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        Ok(self
            .lock()?
            .values()
            .filter(|booking| {
                overlaps_active(booking, starts_at, ends_at, exclude)
                    && booking
                        .makeup_rooms
                        .iter()
                        .any(|item| item.makeup_room_id == makeup_room_id)
            })
            .cloned()
            .collect())
    }
}
