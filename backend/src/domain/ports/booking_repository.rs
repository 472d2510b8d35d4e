//! Port for booking persistence and occupancy queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::Booking;

use super::define_port_error;

define_port_error! {
    /// Errors raised by booking repository adapters.
    pub enum BookingRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "booking repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "booking repository query failed: {message}",
        /// The storage-level no-overlap guard rejected the insert.
        ActiveOverlap { room_id: Uuid } =>
            "an active booking already occupies room {room_id} in this window",
        /// Conditional update lost a version race or targeted a missing row.
        VersionConflict { booking_id: Uuid } =>
            "booking {booking_id} was modified concurrently",
    }
}

/// Port for writing bookings and answering occupancy queries.
///
/// `insert` must enforce the room no-overlap invariant at the storage layer;
/// the service-level availability check is advisory only, since two
/// concurrent creates race on it. `update` must be conditional on
/// [`Booking::version`] and bump it on success.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persist a new booking, failing with [`BookingRepositoryError::ActiveOverlap`]
    /// when an active booking already occupies the room in the window.
    async fn insert(&self, booking: &Booking) -> Result<(), BookingRepositoryError>;

    /// Conditionally update a booking; returns the stored row with its
    /// bumped version.
    async fn update(&self, booking: &Booking) -> Result<Booking, BookingRepositoryError>;

    /// Find a booking by id.
    async fn find_by_id(&self, booking_id: Uuid)
    -> Result<Option<Booking>, BookingRepositoryError>;

    /// Active (pending/confirmed) bookings on `room_id` intersecting the
    /// half-open window, excluding `exclude` when checking an update.
    async fn active_overlapping_for_room(
        &self,
        room_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingRepositoryError>;

    /// Active bookings intersecting the window that reserve units of
    /// `equipment_id`.
    async fn active_overlapping_using_equipment(
        &self,
        equipment_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingRepositoryError>;

    /// Active bookings intersecting the window that reserve units of
    /// `makeup_room_id`.
    async fn active_overlapping_using_makeup_room(
        &self,
        makeup_room_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingRepositoryError>;
}

/// Narrow read-only seam for collaborators that must re-read booking state
/// at fire time without gaining mutation access. The notification side
/// depends on reads only, which breaks the booking/notification cycle.
#[async_trait]
pub trait BookingReader: Send + Sync {
    /// Fetch the current booking state.
    async fn booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingRepositoryError>;
}

#[async_trait]
impl<T: BookingRepository> BookingReader for T {
    async fn booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingRepositoryError> {
        self.find_by_id(booking_id).await
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;

    #[actix_rt::test]
    async fn any_repository_serves_as_a_reader() {
        let booking_id = Uuid::new_v4();
        let mut repository = MockBookingRepository::new();
        repository
            .expect_find_by_id()
            .with(eq(booking_id))
            .returning(|_| Ok(None));

        let reader: &dyn BookingReader = &repository;
        let found = reader.booking(booking_id).await.expect("lookup succeeds");
        assert!(found.is_none());
    }
}
