//! Occupancy checks over stored bookings.
//!
//! Rooms are exclusive: one active booking per window. Equipment and makeup
//! rooms are counted pools: concurrent bookings share units up to
//! `total_quantity`. All intervals are half-open, so a booking ending at
//! 14:00 never conflicts with one starting at 14:00.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::ports::{
    BookingRepository, BookingRepositoryError, CatalogueRepository, CatalogueRepositoryError,
};
use crate::domain::{Booking, Error};

/// Half-open interval intersection: `[a, b)` and `[c, d)` overlap iff
/// `a < d && c < b`.
///
/// # Examples
/// ```
/// use backend::domain::availability::windows_overlap;
/// use chrono::{TimeZone, Utc};
///
/// let at = |h| Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap();
/// assert!(windows_overlap(at(10), at(12), at(11), at(13)));
/// // Touching boundaries do not conflict.
/// assert!(!windows_overlap(at(10), at(12), at(12), at(14)));
/// ```
pub fn windows_overlap(
    a: DateTime<Utc>,
    b: DateTime<Utc>,
    c: DateTime<Utc>,
    d: DateTime<Utc>,
) -> bool {
    a < d && c < b
}

/// Availability gate run before any booking insert or item change.
#[derive(Clone)]
pub struct AvailabilityService<B, C> {
    bookings: Arc<B>,
    catalogue: Arc<C>,
}

fn map_booking_error(error: BookingRepositoryError) -> Error {
    match error {
        BookingRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("booking repository unavailable: {message}"))
        }
        other => Error::internal(format!("booking repository error: {other}")),
    }
}

fn map_catalogue_error(error: CatalogueRepositoryError) -> Error {
    match error {
        CatalogueRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("catalogue repository unavailable: {message}"))
        }
        other => Error::internal(format!("catalogue repository error: {other}")),
    }
}

impl<B, C> AvailabilityService<B, C>
where
    B: BookingRepository,
    C: CatalogueRepository,
{
    /// Create the service over its repositories.
    pub fn new(bookings: Arc<B>, catalogue: Arc<C>) -> Self {
        Self {
            bookings,
            catalogue,
        }
    }

    /// Ensure no active booking occupies `room_id` in the window.
    ///
    /// `exclude` skips the booking being updated so it never conflicts with
    /// itself. A missing room is `NotFound`; an occupied one is `Conflict`.
    pub async fn ensure_room_free(
        &self,
        room_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<(), Error> {
        self.catalogue
            .room(room_id)
            .await
            .map_err(map_catalogue_error)?
            .ok_or_else(|| Error::not_found(format!("room {room_id} does not exist")))?;

        let overlapping = self
            .bookings
            .active_overlapping_for_room(room_id, starts_at, ends_at, exclude)
            .await
            .map_err(map_booking_error)?;

        if overlapping.is_empty() {
            Ok(())
        } else {
            Err(
                Error::conflict("room is already booked for the requested window").with_details(
                    json!({
                        "roomId": room_id,
                        "conflictingBookings": overlapping.len(),
                    }),
                ),
            )
        }
    }

    /// Ensure `quantity` units of `equipment_id` remain free in the window.
    pub async fn ensure_equipment_capacity(
        &self,
        equipment_id: Uuid,
        quantity: u32,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<(), Error> {
        let equipment = self
            .catalogue
            .equipment_item(equipment_id)
            .await
            .map_err(map_catalogue_error)?
            .ok_or_else(|| Error::not_found(format!("equipment {equipment_id} does not exist")))?;

        let overlapping = self
            .bookings
            .active_overlapping_using_equipment(equipment_id, starts_at, ends_at, exclude)
            .await
            .map_err(map_booking_error)?;
        let reserved = reserved_equipment_units(&overlapping, equipment_id);

        ensure_capacity(
            "equipment",
            equipment_id,
            equipment.total_quantity,
            reserved,
            quantity,
        )
    }

    /// Ensure `quantity` units of `makeup_room_id` remain free in the window.
    pub async fn ensure_makeup_room_capacity(
        &self,
        makeup_room_id: Uuid,
        quantity: u32,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<(), Error> {
        let makeup_room = self
            .catalogue
            .makeup_room(makeup_room_id)
            .await
            .map_err(map_catalogue_error)?
            .ok_or_else(|| {
                Error::not_found(format!("makeup room {makeup_room_id} does not exist"))
            })?;

        let overlapping = self
            .bookings
            .active_overlapping_using_makeup_room(makeup_room_id, starts_at, ends_at, exclude)
            .await
            .map_err(map_booking_error)?;
        let reserved = reserved_makeup_units(&overlapping, makeup_room_id);

        ensure_capacity(
            "makeup room",
            makeup_room_id,
            makeup_room.total_quantity,
            reserved,
            quantity,
        )
    }
}

fn reserved_equipment_units(overlapping: &[Booking], equipment_id: Uuid) -> u32 {
    overlapping
        .iter()
        .flat_map(|booking| booking.equipment.iter())
        .filter(|selection| selection.equipment_id == equipment_id)
        .map(|selection| selection.quantity)
        .sum()
}

fn reserved_makeup_units(overlapping: &[Booking], makeup_room_id: Uuid) -> u32 {
    overlapping
        .iter()
        .flat_map(|booking| booking.makeup_rooms.iter())
        .filter(|selection| selection.makeup_room_id == makeup_room_id)
        .map(|selection| selection.quantity)
        .sum()
}

fn ensure_capacity(
    resource: &str,
    resource_id: Uuid,
    total: u32,
    reserved: u32,
    requested: u32,
) -> Result<(), Error> {
    let free = total.saturating_sub(reserved);
    if free >= requested {
        Ok(())
    } else {
        Err(
            Error::conflict(format!("{resource} capacity exceeded for the requested window"))
                .with_details(json!({
                    "resourceId": resource_id,
                    "totalQuantity": total,
                    "reserved": reserved,
                    "requested": requested,
                })),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap()
    }

    #[rstest]
    #[case::nested(at(10), at(14), at(11), at(12), true)]
    #[case::straddle_start(at(10), at(12), at(11), at(13), true)]
    #[case::identical(at(10), at(12), at(10), at(12), true)]
    #[case::disjoint(at(8), at(9), at(10), at(11), false)]
    #[case::touching(at(10), at(12), at(12), at(14), false)]
    fn overlap_predicate(
        #[case] a: DateTime<Utc>,
        #[case] b: DateTime<Utc>,
        #[case] c: DateTime<Utc>,
        #[case] d: DateTime<Utc>,
        #[case] expected: bool,
    ) {
        assert_eq!(windows_overlap(a, b, c, d), expected);
        // Overlap is symmetric in the two intervals.
        assert_eq!(windows_overlap(c, d, a, b), expected);
    }
}
