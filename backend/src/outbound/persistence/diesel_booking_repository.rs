//! PostgreSQL-backed `BookingRepository` using Diesel.
//!
//! The room no-overlap invariant is enforced by a btree_gist exclusion
//! constraint over `(room_id, tstzrange(starts_at, ends_at))` for occupying
//! statuses; a violation surfaces here as `ActiveOverlap`. Updates are
//! guarded by the `version` column and bump it on success.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{BookingRepository, BookingRepositoryError};
use crate::domain::{
    Booking, BookingStatus, EquipmentSelection, MakeupRoomSelection, PaymentMethod, PaymentStatus,
};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{BookingRow, BookingUpdate, NewBookingRow};
use super::pool::DbPool;
use super::schema::bookings;

/// Diesel-backed implementation of the `BookingRepository` port.
#[derive(Clone)]
pub struct DieselBookingRepository {
    pool: DbPool,
}

impl DieselBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn connection(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::bb8::PooledConnection<
            '_,
            diesel_async::AsyncPgConnection,
        >,
        BookingRepositoryError,
    > {
        self.pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, BookingRepositoryError::connection))
    }
}

fn map_error(error: DieselError) -> BookingRepositoryError {
    map_diesel_error(
        error,
        BookingRepositoryError::query,
        BookingRepositoryError::connection,
    )
}

fn map_insert_error(error: DieselError, room_id: Uuid) -> BookingRepositoryError {
    match &error {
        DieselError::DatabaseError(DatabaseErrorKind::ExclusionViolation, _) => {
            BookingRepositoryError::active_overlap(room_id)
        }
        _ => map_error(error),
    }
}

fn row_to_booking(row: BookingRow) -> Result<Booking, BookingRepositoryError> {
    let parse = |message: String| BookingRepositoryError::query(message);
    let equipment: Vec<EquipmentSelection> = serde_json::from_value(row.equipment)
        .map_err(|err| parse(format!("equipment selections: {err}")))?;
    let makeup_rooms: Vec<MakeupRoomSelection> = serde_json::from_value(row.makeup_rooms)
        .map_err(|err| parse(format!("makeup room selections: {err}")))?;
    Ok(Booking {
        id: row.id,
        user_id: row.user_id,
        room_id: row.room_id,
        equipment,
        makeup_rooms,
        starts_at: row.starts_at,
        ends_at: row.ends_at,
        status: BookingStatus::from_str(&row.status)
            .map_err(|err| parse(err.to_string()))?,
        payment_status: PaymentStatus::from_str(&row.payment_status)
            .map_err(|err| parse(err.to_string()))?,
        is_half_paid: row.is_half_paid,
        payment_method: PaymentMethod::from_str(&row.payment_method)
            .map_err(|err| parse(err.to_string()))?,
        original_price: row.original_price,
        total_price: row.total_price,
        discount: row.discount,
        paid_amount: row.paid_amount,
        people_count: u32::try_from(row.people_count).unwrap_or_default(),
        promo_code: row.promo_code,
        cancelled_at: row.cancelled_at,
        cancellation_reason: row.cancellation_reason,
        created_at: row.created_at,
        version: row.version,
    })
}

fn booking_to_row(booking: &Booking) -> Result<NewBookingRow, BookingRepositoryError> {
    let serialize = |message: String| BookingRepositoryError::query(message);
    Ok(NewBookingRow {
        id: booking.id,
        user_id: booking.user_id,
        room_id: booking.room_id,
        equipment: serde_json::to_value(&booking.equipment)
            .map_err(|err| serialize(err.to_string()))?,
        makeup_rooms: serde_json::to_value(&booking.makeup_rooms)
            .map_err(|err| serialize(err.to_string()))?,
        starts_at: booking.starts_at,
        ends_at: booking.ends_at,
        status: booking.status.as_str().to_owned(),
        payment_status: booking.payment_status.as_str().to_owned(),
        is_half_paid: booking.is_half_paid,
        payment_method: booking.payment_method.as_str().to_owned(),
        original_price: booking.original_price,
        total_price: booking.total_price,
        discount: booking.discount,
        paid_amount: booking.paid_amount,
        people_count: i32::try_from(booking.people_count).unwrap_or(i32::MAX),
        promo_code: booking.promo_code.clone(),
        cancelled_at: booking.cancelled_at,
        cancellation_reason: booking.cancellation_reason.clone(),
        created_at: booking.created_at,
        version: booking.version,
    })
}

fn booking_to_update(booking: &Booking) -> Result<BookingUpdate, BookingRepositoryError> {
    let serialize = |message: String| BookingRepositoryError::query(message);
    Ok(BookingUpdate {
        equipment: serde_json::to_value(&booking.equipment)
            .map_err(|err| serialize(err.to_string()))?,
        makeup_rooms: serde_json::to_value(&booking.makeup_rooms)
            .map_err(|err| serialize(err.to_string()))?,
        status: booking.status.as_str().to_owned(),
        payment_status: booking.payment_status.as_str().to_owned(),
        is_half_paid: booking.is_half_paid,
        payment_method: booking.payment_method.as_str().to_owned(),
        original_price: booking.original_price,
        total_price: booking.total_price,
        discount: booking.discount,
        paid_amount: booking.paid_amount,
        promo_code: booking.promo_code.clone(),
        cancelled_at: booking.cancelled_at,
        cancellation_reason: booking.cancellation_reason.clone(),
        version: booking.version + 1,
    })
}

/// Occupying statuses as stored.
const ACTIVE_STATUSES: [&str; 2] = ["pending", "confirmed"];

#[async_trait]
impl BookingRepository for DieselBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), BookingRepositoryError> {
        let row = booking_to_row(booking)?;
        let mut conn = self.connection().await?;
        diesel::insert_into(bookings::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|err| map_insert_error(err, booking.room_id))?;
        Ok(())
    }

    async fn update(&self, booking: &Booking) -> Result<Booking, BookingRepositoryError> {
        let changes = booking_to_update(booking)?;
        let mut conn = self.connection().await?;
        let stored: Option<BookingRow> = diesel::update(
            bookings::table
                .filter(bookings::id.eq(booking.id))
                .filter(bookings::version.eq(booking.version)),
        )
        .set(&changes)
        .returning(BookingRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(|err| map_insert_error(err, booking.room_id))?;

        match stored {
            Some(row) => row_to_booking(row),
            None => Err(BookingRepositoryError::version_conflict(booking.id)),
        }
    }

    async fn find_by_id(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, BookingRepositoryError> {
        let mut conn = self.connection().await?;
        let row: Option<BookingRow> = bookings::table
            .filter(bookings::id.eq(booking_id))
            .select(BookingRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        row.map(row_to_booking).transpose()
    }

    async fn active_overlapping_for_room(
        &self,
        room_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        let mut conn = self.connection().await?;
        let mut query = bookings::table
            .filter(bookings::room_id.eq(room_id))
            .filter(bookings::status.eq_any(ACTIVE_STATUSES))
            .filter(bookings::starts_at.lt(ends_at))
            .filter(bookings::ends_at.gt(starts_at))
            .select(BookingRow::as_select())
            .into_boxed();
        if let Some(excluded) = exclude {
            query = query.filter(bookings::id.ne(excluded));
        }
        let rows: Vec<BookingRow> = query.load(&mut conn).await.map_err(map_error)?;
        rows.into_iter().map(row_to_booking).collect()
    }

    async fn active_overlapping_using_equipment(
        &self,
        equipment_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        let overlapping = self
            .active_overlapping_window(starts_at, ends_at, exclude)
            .await?;
        Ok(overlapping
            .into_iter()
            .filter(|booking| {
                booking
                    .equipment
                    .iter()
                    .any(|item| item.equipment_id == equipment_id)
            })
            .collect())
    }

    async fn active_overlapping_using_makeup_room(
        &self,
        makeup_room_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        let overlapping = self
            .active_overlapping_window(starts_at, ends_at, exclude)
            .await?;
        Ok(overlapping
            .into_iter()
            .filter(|booking| {
                booking
                    .makeup_rooms
                    .iter()
                    .any(|item| item.makeup_room_id == makeup_room_id)
            })
            .collect())
    }
}

impl DieselBookingRepository {
    /// Selection membership lives in jsonb, so item usage is filtered in
    /// Rust over the window's active bookings.
    async fn active_overlapping_window(
        &self,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        let mut conn = self.connection().await?;
        let mut query = bookings::table
            .filter(bookings::status.eq_any(ACTIVE_STATUSES))
            .filter(bookings::starts_at.lt(ends_at))
            .filter(bookings::ends_at.gt(starts_at))
            .select(BookingRow::as_select())
            .into_boxed();
        if let Some(excluded) = exclude {
            query = query.filter(bookings::id.ne(excluded));
        }
        let rows: Vec<BookingRow> = query.load(&mut conn).await.map_err(map_error)?;
        rows.into_iter().map(row_to_booking).collect()
    }
}
