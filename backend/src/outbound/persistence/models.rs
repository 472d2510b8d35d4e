//! Internal Diesel row structs for database operations.
//!
//! Implementation details of the persistence layer; never exposed to the
//! domain. Selections are stored as jsonb and round-trip through serde.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    bookings, customers, equipment, makeup_rooms, notifications, promo_codes, rooms,
};

/// Row struct for reading from the bookings table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BookingRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub equipment: serde_json::Value,
    pub makeup_rooms: serde_json::Value,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: String,
    pub payment_status: String,
    pub is_half_paid: bool,
    pub payment_method: String,
    pub original_price: f64,
    pub total_price: f64,
    pub discount: f64,
    pub paid_amount: f64,
    pub people_count: i32,
    pub promo_code: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub version: i32,
}

/// Insertable struct for creating booking records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub(crate) struct NewBookingRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub equipment: serde_json::Value,
    pub makeup_rooms: serde_json::Value,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: String,
    pub payment_status: String,
    pub is_half_paid: bool,
    pub payment_method: String,
    pub original_price: f64,
    pub total_price: f64,
    pub discount: f64,
    pub paid_amount: f64,
    pub people_count: i32,
    pub promo_code: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub version: i32,
}

/// Changeset applied by version-guarded booking updates.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = bookings)]
pub(crate) struct BookingUpdate {
    pub equipment: serde_json::Value,
    pub makeup_rooms: serde_json::Value,
    pub status: String,
    pub payment_status: String,
    pub is_half_paid: bool,
    pub payment_method: String,
    pub original_price: f64,
    pub total_price: f64,
    pub discount: f64,
    pub paid_amount: f64,
    pub promo_code: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub version: i32,
}

/// Row struct for reading from the notifications table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NotificationRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub status: String,
    pub scheduled_for: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating notification records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notifications)]
pub(crate) struct NewNotificationRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub status: String,
    pub scheduled_for: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Changeset for notification delivery-state updates.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = notifications)]
pub(crate) struct NotificationUpdate {
    pub status: String,
    pub scheduled_for: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_error: Option<String>,
}

/// Row struct for reading from the rooms table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RoomRow {
    pub id: Uuid,
    pub name: String,
    pub weekday_morning_rate: Option<f64>,
    pub weekday_evening_rate: Option<f64>,
    pub weekend_rate: Option<f64>,
    pub default_rate: Option<f64>,
    pub is_deleted: bool,
}

/// Row struct for reading from the equipment table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = equipment)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EquipmentRow {
    pub id: Uuid,
    pub name: String,
    pub price_per_day: f64,
    pub total_quantity: i32,
    pub is_deleted: bool,
}

/// Row struct for reading from the makeup_rooms table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = makeup_rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MakeupRoomRow {
    pub id: Uuid,
    pub name: String,
    pub price_per_hour: f64,
    pub total_quantity: i32,
    pub is_deleted: bool,
}

/// Row struct for reading from the customers table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = customers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CustomerRow {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

/// Row struct for reading from the promo_codes table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = promo_codes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PromoCodeRow {
    pub code: String,
    pub discount_amount: f64,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
}
