//! Driving port exposing the booking use-cases to inbound adapters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::ports::PaymentIntent;
use crate::domain::{
    Booking, BookingStatus, EquipmentSelection, Error, MakeupRoomSelection, PaymentMethod,
};

/// Validated request for creating a booking.
#[derive(Debug, Clone)]
pub struct CreateBookingRequest {
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub equipment: Vec<EquipmentSelection>,
    pub makeup_rooms: Vec<MakeupRoomSelection>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub people_count: u32,
    pub promo_code: Option<String>,
}

/// Booking use-cases driven by HTTP handlers and the payment webhook.
///
/// Admin paths (status override, on-site payment, adding items) run through
/// the same pricing/availability/notification pipeline as creation rather
/// than through separate code paths with separate invariants.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingCommand: Send + Sync {
    /// Price, validate, persist, and schedule notifications for a booking.
    async fn create_booking(&self, request: CreateBookingRequest) -> Result<Booking, Error>;

    /// Record a confirmed payment amount against a booking.
    async fn register_payment(&self, booking_id: Uuid, amount: f64) -> Result<Booking, Error>;

    /// Record that the booking will be paid at the studio.
    async fn set_on_site_payment(
        &self,
        booking_id: Uuid,
        method: PaymentMethod,
    ) -> Result<Booking, Error>;

    /// Create a gateway payment intent for the outstanding amount.
    async fn start_online_payment(&self, booking_id: Uuid) -> Result<PaymentIntent, Error>;

    /// Apply a guarded status transition.
    async fn update_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> Result<Booking, Error>;

    /// Add equipment/makeup-room items to an existing booking, re-running
    /// availability checks and re-pricing the whole booking.
    async fn add_items(
        &self,
        booking_id: Uuid,
        equipment: Vec<EquipmentSelection>,
        makeup_rooms: Vec<MakeupRoomSelection>,
    ) -> Result<Booking, Error>;
}
