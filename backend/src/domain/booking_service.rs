//! Booking lifecycle orchestration.
//!
//! Owns the create → price → availability → persist → schedule sequence and
//! every later mutation (payments, status overrides, on-site payment, item
//! additions). Notification failures never roll back financial state: the
//! booking record is authoritative, messages are best effort.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::availability::AvailabilityService;
use crate::domain::catalogue::{Customer, Equipment, MakeupRoom, PromoCode, Room};
use crate::domain::money::round2;
use crate::domain::ports::{
    BookingCommand, BookingRepository, BookingRepositoryError, CatalogueRepository,
    CatalogueRepositoryError, CreateBookingRequest, NotificationSink, PaymentGateway,
    PaymentGatewayError, PaymentIntent,
};
use crate::domain::pricing::{PriceBreakdown, PriceCalculator};
use crate::domain::{
    Booking, BookingDraft, BookingStatus, EquipmentSelection, Error, MakeupRoomSelection,
    PaymentMethod,
};

/// Reason recorded when an administrator cancels through the status API.
const MANUAL_CANCELLATION_REASON: &str = "cancelled by administrator";

/// Booking use-case service; generic over its driven ports.
pub struct BookingService<B, C, G> {
    bookings: Arc<B>,
    catalogue: Arc<C>,
    gateway: Arc<G>,
    notifications: Arc<dyn NotificationSink>,
    availability: AvailabilityService<B, C>,
    calculator: PriceCalculator,
    clock: Arc<dyn Clock>,
}

fn map_booking_error(error: BookingRepositoryError) -> Error {
    match error {
        BookingRepositoryError::ActiveOverlap { room_id } => Error::conflict(format!(
            "room {room_id} was booked concurrently for this window"
        )),
        BookingRepositoryError::VersionConflict { booking_id } => Error::conflict(format!(
            "booking {booking_id} was modified concurrently; retry with fresh state"
        )),
        BookingRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("booking repository unavailable: {message}"))
        }
        BookingRepositoryError::Query { message } => {
            Error::internal(format!("booking repository error: {message}"))
        }
    }
}

fn map_catalogue_error(error: CatalogueRepositoryError) -> Error {
    match error {
        CatalogueRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("catalogue repository unavailable: {message}"))
        }
        CatalogueRepositoryError::Query { message } => {
            Error::internal(format!("catalogue repository error: {message}"))
        }
    }
}

fn map_gateway_error(error: PaymentGatewayError) -> Error {
    match error {
        PaymentGatewayError::Unavailable { message } => {
            Error::service_unavailable(format!("payment gateway unavailable: {message}"))
        }
        PaymentGatewayError::Rejected { message } => {
            Error::invalid_request(format!("payment gateway rejected the request: {message}"))
        }
    }
}

impl<B, C, G> BookingService<B, C, G>
where
    B: BookingRepository,
    C: CatalogueRepository,
    G: PaymentGateway,
{
    /// Wire the service from its ports, pricing calculator, and clock.
    pub fn new(
        bookings: Arc<B>,
        catalogue: Arc<C>,
        gateway: Arc<G>,
        notifications: Arc<dyn NotificationSink>,
        calculator: PriceCalculator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let availability = AvailabilityService::new(Arc::clone(&bookings), Arc::clone(&catalogue));
        Self {
            bookings,
            catalogue,
            gateway,
            notifications,
            availability,
            calculator,
            clock,
        }
    }

    async fn require_booking(&self, booking_id: Uuid) -> Result<Booking, Error> {
        self.bookings
            .find_by_id(booking_id)
            .await
            .map_err(map_booking_error)?
            .ok_or_else(|| Error::not_found(format!("booking {booking_id} does not exist")))
    }

    async fn require_customer(&self, customer_id: Uuid) -> Result<Customer, Error> {
        self.catalogue
            .customer(customer_id)
            .await
            .map_err(map_catalogue_error)?
            .ok_or_else(|| Error::not_found(format!("user {customer_id} does not exist")))
    }

    async fn require_room(&self, room_id: Uuid) -> Result<Room, Error> {
        self.catalogue
            .room(room_id)
            .await
            .map_err(map_catalogue_error)?
            .ok_or_else(|| Error::not_found(format!("room {room_id} does not exist")))
    }

    async fn resolve_equipment(
        &self,
        selections: &[EquipmentSelection],
    ) -> Result<Vec<(Equipment, u32)>, Error> {
        let mut resolved = Vec::with_capacity(selections.len());
        for selection in selections {
            let item = self
                .catalogue
                .equipment_item(selection.equipment_id)
                .await
                .map_err(map_catalogue_error)?
                .ok_or_else(|| {
                    Error::not_found(format!(
                        "equipment {} does not exist",
                        selection.equipment_id
                    ))
                })?;
            resolved.push((item, selection.quantity));
        }
        Ok(resolved)
    }

    async fn resolve_makeup_rooms(
        &self,
        selections: &[MakeupRoomSelection],
    ) -> Result<Vec<(MakeupRoom, u32, f64)>, Error> {
        let mut resolved = Vec::with_capacity(selections.len());
        for selection in selections {
            let room = self
                .catalogue
                .makeup_room(selection.makeup_room_id)
                .await
                .map_err(map_catalogue_error)?
                .ok_or_else(|| {
                    Error::not_found(format!(
                        "makeup room {} does not exist",
                        selection.makeup_room_id
                    ))
                })?;
            resolved.push((room, selection.quantity, selection.hours));
        }
        Ok(resolved)
    }

    /// An unknown or no-longer-valid promo code simply earns no discount.
    async fn resolve_promo(
        &self,
        code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<PromoCode>, Error> {
        let Some(code) = code else { return Ok(None) };
        let promo = self
            .catalogue
            .promo_code(code)
            .await
            .map_err(map_catalogue_error)?;
        match promo {
            Some(promo) if promo.is_valid(now) => Ok(Some(promo)),
            Some(_) => {
                info!(code, "promo code no longer valid; ignoring");
                Ok(None)
            }
            None => {
                info!(code, "unknown promo code; ignoring");
                Ok(None)
            }
        }
    }

    async fn check_availability(
        &self,
        room_id: Uuid,
        equipment: &[EquipmentSelection],
        makeup_rooms: &[MakeupRoomSelection],
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<(), Error> {
        self.availability
            .ensure_room_free(room_id, starts_at, ends_at, exclude)
            .await?;
        for selection in equipment {
            self.availability
                .ensure_equipment_capacity(
                    selection.equipment_id,
                    selection.quantity,
                    starts_at,
                    ends_at,
                    exclude,
                )
                .await?;
        }
        for selection in makeup_rooms {
            self.availability
                .ensure_makeup_room_capacity(
                    selection.makeup_room_id,
                    selection.quantity,
                    starts_at,
                    ends_at,
                    exclude,
                )
                .await?;
        }
        Ok(())
    }

    async fn price(
        &self,
        room: &Room,
        equipment: &[EquipmentSelection],
        makeup_rooms: &[MakeupRoomSelection],
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        people_count: u32,
        promo_code: Option<&str>,
    ) -> Result<PriceBreakdown, Error> {
        let resolved_equipment = self.resolve_equipment(equipment).await?;
        let resolved_makeup = self.resolve_makeup_rooms(makeup_rooms).await?;
        let promo = self.resolve_promo(promo_code, self.clock.utc()).await?;

        Ok(self.calculator.compute(
            room,
            &resolved_equipment,
            &resolved_makeup,
            starts_at,
            ends_at,
            people_count,
            promo.as_ref(),
        ))
    }

    async fn persist_update(&self, booking: &Booking) -> Result<Booking, Error> {
        self.bookings.update(booking).await.map_err(map_booking_error)
    }
}

#[async_trait]
impl<B, C, G> BookingCommand for BookingService<B, C, G>
where
    B: BookingRepository,
    C: CatalogueRepository,
    G: PaymentGateway,
{
    async fn create_booking(&self, request: CreateBookingRequest) -> Result<Booking, Error> {
        if request.ends_at <= request.starts_at {
            return Err(Error::invalid_request(
                "booking must end strictly after it starts",
            ));
        }

        self.require_customer(request.user_id).await?;
        let room = self.require_room(request.room_id).await?;

        self.check_availability(
            request.room_id,
            &request.equipment,
            &request.makeup_rooms,
            request.starts_at,
            request.ends_at,
            None,
        )
        .await?;

        let breakdown = self
            .price(
                &room,
                &request.equipment,
                &request.makeup_rooms,
                request.starts_at,
                request.ends_at,
                request.people_count,
                request.promo_code.as_deref(),
            )
            .await?;

        let booking = Booking::new(BookingDraft {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            room_id: request.room_id,
            equipment: request.equipment,
            makeup_rooms: request.makeup_rooms,
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            people_count: request.people_count,
            promo_code: request.promo_code,
            original_price: breakdown.original_price,
            total_price: breakdown.final_price,
            created_at: self.clock.utc(),
        })?;

        // The storage-level guard closes the check-then-act window between
        // the availability check above and this insert.
        self.bookings
            .insert(&booking)
            .await
            .map_err(map_booking_error)?;
        info!(booking_id = %booking.id, total = booking.total_price, "booking created");

        // A booking create never hard-fails because a reminder could not be
        // scheduled.
        if let Err(err) = self.notifications.schedule_for_new_booking(&booking).await {
            warn!(booking_id = %booking.id, error = %err, "creation notifications incomplete");
        }

        Ok(booking)
    }

    async fn register_payment(&self, booking_id: Uuid, amount: f64) -> Result<Booking, Error> {
        let mut booking = self.require_booking(booking_id).await?;

        if booking.status == BookingStatus::Cancelled {
            // Out-of-order payment: the money arrived after auto-cancellation.
            // Record it, never resurrect the booking; refunds are an admin
            // concern.
            booking.apply_payment(amount)?;
            let stored = self.persist_update(&booking).await?;
            warn!(
                booking_id = %booking_id,
                amount,
                "payment registered against a cancelled booking"
            );
            return Ok(stored);
        }

        let outcome = booking.apply_payment(amount)?;
        let stored = self.persist_update(&booking).await?;
        info!(
            booking_id = %booking_id,
            amount,
            paid_amount = stored.paid_amount,
            payment_status = %stored.payment_status.as_str(),
            "payment registered"
        );

        if outcome.confirms_payment() {
            if let Err(err) = self.notifications.confirm_payment(&stored).await {
                // The payment itself is durable; messaging remains best
                // effort.
                error!(booking_id = %booking_id, error = %err, "payment confirmation flow failed");
            }
        }

        Ok(stored)
    }

    async fn set_on_site_payment(
        &self,
        booking_id: Uuid,
        method: PaymentMethod,
    ) -> Result<Booking, Error> {
        if !method.is_on_site() {
            return Err(Error::invalid_request(
                "on-site payment method must be cash or card",
            ));
        }

        let mut booking = self.require_booking(booking_id).await?;
        if booking.status.is_terminal() {
            return Err(Error::conflict(format!(
                "booking {booking_id} is {} and cannot change payment method",
                booking.status.as_str()
            )));
        }

        booking.payment_method = method;
        self.persist_update(&booking).await
    }

    async fn start_online_payment(&self, booking_id: Uuid) -> Result<PaymentIntent, Error> {
        let booking = self.require_booking(booking_id).await?;

        if booking.payment_method.is_on_site() {
            return Err(Error::conflict(
                "booking is marked for on-site payment; online payment does not apply",
            ));
        }
        if booking.is_paid() {
            return Err(Error::conflict("booking is already fully paid"));
        }
        if booking.status.is_terminal() {
            return Err(Error::conflict(format!(
                "booking {booking_id} is {}",
                booking.status.as_str()
            )));
        }

        let outstanding = round2(booking.total_price - booking.paid_amount);
        self.gateway
            .create_payment(booking_id, outstanding)
            .await
            .map_err(map_gateway_error)
    }

    async fn update_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> Result<Booking, Error> {
        let mut booking = self.require_booking(booking_id).await?;
        let now = self.clock.utc();

        let changed = if new_status == BookingStatus::Cancelled {
            booking.cancel(MANUAL_CANCELLATION_REASON, now)?
        } else {
            booking.transition(new_status, now)?
        };
        if !changed {
            return Ok(booking);
        }

        let stored = self.persist_update(&booking).await?;
        info!(booking_id = %booking_id, status = %new_status.as_str(), "booking status updated");

        if new_status == BookingStatus::Cancelled {
            if let Err(err) = self.notifications.cancel_all_for_booking(booking_id).await {
                warn!(booking_id = %booking_id, error = %err, "notification cleanup failed");
            }
        }

        Ok(stored)
    }

    async fn add_items(
        &self,
        booking_id: Uuid,
        equipment: Vec<EquipmentSelection>,
        makeup_rooms: Vec<MakeupRoomSelection>,
    ) -> Result<Booking, Error> {
        let mut booking = self.require_booking(booking_id).await?;
        if booking.status.is_terminal() {
            return Err(Error::conflict(format!(
                "booking {booking_id} is {} and cannot take new items",
                booking.status.as_str()
            )));
        }

        let merged_equipment = merge_equipment(&booking.equipment, &equipment);
        let merged_makeup = merge_makeup(&booking.makeup_rooms, &makeup_rooms);

        // Same pipeline as creation: availability first (self excluded, so
        // the merged quantities are checked against the free pool), then a
        // full re-price.
        self.check_availability(
            booking.room_id,
            &merged_equipment,
            &merged_makeup,
            booking.starts_at,
            booking.ends_at,
            Some(booking_id),
        )
        .await?;

        let room = self.require_room(booking.room_id).await?;
        let breakdown = self
            .price(
                &room,
                &merged_equipment,
                &merged_makeup,
                booking.starts_at,
                booking.ends_at,
                booking.people_count,
                booking.promo_code.as_deref(),
            )
            .await?;

        booking.equipment = merged_equipment;
        booking.makeup_rooms = merged_makeup;
        booking.reprice(breakdown.original_price, breakdown.final_price);

        self.persist_update(&booking).await
    }
}

fn merge_equipment(
    existing: &[EquipmentSelection],
    added: &[EquipmentSelection],
) -> Vec<EquipmentSelection> {
    let mut merged: Vec<EquipmentSelection> = existing.to_vec();
    for addition in added {
        match merged
            .iter_mut()
            .find(|item| item.equipment_id == addition.equipment_id)
        {
            Some(item) => item.quantity += addition.quantity,
            None => merged.push(*addition),
        }
    }
    merged
}

fn merge_makeup(
    existing: &[MakeupRoomSelection],
    added: &[MakeupRoomSelection],
) -> Vec<MakeupRoomSelection> {
    let mut merged: Vec<MakeupRoomSelection> = existing.to_vec();
    for addition in added {
        match merged
            .iter_mut()
            .find(|item| item.makeup_room_id == addition.makeup_room_id)
        {
            Some(item) => {
                item.quantity += addition.quantity;
                item.hours = item.hours.max(addition.hours);
            }
            None => merged.push(*addition),
        }
    }
    merged
}
