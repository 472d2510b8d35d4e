//! Narrow scheduling seam consumed by the booking lifecycle.
//!
//! The booking side talks to notifications only through this trait and the
//! delivery side reads bookings only through `BookingReader`, so neither
//! module depends on the other's internals.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Booking, Error};

/// Driving port translating booking lifecycle events into scheduled,
/// cancelable notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Enqueue the creation-time sequence (payment warning, cancel-notice,
    /// pre-arrival reminder) for an unpaid booking.
    async fn schedule_for_new_booking(&self, booking: &Booking) -> Result<(), Error>;

    /// React to a payment reaching paid or the half-paid band: fire the
    /// matching confirmation, drop pending chasers, refresh the reminder.
    async fn confirm_payment(&self, booking: &Booking) -> Result<(), Error>;

    /// Cancel every non-terminal notification for the booking.
    async fn cancel_all_for_booking(&self, booking_id: Uuid) -> Result<usize, Error>;
}

/// No-op sink for wiring paths that do not exercise notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureNotificationSink;

#[async_trait]
impl NotificationSink for FixtureNotificationSink {
    async fn schedule_for_new_booking(&self, _booking: &Booking) -> Result<(), Error> {
        Ok(())
    }

    async fn confirm_payment(&self, _booking: &Booking) -> Result<(), Error> {
        Ok(())
    }

    async fn cancel_all_for_booking(&self, _booking_id: Uuid) -> Result<usize, Error> {
        Ok(0)
    }
}
