//! Translates booking lifecycle events into delayed, cancelable jobs.
//!
//! Every job is keyed by `(booking_id, kind)`; the repository rejects a
//! second active job per key, which is how two racing triggers are prevented
//! from arming two auto-cancellations for one booking. Cancelling pending
//! jobs is cheap; a job that already fired cannot be recalled.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::notification::render_message;
use crate::domain::ports::{
    CatalogueRepository, NotificationRepository, NotificationRepositoryError, NotificationSink,
    SmsSender,
};
use crate::domain::{Booking, Error, ErrorCode, Notification, NotificationKind};

/// Delays relative to booking creation and slot start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Unpaid-booking warning fires this long after creation.
    pub warning_delay: Duration,
    /// Cancellation notice fires this long after creation; its delivery
    /// arms the auto-cancel worker.
    pub cancel_delay: Duration,
    /// Pre-arrival reminder fires this long before the slot.
    pub reminder_lead: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            warning_delay: Duration::hours(1),
            cancel_delay: Duration::hours(2),
            reminder_lead: Duration::hours(24),
        }
    }
}

/// Scheduler service implementing the [`NotificationSink`] driving port.
pub struct NotificationSchedulerService<N, C> {
    notifications: Arc<N>,
    catalogue: Arc<C>,
    sms: Arc<dyn SmsSender>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

fn map_repository_error(error: NotificationRepositoryError) -> Error {
    match error {
        NotificationRepositoryError::DuplicateActive { booking_id, kind } => {
            Error::duplicate_schedule(format!(
                "an active {kind} notification already exists for booking {booking_id}"
            ))
        }
        NotificationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("notification repository unavailable: {message}"))
        }
        NotificationRepositoryError::Query { message } => {
            Error::internal(format!("notification repository error: {message}"))
        }
    }
}

impl<N, C> NotificationSchedulerService<N, C>
where
    N: NotificationRepository,
    C: CatalogueRepository,
{
    /// Create the scheduler over its repositories and delivery fallback.
    pub fn new(
        notifications: Arc<N>,
        catalogue: Arc<C>,
        sms: Arc<dyn SmsSender>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            notifications,
            catalogue,
            sms,
            clock,
            config,
        }
    }

    /// Reminder variant for the booking's current payment state.
    fn reminder_kind(booking: &Booking) -> NotificationKind {
        if booking.is_paid() {
            NotificationKind::ReminderFull
        } else {
            NotificationKind::ReminderHalf
        }
    }

    /// Confirmation variant for the payment that just landed.
    fn confirmation_kind(booking: &Booking) -> NotificationKind {
        if booking.is_paid() {
            NotificationKind::PaymentConfirmedFull
        } else {
            NotificationKind::PaymentConfirmedHalf
        }
    }

    /// Enqueue one notification, failing loudly on an active duplicate.
    async fn schedule(
        &self,
        booking: &Booking,
        kind: NotificationKind,
        scheduled_for: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), Error> {
        let notification = Notification::scheduled(
            booking.id,
            booking.user_id,
            kind,
            scheduled_for,
            self.clock.utc(),
        );
        self.notifications
            .insert_active_unique(&notification)
            .await
            .map_err(map_repository_error)?;
        debug!(
            booking_id = %booking.id,
            kind = %kind,
            scheduled_for = %scheduled_for,
            "notification scheduled"
        );
        Ok(())
    }

    /// Schedule the pre-arrival reminder when its fire time is still ahead.
    async fn schedule_reminder(&self, booking: &Booking) -> Result<(), Error> {
        let fire_at = booking.starts_at - self.config.reminder_lead;
        if fire_at <= self.clock.utc() {
            return Ok(());
        }
        self.schedule(booking, Self::reminder_kind(booking), fire_at)
            .await
    }

    /// Legacy direct-send path: used when scheduling a payment confirmation
    /// fails, so the customer is still notified.
    async fn direct_send(&self, booking: &Booking, kind: NotificationKind) -> Result<(), Error> {
        let customer = self
            .catalogue
            .customer(booking.user_id)
            .await
            .map_err(|err| Error::internal(format!("catalogue lookup failed: {err}")))?
            .ok_or_else(|| Error::not_found(format!("customer {} does not exist", booking.user_id)))?;

        let text = render_message(kind, booking, None);
        self.sms
            .send(&customer.phone, &text)
            .await
            .map_err(|err| Error::internal(format!("fallback SMS send failed: {err}")))?;
        Ok(())
    }
}

#[async_trait]
impl<N, C> NotificationSink for NotificationSchedulerService<N, C>
where
    N: NotificationRepository,
    C: CatalogueRepository,
{
    async fn schedule_for_new_booking(&self, booking: &Booking) -> Result<(), Error> {
        let mut first_error = None;
        // Creation-time chasers only make sense while money is still owed.
        // A zero-total booking is born paid and never gets chased.
        if booking.paid_amount <= 0.0 && !booking.is_paid() {
            let plan = [
                (
                    NotificationKind::PaymentWarning,
                    booking.created_at + self.config.warning_delay,
                ),
                (
                    NotificationKind::PaymentCancelNotice,
                    booking.created_at + self.config.cancel_delay,
                ),
            ];
            for (kind, fire_at) in plan {
                if let Err(err) = self.schedule(booking, kind, fire_at).await {
                    warn!(booking_id = %booking.id, kind = %kind, error = %err, "scheduling failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Err(err) = self.schedule_reminder(booking).await {
            warn!(booking_id = %booking.id, error = %err, "reminder scheduling failed");
            first_error.get_or_insert(err);
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn confirm_payment(&self, booking: &Booking) -> Result<(), Error> {
        // Chasers are obsolete the moment a qualifying payment lands.
        let cancelled = self
            .notifications
            .cancel_active_for_booking(booking.id, Some(&NotificationKind::PAYMENT_CHASERS))
            .await
            .map_err(map_repository_error)?;
        debug!(booking_id = %booking.id, cancelled, "payment chasers cancelled");

        let kind = Self::confirmation_kind(booking);
        if let Err(err) = self.schedule(booking, kind, self.clock.utc()).await {
            // The confirmation must reach the customer even when the queue
            // refuses the job.
            warn!(
                booking_id = %booking.id,
                error = %err,
                "confirmation scheduling failed; falling back to direct send"
            );
            if err.code() != ErrorCode::DuplicateSchedule {
                self.direct_send(booking, kind).await?;
            }
        }

        // Refresh the reminder to the now-current variant.
        self.notifications
            .cancel_active_for_booking(booking.id, Some(&NotificationKind::REMINDERS))
            .await
            .map_err(map_repository_error)?;
        self.schedule_reminder(booking).await
    }

    async fn cancel_all_for_booking(&self, booking_id: Uuid) -> Result<usize, Error> {
        let cancelled = self
            .notifications
            .cancel_active_for_booking(booking_id, None)
            .await
            .map_err(map_repository_error)?;
        debug!(booking_id = %booking_id, cancelled, "notifications cancelled");
        Ok(cancelled)
    }
}
