//! Delivery of due notifications over SMS.
//!
//! Polls the durable notification store, claims due rows, renders the
//! message against fresh booking state, and sends it. Transient send
//! failures are rescheduled with jittered exponential backoff by pushing
//! `scheduled_for` into the future; the attempt budget turns repeated
//! failures into a terminal `Failed` row instead of an infinite retry loop.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use mockable::Clock;
use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::domain::notification::render_message;
use crate::domain::ports::{
    BookingReader, CatalogueRepository, NotificationRepository, ReceiptService, SmsSendError,
    SmsSender,
};
use crate::domain::{Booking, BookingStatus, Notification, NotificationKind, NotificationStatus};

/// Tuning knobs for the delivery loop.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Maximum rows claimed per sweep.
    pub batch_size: usize,
    /// Base delay before the first retry.
    pub initial_backoff: StdDuration,
    /// Retry delay cap.
    pub max_backoff: StdDuration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            initial_backoff: StdDuration::from_secs(30),
            max_backoff: StdDuration::from_secs(15 * 60),
        }
    }
}

/// Retry delay jitter seam; tests substitute a deterministic impl.
pub trait BackoffJitter: Send + Sync {
    fn jittered_delay(&self, base: StdDuration, attempt: u32) -> StdDuration;
}

/// Production jitter: up to a quarter of the base delay on top.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl BackoffJitter for RandomJitter {
    fn jittered_delay(&self, base: StdDuration, _attempt: u32) -> StdDuration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms / 4).max(1);
        let extra = rand::thread_rng().gen_range(0..=max_extra);
        StdDuration::from_millis(base_ms.saturating_add(extra))
    }
}

/// What happened to one claimed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryOutcome {
    Sent,
    Retried,
    Failed,
    Cancelled,
}

/// Poll-based SMS delivery worker.
pub struct DeliveryWorker<B, C, N> {
    bookings: Arc<B>,
    catalogue: Arc<C>,
    notifications: Arc<N>,
    sms: Arc<dyn SmsSender>,
    receipts: Arc<dyn ReceiptService>,
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn BackoffJitter>,
    config: DeliveryConfig,
}

impl<B, C, N> DeliveryWorker<B, C, N>
where
    B: BookingReader,
    C: CatalogueRepository,
    N: NotificationRepository,
{
    pub fn new(
        bookings: Arc<B>,
        catalogue: Arc<C>,
        notifications: Arc<N>,
        sms: Arc<dyn SmsSender>,
        receipts: Arc<dyn ReceiptService>,
        clock: Arc<dyn Clock>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            bookings,
            catalogue,
            notifications,
            sms,
            receipts,
            clock,
            jitter: Arc::new(RandomJitter),
            config,
        }
    }

    /// Substitute the retry jitter strategy (tests).
    pub fn with_jitter(mut self, jitter: Arc<dyn BackoffJitter>) -> Self {
        self.jitter = jitter;
        self
    }

    /// One pass over the due rows. Returns how many messages were sent.
    pub async fn run_sweep(&self) -> usize {
        let now = self.clock.utc();
        let due = match self.notifications.list_due(now, self.config.batch_size).await {
            Ok(due) => due,
            Err(err) => {
                error!(error = %err, "could not list due notifications");
                return 0;
            }
        };

        let mut sent = 0;
        for notification in due {
            match self.deliver(notification).await {
                Ok(DeliveryOutcome::Sent) => sent += 1,
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "delivery sweep item failed");
                }
            }
        }
        sent
    }

    async fn deliver(&self, mut notification: Notification) -> Result<DeliveryOutcome, String> {
        // Claim first so a crash mid-send burns an attempt instead of
        // double-sending on restart.
        notification.status = NotificationStatus::Processing;
        notification.attempts += 1;
        self.notifications
            .update(&notification)
            .await
            .map_err(|err| err.to_string())?;

        let booking = self
            .bookings
            .booking(notification.booking_id)
            .await
            .map_err(|err| err.to_string())?;
        let Some(booking) = booking else {
            return self
                .finish(notification, DeliveryOutcome::Cancelled, Some("booking gone"))
                .await;
        };

        if self.is_moot(&notification, &booking) {
            return self.finish(notification, DeliveryOutcome::Cancelled, None).await;
        }

        let customer = self
            .catalogue
            .customer(notification.user_id)
            .await
            .map_err(|err| err.to_string())?;
        let Some(customer) = customer else {
            return self
                .finish(notification, DeliveryOutcome::Failed, Some("customer gone"))
                .await;
        };

        let receipt_link = self.receipt_link_for(&notification).await;
        let text = render_message(notification.kind, &booking, receipt_link.as_deref());

        match self.sms.send(&customer.phone, &text).await {
            Ok(delivery_id) => {
                debug!(
                    notification_id = %notification.id,
                    delivery_id = %delivery_id.0,
                    kind = %notification.kind,
                    "notification delivered"
                );
                notification.sent_at = Some(self.clock.utc());
                self.finish(notification, DeliveryOutcome::Sent, None).await
            }
            Err(err) if err.is_retryable() && notification.attempts < notification.max_attempts => {
                self.reschedule(notification, &err).await
            }
            Err(err) => {
                let message = err.to_string();
                self.finish(notification, DeliveryOutcome::Failed, Some(&message))
                    .await
            }
        }
    }

    /// A message whose booking state has moved on is cancelled, never sent.
    /// Chasers stay live across small partial payments; only full payment or
    /// the half-paid band makes them obsolete, matching the confirmation
    /// flow that cancels them.
    fn is_moot(&self, notification: &Notification, booking: &Booking) -> bool {
        if booking.status == BookingStatus::Cancelled {
            return true;
        }
        NotificationKind::PAYMENT_CHASERS.contains(&notification.kind)
            && (booking.is_paid() || booking.is_half_paid)
    }

    /// Receipt enrichment is decoration; a provider failure never blocks the
    /// message itself.
    async fn receipt_link_for(&self, notification: &Notification) -> Option<String> {
        let wants_receipt = matches!(
            notification.kind,
            NotificationKind::PaymentConfirmedFull | NotificationKind::PaymentConfirmedHalf
        );
        if !wants_receipt {
            return None;
        }
        match self.receipts.receipt_link(notification.booking_id).await {
            Ok(link) => link,
            Err(err) => {
                warn!(
                    booking_id = %notification.booking_id,
                    error = %err,
                    "receipt lookup failed; sending without link"
                );
                None
            }
        }
    }

    async fn reschedule(
        &self,
        mut notification: Notification,
        error: &SmsSendError,
    ) -> Result<DeliveryOutcome, String> {
        let delay = self
            .jitter
            .jittered_delay(self.base_delay(notification.attempts), notification.attempts);
        let delay = Duration::from_std(delay).unwrap_or_else(|_| Duration::seconds(30));

        notification.status = NotificationStatus::Scheduled;
        notification.scheduled_for = self.clock.utc() + delay;
        notification.last_error = Some(error.to_string());
        self.notifications
            .update(&notification)
            .await
            .map_err(|err| err.to_string())?;
        info!(
            notification_id = %notification.id,
            attempts = notification.attempts,
            retry_at = %notification.scheduled_for,
            "transient send failure; retry scheduled"
        );
        Ok(DeliveryOutcome::Retried)
    }

    async fn finish(
        &self,
        mut notification: Notification,
        outcome: DeliveryOutcome,
        last_error: Option<&str>,
    ) -> Result<DeliveryOutcome, String> {
        notification.status = match outcome {
            DeliveryOutcome::Sent => NotificationStatus::Sent,
            DeliveryOutcome::Failed => NotificationStatus::Failed,
            DeliveryOutcome::Cancelled => NotificationStatus::Cancelled,
            DeliveryOutcome::Retried => NotificationStatus::Scheduled,
        };
        if let Some(message) = last_error {
            notification.last_error = Some(message.to_owned());
        }
        if outcome == DeliveryOutcome::Failed {
            error!(
                notification_id = %notification.id,
                kind = %notification.kind,
                attempts = notification.attempts,
                last_error = notification.last_error.as_deref().unwrap_or("unknown"),
                "notification delivery exhausted"
            );
        }
        self.notifications
            .update(&notification)
            .await
            .map_err(|err| err.to_string())?;
        Ok(outcome)
    }

    fn base_delay(&self, attempt: u32) -> StdDuration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.config.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.config.max_backoff.as_millis()).unwrap_or(u64::MAX);
        StdDuration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }

    /// Run sweeps on an interval until `shutdown` flips to true.
    pub async fn run(&self, interval: StdDuration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let sent = self.run_sweep().await;
                    if sent > 0 {
                        info!(sent, "delivery sweep complete");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("delivery worker stopping");
                        return;
                    }
                }
            }
        }
    }
}
