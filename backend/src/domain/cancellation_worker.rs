//! Auto-cancellation of bookings that stayed unpaid past the grace period.
//!
//! The delivery worker sending the `payment-cancel-2h` notice arms this
//! worker: each sweep re-reads every booking behind a delivered notice and,
//! once the grace period measured from the notice's `sent_at` has elapsed,
//! cancels the booking unless it was fully paid in the meantime. A partial
//! payment does not stop the release; only full payment (or a cancellation
//! from elsewhere) retires the notice without touching the booking.

use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{
    BookingRepository, BookingRepositoryError, NotificationRepository,
};
use crate::domain::{Booking, Notification, NotificationStatus, PaymentStatus};

/// Reason stored on bookings released by the sweep.
const AUTO_CANCELLATION_REASON: &str = "auto-cancelled: payment not received";

/// Grace period between notice delivery and cancellation, in hours.
const DEFAULT_GRACE_HOURS: i64 = 2;

/// Periodic sweep that releases unpaid bookings after a delivered
/// cancellation notice.
pub struct CancellationWorker<B, N> {
    bookings: Arc<B>,
    notifications: Arc<N>,
    clock: Arc<dyn Clock>,
    grace: Duration,
}

/// What a sweep decided for one delivered notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepOutcome {
    /// Grace period not yet over; revisit next sweep.
    NotYetDue,
    /// Booking was cancelled and its remaining notifications released.
    Cancelled,
    /// Booking no longer qualifies (paid, already cancelled, or gone);
    /// the notice is retired without touching the booking.
    Retired,
    /// Concurrent write beat the sweep; retry next round.
    Contended,
}

impl<B, N> CancellationWorker<B, N>
where
    B: BookingRepository,
    N: NotificationRepository,
{
    pub fn new(bookings: Arc<B>, notifications: Arc<N>, clock: Arc<dyn Clock>) -> Self {
        Self {
            bookings,
            notifications,
            clock,
            grace: Duration::hours(DEFAULT_GRACE_HOURS),
        }
    }

    /// Override the grace period (tests, non-default deployments).
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// One pass over every delivered cancellation notice. Per-notice errors
    /// are logged and skipped so one bad row never wedges the sweep.
    pub async fn run_sweep(&self) -> usize {
        let notices = match self.notifications.list_sent_cancel_notices().await {
            Ok(notices) => notices,
            Err(err) => {
                error!(error = %err, "could not list delivered cancellation notices");
                return 0;
            }
        };

        let mut cancelled = 0;
        for notice in notices {
            match self.process_notice(&notice).await {
                Ok(SweepOutcome::Cancelled) => cancelled += 1,
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        booking_id = %notice.booking_id,
                        notification_id = %notice.id,
                        error = %err,
                        "cancellation sweep item failed"
                    );
                }
            }
        }
        cancelled
    }

    async fn process_notice(&self, notice: &Notification) -> Result<SweepOutcome, String> {
        let now = self.clock.utc();
        let Some(sent_at) = notice.sent_at else {
            // A sent notice without a timestamp is a storage defect; retire
            // it rather than cancel on guesswork.
            warn!(notification_id = %notice.id, "sent cancellation notice lacks sent_at");
            self.retire_notice(notice).await?;
            return Ok(SweepOutcome::Retired);
        };
        if now < sent_at + self.grace {
            return Ok(SweepOutcome::NotYetDue);
        }

        // Always a fresh read: the paid/cancelled state at sweep time is the
        // one that counts, not whatever was true when the notice fired.
        let booking = self
            .bookings
            .find_by_id(notice.booking_id)
            .await
            .map_err(|err| err.to_string())?;
        let Some(booking) = booking else {
            self.retire_notice(notice).await?;
            return Ok(SweepOutcome::Retired);
        };

        if !self.qualifies(&booking) {
            debug!(
                booking_id = %booking.id,
                status = %booking.status.as_str(),
                paid_amount = booking.paid_amount,
                "booking no longer qualifies for auto-cancellation"
            );
            self.retire_notice(notice).await?;
            return Ok(SweepOutcome::Retired);
        }

        match self.cancel_booking(booking, notice).await? {
            SweepOutcome::Cancelled => Ok(SweepOutcome::Cancelled),
            other => Ok(other),
        }
    }

    /// Pending or confirmed bookings that are not fully paid qualify. The
    /// unpaid/partial match also shields future payment states from the
    /// release path.
    fn qualifies(&self, booking: &Booking) -> bool {
        booking.status.occupies()
            && matches!(
                booking.payment_status,
                PaymentStatus::Unpaid | PaymentStatus::Partial
            )
    }

    async fn cancel_booking(
        &self,
        mut booking: Booking,
        notice: &Notification,
    ) -> Result<SweepOutcome, String> {
        let now = self.clock.utc();
        booking
            .cancel(AUTO_CANCELLATION_REASON, now)
            .map_err(|err| err.to_string())?;

        match self.bookings.update(&booking).await {
            Ok(_) => {}
            Err(BookingRepositoryError::VersionConflict { booking_id }) => {
                // Someone paid or cancelled concurrently; the next sweep will
                // see the fresh state.
                debug!(booking_id = %booking_id, "auto-cancellation lost a concurrent write");
                return Ok(SweepOutcome::Contended);
            }
            Err(err) => return Err(err.to_string()),
        }

        info!(
            booking_id = %booking.id,
            "booking auto-cancelled after unpaid grace period"
        );

        let released = self
            .notifications
            .cancel_active_for_booking(booking.id, None)
            .await
            .map_err(|err| err.to_string())?;
        if released > 0 {
            debug!(booking_id = %booking.id, released, "pending notifications released");
        }

        self.retire_notice(notice).await?;
        Ok(SweepOutcome::Cancelled)
    }

    /// Flip the delivered notice to cancelled so later sweeps skip it. The
    /// `sent_at` timestamp stays as the delivery record.
    async fn retire_notice(&self, notice: &Notification) -> Result<(), String> {
        let mut retired = notice.clone();
        retired.status = NotificationStatus::Cancelled;
        self.notifications
            .update(&retired)
            .await
            .map_err(|err| err.to_string())
    }

    /// Run sweeps on an interval until `shutdown` flips to true.
    pub async fn run(&self, interval: std::time::Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let cancelled = self.run_sweep().await;
                    if cancelled > 0 {
                        info!(cancelled, "cancellation sweep complete");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("cancellation worker stopping");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;
    use rstest::rstest;
    use uuid::Uuid;

    use super::*;
    use crate::domain::ports::{MockBookingRepository, MockNotificationRepository};
    use crate::domain::{BookingDraft, BookingStatus, NotificationKind, PaymentStatus};
    use crate::test_support::clock::fixed_clock;

    fn unpaid_booking(id: Uuid) -> Booking {
        Booking::new(BookingDraft {
            id,
            user_id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            equipment: vec![],
            makeup_rooms: vec![],
            starts_at: Utc.with_ymd_and_hms(2026, 3, 3, 10, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2026, 3, 3, 12, 0, 0).unwrap(),
            people_count: 2,
            promo_code: None,
            original_price: 1000.0,
            total_price: 1000.0,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        })
        .unwrap()
    }

    fn sent_notice(booking_id: Uuid, sent_at: chrono::DateTime<Utc>) -> Notification {
        let mut notice = Notification::scheduled(
            booking_id,
            Uuid::new_v4(),
            NotificationKind::PaymentCancelNotice,
            sent_at,
            sent_at,
        );
        notice.status = NotificationStatus::Sent;
        notice.sent_at = Some(sent_at);
        notice
    }

    #[rstest]
    #[actix_rt::test]
    async fn cancels_unpaid_booking_after_grace() {
        let booking_id = Uuid::new_v4();
        let sent_at = Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap();
        let now = sent_at + Duration::hours(2) + Duration::minutes(1);

        let mut bookings = MockBookingRepository::new();
        let booking = unpaid_booking(booking_id);
        bookings
            .expect_find_by_id()
            .with(eq(booking_id))
            .returning(move |_| Ok(Some(booking.clone())));
        bookings.expect_update().returning(|booking| {
            assert_eq!(booking.status, BookingStatus::Cancelled);
            assert!(booking.cancellation_reason.is_some());
            Ok(booking.clone())
        });

        let mut notifications = MockNotificationRepository::new();
        let notice = sent_notice(booking_id, sent_at);
        notifications
            .expect_list_sent_cancel_notices()
            .returning(move || Ok(vec![notice.clone()]));
        notifications
            .expect_cancel_active_for_booking()
            .withf(move |id, kinds| *id == booking_id && kinds.is_none())
            .returning(|_, _| Ok(2));
        notifications.expect_update().returning(|notice| {
            assert_eq!(notice.status, NotificationStatus::Cancelled);
            Ok(())
        });

        let worker = CancellationWorker::new(
            Arc::new(bookings),
            Arc::new(notifications),
            fixed_clock(now),
        );
        assert_eq!(worker.run_sweep().await, 1);
    }

    #[rstest]
    #[actix_rt::test]
    async fn leaves_booking_alone_before_grace_elapses() {
        let booking_id = Uuid::new_v4();
        let sent_at = Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap();
        let now = sent_at + Duration::hours(1);

        let bookings = MockBookingRepository::new();
        let mut notifications = MockNotificationRepository::new();
        let notice = sent_notice(booking_id, sent_at);
        notifications
            .expect_list_sent_cancel_notices()
            .returning(move || Ok(vec![notice.clone()]));

        let worker = CancellationWorker::new(
            Arc::new(bookings),
            Arc::new(notifications),
            fixed_clock(now),
        );
        assert_eq!(worker.run_sweep().await, 0);
    }

    #[rstest]
    #[actix_rt::test]
    async fn retires_notice_when_full_payment_arrived_in_time() {
        let booking_id = Uuid::new_v4();
        let sent_at = Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap();
        let now = sent_at + Duration::hours(3);

        let mut booking = unpaid_booking(booking_id);
        booking.apply_payment(1000.0).unwrap();
        assert_eq!(booking.payment_status, PaymentStatus::Paid);

        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_find_by_id()
            .returning(move |_| Ok(Some(booking.clone())));
        bookings.expect_update().never();

        let mut notifications = MockNotificationRepository::new();
        let notice = sent_notice(booking_id, sent_at);
        notifications
            .expect_list_sent_cancel_notices()
            .returning(move || Ok(vec![notice.clone()]));
        notifications.expect_update().returning(|notice| {
            assert_eq!(notice.status, NotificationStatus::Cancelled);
            Ok(())
        });

        let worker = CancellationWorker::new(
            Arc::new(bookings),
            Arc::new(notifications),
            fixed_clock(now),
        );
        assert_eq!(worker.run_sweep().await, 0);
    }

    #[rstest]
    #[case::below_half_band(300.0)]
    #[case::inside_half_band(500.0)]
    #[actix_rt::test]
    async fn cancels_partially_paid_booking_after_grace(#[case] paid: f64) {
        let booking_id = Uuid::new_v4();
        let sent_at = Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap();
        let now = sent_at + Duration::hours(3);

        let mut booking = unpaid_booking(booking_id);
        booking.apply_payment(paid).unwrap();
        assert_eq!(booking.payment_status, PaymentStatus::Partial);

        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_find_by_id()
            .returning(move |_| Ok(Some(booking.clone())));
        bookings.expect_update().returning(|booking| {
            assert_eq!(booking.status, BookingStatus::Cancelled);
            Ok(booking.clone())
        });

        let mut notifications = MockNotificationRepository::new();
        let notice = sent_notice(booking_id, sent_at);
        notifications
            .expect_list_sent_cancel_notices()
            .returning(move || Ok(vec![notice.clone()]));
        notifications
            .expect_cancel_active_for_booking()
            .withf(move |id, kinds| *id == booking_id && kinds.is_none())
            .returning(|_, _| Ok(1));
        notifications.expect_update().returning(|notice| {
            assert_eq!(notice.status, NotificationStatus::Cancelled);
            Ok(())
        });

        let worker = CancellationWorker::new(
            Arc::new(bookings),
            Arc::new(notifications),
            fixed_clock(now),
        );
        assert_eq!(worker.run_sweep().await, 1);
    }

    #[rstest]
    #[actix_rt::test]
    async fn version_conflict_defers_to_next_sweep() {
        let booking_id = Uuid::new_v4();
        let sent_at = Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap();
        let now = sent_at + Duration::hours(3);

        let mut bookings = MockBookingRepository::new();
        let booking = unpaid_booking(booking_id);
        bookings
            .expect_find_by_id()
            .returning(move |_| Ok(Some(booking.clone())));
        bookings.expect_update().returning(move |_| {
            Err(BookingRepositoryError::VersionConflict { booking_id })
        });

        let mut notifications = MockNotificationRepository::new();
        let notice = sent_notice(booking_id, sent_at);
        notifications
            .expect_list_sent_cancel_notices()
            .returning(move || Ok(vec![notice.clone()]));
        // The notice must survive for the next sweep.
        notifications.expect_update().never();
        notifications.expect_cancel_active_for_booking().never();

        let worker = CancellationWorker::new(
            Arc::new(bookings),
            Arc::new(notifications),
            fixed_clock(now),
        );
        assert_eq!(worker.run_sweep().await, 0);
    }
}
