//! Delivery worker retry behaviour against the in-memory adapters: transient
//! failures back off exponentially, permanent failures and exhausted retries
//! park the row as failed, and stale messages are retired unsent.

mod support;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use mockable::Clock;

use backend::domain::ports::{
    BookingCommand, BookingRepository, CreateBookingRequest, FixtureReceiptService,
    SmsSendError, UnconfiguredPaymentGateway,
};
use backend::domain::{
    BackoffJitter, Booking, BookingService, DeliveryConfig, DeliveryWorker, Notification,
    NotificationKind, NotificationSchedulerService, NotificationStatus, PriceCalculator,
    SchedulerConfig, TariffResolver,
};
use backend::outbound::memory::{
    MemoryBookingRepository, MemoryCatalogueRepository, MemoryNotificationRepository,
};
use support::{base_time, seed_catalogue, MutableClock, RecordingSms, SeededCatalogue};

/// Deterministic jitter so retry times can be asserted exactly.
struct NoJitter;

impl BackoffJitter for NoJitter {
    fn jittered_delay(&self, base: StdDuration, _attempt: u32) -> StdDuration {
        base
    }
}

struct Harness {
    service: BookingService<
        MemoryBookingRepository,
        MemoryCatalogueRepository,
        UnconfiguredPaymentGateway,
    >,
    worker: DeliveryWorker<
        MemoryBookingRepository,
        MemoryCatalogueRepository,
        MemoryNotificationRepository,
    >,
    bookings: Arc<MemoryBookingRepository>,
    notifications: Arc<MemoryNotificationRepository>,
    catalogue: SeededCatalogue,
    clock: Arc<MutableClock>,
    sms: Arc<RecordingSms>,
}

impl Harness {
    fn new() -> Self {
        let catalogue = seed_catalogue();
        let bookings = Arc::new(MemoryBookingRepository::new());
        let notifications = Arc::new(MemoryNotificationRepository::new());
        let clock = Arc::new(MutableClock::new(base_time()));
        let sms = Arc::new(RecordingSms::new());
        let scheduler = Arc::new(NotificationSchedulerService::new(
            Arc::clone(&notifications),
            Arc::clone(&catalogue.repository),
            sms.clone(),
            clock.clone(),
            SchedulerConfig::default(),
        ));
        let service = BookingService::new(
            Arc::clone(&bookings),
            Arc::clone(&catalogue.repository),
            Arc::new(UnconfiguredPaymentGateway),
            scheduler,
            PriceCalculator::new(TariffResolver::new(chrono_tz::Europe::Moscow)),
            clock.clone(),
        );
        let worker = DeliveryWorker::new(
            Arc::clone(&bookings),
            Arc::clone(&catalogue.repository),
            Arc::clone(&notifications),
            sms.clone(),
            Arc::new(FixtureReceiptService),
            clock.clone(),
            DeliveryConfig::default(),
        )
        .with_jitter(Arc::new(NoJitter));
        Self {
            service,
            worker,
            bookings,
            notifications,
            catalogue,
            clock,
            sms,
        }
    }

    async fn create_booking(&self) -> Booking {
        let starts_at = base_time() + Duration::days(2) + Duration::hours(1);
        self.service
            .create_booking(CreateBookingRequest {
                user_id: self.catalogue.customer_id,
                room_id: self.catalogue.room_id,
                equipment: Vec::new(),
                makeup_rooms: Vec::new(),
                starts_at,
                ends_at: starts_at + Duration::hours(2),
                people_count: 2,
                promo_code: None,
            })
            .await
            .expect("booking should be created")
    }

    fn warning_row(&self) -> Notification {
        self.notifications
            .snapshot()
            .into_iter()
            .find(|row| row.kind == NotificationKind::PaymentWarning)
            .expect("the payment warning should exist")
    }
}

#[actix_rt::test]
async fn transient_failures_back_off_then_succeed() {
    let harness = Harness::new();
    harness.create_booking().await;

    // Make the warning due and let the first attempt fail.
    harness.clock.advance(Duration::minutes(61));
    harness
        .sms
        .push_failure(SmsSendError::transient("gateway timeout"));
    assert_eq!(harness.worker.run_sweep().await, 0);

    let row = harness.warning_row();
    assert_eq!(row.status, NotificationStatus::Scheduled);
    assert_eq!(row.attempts, 1);
    assert!(row.last_error.is_some());
    assert_eq!(row.scheduled_for, harness.clock.utc() + Duration::seconds(30));

    // Inside the backoff window the row is not picked up again.
    assert_eq!(harness.worker.run_sweep().await, 0);
    assert_eq!(harness.warning_row().attempts, 1);

    // Second attempt fails too; the delay doubles.
    harness.clock.advance(Duration::seconds(30));
    harness
        .sms
        .push_failure(SmsSendError::transient("gateway timeout"));
    assert_eq!(harness.worker.run_sweep().await, 0);
    let row = harness.warning_row();
    assert_eq!(row.attempts, 2);
    assert_eq!(row.scheduled_for, harness.clock.utc() + Duration::seconds(60));

    // Third attempt goes through.
    harness.clock.advance(Duration::seconds(60));
    assert_eq!(harness.worker.run_sweep().await, 1);
    let row = harness.warning_row();
    assert_eq!(row.status, NotificationStatus::Sent);
    assert_eq!(row.attempts, 3);
    assert_eq!(row.sent_at, Some(harness.clock.utc()));
    assert_eq!(harness.sms.sent().len(), 1);
}

#[actix_rt::test]
async fn retries_exhaust_into_failed() {
    let harness = Harness::new();
    harness.create_booking().await;

    harness.clock.advance(Duration::minutes(61));
    for advance in [Duration::zero(), Duration::seconds(30), Duration::seconds(60)] {
        harness.clock.advance(advance);
        harness
            .sms
            .push_failure(SmsSendError::transient("provider overloaded"));
        assert_eq!(harness.worker.run_sweep().await, 0);
    }

    let row = harness.warning_row();
    assert_eq!(row.status, NotificationStatus::Failed);
    assert_eq!(row.attempts, 3);
    assert!(row
        .last_error
        .as_deref()
        .is_some_and(|error| error.contains("provider overloaded")));
    assert!(harness.sms.sent().is_empty());
}

#[actix_rt::test]
async fn permanent_failure_is_not_retried() {
    let harness = Harness::new();
    harness.create_booking().await;

    harness.clock.advance(Duration::minutes(61));
    harness
        .sms
        .push_failure(SmsSendError::permanent("number blocked"));
    assert_eq!(harness.worker.run_sweep().await, 0);

    let row = harness.warning_row();
    assert_eq!(row.status, NotificationStatus::Failed);
    assert_eq!(row.attempts, 1);
    assert!(harness.sms.sent().is_empty());
}

#[actix_rt::test]
async fn chaser_for_a_paid_booking_is_retired_unsent() {
    let harness = Harness::new();
    let booking = harness.create_booking().await;

    // Money arrives through a path that never touched the scheduler, so the
    // chaser row is still live when it comes due.
    let mut paid = harness
        .bookings
        .find_by_id(booking.id)
        .await
        .expect("repository should answer")
        .expect("booking should exist");
    paid.apply_payment(500.0).expect("payment applies");
    harness
        .bookings
        .update(&paid)
        .await
        .expect("update should succeed");

    harness.clock.advance(Duration::minutes(61));
    assert_eq!(harness.worker.run_sweep().await, 0);

    let row = harness.warning_row();
    assert_eq!(row.status, NotificationStatus::Cancelled);
    assert!(harness.sms.sent().is_empty());
}
