//! Domain core: booking entities, pricing, availability, and the
//! notification lifecycle.
//!
//! Everything here is persistence-agnostic. Side effects flow through the
//! traits in [`ports`]; adapters live under `outbound/` and `inbound/`.

pub mod availability;
pub mod booking;
pub mod booking_service;
pub mod cancellation_worker;
pub mod catalogue;
pub mod delivery_worker;
pub mod error;
pub mod money;
pub mod notification;
pub mod notification_scheduler;
pub mod ports;
pub mod pricing;
pub mod tariff;

pub use self::availability::{windows_overlap, AvailabilityService};
pub use self::booking::{
    Booking, BookingDraft, BookingStatus, EquipmentSelection, MakeupRoomSelection, PaymentMethod,
    PaymentOutcome, PaymentStatus,
};
pub use self::booking_service::BookingService;
pub use self::cancellation_worker::CancellationWorker;
pub use self::catalogue::{Customer, Equipment, MakeupRoom, PromoCode, Room};
pub use self::delivery_worker::{BackoffJitter, DeliveryConfig, DeliveryWorker, RandomJitter};
pub use self::error::{Error, ErrorCode};
pub use self::notification::{
    render_message, Notification, NotificationKind, NotificationStatus,
};
pub use self::notification_scheduler::{NotificationSchedulerService, SchedulerConfig};
pub use self::pricing::{PriceBreakdown, PriceCalculator};
pub use self::tariff::{HolidayCalendar, HourSegment, TariffResolver, TariffTable};

/// Convenient API result alias.
pub type ApiResult<T> = Result<T, Error>;
