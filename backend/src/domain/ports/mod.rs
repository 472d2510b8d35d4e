//! Domain ports: trait seams between the core and its adapters.
//!
//! Driven ports (repositories, SMS, gateway, receipts) are implemented under
//! `outbound/`; driving ports (`BookingCommand`, `NotificationSink`) are
//! implemented by domain services and consumed by inbound adapters.

mod booking_command;
mod booking_repository;
mod catalogue_repository;
mod macros;
mod notification_repository;
mod notification_sink;
mod payment_gateway;
mod receipt_service;
mod sms_sender;

pub(crate) use macros::define_port_error;

pub use booking_command::{BookingCommand, CreateBookingRequest};
pub use booking_repository::{BookingReader, BookingRepository, BookingRepositoryError};
pub use catalogue_repository::{CatalogueRepository, CatalogueRepositoryError};
pub use notification_repository::{NotificationRepository, NotificationRepositoryError};
pub use notification_sink::{FixtureNotificationSink, NotificationSink};
pub use payment_gateway::{
    PaymentGateway, PaymentGatewayError, PaymentIntent, PaymentWebhookEvent,
    UnconfiguredPaymentGateway,
};
pub use receipt_service::{FixtureReceiptService, ReceiptService, ReceiptServiceError};
pub use sms_sender::{DeliveryId, LoggingSmsSender, SmsSendError, SmsSender};

#[cfg(test)]
pub use booking_command::MockBookingCommand;
#[cfg(test)]
pub use booking_repository::MockBookingRepository;
#[cfg(test)]
pub use catalogue_repository::MockCatalogueRepository;
#[cfg(test)]
pub use notification_repository::MockNotificationRepository;
#[cfg(test)]
pub use notification_sink::MockNotificationSink;
#[cfg(test)]
pub use payment_gateway::MockPaymentGateway;
#[cfg(test)]
pub use receipt_service::MockReceiptService;
#[cfg(test)]
pub use sms_sender::MockSmsSender;
