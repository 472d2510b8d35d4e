//! Server construction and background worker wiring.
//!
//! Picks the adapter set from configuration (Diesel-backed when a database
//! URL is present, in-memory otherwise), assembles the booking service and
//! notification scheduler over it, and spawns the delivery and
//! auto-cancellation sweep loops alongside the HTTP listener.

mod config;

pub use config::{AppConfig, ConfigError, ProviderConfig};

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::{Clock, DefaultClock};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::ports::{
    BookingCommand, BookingRepository, CatalogueRepository, FixtureReceiptService,
    LoggingSmsSender, NotificationRepository, NotificationSink, PaymentGateway, ReceiptService,
    SmsSender, UnconfiguredPaymentGateway,
};
use crate::domain::{
    BookingService, CancellationWorker, DeliveryConfig, DeliveryWorker, HolidayCalendar,
    NotificationSchedulerService, PriceCalculator, SchedulerConfig, TariffResolver,
};
use crate::inbound::http::bookings::{
    add_items, create_booking, register_payment, set_on_site_payment, start_online_payment,
    update_status,
};
use crate::inbound::http::health::{HealthState, healthz, readyz};
use crate::inbound::http::payments::payment_webhook;
use crate::inbound::http::state::HttpState;
use crate::middleware::Trace;
use crate::outbound::memory::{
    MemoryBookingRepository, MemoryCatalogueRepository, MemoryNotificationRepository,
};
use crate::outbound::payments::HttpPaymentGateway;
use crate::outbound::persistence::{
    DbPool, DieselBookingRepository, DieselCatalogueRepository, DieselNotificationRepository,
    PoolConfig,
};
use crate::outbound::receipts::HttpReceiptService;
use crate::outbound::sms::HttpSmsSender;

/// Run the application until the HTTP listener stops.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when the database pool cannot be built,
/// an outbound client cannot be constructed, or the socket cannot be bound.
pub async fn run(config: AppConfig) -> std::io::Result<()> {
    let health_state = web::Data::new(HealthState::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_state = match &config.database_url {
        Some(url) => {
            let pool = DbPool::new(PoolConfig::new(url.clone()))
                .await
                .map_err(|err| std::io::Error::other(err.to_string()))?;
            wire(
                Arc::new(DieselBookingRepository::new(pool.clone())),
                Arc::new(DieselCatalogueRepository::new(pool.clone())),
                Arc::new(DieselNotificationRepository::new(pool)),
                &config,
                shutdown_rx,
            )?
        }
        None => {
            warn!("DATABASE_URL not set; bookings and notifications are held in memory");
            wire(
                Arc::new(MemoryBookingRepository::new()),
                Arc::new(MemoryCatalogueRepository::new()),
                Arc::new(MemoryNotificationRepository::new()),
                &config,
                shutdown_rx,
            )?
        }
    };

    let server_health_state = health_state.clone();
    let server_http_state = http_state.clone();
    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), server_http_state.clone())
    })
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    info!(addr = %config.bind_addr, "listening");
    let result = server.await;

    // Fail liveness first so orchestrators drain, then stop the sweep loops.
    health_state.mark_unhealthy();
    let _ = shutdown_tx.send(true);
    result
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api/v1")
        .service(create_booking)
        .service(register_payment)
        .service(set_on_site_payment)
        .service(start_online_payment)
        .service(update_status)
        .service(add_items)
        .service(payment_webhook);

    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(api)
        .service(healthz)
        .service(readyz)
}

/// Assemble the service graph over one adapter set and spawn the workers.
fn wire<B, C, N>(
    bookings: Arc<B>,
    catalogue: Arc<C>,
    notifications: Arc<N>,
    config: &AppConfig,
    shutdown: watch::Receiver<bool>,
) -> std::io::Result<web::Data<HttpState>>
where
    B: BookingRepository + 'static,
    C: CatalogueRepository + 'static,
    N: NotificationRepository + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let sms = build_sms_sender(config)?;
    let receipts = build_receipt_service(config)?;

    let scheduler: Arc<dyn NotificationSink> = Arc::new(NotificationSchedulerService::new(
        Arc::clone(&notifications),
        Arc::clone(&catalogue),
        Arc::clone(&sms),
        Arc::clone(&clock),
        SchedulerConfig::default(),
    ));

    let resolver = TariffResolver::new(config.timezone)
        .with_holidays(HolidayCalendar::new(config.holidays.iter().copied()));
    let calculator = PriceCalculator::new(resolver);

    let delivery_worker = DeliveryWorker::new(
        Arc::clone(&bookings),
        Arc::clone(&catalogue),
        Arc::clone(&notifications),
        Arc::clone(&sms),
        receipts,
        Arc::clone(&clock),
        DeliveryConfig::default(),
    );
    let delivery_interval = config.delivery_sweep;
    let delivery_shutdown = shutdown.clone();
    tokio::spawn(async move {
        delivery_worker
            .run(delivery_interval, delivery_shutdown)
            .await;
    });

    let cancellation_worker = CancellationWorker::new(
        Arc::clone(&bookings),
        Arc::clone(&notifications),
        Arc::clone(&clock),
    );
    let cancellation_interval = config.cancellation_sweep;
    tokio::spawn(async move {
        cancellation_worker
            .run(cancellation_interval, shutdown)
            .await;
    });

    match &config.payments {
        Some(provider) => {
            let gateway = HttpPaymentGateway::new(provider.url.clone(), provider.api_key.clone())
                .map_err(|err| std::io::Error::other(err.to_string()))?;
            Ok(build_http_state(
                bookings,
                catalogue,
                Arc::new(gateway),
                scheduler,
                calculator,
                clock,
            ))
        }
        None => {
            warn!("no payment gateway configured; online payments will be refused");
            Ok(build_http_state(
                bookings,
                catalogue,
                Arc::new(UnconfiguredPaymentGateway),
                scheduler,
                calculator,
                clock,
            ))
        }
    }
}

fn build_http_state<B, C, G>(
    bookings: Arc<B>,
    catalogue: Arc<C>,
    gateway: Arc<G>,
    notifications: Arc<dyn NotificationSink>,
    calculator: PriceCalculator,
    clock: Arc<dyn Clock>,
) -> web::Data<HttpState>
where
    B: BookingRepository + 'static,
    C: CatalogueRepository + 'static,
    G: PaymentGateway + 'static,
{
    let webhook_gateway: Arc<dyn PaymentGateway> = Arc::clone(&gateway) as Arc<dyn PaymentGateway>;
    let command: Arc<dyn BookingCommand> = Arc::new(BookingService::new(
        bookings,
        catalogue,
        gateway,
        notifications,
        calculator,
        clock,
    ));
    web::Data::new(HttpState::new(command, webhook_gateway))
}

fn build_sms_sender(config: &AppConfig) -> std::io::Result<Arc<dyn SmsSender>> {
    match &config.sms {
        Some(provider) => {
            let sender = HttpSmsSender::new(provider.url.clone(), provider.api_key.clone())
                .map_err(|err| std::io::Error::other(err.to_string()))?;
            Ok(Arc::new(sender))
        }
        None => {
            warn!("no SMS provider configured; messages will be logged only");
            Ok(Arc::new(LoggingSmsSender))
        }
    }
}

fn build_receipt_service(config: &AppConfig) -> std::io::Result<Arc<dyn ReceiptService>> {
    match &config.receipts {
        Some(provider) => {
            let service = HttpReceiptService::new(provider.url.clone(), provider.api_key.clone())
                .map_err(|err| std::io::Error::other(err.to_string()))?;
            Ok(Arc::new(service))
        }
        None => Ok(Arc::new(FixtureReceiptService)),
    }
}
