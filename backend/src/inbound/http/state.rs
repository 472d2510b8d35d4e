//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they depend on
//! domain ports only and stay testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{BookingCommand, PaymentGateway};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub bookings: Arc<dyn BookingCommand>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl HttpState {
    pub fn new(bookings: Arc<dyn BookingCommand>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { bookings, gateway }
    }
}
