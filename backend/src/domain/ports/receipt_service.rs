//! Port for the fiscal receipt service.
//!
//! Consulted only to enrich payment confirmations with a receipt link; its
//! unavailability must never block a send.

use async_trait::async_trait;
use uuid::Uuid;

use super::define_port_error;

define_port_error! {
    /// Errors raised by receipt service adapters.
    pub enum ReceiptServiceError {
        /// Service unreachable or answered with a failure.
        Unavailable { message: String } =>
            "receipt service unavailable: {message}",
    }
}

/// Port for fiscal receipt lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReceiptService: Send + Sync {
    /// A link to the fiscal receipt for the booking's payment, when one
    /// exists yet.
    async fn receipt_link(&self, booking_id: Uuid)
    -> Result<Option<String>, ReceiptServiceError>;
}

/// Fixture returning no receipt; wired when the service is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureReceiptService;

#[async_trait]
impl ReceiptService for FixtureReceiptService {
    async fn receipt_link(
        &self,
        _booking_id: Uuid,
    ) -> Result<Option<String>, ReceiptServiceError> {
        Ok(None)
    }
}
