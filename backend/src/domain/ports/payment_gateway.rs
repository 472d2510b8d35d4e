//! Port for the online payment gateway.
//!
//! The wire format is the adapter's concern; the domain sees intents,
//! captures, refunds, and parsed webhook events only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment gateway adapters.
    pub enum PaymentGatewayError {
        /// Gateway unreachable or answered with a retryable failure.
        Unavailable { message: String } =>
            "payment gateway unavailable: {message}",
        /// Gateway rejected the request.
        Rejected { message: String } =>
            "payment gateway rejected the request: {message}",
    }
}

/// A created payment intent the client completes out of band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub payment_id: String,
    pub confirmation_url: Option<String>,
    pub amount: f64,
}

/// Parsed webhook event delivered by the gateway.
///
/// Idempotency of webhook *delivery* is the gateway's concern; the domain
/// applies each distinct event exactly once per receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PaymentWebhookEvent {
    Succeeded {
        booking_id: Uuid,
        payment_id: String,
        amount: f64,
    },
    Canceled {
        booking_id: Uuid,
        payment_id: String,
    },
    WaitingForCapture {
        booking_id: Uuid,
        payment_id: String,
        amount: f64,
    },
}

/// Port for gateway calls issued by the domain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for a booking.
    async fn create_payment(
        &self,
        booking_id: Uuid,
        amount: f64,
    ) -> Result<PaymentIntent, PaymentGatewayError>;

    /// Capture a payment awaiting capture.
    async fn capture_payment(&self, payment_id: &str) -> Result<(), PaymentGatewayError>;

    /// Cancel an uncaptured payment.
    async fn cancel_payment(&self, payment_id: &str) -> Result<(), PaymentGatewayError>;

    /// Refund a captured payment.
    async fn create_refund(
        &self,
        payment_id: &str,
        amount: f64,
    ) -> Result<(), PaymentGatewayError>;
}

/// Gateway stand-in used when no provider is configured: every intent is
/// rejected so misconfiguration surfaces immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredPaymentGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredPaymentGateway {
    async fn create_payment(
        &self,
        _booking_id: Uuid,
        _amount: f64,
    ) -> Result<PaymentIntent, PaymentGatewayError> {
        Err(PaymentGatewayError::unavailable(
            "no payment gateway configured",
        ))
    }

    async fn capture_payment(&self, _payment_id: &str) -> Result<(), PaymentGatewayError> {
        Err(PaymentGatewayError::unavailable(
            "no payment gateway configured",
        ))
    }

    async fn cancel_payment(&self, _payment_id: &str) -> Result<(), PaymentGatewayError> {
        Err(PaymentGatewayError::unavailable(
            "no payment gateway configured",
        ))
    }

    async fn create_refund(
        &self,
        _payment_id: &str,
        _amount: f64,
    ) -> Result<(), PaymentGatewayError> {
        Err(PaymentGatewayError::unavailable(
            "no payment gateway configured",
        ))
    }
}
