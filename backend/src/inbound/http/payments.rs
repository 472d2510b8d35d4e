//! Payment gateway webhook handler.
//!
//! ```text
//! POST /api/v1/payments/webhook
//! ```
//!
//! Non-2xx responses make the gateway redeliver, so transient failures are
//! surfaced as errors while terminal states always acknowledge.

use actix_web::{post, web, HttpResponse};
use tracing::{info, warn};

use crate::domain::ports::PaymentWebhookEvent;
use crate::domain::Error;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::ApiResult;

fn map_gateway_error(error: crate::domain::ports::PaymentGatewayError) -> Error {
    use crate::domain::ports::PaymentGatewayError;
    match error {
        PaymentGatewayError::Unavailable { message } => Error::service_unavailable(message),
        PaymentGatewayError::Rejected { message } => Error::invalid_request(message),
    }
}

/// Apply a parsed gateway event to the owning booking.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = PaymentWebhookEvent,
    responses(
        (status = 200, description = "Event applied"),
        (status = 400, description = "Malformed event", body = Error),
        (status = 404, description = "Unknown booking", body = Error),
        (status = 503, description = "Downstream unavailable; redeliver", body = Error)
    ),
    tags = ["payments"],
    operation_id = "paymentWebhook"
)]
#[post("/payments/webhook")]
pub async fn payment_webhook(
    state: web::Data<HttpState>,
    payload: web::Json<PaymentWebhookEvent>,
) -> ApiResult<HttpResponse> {
    match payload.into_inner() {
        PaymentWebhookEvent::Succeeded {
            booking_id,
            payment_id,
            amount,
        } => {
            info!(%booking_id, payment_id, amount, "payment succeeded event");
            state.bookings.register_payment(booking_id, amount).await?;
        }
        PaymentWebhookEvent::WaitingForCapture {
            booking_id,
            payment_id,
            amount,
        } => {
            info!(%booking_id, payment_id, amount, "capturing authorised payment");
            state
                .gateway
                .capture_payment(&payment_id)
                .await
                .map_err(map_gateway_error)?;
        }
        PaymentWebhookEvent::Canceled {
            booking_id,
            payment_id,
        } => {
            // The booking keeps waiting; the unpaid chasers already cover
            // the abandoned-payment path.
            warn!(%booking_id, payment_id, "gateway payment cancelled");
        }
    }
    Ok(HttpResponse::Ok().finish())
}
