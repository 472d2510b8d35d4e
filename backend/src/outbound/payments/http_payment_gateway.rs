//! Reqwest-backed payment gateway adapter.
//!
//! Speaks the provider's JSON API and maps its failures onto the two
//! gateway error classes: `Unavailable` for transport faults and server
//! errors, `Rejected` for requests the provider refused.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ports::{PaymentGateway, PaymentGatewayError, PaymentIntent};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentDto {
    booking_id: Uuid,
    amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundDto {
    amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentIntentDto {
    payment_id: String,
    confirmation_url: Option<String>,
    amount: f64,
}

/// Gateway adapter issuing authenticated calls against one provider base URL.
pub struct HttpPaymentGateway {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl HttpPaymentGateway {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, api_key: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(DEFAULT_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PaymentGatewayError> {
        self.base_url
            .join(path)
            .map_err(|error| PaymentGatewayError::rejected(format!("invalid gateway path: {error}")))
    }

    async fn post_expecting_ok<B: Serialize + Sync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), PaymentGatewayError> {
        let mut request = self
            .client
            .post(self.endpoint(path)?)
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_payment(
        &self,
        booking_id: Uuid,
        amount: f64,
    ) -> Result<PaymentIntent, PaymentGatewayError> {
        let response = self
            .client
            .post(self.endpoint("payments")?)
            .bearer_auth(&self.api_key)
            // Re-used intents are deduplicated provider-side per booking.
            .header("Idempotence-Key", booking_id.to_string())
            .json(&CreatePaymentDto { booking_id, amount })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let intent: PaymentIntentDto = serde_json::from_slice(body.as_ref()).map_err(|error| {
            PaymentGatewayError::unavailable(format!("invalid gateway reply: {error}"))
        })?;
        Ok(PaymentIntent {
            payment_id: intent.payment_id,
            confirmation_url: intent.confirmation_url,
            amount: intent.amount,
        })
    }

    async fn capture_payment(&self, payment_id: &str) -> Result<(), PaymentGatewayError> {
        self.post_expecting_ok::<()>(&format!("payments/{payment_id}/capture"), None)
            .await
    }

    async fn cancel_payment(&self, payment_id: &str) -> Result<(), PaymentGatewayError> {
        self.post_expecting_ok::<()>(&format!("payments/{payment_id}/cancel"), None)
            .await
    }

    async fn create_refund(
        &self,
        payment_id: &str,
        amount: f64,
    ) -> Result<(), PaymentGatewayError> {
        self.post_expecting_ok(
            &format!("payments/{payment_id}/refunds"),
            Some(&RefundDto { amount }),
        )
        .await
    }
}

fn map_transport_error(error: reqwest::Error) -> PaymentGatewayError {
    PaymentGatewayError::unavailable(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PaymentGatewayError {
    let message = format!(
        "status {}: {}",
        status.as_u16(),
        crate::outbound::body_preview(body)
    );
    match status {
        StatusCode::TOO_MANY_REQUESTS => PaymentGatewayError::unavailable(message),
        _ if status.is_client_error() => PaymentGatewayError::rejected(message),
        _ => PaymentGatewayError::unavailable(message),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network status classification.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::rate_limited(StatusCode::TOO_MANY_REQUESTS, false)]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, false)]
    #[case::bad_request(StatusCode::BAD_REQUEST, true)]
    #[case::payment_declined(StatusCode::PAYMENT_REQUIRED, true)]
    fn classifies_statuses(#[case] status: StatusCode, #[case] rejected: bool) {
        let error = map_status_error(status, b"{\"error\":\"declined\"}");
        assert_eq!(
            matches!(error, PaymentGatewayError::Rejected { .. }),
            rejected
        );
    }
}
