//! Reqwest-backed SMS provider adapter.
//!
//! Owns transport details only: request serialisation, timeout and HTTP
//! error classification, and decoding the provider's accepted-message id.
//! The transient/permanent split drives the delivery worker's retry policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{DeliveryId, SmsSendError, SmsSender};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct SendMessageDto<'a> {
    to: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AcceptedMessageDto {
    id: String,
}

/// SMS adapter that POSTs messages to one provider endpoint.
pub struct HttpSmsSender {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl HttpSmsSender {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, api_key: String) -> Result<Self, reqwest::Error> {
        Self::with_timeout(endpoint, api_key, DEFAULT_REQUEST_TIMEOUT)
    }

    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(
        endpoint: Url,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send(&self, phone: &str, text: &str) -> Result<DeliveryId, SmsSendError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&SendMessageDto { to: phone, text })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let accepted: AcceptedMessageDto = serde_json::from_slice(body.as_ref())
            .map_err(|error| SmsSendError::transient(format!("invalid provider reply: {error}")))?;
        Ok(DeliveryId(accepted.id))
    }
}

fn map_transport_error(error: reqwest::Error) -> SmsSendError {
    // Network and timeout failures are worth another attempt.
    SmsSendError::transient(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> SmsSendError {
    let message = format!(
        "status {}: {}",
        status.as_u16(),
        crate::outbound::body_preview(body)
    );
    match status {
        StatusCode::TOO_MANY_REQUESTS => SmsSendError::transient(message),
        _ if status.is_client_error() => SmsSendError::permanent(message),
        _ => SmsSendError::transient(message),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network status classification.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::rate_limited(StatusCode::TOO_MANY_REQUESTS, true)]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, true)]
    #[case::bad_gateway(StatusCode::BAD_GATEWAY, true)]
    #[case::bad_request(StatusCode::BAD_REQUEST, false)]
    #[case::unprocessable(StatusCode::UNPROCESSABLE_ENTITY, false)]
    fn classifies_statuses_for_retry(#[case] status: StatusCode, #[case] retryable: bool) {
        let error = map_status_error(status, b"{\"error\":\"nope\"}");
        assert_eq!(error.is_retryable(), retryable);
    }

    #[test]
    fn status_message_includes_body_preview() {
        let error = map_status_error(StatusCode::BAD_REQUEST, b"{\"error\":\"bad number\"}");
        assert!(error.to_string().contains("bad number"));
    }
}
