//! Reqwest-backed fiscal receipt lookup.
//!
//! A missing receipt is a normal outcome (404 maps to `None`); everything
//! else the provider gets wrong maps to `Unavailable`, which callers treat
//! as "send without a link".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::ports::{ReceiptService, ReceiptServiceError};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptDto {
    url: Option<String>,
}

/// Receipt adapter querying one provider base URL.
pub struct HttpReceiptService {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl HttpReceiptService {
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
}

#[async_trait]
impl ReceiptService for HttpReceiptService {
    async fn receipt_link(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<String>, ReceiptServiceError> {
        let endpoint = self
            .base_url
            .join(&format!("receipts/{booking_id}"))
            .map_err(|error| {
                ReceiptServiceError::unavailable(format!("invalid receipt path: {error}"))
            })?;
        let response = self
            .client
            .get(endpoint)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|error| ReceiptServiceError::unavailable(error.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response
            .bytes()
            .await
            .map_err(|error| ReceiptServiceError::unavailable(error.to_string()))?;
        if !status.is_success() {
            return Err(ReceiptServiceError::unavailable(format!(
                "status {}: {}",
                status.as_u16(),
                crate::outbound::body_preview(body.as_ref())
            )));
        }

        let receipt: ReceiptDto = serde_json::from_slice(body.as_ref()).map_err(|error| {
            ReceiptServiceError::unavailable(format!("invalid receipt reply: {error}"))
        })?;
        Ok(receipt.url)
    }
}
