//! Port for outbound SMS delivery.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by SMS adapters, classified for the retry policy.
    pub enum SmsSendError {
        /// Provider or network failure worth retrying with backoff.
        Transient { message: String } =>
            "transient SMS delivery failure: {message}",
        /// Rejected input (bad number, blocked recipient); retrying is
        /// pointless.
        Permanent { message: String } =>
            "permanent SMS delivery failure: {message}",
    }
}

impl SmsSendError {
    /// Whether the delivery worker should retry this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Provider-issued identifier for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryId(pub String);

/// Port for sending a text message to a phone number.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Submit `text` to `phone`; returns the provider delivery identifier.
    async fn send(&self, phone: &str, text: &str) -> Result<DeliveryId, SmsSendError>;
}

/// No-op sender that logs instead of delivering; wired when no SMS provider
/// is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSmsSender;

#[async_trait]
impl SmsSender for LoggingSmsSender {
    async fn send(&self, phone: &str, text: &str) -> Result<DeliveryId, SmsSendError> {
        tracing::info!(phone, text, "SMS sender not configured; logging message");
        Ok(DeliveryId("logged".to_owned()))
    }
}
