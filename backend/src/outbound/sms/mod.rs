//! Outbound SMS adapters.

mod http_sms_sender;

pub use http_sms_sender::HttpSmsSender;
