//! Outbound fiscal receipt adapters.

mod http_receipt_service;

pub use http_receipt_service::HttpReceiptService;
