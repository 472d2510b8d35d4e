//! HTTP inbound adapter exposing REST endpoints.

pub mod bookings;
pub mod error;
pub mod health;
pub mod payments;
pub mod state;
pub mod validation;

pub use error::ApiResult;
