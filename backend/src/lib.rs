//! Backend library modules for the studio booking service.

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

pub use middleware::Trace;

#[cfg(test)]
pub(crate) mod test_support;
