//! PostgreSQL persistence adapters built on Diesel and bb8.
//!
//! `DbPool` owns the connection pool; the three Diesel repositories implement
//! the domain's repository ports on top of it. Row structs and the generated
//! schema stay private to this module. The booking exclusion constraint and
//! the active-notification partial unique index live in the migrations and
//! surface here only as mapped constraint violations.

mod diesel_booking_repository;
mod diesel_catalogue_repository;
mod diesel_notification_repository;
mod error_mapping;
mod models;
mod pool;
mod schema;

pub use diesel_booking_repository::DieselBookingRepository;
pub use diesel_catalogue_repository::DieselCatalogueRepository;
pub use diesel_notification_repository::DieselNotificationRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
