//! In-memory adapters used when no database is configured and by
//! integration tests. Each store guards a shared map with a mutex so the
//! invariants the SQL adapters enforce with constraints hold here too.

mod memory_booking_repository;
mod memory_catalogue_repository;
mod memory_notification_repository;

pub use memory_booking_repository::MemoryBookingRepository;
pub use memory_catalogue_repository::MemoryCatalogueRepository;
pub use memory_notification_repository::MemoryNotificationRepository;
