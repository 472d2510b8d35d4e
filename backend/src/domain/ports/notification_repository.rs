//! Port for scheduled-notification persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Notification, NotificationKind};

use super::define_port_error;

define_port_error! {
    /// Errors raised by notification repository adapters.
    pub enum NotificationRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "notification repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "notification repository query failed: {message}",
        /// A non-terminal notification of this kind already exists for the
        /// booking. Duplicate scheduling must fail loudly, never overwrite.
        DuplicateActive { booking_id: Uuid, kind: String } =>
            "an active {kind} notification already exists for booking {booking_id}",
    }
}

/// Port for the durable delayed-notification store.
///
/// `insert_active_unique` is the idempotency anchor: the adapter must reject
/// a second non-terminal row per `(booking_id, kind)` atomically (partial
/// unique index in SQL, lock-guarded scan in memory).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Persist a new notification, enforcing the active-uniqueness invariant.
    async fn insert_active_unique(
        &self,
        notification: &Notification,
    ) -> Result<(), NotificationRepositoryError>;

    /// Persist delivery-state changes for an existing notification.
    async fn update(&self, notification: &Notification)
    -> Result<(), NotificationRepositoryError>;

    /// Find a notification by id.
    async fn find_by_id(
        &self,
        notification_id: Uuid,
    ) -> Result<Option<Notification>, NotificationRepositoryError>;

    /// Non-terminal, non-processing notifications whose `scheduled_for` has
    /// passed, oldest first, bounded by `limit`.
    async fn list_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationRepositoryError>;

    /// Delivered cancellation notices; the auto-cancel worker's work list.
    async fn list_sent_cancel_notices(
        &self,
    ) -> Result<Vec<Notification>, NotificationRepositoryError>;

    /// Cancel every non-terminal notification for `booking_id`, optionally
    /// restricted to `kinds`. Returns how many rows were cancelled.
    async fn cancel_active_for_booking<'a>(
        &self,
        booking_id: Uuid,
        kinds: Option<&'a [NotificationKind]>,
    ) -> Result<usize, NotificationRepositoryError>;
}
