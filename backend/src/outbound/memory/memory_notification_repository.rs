//! In-memory `NotificationRepository` for local runs and integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::ports::{NotificationRepository, NotificationRepositoryError};
use crate::domain::{Notification, NotificationKind, NotificationStatus};

/// Shared-map notification store. The active-uniqueness scan runs under the
/// same lock as the insert, standing in for the partial unique index.
#[derive(Default)]
pub struct MemoryNotificationRepository {
    notifications: Mutex<HashMap<Uuid, Notification>>,
}

impl MemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored notification, oldest first. Observability helper for
    /// integration tests.
    pub fn snapshot(&self) -> Vec<Notification> {
        let mut all: Vec<Notification> = self
            .notifications
            .lock()
            .map(|store| store.values().cloned().collect())
            .unwrap_or_default();
        all.sort_by_key(|notification| notification.created_at);
        all
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Notification>>, NotificationRepositoryError>
    {
        self.notifications
            .lock()
            .map_err(|_| NotificationRepositoryError::connection("notification store lock poisoned"))
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn insert_active_unique(
        &self,
        notification: &Notification,
    ) -> Result<(), NotificationRepositoryError> {
        let mut store = self.lock()?;
        let duplicate = store.values().any(|existing| {
            existing.booking_id == notification.booking_id
                && existing.kind == notification.kind
                && !existing.status.is_terminal()
        });
        if duplicate {
            return Err(NotificationRepositoryError::duplicate_active(
                notification.booking_id,
                notification.kind.as_str(),
            ));
        }
        store.insert(notification.id, notification.clone());
        Ok(())
    }

    async fn update(
        &self,
        notification: &Notification,
    ) -> Result<(), NotificationRepositoryError> {
        let mut store = self.lock()?;
        if !store.contains_key(&notification.id) {
            return Err(NotificationRepositoryError::query(format!(
                "notification {} not found",
                notification.id
            )));
        }
        store.insert(notification.id, notification.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        notification_id: Uuid,
    ) -> Result<Option<Notification>, NotificationRepositoryError> {
        Ok(self.lock()?.get(&notification_id).cloned())
    }

    async fn list_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationRepositoryError> {
        let store = self.lock()?;
        let mut due: Vec<Notification> = store
            .values()
            .filter(|notification| {
                matches!(
                    notification.status,
                    NotificationStatus::Pending | NotificationStatus::Scheduled
                ) && notification.scheduled_for <= now
            })
            .cloned()
            .collect();
        due.sort_by_key(|notification| notification.scheduled_for);
        due.truncate(limit);
        Ok(due)
    }

    async fn list_sent_cancel_notices(
        &self,
    ) -> Result<Vec<Notification>, NotificationRepositoryError> {
        let store = self.lock()?;
        let mut notices: Vec<Notification> = store
            .values()
            .filter(|notification| {
                notification.kind == NotificationKind::PaymentCancelNotice
                    && notification.status == NotificationStatus::Sent
            })
            .cloned()
            .collect();
        notices.sort_by_key(|notification| notification.sent_at);
        Ok(notices)
    }

    async fn cancel_active_for_booking<'a>(
        &self,
        booking_id: Uuid,
        kinds: Option<&'a [NotificationKind]>,
    ) -> Result<usize, NotificationRepositoryError> {
        let mut store = self.lock()?;
        let mut cancelled = 0;
        for notification in store.values_mut() {
            if notification.booking_id != booking_id || notification.status.is_terminal() {
                continue;
            }
            if let Some(kinds) = kinds {
                if !kinds.contains(&notification.kind) {
                    continue;
                }
            }
            notification.status = NotificationStatus::Cancelled;
            cancelled += 1;
        }
        Ok(cancelled)
    }
}
