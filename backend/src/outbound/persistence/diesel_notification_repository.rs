//! PostgreSQL-backed `NotificationRepository` using Diesel.
//!
//! Active uniqueness per `(booking_id, kind)` is enforced by a partial
//! unique index over non-terminal statuses; a violation surfaces here as
//! `DuplicateActive`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{NotificationRepository, NotificationRepositoryError};
use crate::domain::{Notification, NotificationKind, NotificationStatus};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewNotificationRow, NotificationRow, NotificationUpdate};
use super::pool::DbPool;
use super::schema::notifications;

/// Diesel-backed implementation of the `NotificationRepository` port.
#[derive(Clone)]
pub struct DieselNotificationRepository {
    pool: DbPool,
}

impl DieselNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn connection(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::bb8::PooledConnection<
            '_,
            diesel_async::AsyncPgConnection,
        >,
        NotificationRepositoryError,
    > {
        self.pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, NotificationRepositoryError::connection))
    }
}

fn map_error(error: DieselError) -> NotificationRepositoryError {
    map_diesel_error(
        error,
        NotificationRepositoryError::query,
        NotificationRepositoryError::connection,
    )
}

fn row_to_notification(row: NotificationRow) -> Result<Notification, NotificationRepositoryError> {
    let parse = |message: String| NotificationRepositoryError::query(message);
    Ok(Notification {
        id: row.id,
        booking_id: row.booking_id,
        user_id: row.user_id,
        kind: NotificationKind::from_str(&row.kind).map_err(|err| parse(err.to_string()))?,
        status: NotificationStatus::from_str(&row.status)
            .map_err(|err| parse(err.to_string()))?,
        scheduled_for: row.scheduled_for,
        sent_at: row.sent_at,
        attempts: u32::try_from(row.attempts).unwrap_or_default(),
        max_attempts: u32::try_from(row.max_attempts).unwrap_or_default(),
        last_error: row.last_error,
        created_at: row.created_at,
    })
}

fn notification_to_row(notification: &Notification) -> NewNotificationRow {
    NewNotificationRow {
        id: notification.id,
        booking_id: notification.booking_id,
        user_id: notification.user_id,
        kind: notification.kind.as_str().to_owned(),
        status: notification.status.as_str().to_owned(),
        scheduled_for: notification.scheduled_for,
        sent_at: notification.sent_at,
        attempts: i32::try_from(notification.attempts).unwrap_or(i32::MAX),
        max_attempts: i32::try_from(notification.max_attempts).unwrap_or(i32::MAX),
        last_error: notification.last_error.clone(),
        created_at: notification.created_at,
    }
}

/// Statuses that count for uniqueness and delivery.
const ACTIVE_STATUSES: [&str; 3] = ["pending", "scheduled", "processing"];

#[async_trait]
impl NotificationRepository for DieselNotificationRepository {
    async fn insert_active_unique(
        &self,
        notification: &Notification,
    ) -> Result<(), NotificationRepositoryError> {
        let row = notification_to_row(notification);
        let mut conn = self.connection().await?;
        diesel::insert_into(notifications::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|err| match &err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    NotificationRepositoryError::duplicate_active(
                        notification.booking_id,
                        notification.kind.as_str(),
                    )
                }
                _ => map_error(err),
            })?;
        Ok(())
    }

    async fn update(
        &self,
        notification: &Notification,
    ) -> Result<(), NotificationRepositoryError> {
        let changes = NotificationUpdate {
            status: notification.status.as_str().to_owned(),
            scheduled_for: notification.scheduled_for,
            sent_at: notification.sent_at,
            attempts: i32::try_from(notification.attempts).unwrap_or(i32::MAX),
            last_error: notification.last_error.clone(),
        };
        let mut conn = self.connection().await?;
        diesel::update(notifications::table.filter(notifications::id.eq(notification.id)))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        notification_id: Uuid,
    ) -> Result<Option<Notification>, NotificationRepositoryError> {
        let mut conn = self.connection().await?;
        let row: Option<NotificationRow> = notifications::table
            .filter(notifications::id.eq(notification_id))
            .select(NotificationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        row.map(row_to_notification).transpose()
    }

    async fn list_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationRepositoryError> {
        let mut conn = self.connection().await?;
        let rows: Vec<NotificationRow> = notifications::table
            .filter(notifications::status.eq_any(["pending", "scheduled"]))
            .filter(notifications::scheduled_for.le(now))
            .order(notifications::scheduled_for.asc())
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select(NotificationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        rows.into_iter().map(row_to_notification).collect()
    }

    async fn list_sent_cancel_notices(
        &self,
    ) -> Result<Vec<Notification>, NotificationRepositoryError> {
        let mut conn = self.connection().await?;
        let rows: Vec<NotificationRow> = notifications::table
            .filter(notifications::kind.eq(NotificationKind::PaymentCancelNotice.as_str()))
            .filter(notifications::status.eq(NotificationStatus::Sent.as_str()))
            .order(notifications::sent_at.asc())
            .select(NotificationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;
        rows.into_iter().map(row_to_notification).collect()
    }

    async fn cancel_active_for_booking<'a>(
        &self,
        booking_id: Uuid,
        kinds: Option<&'a [NotificationKind]>,
    ) -> Result<usize, NotificationRepositoryError> {
        let mut conn = self.connection().await?;
        let cancelled_status = NotificationStatus::Cancelled.as_str();
        // Update statements cannot be boxed, so the optional kind filter
        // needs its own branch.
        let cancelled = match kinds {
            Some(kinds) => {
                let names: Vec<&str> = kinds.iter().map(|kind| kind.as_str()).collect();
                diesel::update(
                    notifications::table
                        .filter(notifications::booking_id.eq(booking_id))
                        .filter(notifications::status.eq_any(ACTIVE_STATUSES))
                        .filter(notifications::kind.eq_any(names)),
                )
                .set(notifications::status.eq(cancelled_status))
                .execute(&mut conn)
                .await
            }
            None => {
                diesel::update(
                    notifications::table
                        .filter(notifications::booking_id.eq(booking_id))
                        .filter(notifications::status.eq_any(ACTIVE_STATUSES)),
                )
                .set(notifications::status.eq(cancelled_status))
                .execute(&mut conn)
                .await
            }
        }
        .map_err(map_error)?;
        Ok(cancelled)
    }
}
