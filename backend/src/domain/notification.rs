//! Scheduled notification entity.
//!
//! One row per delayed message tied to a booking. The repository enforces the
//! uniqueness invariant: at most one non-terminal notification per
//! `(booking_id, kind)` at a time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::booking::Booking;
use crate::domain::Error;

/// The fixed set of message kinds the scheduler knows how to enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    /// Unpaid-booking warning, one hour after creation.
    PaymentWarning,
    /// Cancellation notice, two hours after creation; once delivered it arms
    /// the auto-cancellation worker.
    PaymentCancelNotice,
    /// Confirmation after full payment.
    PaymentConfirmedFull,
    /// Confirmation after reaching the half-paid band.
    PaymentConfirmedHalf,
    /// Pre-arrival reminder, 24 hours before the slot, fully-paid variant.
    ReminderFull,
    /// Pre-arrival reminder, 24 hours before the slot, remainder-due variant.
    ReminderHalf,
}

impl NotificationKind {
    /// Stable wire/storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PaymentWarning => "payment-warning-1h",
            Self::PaymentCancelNotice => "payment-cancel-2h",
            Self::PaymentConfirmedFull => "payment-confirmed-full",
            Self::PaymentConfirmedHalf => "payment-confirmed-half",
            Self::ReminderFull => "reminder-24h-full",
            Self::ReminderHalf => "reminder-24h-half",
        }
    }

    /// Both pre-arrival reminder variants.
    pub const REMINDERS: [Self; 2] = [Self::ReminderFull, Self::ReminderHalf];

    /// Kinds cancelled when a payment confirmation arrives.
    pub const PAYMENT_CHASERS: [Self; 2] = [Self::PaymentWarning, Self::PaymentCancelNotice];
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "payment-warning-1h" => Ok(Self::PaymentWarning),
            "payment-cancel-2h" => Ok(Self::PaymentCancelNotice),
            "payment-confirmed-full" => Ok(Self::PaymentConfirmedFull),
            "payment-confirmed-half" => Ok(Self::PaymentConfirmedHalf),
            "reminder-24h-full" => Ok(Self::ReminderFull),
            "reminder-24h-half" => Ok(Self::ReminderHalf),
            other => Err(Error::invalid_request(format!(
                "unknown notification kind: {other}"
            ))),
        }
    }
}

/// Delivery state. `Sent`, `Failed`, and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Scheduled,
    Processing,
    Sent,
    Failed,
    Cancelled,
}

impl NotificationStatus {
    /// Stable wire/storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal notifications count neither for uniqueness nor delivery.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed | Self::Cancelled)
    }
}

impl FromStr for NotificationStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "scheduled" => Ok(Self::Scheduled),
            "processing" => Ok(Self::Processing),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::invalid_request(format!(
                "unknown notification status: {other}"
            ))),
        }
    }
}

/// Default delivery attempt budget before a notification is marked failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// One scheduled or delivered message tied to a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub status: NotificationStatus,
    /// Target fire time; the delivery worker picks the row up once this has
    /// passed.
    pub scheduled_for: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build a freshly scheduled notification.
    pub fn scheduled(
        booking_id: Uuid,
        user_id: Uuid,
        kind: NotificationKind,
        scheduled_for: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            user_id,
            kind,
            status: NotificationStatus::Scheduled,
            scheduled_for,
            sent_at: None,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            last_error: None,
            created_at: now,
        }
    }

    /// Whether the delay has elapsed and the row is claimable for delivery.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal()
            && self.status != NotificationStatus::Processing
            && self.scheduled_for <= now
    }
}

/// Render the SMS text for a notification.
///
/// Deliberately plain string formatting; templating sophistication is out of
/// scope. The receipt link, when present, is appended to payment
/// confirmations only.
pub fn render_message(kind: NotificationKind, booking: &Booking, receipt_link: Option<&str>) -> String {
    let slot = booking.starts_at.format("%Y-%m-%d %H:%M UTC");
    let mut text = match kind {
        NotificationKind::PaymentWarning => format!(
            "Your booking for {slot} is awaiting payment. Unpaid bookings are released two hours after creation."
        ),
        NotificationKind::PaymentCancelNotice => format!(
            "Your booking for {slot} is still unpaid and will be cancelled in two hours unless payment arrives."
        ),
        NotificationKind::PaymentConfirmedFull => format!(
            "Payment received in full. Your booking for {slot} is confirmed."
        ),
        NotificationKind::PaymentConfirmedHalf => format!(
            "Prepayment received. Your booking for {slot} is reserved; the remainder is due on site."
        ),
        NotificationKind::ReminderFull => format!(
            "Reminder: your fully paid booking starts {slot}."
        ),
        NotificationKind::ReminderHalf => format!(
            "Reminder: your booking starts {slot}. Please settle the outstanding amount on arrival."
        ),
    };
    if let Some(link) = receipt_link {
        if matches!(
            kind,
            NotificationKind::PaymentConfirmedFull | NotificationKind::PaymentConfirmedHalf
        ) {
            text.push_str(" Receipt: ");
            text.push_str(link);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_round_trip() {
        for kind in [
            NotificationKind::PaymentWarning,
            NotificationKind::PaymentCancelNotice,
            NotificationKind::PaymentConfirmedFull,
            NotificationKind::PaymentConfirmedHalf,
            NotificationKind::ReminderFull,
            NotificationKind::ReminderHalf,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(NotificationStatus::Sent.is_terminal());
        assert!(NotificationStatus::Failed.is_terminal());
        assert!(NotificationStatus::Cancelled.is_terminal());
        assert!(!NotificationStatus::Scheduled.is_terminal());
        assert!(!NotificationStatus::Processing.is_terminal());
    }

    #[test]
    fn due_only_after_scheduled_for() {
        let now = Utc::now();
        let mut notification = Notification::scheduled(
            Uuid::new_v4(),
            Uuid::new_v4(),
            NotificationKind::PaymentWarning,
            now + chrono::Duration::hours(1),
            now,
        );
        assert!(!notification.is_due(now));
        assert!(notification.is_due(now + chrono::Duration::hours(1)));

        notification.status = NotificationStatus::Cancelled;
        assert!(!notification.is_due(now + chrono::Duration::hours(2)));
    }
}
