//! Booking aggregate: status state machine and payment derivation.
//!
//! The entity owns every pure rule: which status transitions are legal, how
//! `payment_status` derives from the amounts, and when the half-paid flag
//! applies. Services orchestrate around it; adapters persist it verbatim.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::money::{covers, is_zero, round2};
use crate::domain::{Error, ErrorCode};

/// Booking lifecycle status. `Cancelled` and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Stable wire/storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Whether the booking occupies its resources for availability checks.
    pub fn occupies(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Legal transitions: pending → confirmed/cancelled,
    /// confirmed → completed/cancelled.
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Confirmed | Self::Cancelled),
            Self::Confirmed => matches!(next, Self::Completed | Self::Cancelled),
            Self::Cancelled | Self::Completed => false,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(Error::invalid_request(format!(
                "unknown booking status: {other}"
            ))),
        }
    }
}

/// Payment progress derived from `paid_amount` against `total_price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Stable wire/storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "unpaid" => Ok(Self::Unpaid),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            other => Err(Error::invalid_request(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// How the booking is paid. Once an on-site method is recorded, online
/// payment flows no longer apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Online,
    OnSiteCash,
    OnSiteCard,
}

impl PaymentMethod {
    /// Stable wire/storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::OnSiteCash => "on_site_cash",
            Self::OnSiteCard => "on_site_card",
        }
    }

    /// Whether payment is collected at the studio.
    pub fn is_on_site(self) -> bool {
        matches!(self, Self::OnSiteCash | Self::OnSiteCard)
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "online" => Ok(Self::Online),
            "on_site_cash" => Ok(Self::OnSiteCash),
            "on_site_card" => Ok(Self::OnSiteCard),
            other => Err(Error::invalid_request(format!(
                "unknown payment method: {other}"
            ))),
        }
    }
}

/// Requested equipment units for a booking (flat per-day pricing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentSelection {
    pub equipment_id: Uuid,
    pub quantity: u32,
}

/// Requested makeup-room units and hours (per-hour pricing).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeupRoomSelection {
    pub makeup_room_id: Uuid,
    pub quantity: u32,
    pub hours: f64,
}

/// Half-paid band: `paid_amount` within this share of `total_price` counts
/// as "half paid" and selects the half-payment notification templates.
/// The ±10-point tolerance around 50% mirrors the source system.
const HALF_BAND_LOW: f64 = 0.4;
const HALF_BAND_HIGH: f64 = 0.6;

/// What a cumulative payment changed, used to pick follow-up notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaymentOutcome {
    /// The booking crossed into fully paid with this payment.
    pub became_paid: bool,
    /// The booking entered the half-paid band for the first time.
    pub became_half_paid: bool,
}

impl PaymentOutcome {
    /// Whether this payment should trigger a confirmation notification.
    pub fn confirms_payment(self) -> bool {
        self.became_paid || self.became_half_paid
    }
}

/// Validated input for constructing a booking.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub id: Uuid,
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub equipment: Vec<EquipmentSelection>,
    pub makeup_rooms: Vec<MakeupRoomSelection>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub people_count: u32,
    pub promo_code: Option<String>,
    pub original_price: f64,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
}

/// The central aggregate. Never physically deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub equipment: Vec<EquipmentSelection>,
    pub makeup_rooms: Vec<MakeupRoomSelection>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub is_half_paid: bool,
    pub payment_method: PaymentMethod,
    pub original_price: f64,
    pub total_price: f64,
    pub discount: f64,
    pub paid_amount: f64,
    pub people_count: u32,
    pub promo_code: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency version; bumped on every persisted update.
    pub version: i32,
}

impl Booking {
    /// Construct a pending booking from validated pricing output. The
    /// payment state is derived rather than assumed unpaid: a zero total
    /// (a promo covering the whole price) starts out paid, so no payment
    /// chasers ever target it.
    pub fn new(draft: BookingDraft) -> Result<Self, Error> {
        if draft.ends_at <= draft.starts_at {
            return Err(Error::invalid_request(
                "booking must end strictly after it starts",
            ));
        }
        if draft.equipment.iter().any(|item| item.quantity == 0)
            || draft.makeup_rooms.iter().any(|item| item.quantity == 0)
        {
            return Err(Error::invalid_request(
                "selection quantities must be at least one",
            ));
        }
        if draft.makeup_rooms.iter().any(|item| item.hours <= 0.0) {
            return Err(Error::invalid_request(
                "makeup room hours must be positive",
            ));
        }

        let discount = round2(draft.original_price - draft.total_price);
        let (payment_status, is_half_paid) = Self::derive_payment(0.0, draft.total_price);
        Ok(Self {
            id: draft.id,
            user_id: draft.user_id,
            room_id: draft.room_id,
            equipment: draft.equipment,
            makeup_rooms: draft.makeup_rooms,
            starts_at: draft.starts_at,
            ends_at: draft.ends_at,
            status: BookingStatus::Pending,
            payment_status,
            is_half_paid,
            payment_method: PaymentMethod::Online,
            original_price: draft.original_price,
            total_price: draft.total_price,
            discount,
            paid_amount: 0.0,
            people_count: draft.people_count,
            promo_code: draft.promo_code,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: draft.created_at,
            version: 0,
        })
    }

    /// Whether the booking is fully paid.
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Derive `(payment_status, is_half_paid)` from amounts.
    fn derive_payment(paid_amount: f64, total_price: f64) -> (PaymentStatus, bool) {
        if covers(paid_amount, total_price) {
            return (PaymentStatus::Paid, false);
        }
        if is_zero(paid_amount) {
            return (PaymentStatus::Unpaid, false);
        }
        let share = if total_price > 0.0 {
            paid_amount / total_price
        } else {
            0.0
        };
        let half = (HALF_BAND_LOW..=HALF_BAND_HIGH).contains(&share);
        (PaymentStatus::Partial, half)
    }

    /// Record a cumulative payment and re-derive the payment state.
    ///
    /// Idempotency of webhook delivery is the caller's responsibility; this
    /// is a pure additive update.
    pub fn apply_payment(&mut self, amount: f64) -> Result<PaymentOutcome, Error> {
        if amount <= 0.0 {
            return Err(Error::invalid_request("payment amount must be positive"));
        }

        let was_paid = self.is_paid();
        let was_half_paid = self.is_half_paid;

        self.paid_amount = round2(self.paid_amount + amount);
        let (payment_status, is_half_paid) =
            Self::derive_payment(self.paid_amount, self.total_price);
        self.payment_status = payment_status;
        self.is_half_paid = is_half_paid;

        Ok(PaymentOutcome {
            became_paid: self.is_paid() && !was_paid,
            became_half_paid: self.is_half_paid && !was_half_paid,
        })
    }

    /// Replace the price totals (after items were added) and re-derive the
    /// payment state against the new total.
    pub fn reprice(&mut self, original_price: f64, total_price: f64) {
        self.original_price = original_price;
        self.total_price = total_price;
        self.discount = round2(original_price - total_price);
        let (payment_status, is_half_paid) =
            Self::derive_payment(self.paid_amount, self.total_price);
        self.payment_status = payment_status;
        self.is_half_paid = is_half_paid;
    }

    /// Apply a guarded status transition.
    ///
    /// Returns `Ok(false)` for a same-status no-op. Transitions out of a
    /// terminal status, or any other illegal move, are rejected with
    /// [`ErrorCode::Conflict`] and never silently overwrite state.
    pub fn transition(&mut self, next: BookingStatus, now: DateTime<Utc>) -> Result<bool, Error> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(Error::new(
                ErrorCode::Conflict,
                format!(
                    "booking cannot move from {} to {}",
                    self.status.as_str(),
                    next.as_str()
                ),
            ));
        }

        self.status = next;
        if next == BookingStatus::Cancelled {
            self.cancelled_at = Some(now);
        }
        Ok(true)
    }

    /// Cancel with a recorded reason (worker or explicit cancellation).
    pub fn cancel(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<bool, Error> {
        let changed = self.transition(BookingStatus::Cancelled, now)?;
        if changed {
            self.cancellation_reason = Some(reason.into());
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    fn draft() -> BookingDraft {
        let starts_at = Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap();
        BookingDraft {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            equipment: Vec::new(),
            makeup_rooms: Vec::new(),
            starts_at,
            ends_at: starts_at + chrono::Duration::hours(2),
            people_count: 2,
            promo_code: None,
            original_price: 1000.0,
            total_price: 1000.0,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    fn booking() -> Booking {
        Booking::new(draft()).expect("valid draft")
    }

    #[test]
    fn zero_total_starts_out_paid() {
        let mut free = draft();
        free.total_price = 0.0;
        let booking = Booking::new(free).expect("valid draft");
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
        assert!(!booking.is_half_paid);
        assert!(booking.is_paid());
    }

    #[test]
    fn rejects_inverted_window() {
        let mut bad = draft();
        bad.ends_at = bad.starts_at;
        let err = Booking::new(bad).expect_err("window must be rejected");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[case::zero(0.0, PaymentStatus::Unpaid, false)]
    #[case::below_band(300.0, PaymentStatus::Partial, false)]
    #[case::half(500.0, PaymentStatus::Partial, true)]
    #[case::band_low_edge(400.0, PaymentStatus::Partial, true)]
    #[case::band_high_edge(600.0, PaymentStatus::Partial, true)]
    #[case::above_band(700.0, PaymentStatus::Partial, false)]
    #[case::paid(1000.0, PaymentStatus::Paid, false)]
    #[case::overshoot(1000.01, PaymentStatus::Paid, false)]
    fn payment_status_derivation(
        #[case] amount: f64,
        #[case] expected: PaymentStatus,
        #[case] half: bool,
    ) {
        let mut booking = booking();
        if amount > 0.0 {
            booking.apply_payment(amount).expect("positive amount");
        }
        assert_eq!(booking.payment_status, expected);
        assert_eq!(booking.is_half_paid, half);
    }

    #[test]
    fn payments_accumulate_and_report_first_crossings() {
        let mut booking = booking();

        let first = booking.apply_payment(500.0).expect("first half");
        assert!(first.became_half_paid);
        assert!(!first.became_paid);

        // Still in the band: no repeat half-paid signal.
        let second = booking.apply_payment(50.0).expect("top-up");
        assert!(!second.became_half_paid);
        assert!(!second.became_paid);

        let third = booking.apply_payment(450.0).expect("remainder");
        assert!(third.became_paid);
        assert_eq!(booking.paid_amount, 1000.0);
    }

    #[test]
    fn rounding_drift_still_reaches_paid() {
        let mut booking = booking();
        booking.apply_payment(333.33).expect("payment");
        booking.apply_payment(333.33).expect("payment");
        let outcome = booking.apply_payment(333.34).expect("payment");
        assert!(outcome.became_paid);
    }

    #[rstest]
    #[case(BookingStatus::Pending, BookingStatus::Confirmed, true)]
    #[case(BookingStatus::Pending, BookingStatus::Cancelled, true)]
    #[case(BookingStatus::Pending, BookingStatus::Completed, false)]
    #[case(BookingStatus::Confirmed, BookingStatus::Completed, true)]
    #[case(BookingStatus::Confirmed, BookingStatus::Cancelled, true)]
    #[case(BookingStatus::Cancelled, BookingStatus::Pending, false)]
    #[case(BookingStatus::Completed, BookingStatus::Cancelled, false)]
    fn transition_table(
        #[case] from: BookingStatus,
        #[case] to: BookingStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn terminal_states_reject_transitions_without_overwriting() {
        let now = Utc::now();
        let mut booking = booking();
        booking.cancel("unpaid", now).expect("cancel pending");
        assert_eq!(booking.cancelled_at, Some(now));

        let err = booking
            .transition(BookingStatus::Confirmed, now)
            .expect_err("terminal status must reject transitions");
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(booking.status, BookingStatus::Cancelled);
    }

    #[test]
    fn same_status_transition_is_a_noop() {
        let mut booking = booking();
        let changed = booking
            .transition(BookingStatus::Pending, Utc::now())
            .expect("no-op");
        assert!(!changed);
    }
}
