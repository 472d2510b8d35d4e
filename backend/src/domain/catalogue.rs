//! Catalogue entities referenced by bookings.
//!
//! These are the read-side shapes the booking pipeline needs: identity,
//! pricing inputs, unit counts, and the soft-delete flag. Admin CRUD over the
//! catalogue is out of scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::money::round2;
use crate::domain::tariff::TariffTable;

/// A bookable studio room with its hourly tariff table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub tariff: TariffTable,
    pub is_deleted: bool,
}

/// Rentable equipment priced per day, shared across bookings up to
/// `total_quantity` units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: Uuid,
    pub name: String,
    pub price_per_day: f64,
    pub total_quantity: u32,
    pub is_deleted: bool,
}

/// A makeup room priced per hour, shared up to `total_quantity` units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeupRoom {
    pub id: Uuid,
    pub name: String,
    pub price_per_hour: f64,
    pub total_quantity: u32,
    pub is_deleted: bool,
}

/// A customer able to hold bookings and receive SMS notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

/// A flat-amount promo code with an activity window and a usage budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub discount_amount: f64,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>,
    pub usage_count: u32,
}

impl PromoCode {
    /// A promo code applies only while active, unexpired, and under its
    /// usage limit.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if let Some(expires_at) = self.expires_at {
            if now >= expires_at {
                return false;
            }
        }
        if let Some(limit) = self.usage_limit {
            if self.usage_count >= limit {
                return false;
            }
        }
        true
    }

    /// Discount applied to `price`, floored at zero.
    pub fn apply(&self, price: f64) -> f64 {
        round2((price - self.discount_amount).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn promo() -> PromoCode {
        PromoCode {
            code: "SPRING".to_owned(),
            discount_amount: 500.0,
            active: true,
            expires_at: Some(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()),
            usage_limit: Some(10),
            usage_count: 3,
        }
    }

    #[test]
    fn promo_valid_within_window_and_budget() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        assert!(promo().is_valid(now));
    }

    #[test]
    fn promo_rejects_expiry_inactivity_and_exhaustion() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();

        let mut expired = promo();
        expired.expires_at = Some(now);
        assert!(!expired.is_valid(now));

        let mut inactive = promo();
        inactive.active = false;
        assert!(!inactive.is_valid(now));

        let mut spent = promo();
        spent.usage_count = 10;
        assert!(!spent.is_valid(now));
    }

    #[test]
    fn discount_is_flat_and_floored() {
        assert_eq!(promo().apply(2000.0), 1500.0);
        assert_eq!(promo().apply(300.0), 0.0);
    }
}
