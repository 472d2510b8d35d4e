//! Booking price computation.
//!
//! Room time is priced per clock-hour segment through the tariff resolver.
//! Equipment carries a flat per-day fee regardless of booking duration,
//! while makeup rooms scale by the hour. Every aggregation step rounds to
//! two decimals so audits recompute identically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::catalogue::{Equipment, MakeupRoom, PromoCode, Room};
use crate::domain::money::round2;
use crate::domain::tariff::TariffResolver;

/// Headcount bands and their percentage surcharge on the base price.
/// Up to five people ride free; larger parties wear the room harder.
const PEOPLE_SURCHARGE_BANDS: [(u32, f64); 3] = [(15, 0.30), (10, 0.20), (5, 0.10)];

/// Surcharge rate for a party of `people_count`.
pub fn people_surcharge_rate(people_count: u32) -> f64 {
    for (threshold, rate) in PEOPLE_SURCHARGE_BANDS {
        if people_count > threshold {
            return rate;
        }
    }
    0.0
}

/// Per-component price breakdown persisted with the booking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub room_price: f64,
    pub equipment_price: f64,
    pub makeup_price: f64,
    /// People-band surcharge as a rate (0.10 = 10%).
    pub surcharge_rate: f64,
    /// Base plus surcharge, before any promo discount.
    pub original_price: f64,
    /// What the customer owes after the promo discount.
    pub final_price: f64,
}

/// Prices a booking from catalogue inputs and the tariff resolver.
#[derive(Debug, Clone)]
pub struct PriceCalculator {
    resolver: TariffResolver,
}

impl PriceCalculator {
    /// Create a calculator over the studio's tariff resolver.
    pub fn new(resolver: TariffResolver) -> Self {
        Self { resolver }
    }

    /// Access the underlying resolver.
    pub fn resolver(&self) -> &TariffResolver {
        &self.resolver
    }

    /// Compute the full breakdown for a candidate booking.
    ///
    /// `promo` must already be validity-checked by the caller against "now";
    /// an invalid promo is passed as `None`.
    pub fn compute(
        &self,
        room: &Room,
        equipment: &[(Equipment, u32)],
        makeup_rooms: &[(MakeupRoom, u32, f64)],
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        people_count: u32,
        promo: Option<&PromoCode>,
    ) -> PriceBreakdown {
        let room_price = self.room_price(room, starts_at, ends_at);
        let equipment_price = equipment_price(equipment);
        let makeup_price = makeup_price(makeup_rooms);

        let base = round2(room_price + equipment_price + makeup_price);
        let surcharge_rate = people_surcharge_rate(people_count);
        let original_price = round2(base * (1.0 + surcharge_rate));
        let final_price = match promo {
            Some(promo) => promo.apply(original_price),
            None => original_price,
        };

        PriceBreakdown {
            room_price,
            equipment_price,
            makeup_price,
            surcharge_rate,
            original_price,
            final_price,
        }
    }

    /// Room cost: each clock-hour segment billed at its own resolved rate.
    fn room_price(&self, room: &Room, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> f64 {
        let total: f64 = self
            .resolver
            .hour_segments(starts_at, ends_at)
            .iter()
            .map(|segment| {
                round2(self.resolver.rate_at(&room.tariff, segment.starts_at) * segment.hours)
            })
            .sum();
        round2(total)
    }
}

/// Flat per-day fee times quantity; never scaled by booking duration.
fn equipment_price(equipment: &[(Equipment, u32)]) -> f64 {
    let total: f64 = equipment
        .iter()
        .map(|(item, quantity)| round2(item.price_per_day * f64::from(*quantity)))
        .sum();
    round2(total)
}

/// Hour-scaled makeup-room fee: rate × quantity × hours.
fn makeup_price(makeup_rooms: &[(MakeupRoom, u32, f64)]) -> f64 {
    let total: f64 = makeup_rooms
        .iter()
        .map(|(room, quantity, hours)| round2(room.price_per_hour * f64::from(*quantity) * hours))
        .sum();
    round2(total)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::Europe::Moscow;
    use rstest::rstest;
    use uuid::Uuid;

    use crate::domain::tariff::TariffTable;

    use super::*;

    fn calculator() -> PriceCalculator {
        PriceCalculator::new(TariffResolver::new(Moscow))
    }

    fn room() -> Room {
        Room {
            id: Uuid::new_v4(),
            name: "Main hall".to_owned(),
            tariff: TariffTable {
                weekday_morning: Some(1000.0),
                weekday_evening: Some(1200.0),
                weekend: Some(1500.0),
                default_rate: None,
            },
            is_deleted: false,
        }
    }

    fn equipment(price_per_day: f64) -> Equipment {
        Equipment {
            id: Uuid::new_v4(),
            name: "Strobe kit".to_owned(),
            price_per_day,
            total_quantity: 4,
            is_deleted: false,
        }
    }

    fn makeup_room(price_per_hour: f64) -> MakeupRoom {
        MakeupRoom {
            id: Uuid::new_v4(),
            name: "Makeup A".to_owned(),
            price_per_hour,
            total_quantity: 2,
            is_deleted: false,
        }
    }

    /// Local Moscow wall-clock instant. 2026-03-02 is a Monday.
    fn local(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Moscow
            .with_ymd_and_hms(2026, 3, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn segmented_room_price_across_midday() {
        // 11:00–13:00 weekday: one morning hour plus one evening hour.
        let breakdown = calculator().compute(
            &room(),
            &[],
            &[],
            local(2, 11, 0),
            local(2, 13, 0),
            2,
            None,
        );
        assert_eq!(breakdown.room_price, 2200.0);
        assert_eq!(breakdown.final_price, 2200.0);
    }

    #[test]
    fn fractional_segments_are_billed_proportionally() {
        // 11:30–13:00: half a morning hour plus one evening hour.
        let breakdown = calculator().compute(
            &room(),
            &[],
            &[],
            local(2, 11, 30),
            local(2, 13, 0),
            2,
            None,
        );
        assert_eq!(breakdown.room_price, 500.0 + 1200.0);
    }

    #[test]
    fn equipment_is_flat_per_day_not_per_hour() {
        // A three-hour booking with two strobe kits at 500/day: exactly
        // 500 × 2, not 500 × 3 × 2.
        let breakdown = calculator().compute(
            &room(),
            &[(equipment(500.0), 2)],
            &[],
            local(2, 18, 0),
            local(2, 21, 0),
            2,
            None,
        );
        assert_eq!(breakdown.equipment_price, 1000.0);
    }

    #[test]
    fn makeup_rooms_are_hour_scaled() {
        let breakdown = calculator().compute(
            &room(),
            &[],
            &[(makeup_room(800.0), 1, 1.5)],
            local(2, 18, 0),
            local(2, 20, 0),
            2,
            None,
        );
        assert_eq!(breakdown.makeup_price, 1200.0);
    }

    #[rstest]
    #[case(1, 0.0)]
    #[case(5, 0.0)]
    #[case(6, 0.10)]
    #[case(10, 0.10)]
    #[case(11, 0.20)]
    #[case(15, 0.20)]
    #[case(16, 0.30)]
    fn surcharge_bands(#[case] people: u32, #[case] expected: f64) {
        assert_eq!(people_surcharge_rate(people), expected);
    }

    #[test]
    fn surcharge_applies_to_whole_base() {
        // 2h evening room (2400) + flat equipment (500), party of six.
        let breakdown = calculator().compute(
            &room(),
            &[(equipment(500.0), 1)],
            &[],
            local(2, 18, 0),
            local(2, 20, 0),
            6,
            None,
        );
        assert_eq!(breakdown.original_price, round2(2900.0 * 1.1));
    }

    #[test]
    fn promo_discount_is_flat_and_floored() {
        let promo = PromoCode {
            code: "WELCOME".to_owned(),
            discount_amount: 5000.0,
            active: true,
            expires_at: None,
            usage_limit: None,
            usage_count: 0,
        };
        let breakdown = calculator().compute(
            &room(),
            &[],
            &[],
            local(2, 18, 0),
            local(2, 20, 0),
            2,
            Some(&promo),
        );
        assert_eq!(breakdown.original_price, 2400.0);
        assert_eq!(breakdown.final_price, 0.0);
    }
}
