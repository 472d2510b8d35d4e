//! Time-of-day tariff resolution and clock-hour segmentation.
//!
//! Rates depend on the *local* civil time at the studio, so every calendar
//! decision here goes through the configured [`chrono_tz::Tz`]. A booking
//! window is priced per clock-hour segment, never as one flat block: the
//! 11:30–13:00 window crosses the midday boundary and must be billed as
//! 0.5h morning + 1.0h evening.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, Offset, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Hourly rates for a room. Absent or zero rates fall back to the next
/// configured rate; a fully unconfigured table resolves to zero, which is a
/// configuration error rather than a runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffTable {
    pub weekday_morning: Option<f64>,
    pub weekday_evening: Option<f64>,
    pub weekend: Option<f64>,
    pub default_rate: Option<f64>,
}

/// Designated non-working dates priced at the weekend rate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    /// Build a calendar from explicit dates.
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    /// Whether `date` is a designated holiday.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

/// Which tariff band applies to a given local instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Morning,
    Evening,
    Weekend,
}

/// One clock-hour-aligned piece of a booking window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourSegment {
    /// Segment start, also the instant the rate is resolved at.
    pub starts_at: DateTime<Utc>,
    /// Segment length in hours; fractional at the window edges.
    pub hours: f64,
}

/// Resolves a room's hourly rate for an instant in the studio's civil zone.
#[derive(Debug, Clone)]
pub struct TariffResolver {
    zone: Tz,
    holidays: HolidayCalendar,
}

/// Evening pricing on the last business day of the week starts at this
/// local hour and is billed at the weekend rate.
const FRIDAY_WEEKEND_HOUR: u32 = 17;

/// Local hour before which weekday bookings use the morning rate.
const MORNING_END_HOUR: u32 = 12;

impl TariffResolver {
    /// Create a resolver for the studio's timezone with no holidays.
    pub fn new(zone: Tz) -> Self {
        Self {
            zone,
            holidays: HolidayCalendar::default(),
        }
    }

    /// Attach a holiday calendar.
    pub fn with_holidays(mut self, holidays: HolidayCalendar) -> Self {
        self.holidays = holidays;
        self
    }

    /// The civil timezone used for day-of-week and hour decisions.
    pub fn zone(&self) -> Tz {
        self.zone
    }

    fn band_at(&self, instant: DateTime<Utc>) -> Band {
        let local = instant.with_timezone(&self.zone);
        let weekday = local.weekday();

        if matches!(weekday, Weekday::Sat | Weekday::Sun)
            || self.holidays.contains(local.date_naive())
        {
            return Band::Weekend;
        }
        if weekday == Weekday::Fri && local.hour() >= FRIDAY_WEEKEND_HOUR {
            return Band::Weekend;
        }
        if local.hour() < MORNING_END_HOUR {
            Band::Morning
        } else {
            Band::Evening
        }
    }

    /// Hourly rate applicable to the clock hour containing `instant`.
    ///
    /// Falls back across the remaining configured rates when the selected one
    /// is absent or zero, ending at `default_rate` and finally `0.0`.
    pub fn rate_at(&self, tariff: &TariffTable, instant: DateTime<Utc>) -> f64 {
        let candidates = match self.band_at(instant) {
            Band::Morning => [
                tariff.weekday_morning,
                tariff.weekday_evening,
                tariff.weekend,
                tariff.default_rate,
            ],
            Band::Evening => [
                tariff.weekday_evening,
                tariff.weekday_morning,
                tariff.weekend,
                tariff.default_rate,
            ],
            Band::Weekend => [
                tariff.weekend,
                tariff.weekday_evening,
                tariff.weekday_morning,
                tariff.default_rate,
            ],
        };

        candidates
            .into_iter()
            .flatten()
            .find(|rate| *rate > 0.0)
            .unwrap_or(0.0)
    }

    /// Split `[starts_at, ends_at)` at local clock-hour boundaries.
    ///
    /// Each returned segment lies within a single local clock hour, so it can
    /// be priced with one [`TariffResolver::rate_at`] call. Boundaries are
    /// computed from the zone offset at each segment start, which keeps the
    /// split correct across DST transitions.
    pub fn hour_segments(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Vec<HourSegment> {
        let mut segments = Vec::new();
        let mut cursor = starts_at;

        while cursor < ends_at {
            let boundary = self.next_local_hour_boundary(cursor);
            let segment_end = boundary.min(ends_at);
            let seconds = (segment_end - cursor).num_seconds();
            segments.push(HourSegment {
                starts_at: cursor,
                hours: seconds as f64 / 3600.0,
            });
            cursor = segment_end;
        }

        segments
    }

    fn next_local_hour_boundary(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let offset = self
            .zone
            .offset_from_utc_datetime(&instant.naive_utc())
            .fix()
            .local_minus_utc() as i64;
        let local_seconds = instant.timestamp() + offset;
        let into_hour = local_seconds.rem_euclid(3600);
        let advance = 3600 - into_hour;
        instant + chrono::Duration::seconds(advance)
    }
}
