//! Deterministic clocks for time-dependent tests.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Local, Utc};
use mockable::Clock;

/// Clock pinned to a single instant.
pub struct FixedClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub fn fixed_clock(utc_now: DateTime<Utc>) -> Arc<dyn Clock> {
    Arc::new(FixedClock { utc_now })
}

/// Clock that tests advance by hand to step through schedules.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(utc_now: DateTime<Utc>) -> Self {
        Self(Mutex::new(utc_now))
    }

    pub fn advance(&self, delta: Duration) {
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}
