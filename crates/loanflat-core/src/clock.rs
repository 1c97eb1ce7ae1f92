//! Wall-clock source for `TimestampIfMissing`.

use chrono::{NaiveDateTime, Utc};

/// Supplies the processing time, read once per document.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Current UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// A pinned time, for reproducible runs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
