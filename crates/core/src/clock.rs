//! Time source and campus calendar.
//!
//! All windowing logic is a pure function of `Clock::now()` and stored
//! timestamps. Calendar days and weekdays are evaluated at the campus UTC
//! offset, not the host's local zone.

use chrono::{Datelike, DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc, Weekday};
use parking_lot::RwLock;

use crate::error::{Error, Result};

/// Supplies the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.write() = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// Converts instants to campus-local dates and times.
#[derive(Debug, Clone, Copy)]
pub struct CampusCalendar {
    offset: FixedOffset,
}

impl CampusCalendar {
    /// Build a calendar for a UTC offset given in minutes (e.g. 420 for UTC+7).
    pub fn from_offset_minutes(minutes: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
            Error::validation(format!("utc offset of {} minutes is out of range", minutes))
        })?;
        Ok(Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    /// Campus-local wall time without offset.
    pub fn local_naive(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        self.to_local(instant).naive_local()
    }

    /// Campus calendar day of an instant.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_local(instant).date_naive()
    }

    pub fn weekday_of(&self, instant: DateTime<Utc>) -> Weekday {
        self.to_local(instant).weekday()
    }
}
