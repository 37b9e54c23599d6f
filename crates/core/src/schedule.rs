//! Course schedules and the check-in window.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result, WindowSide};
use crate::limits::{DEFAULT_EARLY_CHECKIN_MINUTES, DEFAULT_LATE_CHECKIN_MINUTES};

/// Weekly meeting slot of a course, in campus-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSchedule {
    #[serde(deserialize_with = "de_weekday")]
    pub weekday: Weekday,
    #[serde(deserialize_with = "de_clock_time")]
    pub start: NaiveTime,
    #[serde(deserialize_with = "de_clock_time")]
    pub end: NaiveTime,
}

impl CourseSchedule {
    pub fn new(weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if end <= start {
            return Err(Error::validation("course end must be after its start"));
        }
        Ok(Self {
            weekday,
            start,
            end,
        })
    }
}

/// A course as the catalog describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    /// The instructor assigned to teach the course.
    pub instructor_id: String,
    pub schedule: CourseSchedule,
}

/// Parse a weekday name in English or Indonesian.
pub fn parse_weekday(raw: &str) -> Result<Weekday> {
    let day = match raw.trim().to_ascii_lowercase().as_str() {
        "senin" | "monday" | "mon" => Weekday::Mon,
        "selasa" | "tuesday" | "tue" => Weekday::Tue,
        "rabu" | "wednesday" | "wed" => Weekday::Wed,
        "kamis" | "thursday" | "thu" => Weekday::Thu,
        "jumat" | "jum'at" | "friday" | "fri" => Weekday::Fri,
        "sabtu" | "saturday" | "sat" => Weekday::Sat,
        "minggu" | "sunday" | "sun" => Weekday::Sun,
        other => return Err(Error::validation(format!("unknown weekday '{}'", other))),
    };
    Ok(day)
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_clock_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| Error::validation(format!("invalid time of day '{}'", raw)))
}

fn de_weekday<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Weekday, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_weekday(&raw).map_err(serde::de::Error::custom)
}

fn de_clock_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<NaiveTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_clock_time(&raw).map_err(serde::de::Error::custom)
}

/// How far around the scheduled meeting a scan is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinPolicy {
    /// Minutes before the scheduled start.
    #[serde(default = "default_early_minutes")]
    pub early_minutes: i64,
    /// Minutes after the scheduled end.
    #[serde(default = "default_late_minutes")]
    pub late_minutes: i64,
}

fn default_early_minutes() -> i64 {
    DEFAULT_EARLY_CHECKIN_MINUTES
}

fn default_late_minutes() -> i64 {
    DEFAULT_LATE_CHECKIN_MINUTES
}

impl Default for CheckinPolicy {
    fn default() -> Self {
        Self {
            early_minutes: default_early_minutes(),
            late_minutes: default_late_minutes(),
        }
    }
}

impl CheckinPolicy {
    /// The window for a schedule on a given campus day.
    pub fn window(&self, schedule: &CourseSchedule, day: NaiveDate) -> CheckinWindow {
        CheckinWindow {
            opens_at: day.and_time(schedule.start) - Duration::minutes(self.early_minutes),
            closes_at: day.and_time(schedule.end) + Duration::minutes(self.late_minutes),
        }
    }
}

/// Inclusive range of campus-local wall time in which a scan may succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinWindow {
    pub opens_at: NaiveDateTime,
    pub closes_at: NaiveDateTime,
}

impl CheckinWindow {
    pub fn contains(&self, local: NaiveDateTime) -> bool {
        local >= self.opens_at && local <= self.closes_at
    }

    /// `Ok(())` inside the window, `OutsideWindow` otherwise.
    pub fn check(&self, local: NaiveDateTime) -> Result<()> {
        let side = if local < self.opens_at {
            WindowSide::TooEarly
        } else if local > self.closes_at {
            WindowSide::TooLate
        } else {
            return Ok(());
        };
        Err(Error::OutsideWindow {
            side,
            opens_at: self.opens_at,
            closes_at: self.closes_at,
        })
    }
}
