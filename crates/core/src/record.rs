//! Attendance record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Outcome of one student for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Excused,
    Sick,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Excused => "excused",
            Self::Sick => "sick",
            Self::Absent => "absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = Error;

    /// Accepts the English names and the campus spellings
    /// (`hadir`, `izin`, `sakit`, `alpa`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" | "hadir" => Ok(Self::Present),
            "excused" | "izin" => Ok(Self::Excused),
            "sick" | "sakit" => Ok(Self::Sick),
            "absent" | "alpa" => Ok(Self::Absent),
            other => Err(Error::validation(format!(
                "status must be one of present, excused, sick, absent (got '{}')",
                other
            ))),
        }
    }
}

/// How a record came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    SelfCheckIn,
    InstructorOverride,
}

/// One student's outcome for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub student_id: String,
    pub session_id: Uuid,
    pub course_id: String,
    /// Denormalized from the session for reporting.
    pub meeting_number: u32,
    pub status: AttendanceStatus,
    pub recorded_at: DateTime<Utc>,
    pub source: RecordSource,
}

impl AttendanceRecord {
    /// A successful self check-in; status is always `present`.
    pub fn check_in(
        student_id: impl Into<String>,
        session_id: Uuid,
        course_id: impl Into<String>,
        meeting_number: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            session_id,
            course_id: course_id.into(),
            meeting_number,
            status: AttendanceStatus::Present,
            recorded_at: now,
            source: RecordSource::SelfCheckIn,
        }
    }

    /// An instructor-set status.
    pub fn manual(
        student_id: impl Into<String>,
        session_id: Uuid,
        course_id: impl Into<String>,
        meeting_number: u32,
        status: AttendanceStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            session_id,
            course_id: course_id.into(),
            meeting_number,
            status,
            recorded_at: now,
            source: RecordSource::InstructorOverride,
        }
    }
}

/// Per-status tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub present: u32,
    pub excused: u32,
    pub sick: u32,
    pub absent: u32,
}

impl StatusCounts {
    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Excused => self.excused += 1,
            AttendanceStatus::Sick => self.sick += 1,
            AttendanceStatus::Absent => self.absent += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.present + self.excused + self.sick + self.absent
    }
}

impl FromIterator<AttendanceStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = AttendanceStatus>>(iter: I) -> Self {
        let mut counts = Self::default();
        for status in iter {
            counts.add(status);
        }
        counts
    }
}

/// Percentage helper; zero when the denominator is zero.
pub fn percent(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}
