//! Unified error types for the attendance engine.
//!
//! Every semantic error carries a stable code so clients can render an
//! actionable message:
//! - ATT_001-011: Session and check-in errors
//! - DB_001: Storage errors (transient, retryable by the caller)
//! - UPSTREAM_001: Directory (enrollment/catalog) errors
//! - INTERNAL_001: Anything else

use chrono::{NaiveDateTime, Weekday};
use thiserror::Error;

use crate::record::AttendanceStatus;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// ATT_001: Malformed input (duration, meeting number, status)
    Validation,
    /// ATT_002: Unknown session, course or record
    NotFound,
    /// ATT_003: Requester does not own the resource
    Forbidden,
    /// ATT_004: A live session already exists for this meeting today
    Conflict,
    /// ATT_005: Session is closed or past its expiry
    Expired,
    /// ATT_006: Scan token unknown, closed or expired
    InvalidOrExpiredToken,
    /// ATT_007: Scan token belongs to a different course
    CourseMismatch,
    /// ATT_008: Student is not enrolled in the course
    NotEnrolled,
    /// ATT_009: Today is not the course's scheduled weekday
    WrongDay,
    /// ATT_010: Scan is outside the check-in window
    OutsideWindow,
    /// ATT_011: Student already has a record for this meeting
    AlreadyCheckedIn,
    /// DB_001: Storage layer failure
    Storage,
    /// UPSTREAM_001: Directory service failure
    Upstream,
    /// INTERNAL_001: Unexpected failure
    Internal,
}

impl ErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "ATT_001",
            Self::NotFound => "ATT_002",
            Self::Forbidden => "ATT_003",
            Self::Conflict => "ATT_004",
            Self::Expired => "ATT_005",
            Self::InvalidOrExpiredToken => "ATT_006",
            Self::CourseMismatch => "ATT_007",
            Self::NotEnrolled => "ATT_008",
            Self::WrongDay => "ATT_009",
            Self::OutsideWindow => "ATT_010",
            Self::AlreadyCheckedIn => "ATT_011",
            Self::Storage => "DB_001",
            Self::Upstream => "UPSTREAM_001",
            Self::Internal => "INTERNAL_001",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Forbidden => 403,
            Self::Conflict => 409,
            Self::Expired => 410,
            Self::InvalidOrExpiredToken => 400,
            Self::CourseMismatch => 400,
            Self::NotEnrolled => 403,
            Self::WrongDay => 400,
            Self::OutsideWindow => 400,
            Self::AlreadyCheckedIn => 409,
            Self::Storage => 503,
            Self::Upstream => 502,
            Self::Internal => 500,
        }
    }
}

/// Which side of the check-in window a scan fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSide {
    TooEarly,
    TooLate,
}

impl std::fmt::Display for WindowSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooEarly => f.write_str("too early"),
            Self::TooLate => f.write_str("too late"),
        }
    }
}

/// Unified error type for the attendance engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("session no longer active: {0}")]
    Expired(String),

    #[error("scan token is invalid or the session is no longer active")]
    InvalidOrExpiredToken,

    #[error("scan token belongs to course {session_course}, not {requested_course}")]
    CourseMismatch {
        session_course: String,
        requested_course: String,
    },

    #[error("student {student_id} is not enrolled in {course_id}")]
    NotEnrolled {
        student_id: String,
        course_id: String,
    },

    #[error("course is scheduled on {scheduled}, today is {today}")]
    WrongDay { scheduled: Weekday, today: Weekday },

    #[error("scan is {side}: check-in is open from {opens_at} to {closes_at}")]
    OutsideWindow {
        side: WindowSide,
        opens_at: NaiveDateTime,
        closes_at: NaiveDateTime,
    },

    #[error("already checked in for meeting {meeting_number} with status {status}")]
    AlreadyCheckedIn {
        status: AttendanceStatus,
        meeting_number: u32,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn expired(msg: impl Into<String>) -> Self {
        Self::Expired(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Forbidden(_) => ErrorCode::Forbidden,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::Expired(_) => ErrorCode::Expired,
            Self::InvalidOrExpiredToken => ErrorCode::InvalidOrExpiredToken,
            Self::CourseMismatch { .. } => ErrorCode::CourseMismatch,
            Self::NotEnrolled { .. } => ErrorCode::NotEnrolled,
            Self::WrongDay { .. } => ErrorCode::WrongDay,
            Self::OutsideWindow { .. } => ErrorCode::OutsideWindow,
            Self::AlreadyCheckedIn { .. } => ErrorCode::AlreadyCheckedIn,
            Self::Storage(_) => ErrorCode::Storage,
            Self::Upstream(_) => ErrorCode::Upstream,
            Self::Serialization(_) => ErrorCode::Internal,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        self.code().http_status()
    }

    /// Whether the calling layer may retry the operation unchanged.
    ///
    /// Semantic errors are deterministic; only transport failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Upstream(_))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reasons: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{}: {}", field, reasons.join(", "))
            })
            .collect();
        fields.sort();
        Self::Validation(fields.join("; "))
    }
}
