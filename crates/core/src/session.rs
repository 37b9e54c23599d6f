//! Attendance session types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Stored lifecycle state.
///
/// A session is never moved to `Closed` by time alone; use
/// [`Session::is_live_at`] for the effective state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Closed,
}

/// One attempt to hold attendance for a course meeting on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub instructor_id: String,
    pub course_id: String,
    /// Ordinal meeting within the term (1-16).
    pub meeting_number: u32,
    /// Current scan token; rotated by refresh.
    pub token: String,
    /// Human-readable code, e.g. `ABS-CS101-P3-150126100000`.
    pub code: String,
    pub created_at: DateTime<Utc>,
    /// Always `created_at + duration`.
    pub expires_at: DateTime<Utc>,
    pub state: SessionState,
}

impl Session {
    /// Creates a new active session.
    pub fn new(
        instructor_id: impl Into<String>,
        course_id: impl Into<String>,
        meeting_number: u32,
        duration_minutes: u32,
        token: String,
        code: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instructor_id: instructor_id.into(),
            course_id: course_id.into(),
            meeting_number,
            token,
            code,
            created_at: now,
            expires_at: now + Duration::minutes(duration_minutes as i64),
            state: SessionState::Active,
        }
    }

    /// Active and not yet expired.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.state == SessionState::Active && now < self.expires_at
    }

    pub fn is_owned_by(&self, instructor_id: &str) -> bool {
        self.instructor_id == instructor_id
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.expires_at - self.created_at).num_minutes()
    }

    /// Seconds until expiry, floored at zero.
    pub fn seconds_left(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Request to open a session.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenSession {
    #[validate(length(min = 1, max = 32))]
    pub course_id: String,
    #[validate(range(min = 1, max = 16, message = "meeting_number must be between 1 and 16"))]
    pub meeting_number: u32,
    #[validate(range(min = 5, max = 120, message = "duration must be between 5 and 120 minutes"))]
    #[serde(alias = "duration")]
    pub duration_minutes: u32,
}

/// Narrowing filters for session listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFilter {
    pub instructor_id: Option<String>,
    pub course_id: Option<String>,
    pub meeting_number: Option<u32>,
}

impl SessionFilter {
    pub fn for_instructor(instructor_id: impl Into<String>) -> Self {
        Self {
            instructor_id: Some(instructor_id.into()),
            ..Self::default()
        }
    }

    pub fn for_course(course_id: impl Into<String>) -> Self {
        Self {
            course_id: Some(course_id.into()),
            ..Self::default()
        }
    }

    pub fn with_course(mut self, course_id: Option<String>) -> Self {
        self.course_id = course_id;
        self
    }

    pub fn with_meeting(mut self, meeting_number: Option<u32>) -> Self {
        self.meeting_number = meeting_number;
        self
    }

    pub fn matches(&self, session: &Session) -> bool {
        self.instructor_id
            .as_deref()
            .map_or(true, |id| session.instructor_id == id)
            && self
                .course_id
                .as_deref()
                .map_or(true, |id| session.course_id == id)
            && self
                .meeting_number
                .map_or(true, |n| session.meeting_number == n)
    }
}

/// Data an external renderer needs to draw the scan code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTicket {
    pub session_id: Uuid,
    pub course_id: String,
    pub meeting_number: u32,
    pub expires_at: DateTime<Utc>,
    pub seconds_left: i64,
    /// `token|course|meeting|unix-seconds`
    pub payload: String,
}

impl ScanTicket {
    pub fn for_session(session: &Session, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session.id,
            course_id: session.course_id.clone(),
            meeting_number: session.meeting_number,
            expires_at: session.expires_at,
            seconds_left: session.seconds_left(now),
            payload: format!(
                "{}|{}|{}|{}",
                session.token,
                session.course_id,
                session.meeting_number,
                now.timestamp()
            ),
        }
    }
}
