//! Store contracts.
//!
//! Uniqueness invariants live here, not in the engine: every
//! check-then-write the engine relies on is a single store call that
//! either commits or fails with the matching semantic error.

use async_trait::async_trait;
use attendance_core::{AttendanceRecord, Result, Session, SessionFilter};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Unique key for live sessions: one per instructor, course, meeting and campus day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionSlot {
    pub instructor_id: String,
    pub course_id: String,
    pub meeting_number: u32,
    pub day: NaiveDate,
}

impl SessionSlot {
    pub fn of(session: &Session, day: NaiveDate) -> Self {
        Self {
            instructor_id: session.instructor_id.clone(),
            course_id: session.course_id.clone(),
            meeting_number: session.meeting_number,
            day,
        }
    }
}

/// Unique key for self check-ins: one per student, course, meeting and campus day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeetingKey {
    pub student_id: String,
    pub course_id: String,
    pub meeting_number: u32,
    pub day: NaiveDate,
}

impl MeetingKey {
    pub fn of(record: &AttendanceRecord, day: NaiveDate) -> Self {
        Self {
            student_id: record.student_id.clone(),
            course_id: record.course_id.clone(),
            meeting_number: record.meeting_number,
            day,
        }
    }
}

/// Durable record of sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session opened on `day`.
    ///
    /// Fails with `Conflict` when the slot already holds a session that is
    /// live at `session.created_at`.
    async fn insert_session(&self, session: Session, day: NaiveDate) -> Result<Session>;

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>>;

    /// Replace the scan token of a session that is live at `now`.
    ///
    /// Fails with `NotFound` for unknown sessions and `Expired` for closed
    /// or expired ones. The old token stops resolving immediately.
    async fn rotate_token(&self, id: Uuid, token: String, now: DateTime<Utc>) -> Result<Session>;

    /// Mark a session closed. Closing a closed session is a no-op.
    async fn close_session(&self, id: Uuid) -> Result<Session>;

    /// Sessions matching the filter, newest first.
    async fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>>;

    /// Whether the store can durably accept writes.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Durable record of check-in outcomes.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Insert a self check-in made on `day`.
    ///
    /// Fails with `AlreadyCheckedIn` (carrying the existing status) when the
    /// student already has a record for the same meeting or session that day.
    async fn insert_record(&self, record: AttendanceRecord, day: NaiveDate)
        -> Result<AttendanceRecord>;

    /// Insert or overwrite the record for (student, session, day).
    ///
    /// An existing record keeps its ID; status, time and source are replaced.
    async fn upsert_record(&self, record: AttendanceRecord, day: NaiveDate)
        -> Result<AttendanceRecord>;

    async fn records_for_session(&self, session_id: Uuid) -> Result<Vec<AttendanceRecord>>;

    /// A student's records, optionally for one course, newest first.
    async fn records_for_student(
        &self,
        student_id: &str,
        course_id: Option<&str>,
    ) -> Result<Vec<AttendanceRecord>>;

    async fn records_for_course(&self, course_id: &str) -> Result<Vec<AttendanceRecord>>;
}
