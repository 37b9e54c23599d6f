//! Collaborators shared by the engine services.

use attendance_core::{
    limits::DEFAULT_UTC_OFFSET_MINUTES, AttendanceStatus, CampusCalendar, CheckinPolicy, Clock,
    Course, CourseCatalog, EnrollmentOracle, Error, RandomTokenGenerator, Result, Session,
    SystemClock, TokenGenerator,
};
use attendance_store::{AttendanceStore, SessionStore};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Everything the engine reads from or writes to.
#[derive(Clone)]
pub struct EngineContext {
    pub sessions: Arc<dyn SessionStore>,
    pub records: Arc<dyn AttendanceStore>,
    pub enrollment: Arc<dyn EnrollmentOracle>,
    pub catalog: Arc<dyn CourseCatalog>,
    pub clock: Arc<dyn Clock>,
    pub tokens: Arc<dyn TokenGenerator>,
    pub calendar: CampusCalendar,
    pub policy: CheckinPolicy,
}

impl EngineContext {
    /// Context with the system clock, random tokens, the default campus
    /// offset and the default check-in policy.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        records: Arc<dyn AttendanceStore>,
        enrollment: Arc<dyn EnrollmentOracle>,
        catalog: Arc<dyn CourseCatalog>,
    ) -> Result<Self> {
        Ok(Self {
            sessions,
            records,
            enrollment,
            catalog,
            clock: Arc::new(SystemClock),
            tokens: Arc::new(RandomTokenGenerator),
            calendar: CampusCalendar::from_offset_minutes(DEFAULT_UTC_OFFSET_MINUTES)?,
            policy: CheckinPolicy::default(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_tokens(mut self, tokens: Arc<dyn TokenGenerator>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_calendar(mut self, calendar: CampusCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_policy(mut self, policy: CheckinPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Campus day a session was opened on. Records written for the session,
    /// by scan or by override, are keyed on this day.
    pub(crate) fn session_day(&self, session: &Session) -> NaiveDate {
        self.calendar.day_of(session.created_at)
    }

    /// Catalog lookup that treats a missing course as `NotFound`.
    pub(crate) async fn course(&self, course_id: &str) -> Result<Course> {
        self.catalog
            .get_course(course_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("course {}", course_id)))
    }

    /// A course the instructor teaches; someone else's course is `Forbidden`.
    pub(crate) async fn taught_course(&self, course_id: &str, instructor_id: &str) -> Result<Course> {
        let course = self.course(course_id).await?;
        if course.instructor_id != instructor_id {
            return Err(Error::forbidden(format!(
                "course {} is not assigned to instructor {}",
                course.id, instructor_id
            )));
        }
        Ok(course)
    }

    /// Fetch a session the requester owns.
    pub(crate) async fn owned_session(&self, session_id: Uuid, requester: &str) -> Result<Session> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("session {}", session_id)))?;
        if !session.is_owned_by(requester) {
            return Err(Error::forbidden(format!(
                "session {} belongs to another instructor",
                session_id
            )));
        }
        Ok(session)
    }

    pub(crate) async fn require_enrolled(&self, student_id: &str, course_id: &str) -> Result<()> {
        if self.enrollment.is_enrolled(student_id, course_id).await? {
            Ok(())
        } else {
            Err(Error::NotEnrolled {
                student_id: student_id.to_string(),
                course_id: course_id.to_string(),
            })
        }
    }
}

/// Status of a student for a meeting, with `pending` for "no record yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Standing {
    Present,
    Excused,
    Sick,
    Absent,
    Pending,
}

impl From<Option<AttendanceStatus>> for Standing {
    fn from(status: Option<AttendanceStatus>) -> Self {
        match status {
            Some(AttendanceStatus::Present) => Self::Present,
            Some(AttendanceStatus::Excused) => Self::Excused,
            Some(AttendanceStatus::Sick) => Self::Sick,
            Some(AttendanceStatus::Absent) => Self::Absent,
            None => Self::Pending,
        }
    }
}
