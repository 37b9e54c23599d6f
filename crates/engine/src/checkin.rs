//! Student self check-in and instructor status overrides.
//!
//! A scan passes through these checks in order and stops at the first
//! failure:
//!
//! 1. the token resolves to a live session
//! 2. the session belongs to the requested course
//! 3. the student is enrolled in the course
//! 4. the course meets on today's campus weekday
//! 5. the campus wall time is inside the check-in window
//! 6. the student has no record for this meeting on the session's day
//!
//! Step 6 and the insert are one store call, so two concurrent scans for
//! the same meeting produce exactly one record.

use attendance_core::{
    ids::{parse_actor_id, parse_course_id},
    AttendanceRecord, AttendanceStatus, Error, Result, Session,
};
use chrono::{DateTime, Utc};
use std::time::Instant;
use telemetry::metrics;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::EngineContext;

/// Validates scans and records outcomes.
#[derive(Clone)]
pub struct CheckinValidator {
    ctx: EngineContext,
}

impl CheckinValidator {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Check a student in with a scanned token.
    pub async fn validate(
        &self,
        token: &str,
        course_id: &str,
        student_id: &str,
    ) -> Result<AttendanceRecord> {
        let started = Instant::now();
        let result = self.run_pipeline(token, course_id, student_id).await;
        metrics()
            .checkin_latency_ms
            .observe(started.elapsed().as_millis() as u64);

        match &result {
            Ok(record) => {
                metrics().checkins_accepted.inc();
                info!(
                    session_id = %record.session_id,
                    course_id = %record.course_id,
                    meeting_number = record.meeting_number,
                    student_id = %record.student_id,
                    "Check-in accepted"
                );
            }
            Err(e) => {
                metrics().checkins_rejected.inc();
                if matches!(e, Error::AlreadyCheckedIn { .. }) {
                    metrics().duplicate_checkins.inc();
                }
                warn!(
                    course_id = %course_id,
                    student_id = %student_id,
                    code = e.code().code(),
                    error = %e,
                    "Check-in rejected"
                );
            }
        }
        result
    }

    async fn run_pipeline(
        &self,
        token: &str,
        course_id: &str,
        student_id: &str,
    ) -> Result<AttendanceRecord> {
        let course_id = parse_course_id(course_id)?;
        let student_id = parse_actor_id(student_id)?;
        let now = self.ctx.now();

        let session = self.live_session(token, now).await?;

        if session.course_id != course_id {
            return Err(Error::CourseMismatch {
                session_course: session.course_id,
                requested_course: course_id,
            });
        }

        self.ctx.require_enrolled(&student_id, &course_id).await?;

        let course = self.ctx.course(&course_id).await?;
        let today = self.ctx.calendar.weekday_of(now);
        if course.schedule.weekday != today {
            return Err(Error::WrongDay {
                scheduled: course.schedule.weekday,
                today,
            });
        }

        self.ctx
            .policy
            .window(&course.schedule, self.ctx.calendar.day_of(now))
            .check(self.ctx.calendar.local_naive(now))?;

        let record = AttendanceRecord::check_in(
            student_id,
            session.id,
            course_id,
            session.meeting_number,
            now,
        );
        self.ctx
            .records
            .insert_record(record, self.ctx.session_day(&session))
            .await
    }

    async fn live_session(&self, token: &str, now: DateTime<Utc>) -> Result<Session> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::InvalidOrExpiredToken);
        }
        self.ctx
            .sessions
            .find_by_token(token)
            .await?
            .filter(|s| s.is_live_at(now))
            .ok_or(Error::InvalidOrExpiredToken)
    }

    /// Set a student's status for a session by hand.
    ///
    /// Skips liveness, day, window and duplicate checks; an existing record
    /// for the student and session is overwritten.
    pub async fn set_status(
        &self,
        session_id: Uuid,
        student_id: &str,
        status: &str,
        requester: &str,
    ) -> Result<AttendanceRecord> {
        let session = self.ctx.owned_session(session_id, requester).await?;
        let student_id = parse_actor_id(student_id)?;
        self.ctx
            .require_enrolled(&student_id, &session.course_id)
            .await?;
        let status: AttendanceStatus = status.parse()?;

        let now = self.ctx.now();
        let record = AttendanceRecord::manual(
            student_id,
            session.id,
            session.course_id.clone(),
            session.meeting_number,
            status,
            now,
        );
        let record = self
            .ctx
            .records
            .upsert_record(record, self.ctx.session_day(&session))
            .await?;

        metrics().status_overrides.inc();
        info!(
            session_id = %session.id,
            student_id = %record.student_id,
            status = %record.status,
            "Attendance status set"
        );
        Ok(record)
    }
}
