//! Session lifecycle: open, refresh, close and listings.

use attendance_core::{
    ids::parse_course_id, limits::SESSION_HISTORY_LIMIT, session_code, AttendanceStatus, Error,
    OpenSession, Result, ScanTicket, Session, SessionFilter,
};
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::context::EngineContext;

/// A newly opened session and the size of its audience.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenedSession {
    #[serde(flatten)]
    pub session: Session,
    pub student_count: usize,
    pub ticket: ScanTicket,
}

/// A session with its liveness evaluated at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    pub live: bool,
    pub seconds_left: i64,
    pub duration_minutes: i64,
}

/// One row of an instructor's session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistoryEntry {
    #[serde(flatten)]
    pub view: SessionView,
    pub recorded: usize,
    pub present: usize,
}

/// Opens, rotates and closes sessions.
#[derive(Clone)]
pub struct SessionManager {
    ctx: EngineContext,
}

impl SessionManager {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    fn view(&self, session: Session) -> SessionView {
        let now = self.ctx.now();
        SessionView {
            live: session.is_live_at(now),
            seconds_left: if session.is_live_at(now) {
                session.seconds_left(now)
            } else {
                0
            },
            duration_minutes: session.duration_minutes(),
            session,
        }
    }

    /// Open a session for a course meeting the instructor teaches.
    pub async fn open(&self, instructor_id: &str, request: OpenSession) -> Result<OpenedSession> {
        request.validate()?;
        let course_id = parse_course_id(&request.course_id)?;
        let course = self.ctx.taught_course(&course_id, instructor_id).await?;

        // Everything that can fail upstream happens before the insert, so a
        // failed open leaves no session occupying the slot.
        let student_count = self.ctx.enrollment.enrolled_students(&course.id).await?.len();

        let now = self.ctx.now();
        let code = session_code(
            &course.id,
            request.meeting_number,
            self.ctx.calendar.to_local(now),
        );
        let session = Session::new(
            instructor_id,
            course.id.clone(),
            request.meeting_number,
            request.duration_minutes,
            self.ctx.tokens.new_token(),
            code,
            now,
        );

        let day = self.ctx.session_day(&session);
        let session = match self.ctx.sessions.insert_session(session, day).await {
            Ok(session) => session,
            Err(e @ Error::Conflict(_)) => {
                metrics().session_conflicts.inc();
                warn!(
                    course_id = %course.id,
                    meeting_number = request.meeting_number,
                    "Rejected duplicate live session"
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        metrics().sessions_opened.inc();
        info!(
            session_id = %session.id,
            course_id = %session.course_id,
            meeting_number = session.meeting_number,
            expires_at = %session.expires_at,
            student_count,
            "Session opened"
        );

        Ok(OpenedSession {
            ticket: ScanTicket::for_session(&session, now),
            session,
            student_count,
        })
    }

    /// Issue a new scan token. Expiry is unchanged.
    pub async fn refresh(&self, session_id: Uuid, requester: &str) -> Result<ScanTicket> {
        let session = self.ctx.owned_session(session_id, requester).await?;
        let now = self.ctx.now();
        if !session.is_live_at(now) {
            return Err(Error::expired(format!("session {} is closed or expired", session_id)));
        }

        let session = self
            .ctx
            .sessions
            .rotate_token(session_id, self.ctx.tokens.new_token(), now)
            .await?;
        metrics().tokens_refreshed.inc();
        info!(session_id = %session.id, "Scan token rotated");
        Ok(ScanTicket::for_session(&session, now))
    }

    /// Close a session. Closing twice succeeds.
    pub async fn close(&self, session_id: Uuid, requester: &str) -> Result<SessionView> {
        let session = self.ctx.owned_session(session_id, requester).await?;
        let already_closed = session.state == attendance_core::SessionState::Closed;

        let session = self.ctx.sessions.close_session(session_id).await?;
        if already_closed {
            debug!(session_id = %session_id, "Session already closed");
        } else {
            metrics().sessions_closed.inc();
            info!(session_id = %session_id, course_id = %session.course_id, "Session closed");
        }
        Ok(self.view(session))
    }

    /// Live sessions of an instructor, by meeting number then newest first.
    pub async fn list_active(
        &self,
        instructor_id: &str,
        course_id: Option<String>,
        meeting_number: Option<u32>,
    ) -> Result<Vec<SessionView>> {
        let filter = SessionFilter::for_instructor(instructor_id)
            .with_course(course_id)
            .with_meeting(meeting_number);
        let now = self.ctx.now();

        let mut live: Vec<Session> = self
            .ctx
            .sessions
            .list_sessions(&filter)
            .await?
            .into_iter()
            .filter(|s| s.is_live_at(now))
            .collect();
        live.sort_by(|a, b| {
            a.meeting_number
                .cmp(&b.meeting_number)
                .then(b.created_at.cmp(&a.created_at))
        });

        debug!(instructor_id, count = live.len(), "Listed active sessions");
        Ok(live.into_iter().map(|s| self.view(s)).collect())
    }

    /// Recent sessions of an instructor with attendance counts.
    pub async fn history(
        &self,
        instructor_id: &str,
        course_id: Option<String>,
        meeting_number: Option<u32>,
    ) -> Result<Vec<SessionHistoryEntry>> {
        let filter = SessionFilter::for_instructor(instructor_id)
            .with_course(course_id)
            .with_meeting(meeting_number);
        let sessions = self.ctx.sessions.list_sessions(&filter).await?;

        let mut entries = Vec::with_capacity(sessions.len().min(SESSION_HISTORY_LIMIT));
        for session in sessions.into_iter().take(SESSION_HISTORY_LIMIT) {
            let records = self.ctx.records.records_for_session(session.id).await?;
            entries.push(SessionHistoryEntry {
                recorded: records.len(),
                present: records
                    .iter()
                    .filter(|r| r.status == AttendanceStatus::Present)
                    .count(),
                view: self.view(session),
            });
        }
        Ok(entries)
    }

    /// Render data for a scan token, if its session is still live.
    pub async fn ticket(&self, token: &str) -> Result<ScanTicket> {
        let now = self.ctx.now();
        let session = self
            .ctx
            .sessions
            .find_by_token(token.trim())
            .await?
            .filter(|s| s.is_live_at(now))
            .ok_or(Error::InvalidOrExpiredToken)?;
        Ok(ScanTicket::for_session(&session, now))
    }
}
