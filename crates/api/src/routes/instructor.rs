//! Instructor endpoints: session lifecycle, overrides and reports.

use attendance_core::{AttendanceRecord, OpenSession, ScanTicket};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use engine::{
    CourseRoster, MeetingSummary, OpenedSession, SessionHistoryEntry, SessionReport, SessionView,
};
use serde::Deserialize;
use tracing::debug;

use crate::extractors::{parse_body, parse_session_id, InstructorContext};
use crate::response::ApiError;
use crate::state::AppState;

/// Optional narrowing for session listings.
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub course_id: Option<String>,
    pub meeting_number: Option<u32>,
}

/// Restricts a course roster to one meeting.
#[derive(Debug, Default, Deserialize)]
pub struct RosterQuery {
    pub meeting_number: Option<u32>,
}

/// Body of an attendance override.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub student_id: String,
    pub status: String,
}

/// POST /instructor/sessions - Open a session.
pub async fn open_session(
    State(state): State<AppState>,
    InstructorContext(instructor_id): InstructorContext,
    body: Bytes,
) -> Result<(StatusCode, Json<OpenedSession>), ApiError> {
    let request: OpenSession = parse_body(&body)?;
    let opened = state.engine.sessions.open(&instructor_id, request).await?;
    Ok((StatusCode::CREATED, Json(opened)))
}

/// GET /instructor/sessions/active
pub async fn list_active(
    State(state): State<AppState>,
    InstructorContext(instructor_id): InstructorContext,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    let sessions = state
        .engine
        .sessions
        .list_active(&instructor_id, query.course_id, query.meeting_number)
        .await?;
    Ok(Json(sessions))
}

/// GET /instructor/sessions/history
pub async fn history(
    State(state): State<AppState>,
    InstructorContext(instructor_id): InstructorContext,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<SessionHistoryEntry>>, ApiError> {
    let entries = state
        .engine
        .sessions
        .history(&instructor_id, query.course_id, query.meeting_number)
        .await?;
    Ok(Json(entries))
}

/// GET /instructor/courses/:course_id/meetings
pub async fn meeting_summary(
    State(state): State<AppState>,
    InstructorContext(instructor_id): InstructorContext,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<MeetingSummary>>, ApiError> {
    let summary = state
        .engine
        .reports
        .meeting_summary(&instructor_id, &course_id)
        .await?;
    Ok(Json(summary))
}

/// GET /instructor/courses/:course_id/attendance - Enrolled students by meeting.
pub async fn course_roster(
    State(state): State<AppState>,
    InstructorContext(instructor_id): InstructorContext,
    Path(course_id): Path<String>,
    Query(query): Query<RosterQuery>,
) -> Result<Json<CourseRoster>, ApiError> {
    let roster = state
        .engine
        .reports
        .course_roster(&instructor_id, &course_id, query.meeting_number)
        .await?;
    Ok(Json(roster))
}

/// GET /instructor/sessions/:id - Live report for one session.
pub async fn session_report(
    State(state): State<AppState>,
    InstructorContext(instructor_id): InstructorContext,
    Path(id): Path<String>,
) -> Result<Json<SessionReport>, ApiError> {
    let session_id = parse_session_id(&id)?;
    let report = state
        .engine
        .reports
        .session_report(session_id, &instructor_id)
        .await?;
    debug!(session_id = %session_id, pending = report.pending_count, "Served session report");
    Ok(Json(report))
}

/// POST /instructor/sessions/:id/refresh - Rotate the scan token.
pub async fn refresh(
    State(state): State<AppState>,
    InstructorContext(instructor_id): InstructorContext,
    Path(id): Path<String>,
) -> Result<Json<ScanTicket>, ApiError> {
    let session_id = parse_session_id(&id)?;
    let ticket = state
        .engine
        .sessions
        .refresh(session_id, &instructor_id)
        .await?;
    Ok(Json(ticket))
}

/// POST /instructor/sessions/:id/close
pub async fn close(
    State(state): State<AppState>,
    InstructorContext(instructor_id): InstructorContext,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let session_id = parse_session_id(&id)?;
    let view = state
        .engine
        .sessions
        .close(session_id, &instructor_id)
        .await?;
    Ok(Json(view))
}

/// PUT /instructor/sessions/:id/attendance - Set a student's status.
pub async fn set_status(
    State(state): State<AppState>,
    InstructorContext(instructor_id): InstructorContext,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<AttendanceRecord>, ApiError> {
    let session_id = parse_session_id(&id)?;
    let request: SetStatusRequest = parse_body(&body)?;
    let record = state
        .engine
        .checkin
        .set_status(session_id, &request.student_id, &request.status, &instructor_id)
        .await?;
    Ok(Json(record))
}
