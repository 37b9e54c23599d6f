//! Student endpoints: scanning and attendance history.

use attendance_core::{AttendanceRecord, AttendanceStatus, ScanTicket};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use engine::{CourseHistory, CourseSummary};
use serde::Deserialize;
use telemetry::metrics;
use tracing::warn;

use crate::extractors::{parse_body, ActorContext, StudentContext};
use crate::response::ApiError;
use crate::state::AppState;

/// Body of a scan.
#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    #[serde(alias = "qr_token")]
    pub token: String,
    pub course_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub status: Option<String>,
}

/// POST /student/check-in - Scan a session token.
pub async fn check_in(
    State(state): State<AppState>,
    StudentContext(student_id): StudentContext,
    body: Bytes,
) -> Result<(StatusCode, Json<AttendanceRecord>), ApiError> {
    if let Err(retry_after) = state.rate_limiter.check(&student_id) {
        metrics().rate_limited_requests.inc();
        warn!(student_id = %student_id, retry_after, "Check-in rate limited");
        return Err(ApiError::rate_limited(
            "too many check-in attempts",
            Some(retry_after),
        ));
    }

    let request: CheckInRequest = parse_body(&body)?;
    let record = state
        .engine
        .checkin
        .validate(&request.token, &request.course_id, &student_id)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /student/attendance - Own records, optionally by status.
pub async fn history(
    State(state): State<AppState>,
    StudentContext(student_id): StudentContext,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<AttendanceStatus>)
        .transpose()?;
    let records = state
        .engine
        .reports
        .student_history(&student_id, status)
        .await?;
    Ok(Json(records))
}

/// GET /student/attendance/summary
pub async fn summary(
    State(state): State<AppState>,
    StudentContext(student_id): StudentContext,
) -> Result<Json<Vec<CourseSummary>>, ApiError> {
    Ok(Json(state.engine.reports.student_summary(&student_id).await?))
}

/// GET /student/courses/:course_id/attendance
pub async fn course_history(
    State(state): State<AppState>,
    StudentContext(student_id): StudentContext,
    Path(course_id): Path<String>,
) -> Result<Json<CourseHistory>, ApiError> {
    let history = state
        .engine
        .reports
        .student_course_history(&student_id, &course_id)
        .await?;
    Ok(Json(history))
}

/// GET /sessions/ticket/:token - Data for drawing the scan code.
pub async fn ticket(
    State(state): State<AppState>,
    _actor: ActorContext,
    Path(token): Path<String>,
) -> Result<Json<ScanTicket>, ApiError> {
    Ok(Json(state.engine.sessions.ticket(&token).await?))
}
