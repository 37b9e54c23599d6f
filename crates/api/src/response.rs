//! Standardized API responses.

use attendance_core::{Error, ErrorCode};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use telemetry::{ComponentHealthReport, HealthStatus};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub store_ready: bool,
    pub directory_connected: bool,
    pub components: Vec<ComponentHealthReport>,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error with a stable code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
            retry_after: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, ErrorCode::Validation.code(), msg)
    }

    pub fn unauthorized(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::UNAUTHORIZED, code, msg)
    }

    pub fn forbidden(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::FORBIDDEN, code, msg)
    }

    pub fn rate_limited(msg: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            response: ErrorResponse::new(msg, "RATE_001"),
            retry_after,
        }
    }

    pub fn details(mut self, details: Value) -> Self {
        self.response = self.response.with_details(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.response)).into_response();

        if let Some(retry_after) = self.retry_after {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let code = err.code();
        let status = StatusCode::from_u16(code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let api = ApiError::with_code(status, code.code(), err.to_string());

        match err {
            Error::AlreadyCheckedIn {
                status,
                meeting_number,
            } => api.details(json!({
                "status": status,
                "meeting_number": meeting_number,
            })),
            Error::OutsideWindow {
                side,
                opens_at,
                closes_at,
            } => api.details(json!({
                "side": side.to_string(),
                "opens_at": opens_at,
                "closes_at": closes_at,
            })),
            Error::WrongDay { scheduled, today } => api.details(json!({
                "scheduled": scheduled.to_string(),
                "today": today.to_string(),
            })),
            Error::CourseMismatch {
                session_course,
                requested_course,
            } => api.details(json!({
                "session_course": session_course,
                "requested_course": requested_course,
            })),
            Error::Validation(msg) => api.details(json!(msg
                .split("; ")
                .map(str::to_string)
                .collect::<Vec<_>>())),
            _ => api,
        }
    }
}
