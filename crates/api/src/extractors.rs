//! Request extractors.
//!
//! Identity is established by the upstream gateway, which injects
//! `X-Actor-Id` and `X-Actor-Role`. Handlers pick the extractor matching
//! the role they serve.

use attendance_core::ids::parse_actor_id;
use axum::{
    async_trait,
    body::Bytes,
    extract::FromRequestParts,
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::response::ApiError;

pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";

/// Who is calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Instructor,
    Student,
}

impl ActorRole {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "instructor" | "dosen" => Some(Self::Instructor),
            "student" | "mahasiswa" => Some(Self::Student),
            _ => None,
        }
    }
}

/// Identity of any authenticated caller.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub actor_id: String,
    pub role: ActorRole,
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let actor_id = header(ACTOR_ID_HEADER)
            .ok_or_else(|| ApiError::unauthorized("AUTH_001", "missing X-Actor-Id header"))?;
        let actor_id = parse_actor_id(actor_id)
            .map_err(|e| ApiError::unauthorized("AUTH_002", e.to_string()))?;

        let role = header(ACTOR_ROLE_HEADER)
            .and_then(ActorRole::parse)
            .ok_or_else(|| ApiError::unauthorized("AUTH_002", "missing or unknown X-Actor-Role"))?;

        Ok(ActorContext { actor_id, role })
    }
}

async fn require_role<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
    role: ActorRole,
) -> Result<String, ApiError> {
    let actor = ActorContext::from_request_parts(parts, state).await?;
    if actor.role != role {
        return Err(ApiError::forbidden(
            "AUTH_003",
            format!("this endpoint requires the {:?} role", role).to_lowercase(),
        ));
    }
    Ok(actor.actor_id)
}

/// An instructor caller.
#[derive(Debug, Clone)]
pub struct InstructorContext(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for InstructorContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, ActorRole::Instructor)
            .await
            .map(InstructorContext)
    }
}

/// A student caller.
#[derive(Debug, Clone)]
pub struct StudentContext(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for StudentContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, ActorRole::Student)
            .await
            .map(StudentContext)
    }
}

/// Parse a JSON request body, reporting problems in the API error format.
pub fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid body: {}", e)))
}

/// Parse a session ID path segment.
pub fn parse_session_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::bad_request(format!("invalid session id '{}'", raw)))
}
