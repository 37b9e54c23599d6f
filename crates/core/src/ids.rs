//! Identifier validation for courses and actors.
//!
//! Course codes look like `CS101` or `IF-2204`; actor IDs are NIM/NIP
//! numbers or gateway-issued opaque IDs.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::limits::{MAX_ACTOR_ID_LEN, MAX_COURSE_ID_LEN};

/// Compiled course code regex (lazy initialization).
static COURSE_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("invalid course id pattern"));

/// Compiled actor ID regex (lazy initialization).
static ACTOR_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._@-]+$").expect("invalid actor id pattern"));

/// Validate a course code and return it trimmed.
pub fn parse_course_id(raw: &str) -> Result<String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(Error::validation("course_id is required"));
    }
    if id.len() > MAX_COURSE_ID_LEN {
        return Err(Error::validation(format!(
            "course_id exceeds {} characters",
            MAX_COURSE_ID_LEN
        )));
    }
    if !COURSE_ID_REGEX.is_match(id) {
        return Err(Error::validation("course_id has invalid characters"));
    }
    Ok(id.to_string())
}

/// Validate a student or instructor ID and return it trimmed.
pub fn parse_actor_id(raw: &str) -> Result<String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(Error::validation("actor id is required"));
    }
    if id.len() > MAX_ACTOR_ID_LEN || !ACTOR_ID_REGEX.is_match(id) {
        return Err(Error::validation("actor id is malformed"));
    }
    Ok(id.to_string())
}
