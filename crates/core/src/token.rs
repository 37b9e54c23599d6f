//! Scan credentials and session codes.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, FixedOffset};

use crate::limits::{SCAN_TOKEN_BYTES, SESSION_CODE_PREFIX};

/// Produces unguessable opaque tokens.
pub trait TokenGenerator: Send + Sync {
    fn new_token(&self) -> String;
}

/// OS-seeded random tokens (32 bytes, base64url without padding).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn new_token(&self) -> String {
        let mut rng = rand::rng();
        let bytes: [u8; SCAN_TOKEN_BYTES] = rand::Rng::random(&mut rng);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

/// Human-readable session code for traceability.
///
/// Format: `ABS-{course}-P{meeting}-{ddmmyyHHMMSS}` in campus-local time.
pub fn session_code(course_id: &str, meeting_number: u32, opened_at: DateTime<FixedOffset>) -> String {
    format!(
        "{}-{}-P{}-{}",
        SESSION_CODE_PREFIX,
        course_id,
        meeting_number,
        opened_at.format("%d%m%y%H%M%S")
    )
}
