//! Bounds and policy constants for attendance sessions.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so the session bounds are duplicated on `OpenSession`. Keep both in
//! sync when modifying.

// === Session Bounds ===

/// Shortest session an instructor may open (minutes).
pub const MIN_SESSION_MINUTES: u32 = 5;

/// Longest session an instructor may open (minutes).
pub const MAX_SESSION_MINUTES: u32 = 120;

/// First meeting of a term.
pub const MIN_MEETING_NUMBER: u32 = 1;

/// Last meeting of a term.
pub const MAX_MEETING_NUMBER: u32 = 16;

// === Check-in Window ===

/// Minutes before the scheduled start at which scanning opens.
pub const DEFAULT_EARLY_CHECKIN_MINUTES: i64 = 15;

/// Minutes after the scheduled end at which scanning closes.
pub const DEFAULT_LATE_CHECKIN_MINUTES: i64 = 60;

// === Credentials ===

/// Random bytes per scan token (base64url-encoded to 43 chars).
pub const SCAN_TOKEN_BYTES: usize = 32;

/// Session code prefix, e.g. `ABS-CS101-P3-150126100000`.
pub const SESSION_CODE_PREFIX: &str = "ABS";

// === Identifiers ===

/// Course code max length.
pub const MAX_COURSE_ID_LEN: usize = 32;

/// Student/instructor ID max length (matches NIM/NIP plus headroom).
pub const MAX_ACTOR_ID_LEN: usize = 64;

// === Read Limits ===

/// Instructor session history page size.
pub const SESSION_HISTORY_LIMIT: usize = 50;

/// Student attendance history page size.
pub const STUDENT_HISTORY_LIMIT: usize = 100;

// === Campus Time ===

/// Default campus offset from UTC in minutes (UTC+7).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 7 * 60;
