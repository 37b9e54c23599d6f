//! Test fixtures: campus times, directory contents and request bodies.

use attendance_core::{Course, CourseSchedule, InMemoryDirectory};
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc, Weekday};

pub const INSTRUCTOR: &str = "dsn-1";
pub const OTHER_INSTRUCTOR: &str = "dsn-2";
pub const STUDENT: &str = "mhs-1";
pub const CLASSMATE: &str = "mhs-2";
pub const OUTSIDER: &str = "mhs-9";

/// Thursday 2026-01-15 at `hh:mm` campus time (UTC+7).
pub fn thursday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    FixedOffset::east_opt(7 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 1, 15, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

/// Same wall time `weeks` later.
pub fn weeks_later(t: DateTime<Utc>, weeks: i64) -> DateTime<Utc> {
    t + Duration::weeks(weeks)
}

fn course(id: &str, name: &str, instructor: &str, weekday: Weekday, start: (u32, u32), end: (u32, u32)) -> Course {
    Course {
        id: id.into(),
        name: name.into(),
        instructor_id: instructor.into(),
        schedule: CourseSchedule::new(
            weekday,
            NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        )
        .unwrap(),
    }
}

/// CS101 Thu 10:00-11:30 and CS102 Mon 13:00-14:40 taught by dsn-1,
/// MA201 Wed taught by dsn-2. mhs-1 and mhs-2 take CS101; mhs-1 also
/// takes CS102.
pub fn campus_directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::new();
    directory.add_course(course("CS101", "Algorithms", INSTRUCTOR, Weekday::Thu, (10, 0), (11, 30)));
    directory.add_course(course("CS102", "Databases", INSTRUCTOR, Weekday::Mon, (13, 0), (14, 40)));
    directory.add_course(course("MA201", "Linear Algebra", OTHER_INSTRUCTOR, Weekday::Wed, (8, 0), (9, 40)));
    directory.enroll(STUDENT, "CS101");
    directory.enroll(CLASSMATE, "CS101");
    directory.enroll(STUDENT, "CS102");
    directory
}

pub fn open_body(course_id: &str, meeting_number: u32, duration: u32) -> serde_json::Value {
    serde_json::json!({
        "course_id": course_id,
        "meeting_number": meeting_number,
        "duration": duration,
    })
}

pub fn check_in_body(token: &str, course_id: &str) -> serde_json::Value {
    serde_json::json!({
        "token": token,
        "course_id": course_id,
    })
}

pub fn status_body(student_id: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "student_id": student_id,
        "status": status,
    })
}
