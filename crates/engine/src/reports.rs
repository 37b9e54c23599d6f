//! Read-side aggregates over sessions and records.
//!
//! Everything here is recomputed per request. A student without a record
//! for a meeting is reported as `pending`, not as an error.

use attendance_core::{
    limits::{MAX_MEETING_NUMBER, MIN_MEETING_NUMBER, STUDENT_HISTORY_LIMIT},
    percent, AttendanceRecord, AttendanceStatus, Error, RecordSource, Result, Session,
    SessionFilter, StatusCounts,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;
use uuid::Uuid;

use crate::context::{EngineContext, Standing};

/// One student's line in a session report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRow {
    pub student_id: String,
    pub status: Standing,
    pub recorded_at: Option<DateTime<Utc>>,
    pub source: Option<RecordSource>,
}

/// Attendance for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session: Session,
    pub live: bool,
    pub seconds_left: i64,
    pub enrolled: usize,
    pub counts: StatusCounts,
    pub pending: Vec<String>,
    pub pending_count: usize,
    /// Enrolled students with any record.
    pub recorded_percentage: f64,
    pub present_percentage: f64,
    pub students: Vec<StudentRow>,
}

/// One meeting in a student's course history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingEntry {
    pub meeting_number: u32,
    pub status: Standing,
    pub session_id: Option<Uuid>,
    pub recorded_at: Option<DateTime<Utc>>,
}

/// A student's attendance in one course across all its sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseHistory {
    pub course_id: String,
    pub course_name: String,
    pub student_id: String,
    pub meetings_held: usize,
    pub meetings_present: usize,
    /// Present meetings over meetings held; 0 when none were held.
    pub percentage: f64,
    pub counts: StatusCounts,
    pub meetings: Vec<MeetingEntry>,
}

/// Per-course rollup on a student's dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSummary {
    pub course_id: String,
    pub course_name: String,
    pub meetings_held: usize,
    pub counts: StatusCounts,
    pub percentage: f64,
}

/// What happened for one meeting number of a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub meeting_number: u32,
    pub sessions_opened: usize,
    pub live_sessions: usize,
    pub last_opened_at: Option<DateTime<Utc>>,
    pub recorded: usize,
}

/// One enrolled student against one meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterRow {
    pub student_id: String,
    pub status: Standing,
    pub session_id: Option<Uuid>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub source: Option<RecordSource>,
}

/// The roster for one meeting, merged over every session opened for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRoster {
    pub meeting_number: u32,
    pub sessions: usize,
    pub counts: StatusCounts,
    pub pending_count: usize,
    pub students: Vec<RosterRow>,
}

/// Attendance of every enrolled student in a course, meeting by meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRoster {
    pub course_id: String,
    pub course_name: String,
    pub enrolled: usize,
    pub meetings: Vec<MeetingRoster>,
}

/// Computes reports on demand.
#[derive(Clone)]
pub struct Aggregator {
    ctx: EngineContext,
}

/// The most recent record per meeting. A meeting can be recorded in more
/// than one of its sessions; the latest write is the student's standing.
fn latest_per_meeting<'a>(
    records: impl IntoIterator<Item = &'a AttendanceRecord>,
) -> BTreeMap<u32, &'a AttendanceRecord> {
    let mut latest: BTreeMap<u32, &AttendanceRecord> = BTreeMap::new();
    for record in records {
        latest
            .entry(record.meeting_number)
            .and_modify(|kept| {
                if record.recorded_at > kept.recorded_at {
                    *kept = record;
                }
            })
            .or_insert(record);
    }
    latest
}

/// Meetings with at least one session, and the subset the student attended.
fn rollup(
    sessions: &[Session],
    latest: &BTreeMap<u32, &AttendanceRecord>,
) -> (BTreeSet<u32>, BTreeSet<u32>) {
    let held: BTreeSet<u32> = sessions.iter().map(|s| s.meeting_number).collect();
    let present = latest
        .values()
        .filter(|r| r.status == AttendanceStatus::Present && held.contains(&r.meeting_number))
        .map(|r| r.meeting_number)
        .collect();
    (held, present)
}

impl Aggregator {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Report for a session the requester owns.
    pub async fn session_report(&self, session_id: Uuid, requester: &str) -> Result<SessionReport> {
        let session = self.ctx.owned_session(session_id, requester).await?;
        let enrolled = self
            .ctx
            .enrollment
            .enrolled_students(&session.course_id)
            .await?;
        let records = self.ctx.records.records_for_session(session.id).await?;

        let by_student: HashMap<&str, &AttendanceRecord> =
            records.iter().map(|r| (r.student_id.as_str(), r)).collect();

        let mut students = Vec::with_capacity(enrolled.len());
        let mut pending = Vec::new();
        let mut counts = StatusCounts::default();
        for student_id in &enrolled {
            let record = by_student.get(student_id.as_str()).copied();
            match record {
                Some(r) => counts.add(r.status),
                None => pending.push(student_id.clone()),
            }
            students.push(StudentRow {
                student_id: student_id.clone(),
                status: record.map(|r| r.status).into(),
                recorded_at: record.map(|r| r.recorded_at),
                source: record.map(|r| r.source),
            });
        }

        let enrolled_count = enrolled.len() as u32;
        let now = self.ctx.now();
        debug!(session_id = %session.id, enrolled = enrolled.len(), "Built session report");

        Ok(SessionReport {
            live: session.is_live_at(now),
            seconds_left: if session.is_live_at(now) {
                session.seconds_left(now)
            } else {
                0
            },
            enrolled: enrolled.len(),
            recorded_percentage: percent(counts.total(), enrolled_count),
            present_percentage: percent(counts.present, enrolled_count),
            pending_count: pending.len(),
            pending,
            counts,
            students,
            session,
        })
    }

    /// A student's history in one course, meeting by meeting.
    pub async fn student_course_history(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<CourseHistory> {
        let course = self.ctx.course(course_id).await?;
        self.ctx.require_enrolled(student_id, &course.id).await?;

        let sessions = self
            .ctx
            .sessions
            .list_sessions(&SessionFilter::for_course(course.id.clone()))
            .await?;
        let records = self
            .ctx
            .records
            .records_for_student(student_id, Some(&course.id))
            .await?;
        let latest = latest_per_meeting(&records);
        let (held, present) = rollup(&sessions, &latest);

        let meetings = held
            .iter()
            .map(|&n| {
                let record = latest.get(&n).copied();
                MeetingEntry {
                    meeting_number: n,
                    status: record.map(|r| r.status).into(),
                    session_id: record.map(|r| r.session_id),
                    recorded_at: record.map(|r| r.recorded_at),
                }
            })
            .collect();

        Ok(CourseHistory {
            course_id: course.id,
            course_name: course.name,
            student_id: student_id.to_string(),
            meetings_held: held.len(),
            meetings_present: present.len(),
            percentage: percent(present.len() as u32, held.len() as u32),
            counts: latest.values().map(|r| r.status).collect(),
            meetings,
        })
    }

    /// Rollup for every course the student is enrolled in.
    pub async fn student_summary(&self, student_id: &str) -> Result<Vec<CourseSummary>> {
        let courses = self.ctx.enrollment.courses_for_student(student_id).await?;

        let mut summaries = Vec::with_capacity(courses.len());
        for course_id in courses {
            let course_name = self
                .ctx
                .catalog
                .get_course(&course_id)
                .await?
                .map(|c| c.name)
                .unwrap_or_else(|| course_id.clone());
            let sessions = self
                .ctx
                .sessions
                .list_sessions(&SessionFilter::for_course(course_id.clone()))
                .await?;
            let records = self
                .ctx
                .records
                .records_for_student(student_id, Some(&course_id))
                .await?;
            let latest = latest_per_meeting(&records);
            let (held, present) = rollup(&sessions, &latest);

            summaries.push(CourseSummary {
                meetings_held: held.len(),
                counts: latest.values().map(|r| r.status).collect(),
                percentage: percent(present.len() as u32, held.len() as u32),
                course_id,
                course_name,
            });
        }
        Ok(summaries)
    }

    /// A student's records across courses, newest first.
    pub async fn student_history(
        &self,
        student_id: &str,
        status: Option<AttendanceStatus>,
    ) -> Result<Vec<AttendanceRecord>> {
        Ok(self
            .ctx
            .records
            .records_for_student(student_id, None)
            .await?
            .into_iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .take(STUDENT_HISTORY_LIMIT)
            .collect())
    }

    /// Per-meeting activity of a course the instructor teaches.
    pub async fn meeting_summary(
        &self,
        instructor_id: &str,
        course_id: &str,
    ) -> Result<Vec<MeetingSummary>> {
        let course = self.ctx.taught_course(course_id, instructor_id).await?;

        let sessions = self
            .ctx
            .sessions
            .list_sessions(&SessionFilter::for_instructor(instructor_id).with_course(Some(course.id.clone())))
            .await?;
        let records = self.ctx.records.records_for_course(&course.id).await?;
        let now = self.ctx.now();

        Ok((MIN_MEETING_NUMBER..=MAX_MEETING_NUMBER)
            .map(|n| {
                let of_meeting: Vec<&Session> =
                    sessions.iter().filter(|s| s.meeting_number == n).collect();
                MeetingSummary {
                    meeting_number: n,
                    sessions_opened: of_meeting.len(),
                    live_sessions: of_meeting.iter().filter(|s| s.is_live_at(now)).count(),
                    last_opened_at: of_meeting.iter().map(|s| s.created_at).max(),
                    recorded: records.iter().filter(|r| r.meeting_number == n).count(),
                }
            })
            .collect())
    }

    /// Every enrolled student's standing in a course the instructor teaches,
    /// for one meeting or for every meeting held so far.
    ///
    /// A requested meeting with no sessions still lists the roster, all
    /// pending.
    pub async fn course_roster(
        &self,
        instructor_id: &str,
        course_id: &str,
        meeting_number: Option<u32>,
    ) -> Result<CourseRoster> {
        if let Some(n) = meeting_number {
            if !(MIN_MEETING_NUMBER..=MAX_MEETING_NUMBER).contains(&n) {
                return Err(Error::validation(format!(
                    "meeting_number must be between {} and {}",
                    MIN_MEETING_NUMBER, MAX_MEETING_NUMBER
                )));
            }
        }
        let course = self.ctx.taught_course(course_id, instructor_id).await?;

        let enrolled = self.ctx.enrollment.enrolled_students(&course.id).await?;
        let sessions = self
            .ctx
            .sessions
            .list_sessions(
                &SessionFilter::for_course(course.id.clone()).with_meeting(meeting_number),
            )
            .await?;
        let records = self.ctx.records.records_for_course(&course.id).await?;

        let meeting_numbers: BTreeSet<u32> = match meeting_number {
            Some(n) => BTreeSet::from([n]),
            None => sessions.iter().map(|s| s.meeting_number).collect(),
        };

        let mut by_student: HashMap<&str, Vec<&AttendanceRecord>> = HashMap::new();
        for record in &records {
            by_student
                .entry(record.student_id.as_str())
                .or_default()
                .push(record);
        }
        let latest: HashMap<&str, BTreeMap<u32, &AttendanceRecord>> = by_student
            .into_iter()
            .map(|(student, records)| (student, latest_per_meeting(records)))
            .collect();

        let meetings = meeting_numbers
            .into_iter()
            .map(|n| {
                let mut counts = StatusCounts::default();
                let mut pending_count = 0;
                let students = enrolled
                    .iter()
                    .map(|student_id| {
                        let record = latest
                            .get(student_id.as_str())
                            .and_then(|m| m.get(&n))
                            .copied();
                        match record {
                            Some(r) => counts.add(r.status),
                            None => pending_count += 1,
                        }
                        RosterRow {
                            student_id: student_id.clone(),
                            status: record.map(|r| r.status).into(),
                            session_id: record.map(|r| r.session_id),
                            recorded_at: record.map(|r| r.recorded_at),
                            source: record.map(|r| r.source),
                        }
                    })
                    .collect();
                MeetingRoster {
                    meeting_number: n,
                    sessions: sessions.iter().filter(|s| s.meeting_number == n).count(),
                    counts,
                    pending_count,
                    students,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            course_id = %course.id,
            meetings = meetings.len(),
            enrolled = enrolled.len(),
            "Built course roster"
        );

        Ok(CourseRoster {
            course_id: course.id,
            course_name: course.name,
            enrolled: enrolled.len(),
            meetings,
        })
    }
}
