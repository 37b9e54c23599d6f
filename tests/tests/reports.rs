//! Reports over HTTP: session reports, overrides and student rollups.

use axum::http::StatusCode;
use integration_tests::fixtures::{
    check_in_body, open_body, status_body, thursday_at, weeks_later, CLASSMATE, INSTRUCTOR,
    OTHER_INSTRUCTOR, OUTSIDER, STUDENT,
};
use integration_tests::setup::{as_instructor, as_student, TestContext};
use serde_json::Value;

async fn open(server: &axum_test::TestServer, meeting: u32) -> Value {
    let response = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", meeting, 30))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

async fn scan(server: &axum_test::TestServer, student: &str, session: &Value) {
    as_student(server.post("/student/check-in"), student)
        .json(&check_in_body(session["token"].as_str().unwrap(), "CS101"))
        .await
        .assert_status(StatusCode::CREATED);
}

/// The session report lists every enrolled student and who is still pending.
#[tokio::test]
async fn test_session_report() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let session = open(&server, 1).await;
    let path = format!("/instructor/sessions/{}", session["id"].as_str().unwrap());

    ctx.advance_minutes(3);
    scan(&server, STUDENT, &session).await;

    let report = as_instructor(server.get(&path), INSTRUCTOR)
        .await
        .json::<Value>();
    assert_eq!(report["live"], true);
    assert_eq!(report["seconds_left"], 27 * 60);
    assert_eq!(report["enrolled"], 2);
    assert_eq!(report["counts"]["present"], 1);
    assert_eq!(report["pending"], serde_json::json!([CLASSMATE]));
    assert_eq!(report["pending_count"], 1);
    assert_eq!(report["recorded_percentage"], 50.0);
    assert_eq!(report["present_percentage"], 50.0);

    let rows = report["students"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    let mine = rows.iter().find(|r| r["student_id"] == STUDENT).unwrap();
    assert_eq!(mine["status"], "present");
    assert_eq!(mine["source"], "self_check_in");
    let theirs = rows.iter().find(|r| r["student_id"] == CLASSMATE).unwrap();
    assert_eq!(theirs["status"], "pending");

    as_instructor(server.get(&path), OTHER_INSTRUCTOR)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

/// Instructor overrides replace the student's status and clear pending.
#[tokio::test]
async fn test_override_status() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let session = open(&server, 1).await;
    let id = session["id"].as_str().unwrap();
    scan(&server, STUDENT, &session).await;

    let attendance = format!("/instructor/sessions/{}/attendance", id);

    let response = as_instructor(server.put(&attendance), INSTRUCTOR)
        .json(&status_body(CLASSMATE, "sakit"))
        .await;
    response.assert_status_ok();
    let record = response.json::<Value>();
    assert_eq!(record["status"], "sick");
    assert_eq!(record["source"], "instructor_override");

    // Overrides also replace a self check-in
    let response = as_instructor(server.put(&attendance), INSTRUCTOR)
        .json(&status_body(STUDENT, "excused"))
        .await;
    response.assert_status_ok();

    let report = as_instructor(server.get(&format!("/instructor/sessions/{}", id)), INSTRUCTOR)
        .await
        .json::<Value>();
    assert_eq!(report["pending_count"], 0);
    assert_eq!(report["counts"]["present"], 0);
    assert_eq!(report["counts"]["excused"], 1);
    assert_eq!(report["counts"]["sick"], 1);
    assert_eq!(report["recorded_percentage"], 100.0);

    // Closing does not prevent later corrections
    as_instructor(server.post(&format!("/instructor/sessions/{}/close", id)), INSTRUCTOR)
        .await
        .assert_status_ok();
    as_instructor(server.put(&attendance), INSTRUCTOR)
        .json(&status_body(STUDENT, "present"))
        .await
        .assert_status_ok();
}

/// Overrides validate the student, the status and the owner.
#[tokio::test]
async fn test_override_rejections() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let session = open(&server, 1).await;
    let attendance = format!(
        "/instructor/sessions/{}/attendance",
        session["id"].as_str().unwrap()
    );

    let response = as_instructor(server.put(&attendance), INSTRUCTOR)
        .json(&status_body(STUDENT, "late"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "ATT_001");

    as_instructor(server.put(&attendance), INSTRUCTOR)
        .json(&status_body(OUTSIDER, "present"))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    as_instructor(server.put(&attendance), OTHER_INSTRUCTOR)
        .json(&status_body(STUDENT, "present"))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    as_student(server.put(&attendance), STUDENT)
        .json(&status_body(STUDENT, "present"))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

/// Percentages count distinct meetings held against meetings present.
#[tokio::test]
async fn test_course_history_and_summary() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    // Week 1: present
    let first = open(&server, 1).await;
    scan(&server, STUDENT, &first).await;

    // Week 2: marked sick
    ctx.set_time(weeks_later(thursday_at(10, 0), 1));
    let second = open(&server, 2).await;
    as_instructor(
        server.put(&format!(
            "/instructor/sessions/{}/attendance",
            second["id"].as_str().unwrap()
        )),
        INSTRUCTOR,
    )
    .json(&status_body(STUDENT, "sick"))
    .await
    .assert_status_ok();

    // Week 3: held, never scanned
    ctx.set_time(weeks_later(thursday_at(10, 0), 2));
    open(&server, 3).await;

    let history = as_student(server.get("/student/courses/CS101/attendance"), STUDENT)
        .await
        .json::<Value>();
    assert_eq!(history["course_name"], "Algorithms");
    assert_eq!(history["meetings_held"], 3);
    assert_eq!(history["meetings_present"], 1);
    let meetings = history["meetings"].as_array().unwrap();
    assert_eq!(meetings.len(), 3);
    assert_eq!(meetings[0]["status"], "present");
    assert_eq!(meetings[1]["status"], "sick");
    assert_eq!(meetings[2]["status"], "pending");
    assert_eq!(history["counts"]["present"], 1);
    assert_eq!(history["counts"]["sick"], 1);

    let summary = as_student(server.get("/student/attendance/summary"), STUDENT)
        .await
        .json::<Vec<Value>>();
    assert_eq!(summary.len(), 2);
    let cs101 = summary.iter().find(|s| s["course_id"] == "CS101").unwrap();
    assert_eq!(cs101["meetings_held"], 3);
    let cs102 = summary.iter().find(|s| s["course_id"] == "CS102").unwrap();
    assert_eq!(cs102["meetings_held"], 0);
    assert_eq!(cs102["percentage"], 0.0);

    as_student(server.get("/student/courses/MA201/attendance"), STUDENT)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    as_student(server.get("/student/courses/XX999/attendance"), STUDENT)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

/// The course roster merges every session of a meeting per student.
#[tokio::test]
async fn test_course_roster() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let first = open(&server, 1).await;
    scan(&server, STUDENT, &first).await;
    as_instructor(
        server.post(&format!("/instructor/sessions/{}/close", first["id"].as_str().unwrap())),
        INSTRUCTOR,
    )
    .await
    .assert_status_ok();
    let second = open(&server, 1).await;
    scan(&server, CLASSMATE, &second).await;

    let roster = as_instructor(server.get("/instructor/courses/CS101/attendance"), INSTRUCTOR)
        .await;
    roster.assert_status_ok();
    let body = roster.json::<Value>();
    assert_eq!(body["course_id"], "CS101");
    assert_eq!(body["enrolled"], 2);
    let meetings = body["meetings"].as_array().unwrap();
    assert_eq!(meetings.len(), 1);
    assert_eq!(meetings[0]["meeting_number"], 1);
    assert_eq!(meetings[0]["sessions"], 2);
    assert_eq!(meetings[0]["counts"]["present"], 2);
    assert_eq!(meetings[0]["pending_count"], 0);

    let later = as_instructor(server.get("/instructor/courses/CS101/attendance"), INSTRUCTOR)
        .add_query_param("meeting_number", 4)
        .await
        .json::<Value>();
    assert_eq!(later["meetings"][0]["meeting_number"], 4);
    assert_eq!(later["meetings"][0]["pending_count"], 2);

    let invalid = as_instructor(server.get("/instructor/courses/CS101/attendance"), INSTRUCTOR)
        .add_query_param("meeting_number", 17)
        .await;
    invalid.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(invalid.json::<Value>()["code"], "ATT_001");

    as_instructor(server.get("/instructor/courses/CS101/attendance"), OTHER_INSTRUCTOR)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    as_student(server.get("/instructor/courses/CS101/attendance"), STUDENT)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

/// Student history can be narrowed by status.
#[tokio::test]
async fn test_student_history_filter() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let first = open(&server, 1).await;
    scan(&server, STUDENT, &first).await;

    ctx.set_time(weeks_later(thursday_at(10, 0), 1));
    let second = open(&server, 2).await;
    as_instructor(
        server.put(&format!(
            "/instructor/sessions/{}/attendance",
            second["id"].as_str().unwrap()
        )),
        INSTRUCTOR,
    )
    .json(&status_body(STUDENT, "absent"))
    .await
    .assert_status_ok();

    let all = as_student(server.get("/student/attendance"), STUDENT)
        .await
        .json::<Vec<Value>>();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["meeting_number"], 2);

    let absent = as_student(server.get("/student/attendance"), STUDENT)
        .add_query_param("status", "alpa")
        .await
        .json::<Vec<Value>>();
    assert_eq!(absent.len(), 1);
    assert_eq!(absent[0]["status"], "absent");

    as_student(server.get("/student/attendance"), STUDENT)
        .add_query_param("status", "late")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
