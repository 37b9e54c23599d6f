//! Student scans over HTTP: the validation pipeline end to end.

use api::middleware::rate_limit::RateLimitConfig;
use axum::http::StatusCode;
use integration_tests::fixtures::{
    check_in_body, open_body, thursday_at, CLASSMATE, INSTRUCTOR, OUTSIDER, STUDENT,
};
use integration_tests::setup::{as_instructor, as_student, TestContext};
use serde_json::Value;

async fn open(server: &axum_test::TestServer, course_id: &str, meeting: u32) -> Value {
    let response = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body(course_id, meeting, 30))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

/// A scan inside the window records the student present exactly once.
#[tokio::test]
async fn test_check_in_then_duplicate() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let session = open(&server, "CS101", 1).await;
    let token = session["token"].as_str().unwrap();

    ctx.advance_minutes(5);
    let response = as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body(token, "CS101"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let record = response.json::<Value>();
    assert_eq!(record["student_id"], STUDENT);
    assert_eq!(record["status"], "present");
    assert_eq!(record["source"], "self_check_in");
    assert_eq!(record["meeting_number"], 1);
    assert_eq!(record["session_id"], session["id"]);

    let again = as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body(token, "CS101"))
        .await;
    again.assert_status(StatusCode::CONFLICT);
    let body = again.json::<Value>();
    assert_eq!(body["code"], "ATT_011");
    assert_eq!(body["details"]["status"], "present");
    assert_eq!(body["details"]["meeting_number"], 1);

    // The classmate is unaffected
    as_student(server.post("/student/check-in"), CLASSMATE)
        .json(&check_in_body(token, "CS101"))
        .await
        .assert_status(StatusCode::CREATED);
}

/// The legacy `qr_token` field name is accepted.
#[tokio::test]
async fn test_check_in_accepts_qr_token_field() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let session = open(&server, "CS101", 1).await;

    as_student(server.post("/student/check-in"), STUDENT)
        .json(&serde_json::json!({
            "qr_token": session["token"],
            "course_id": "CS101",
        }))
        .await
        .assert_status(StatusCode::CREATED);
}

/// Unknown, rotated, closed and expired tokens all read the same.
#[tokio::test]
async fn test_unusable_tokens() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body("no-such-token", "CS101"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "ATT_006");

    let session = open(&server, "CS101", 1).await;
    let id = session["id"].as_str().unwrap();
    as_instructor(server.post(&format!("/instructor/sessions/{}/refresh", id)), INSTRUCTOR)
        .await
        .assert_status_ok();

    let rotated = as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body("tok-1", "CS101"))
        .await;
    assert_eq!(rotated.json::<Value>()["code"], "ATT_006");

    ctx.advance_minutes(30);
    let expired = as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body("tok-2", "CS101"))
        .await;
    expired.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(expired.json::<Value>()["code"], "ATT_006");
}

/// The scanned session must belong to the course the student selected.
#[tokio::test]
async fn test_course_mismatch() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let session = open(&server, "CS101", 1).await;

    let response = as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body(session["token"].as_str().unwrap(), "CS102"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "ATT_007");
    assert_eq!(body["details"]["session_course"], "CS101");
    assert_eq!(body["details"]["requested_course"], "CS102");
}

/// Students outside the roster are refused.
#[tokio::test]
async fn test_not_enrolled() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let session = open(&server, "CS101", 1).await;

    let response = as_student(server.post("/student/check-in"), OUTSIDER)
        .json(&check_in_body(session["token"].as_str().unwrap(), "CS101"))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], "ATT_008");
}

/// A Monday course cannot be scanned on a Thursday.
#[tokio::test]
async fn test_wrong_day() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let session = open(&server, "CS102", 1).await;

    let response = as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body(session["token"].as_str().unwrap(), "CS102"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "ATT_009");
    assert_eq!(body["details"]["scheduled"], "Mon");
    assert_eq!(body["details"]["today"], "Thu");
}

/// Scans are accepted from 15 minutes before start to 60 after end.
#[tokio::test]
async fn test_window_bounds() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    ctx.set_time(thursday_at(9, 40));
    let session = open(&server, "CS101", 1).await;
    let token = session["token"].as_str().unwrap().to_string();

    let early = as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body(&token, "CS101"))
        .await;
    early.assert_status(StatusCode::BAD_REQUEST);
    let body = early.json::<Value>();
    assert_eq!(body["code"], "ATT_010");
    assert_eq!(body["details"]["side"], "too early");
    assert_eq!(body["details"]["opens_at"], "2026-01-15T09:45:00");
    assert_eq!(body["details"]["closes_at"], "2026-01-15T12:30:00");

    ctx.set_time(thursday_at(9, 45));
    as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body(&token, "CS101"))
        .await
        .assert_status(StatusCode::CREATED);

    ctx.set_time(thursday_at(12, 10));
    let late_session = open(&server, "CS101", 2).await;
    ctx.set_time(thursday_at(12, 31));
    let late = as_student(server.post("/student/check-in"), CLASSMATE)
        .json(&check_in_body(late_session["token"].as_str().unwrap(), "CS101"))
        .await;
    late.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(late.json::<Value>()["details"]["side"], "too late");
}

/// Checking in through a second session of the same meeting is a duplicate.
#[tokio::test]
async fn test_same_meeting_second_session() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let first = open(&server, "CS101", 1).await;

    as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body(first["token"].as_str().unwrap(), "CS101"))
        .await
        .assert_status(StatusCode::CREATED);

    as_instructor(
        server.post(&format!("/instructor/sessions/{}/close", first["id"].as_str().unwrap())),
        INSTRUCTOR,
    )
    .await
    .assert_status_ok();
    let second = open(&server, "CS101", 1).await;

    let response = as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body(second["token"].as_str().unwrap(), "CS101"))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "ATT_011");
}

/// Parallel scans by one student produce a single record.
#[tokio::test]
async fn test_concurrent_scans_record_once() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let session = open(&server, "CS101", 1).await;
    let token = session["token"].as_str().unwrap().to_string();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let checkin = ctx.engine.checkin.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            checkin.validate(&token, "CS101", STUDENT).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);

    let history = as_student(server.get("/student/attendance"), STUDENT)
        .await
        .json::<Vec<Value>>();
    assert_eq!(history.len(), 1);
}

/// Directory outages surface as 502 and record nothing.
#[tokio::test]
async fn test_directory_outage() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let session = open(&server, "CS101", 1).await;

    ctx.directory.set_failing(true);
    let response = as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body(session["token"].as_str().unwrap(), "CS101"))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(response.json::<Value>()["code"], "UPSTREAM_001");

    ctx.directory.set_failing(false);
    as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body(session["token"].as_str().unwrap(), "CS101"))
        .await
        .assert_status(StatusCode::CREATED);
}

/// Repeated scans beyond the burst are throttled per student.
#[tokio::test]
async fn test_check_in_rate_limited() {
    let ctx = TestContext::with_rate_limit(RateLimitConfig {
        rate: 0.01,
        burst: 2,
    })
    .await;
    let server = ctx.server();

    for _ in 0..2 {
        let response = as_student(server.post("/student/check-in"), STUDENT)
            .json(&check_in_body("no-such-token", "CS101"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    let limited = as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body("no-such-token", "CS101"))
        .await;
    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.json::<Value>()["code"], "RATE_001");
    assert!(limited.headers().contains_key("retry-after"));

    // Another student has their own bucket
    as_student(server.post("/student/check-in"), CLASSMATE)
        .json(&check_in_body("no-such-token", "CS101"))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

/// The metrics snapshot reflects scan traffic.
#[tokio::test]
async fn test_metrics_endpoint() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let opened = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 1, 30))
        .await
        .json::<Value>();
    as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body(opened["token"].as_str().unwrap(), "CS101"))
        .await
        .assert_status(StatusCode::CREATED);
    as_student(server.post("/student/check-in"), STUDENT)
        .json(&check_in_body(opened["token"].as_str().unwrap(), "CS101"))
        .await
        .assert_status(StatusCode::CONFLICT);

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert!(body["sessions_opened"].as_u64().unwrap() >= 1);
    assert!(body["checkins_accepted"].as_u64().unwrap() >= 1);
    assert!(body["duplicate_checkins"].as_u64().unwrap() >= 1);
    assert!(body["store_writes"].as_u64().unwrap() >= 2);
    assert!(body["checkin_latency_buckets"].is_array());
    // The metrics request itself is being served
    assert!(body["in_flight_requests"].as_u64().unwrap() >= 1);
}
