//! Session lifecycle over HTTP: open, refresh, close, listings.

use axum::http::StatusCode;
use integration_tests::fixtures::{open_body, INSTRUCTOR, OTHER_INSTRUCTOR, STUDENT};
use integration_tests::setup::{as_actor, as_instructor, as_student, TestContext};
use serde_json::Value;

/// Opening a session returns the session, the roster size and a ticket.
#[tokio::test]
async fn test_open_session() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 1, 30))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["course_id"], "CS101");
    assert_eq!(body["meeting_number"], 1);
    assert_eq!(body["state"], "active");
    assert_eq!(body["token"], "tok-1");
    assert_eq!(body["code"], "ABS-CS101-P1-150126100000");
    assert_eq!(body["student_count"], 2);
    assert_eq!(body["ticket"]["seconds_left"], 1800);
    assert!(body["ticket"]["payload"]
        .as_str()
        .unwrap()
        .starts_with("tok-1|CS101|1|"));
}

/// Missing identity is 401, the wrong role is 403.
#[tokio::test]
async fn test_open_session_requires_instructor() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post("/instructor/sessions")
        .json(&open_body("CS101", 1, 30))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "AUTH_001");

    let response = as_actor(server.post("/instructor/sessions"), INSTRUCTOR, "janitor")
        .json(&open_body("CS101", 1, 30))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "AUTH_002");

    let response = as_student(server.post("/instructor/sessions"), STUDENT)
        .json(&open_body("CS101", 1, 30))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], "AUTH_003");
}

/// Out-of-range input is rejected before anything is stored.
#[tokio::test]
async fn test_open_session_validation() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 17, 30))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "ATT_001");

    let response = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 1, 121))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .text("{not json")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "ATT_001");

    assert!(ctx.tokens.issued().is_empty());
}

/// Unknown course is 404; someone else's course is 403.
#[tokio::test]
async fn test_open_session_course_checks() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("XX999", 1, 30))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "ATT_002");

    let response = as_instructor(server.post("/instructor/sessions"), OTHER_INSTRUCTOR)
        .json(&open_body("CS101", 1, 30))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], "ATT_003");
}

/// A second live session for the same slot conflicts until the first closes.
#[tokio::test]
async fn test_duplicate_slot_conflicts_until_closed() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let first = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 1, 30))
        .await;
    first.assert_status(StatusCode::CREATED);
    let id = first.json::<Value>()["id"].as_str().unwrap().to_string();

    let second = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 1, 30))
        .await;
    second.assert_status(StatusCode::CONFLICT);
    assert_eq!(second.json::<Value>()["code"], "ATT_004");

    // A different meeting number is a different slot
    as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 2, 30))
        .await
        .assert_status(StatusCode::CREATED);

    as_instructor(server.post(&format!("/instructor/sessions/{}/close", id)), INSTRUCTOR)
        .await
        .assert_status_ok();

    as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 1, 30))
        .await
        .assert_status(StatusCode::CREATED);
}

/// A failed open leaves nothing behind, so the retry succeeds.
#[tokio::test]
async fn test_failed_open_can_be_retried() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    ctx.directory.set_roster_failing(true);
    let response = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 3, 30))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(response.json::<Value>()["code"], "UPSTREAM_001");
    assert!(ctx.tokens.issued().is_empty());

    ctx.directory.set_roster_failing(false);
    as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 3, 30))
        .await
        .assert_status(StatusCode::CREATED);

    let active = as_instructor(server.get("/instructor/sessions/active"), INSTRUCTOR)
        .await
        .json::<Vec<Value>>();
    assert_eq!(active.len(), 1);
}

/// An expired session frees its slot without being closed.
#[tokio::test]
async fn test_expired_session_frees_slot() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 1, 5))
        .await
        .assert_status(StatusCode::CREATED);

    ctx.advance_minutes(6);

    as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 1, 5))
        .await
        .assert_status(StatusCode::CREATED);
}

/// Refresh swaps the token; the old token no longer resolves.
#[tokio::test]
async fn test_refresh_rotates_token() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let opened = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 1, 30))
        .await
        .json::<Value>();
    let id = opened["id"].as_str().unwrap();

    let refreshed = as_instructor(server.post(&format!("/instructor/sessions/{}/refresh", id)), INSTRUCTOR).await;
    refreshed.assert_status_ok();
    let ticket = refreshed.json::<Value>();
    assert!(ticket["payload"].as_str().unwrap().starts_with("tok-2|"));

    let old = as_student(server.get("/sessions/ticket/tok-1"), STUDENT).await;
    old.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(old.json::<Value>()["code"], "ATT_006");

    as_student(server.get("/sessions/ticket/tok-2"), STUDENT)
        .await
        .assert_status_ok();
}

/// Refresh is owner-only and refuses expired sessions.
#[tokio::test]
async fn test_refresh_rejections() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let opened = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 1, 5))
        .await
        .json::<Value>();
    let path = format!("/instructor/sessions/{}/refresh", opened["id"].as_str().unwrap());

    as_instructor(server.post(&path), OTHER_INSTRUCTOR)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    ctx.advance_minutes(5);
    let response = as_instructor(server.post(&path), INSTRUCTOR).await;
    response.assert_status(StatusCode::GONE);
    assert_eq!(response.json::<Value>()["code"], "ATT_005");

    let missing = as_instructor(
        server.post("/instructor/sessions/00000000-0000-0000-0000-000000000000/refresh"),
        INSTRUCTOR,
    )
    .await;
    missing.assert_status(StatusCode::NOT_FOUND);

    as_instructor(server.post("/instructor/sessions/not-a-uuid/refresh"), INSTRUCTOR)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

/// Closing is idempotent and reports the session as no longer live.
#[tokio::test]
async fn test_close_is_idempotent() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let opened = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 1, 30))
        .await
        .json::<Value>();
    let path = format!("/instructor/sessions/{}/close", opened["id"].as_str().unwrap());

    for _ in 0..2 {
        let response = as_instructor(server.post(&path), INSTRUCTOR).await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["state"], "closed");
        assert_eq!(body["live"], false);
        assert_eq!(body["seconds_left"], 0);
    }

    as_student(server.get("/sessions/ticket/tok-1"), STUDENT)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

/// Active listing only shows live sessions; history shows everything.
#[tokio::test]
async fn test_active_and_history_listings() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let first = as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 1, 30))
        .await
        .json::<Value>();
    as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 2, 30))
        .await
        .assert_status(StatusCode::CREATED);
    as_instructor(
        server.post(&format!("/instructor/sessions/{}/close", first["id"].as_str().unwrap())),
        INSTRUCTOR,
    )
    .await
    .assert_status_ok();

    let active = as_instructor(server.get("/instructor/sessions/active"), INSTRUCTOR)
        .await
        .json::<Vec<Value>>();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["meeting_number"], 2);
    assert_eq!(active[0]["live"], true);

    let history = as_instructor(server.get("/instructor/sessions/history"), INSTRUCTOR)
        .await
        .json::<Vec<Value>>();
    assert_eq!(history.len(), 2);

    let narrowed = as_instructor(server.get("/instructor/sessions/history"), INSTRUCTOR)
        .add_query_param("meeting_number", 1)
        .await
        .json::<Vec<Value>>();
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0]["live"], false);

    let theirs = as_instructor(server.get("/instructor/sessions/active"), OTHER_INSTRUCTOR)
        .await
        .json::<Vec<Value>>();
    assert!(theirs.is_empty());
}

/// The meeting summary always has one row per meeting number.
#[tokio::test]
async fn test_meeting_summary() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    as_instructor(server.post("/instructor/sessions"), INSTRUCTOR)
        .json(&open_body("CS101", 3, 30))
        .await
        .assert_status(StatusCode::CREATED);

    let rows = as_instructor(server.get("/instructor/courses/CS101/meetings"), INSTRUCTOR)
        .await
        .json::<Vec<Value>>();
    assert_eq!(rows.len(), 16);
    assert_eq!(rows[2]["meeting_number"], 3);
    assert_eq!(rows[2]["sessions_opened"], 1);
    assert_eq!(rows[2]["live_sessions"], 1);
    assert_eq!(rows[0]["sessions_opened"], 0);

    as_instructor(server.get("/instructor/courses/MA201/meetings"), INSTRUCTOR)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
