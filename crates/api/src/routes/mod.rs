//! API routes.

pub mod health;
pub mod instructor;
pub mod student;

use axum::{
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::in_flight::track_in_flight;
use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let instructor = Router::new()
        .route("/sessions", post(instructor::open_session))
        .route("/sessions/active", get(instructor::list_active))
        .route("/sessions/history", get(instructor::history))
        .route("/sessions/:id", get(instructor::session_report))
        .route("/sessions/:id/refresh", post(instructor::refresh))
        .route("/sessions/:id/close", post(instructor::close))
        .route("/sessions/:id/attendance", put(instructor::set_status))
        .route("/courses/:course_id/meetings", get(instructor::meeting_summary))
        .route("/courses/:course_id/attendance", get(instructor::course_roster));

    let student = Router::new()
        .route("/check-in", post(student::check_in))
        .route("/attendance", get(student::history))
        .route("/attendance/summary", get(student::summary))
        .route("/courses/:course_id/attendance", get(student::course_history));

    Router::new()
        .nest("/instructor", instructor)
        .nest("/student", student)
        .route("/sessions/ticket/:token", get(student::ticket))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route("/metrics", get(health::metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(track_in_flight))
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}
