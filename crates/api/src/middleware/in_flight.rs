//! Tracks how many requests the router is serving right now.

use axum::{extract::Request, middleware::Next, response::Response};
use telemetry::{metrics, Gauge};

/// Holds one unit of a gauge for as long as it lives.
///
/// The gauge is released on drop, so a handler that errors or a client
/// that disconnects mid-request still leaves the count correct.
pub struct InFlightGuard<'a> {
    gauge: &'a Gauge,
}

impl<'a> InFlightGuard<'a> {
    pub fn enter(gauge: &'a Gauge) -> Self {
        gauge.inc();
        Self { gauge }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

/// Middleware counting requests into `in_flight_requests`.
pub async fn track_in_flight(request: Request, next: Next) -> Response {
    let _guard = InFlightGuard::enter(&metrics().in_flight_requests);
    next.run(request).await
}
