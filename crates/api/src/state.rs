//! Application state shared across handlers.

use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter, SharedRateLimiter};
use engine::Engine;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How often idle rate limit buckets are dropped.
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    /// Throttles check-in scans per student
    pub rate_limiter: SharedRateLimiter,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self::with_rate_limit(engine, RateLimitConfig::default())
    }

    pub fn with_rate_limit(engine: Engine, rate_config: RateLimitConfig) -> Self {
        Self {
            engine,
            rate_limiter: Arc::new(RateLimiter::new(rate_config)),
        }
    }

    /// Start the rate limiter cleanup background task.
    pub fn start_rate_limiter_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let rate_limiter = self.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                rate_limiter.cleanup(RATE_LIMIT_CLEANUP_INTERVAL);
                debug!(tracked = rate_limiter.tracked_keys(), "Rate limiter cleanup");
            }
        })
    }
}
