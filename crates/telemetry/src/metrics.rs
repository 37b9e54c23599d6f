//! In-process metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A value that can go up or down.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Latency histogram in milliseconds.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s
    buckets: [AtomicU64; 10],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 10] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// (upper bound, count) pairs.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the attendance engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Sessions
    pub sessions_opened: Counter,
    pub session_conflicts: Counter,
    pub sessions_closed: Counter,
    pub tokens_refreshed: Counter,

    // Check-ins
    pub checkins_accepted: Counter,
    pub checkins_rejected: Counter,
    pub duplicate_checkins: Counter,
    pub status_overrides: Counter,
    pub rate_limited_requests: Counter,

    // Store
    pub store_writes: Counter,
    pub store_write_conflicts: Counter,

    // Directory
    pub directory_requests: Counter,
    pub directory_errors: Counter,

    pub checkin_latency_ms: Histogram,
    pub directory_latency_ms: Histogram,

    /// Requests currently inside the router.
    pub in_flight_requests: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            sessions_opened: self.sessions_opened.get(),
            session_conflicts: self.session_conflicts.get(),
            sessions_closed: self.sessions_closed.get(),
            tokens_refreshed: self.tokens_refreshed.get(),
            checkins_accepted: self.checkins_accepted.get(),
            checkins_rejected: self.checkins_rejected.get(),
            duplicate_checkins: self.duplicate_checkins.get(),
            status_overrides: self.status_overrides.get(),
            rate_limited_requests: self.rate_limited_requests.get(),
            store_writes: self.store_writes.get(),
            store_write_conflicts: self.store_write_conflicts.get(),
            directory_requests: self.directory_requests.get(),
            directory_errors: self.directory_errors.get(),
            checkin_latency_mean_ms: self.checkin_latency_ms.mean(),
            checkin_latency_buckets: self.checkin_latency_ms.buckets(),
            directory_latency_mean_ms: self.directory_latency_ms.mean(),
            in_flight_requests: self.in_flight_requests.get(),
        }
    }
}

/// Point-in-time copy of [`Metrics`], served at `/metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub sessions_opened: u64,
    pub session_conflicts: u64,
    pub sessions_closed: u64,
    pub tokens_refreshed: u64,
    pub checkins_accepted: u64,
    pub checkins_rejected: u64,
    pub duplicate_checkins: u64,
    pub status_overrides: u64,
    pub rate_limited_requests: u64,
    pub store_writes: u64,
    pub store_write_conflicts: u64,
    pub directory_requests: u64,
    pub directory_errors: u64,
    pub checkin_latency_mean_ms: f64,
    pub checkin_latency_buckets: Vec<(u64, u64)>,
    pub directory_latency_mean_ms: f64,
    pub in_flight_requests: u64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
