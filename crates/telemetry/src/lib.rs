//! Internal telemetry for the attendance engine.
//!
//! Counters and component health live in process and are exposed over
//! the HTTP API; logs go through `tracing`.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
