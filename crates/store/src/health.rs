//! Store health checks.

use crate::repository::SessionStore;
use telemetry::health;
use tracing::{debug, error};

/// Check the store and record the outcome in the health registry.
pub async fn check_connection(store: &dyn SessionStore) -> bool {
    if store.is_healthy() {
        debug!("Store healthy");
        health().store.set_healthy();
        true
    } else {
        error!("Store health check failed");
        health().store.set_unhealthy("last snapshot write failed");
        false
    }
}
