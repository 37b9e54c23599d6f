//! Store configuration.

use serde::{Deserialize, Serialize};

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot file loaded on startup and written on shutdown.
    /// `None` keeps everything in memory only.
    #[serde(default)]
    pub snapshot_path: Option<String>,
    /// Seconds between periodic snapshots; 0 disables them.
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,
}

fn default_snapshot_interval_secs() -> u64 {
    60
}
