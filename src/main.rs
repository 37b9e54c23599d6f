//! Attendance Check-in Session Engine
//!
//! Serves the attendance part of the student hub portal:
//! - instructors open time-boxed sessions and rotate scan tokens
//! - students check in once per meeting through the validation pipeline
//! - attendance reports derived on demand from sessions and records

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::middleware::rate_limit::RateLimitConfig;
use api::{router, AppState, DirectoryClient, DirectoryConfig};
use attendance_core::{limits::DEFAULT_UTC_OFFSET_MINUTES, CampusCalendar, CheckinPolicy};
use attendance_store::{MemoryStore, StoreConfig};
use engine::{Engine, EngineContext};
use telemetry::init_tracing_from_env;

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct AppConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Campus offset from UTC in minutes
    #[serde(default = "default_utc_offset_minutes")]
    utc_offset_minutes: i32,

    /// Academic directory URL; empty or "mock" for the in-process directory
    #[serde(default)]
    directory_url: String,
    /// JSON seed for the in-process directory
    #[serde(default)]
    directory_seed: Option<String>,
    #[serde(default = "default_directory_cache_ttl_secs")]
    directory_cache_ttl_secs: u64,

    #[serde(default)]
    checkin: CheckinPolicy,

    #[serde(default)]
    rate_limit: RateLimitConfig,

    #[serde(default)]
    store: StoreConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_utc_offset_minutes() -> i32 {
    DEFAULT_UTC_OFFSET_MINUTES
}

fn default_directory_cache_ttl_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            utc_offset_minutes: default_utc_offset_minutes(),
            directory_url: String::new(),
            directory_seed: None,
            directory_cache_ttl_secs: default_directory_cache_ttl_secs(),
            checkin: CheckinPolicy::default(),
            rate_limit: RateLimitConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    fn directory(&self) -> DirectoryConfig {
        DirectoryConfig {
            url: self.directory_url.clone(),
            seed_path: self.directory_seed.clone(),
            cache_ttl_secs: self.directory_cache_ttl_secs,
            ..DirectoryConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Attendance Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let directory_mode = if config.directory_url.is_empty() {
        "mock"
    } else {
        config.directory_url.as_str()
    };
    info!(
        utc_offset_minutes = config.utc_offset_minutes,
        early_minutes = config.checkin.early_minutes,
        late_minutes = config.checkin.late_minutes,
        directory = directory_mode,
        "Loaded configuration"
    );

    // Storage
    let store = Arc::new(match &config.store.snapshot_path {
        Some(path) => MemoryStore::load_from(path)
            .await
            .context("Failed to load store snapshot")?,
        None => MemoryStore::new(),
    });
    attendance_store::health::check_connection(&*store).await;

    // Directory
    let directory = Arc::new(
        DirectoryClient::from_config(&config.directory())
            .await
            .context("Failed to create directory client")?,
    );
    if !directory.check_connection().await {
        warn!("Directory is unreachable; scans will fail until it recovers");
    }

    let calendar = CampusCalendar::from_offset_minutes(config.utc_offset_minutes)
        .context("Invalid campus UTC offset")?;
    let ctx = EngineContext::new(store.clone(), store.clone(), directory.clone(), directory)
        .context("Failed to build engine context")?
        .with_calendar(calendar)
        .with_policy(config.checkin);

    let state = AppState::with_rate_limit(Engine::new(ctx), config.rate_limit.clone());
    let _rate_limiter_cleanup = state.start_rate_limiter_cleanup();

    let _snapshot_task = start_snapshot_task(&config.store, store.clone());

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");

    if let Some(path) = &config.store.snapshot_path {
        if let Err(e) = store.persist_to(path).await {
            error!("Failed to persist store snapshot: {}", e);
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<AppConfig> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&AppConfig::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("ATTENDANCE")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides for values the nested env parsing mangles
    if let Ok(url) = std::env::var("ATTENDANCE_DIRECTORY_URL") {
        config.directory_url = url;
    }
    if let Ok(seed) = std::env::var("ATTENDANCE_DIRECTORY_SEED") {
        config.directory_seed = Some(seed);
    }
    if let Ok(path) = std::env::var("ATTENDANCE_SNAPSHOT_PATH") {
        config.store.snapshot_path = Some(path);
    }
    if let Ok(offset) = std::env::var("ATTENDANCE_UTC_OFFSET_MINUTES") {
        config.utc_offset_minutes = offset
            .parse()
            .context("ATTENDANCE_UTC_OFFSET_MINUTES must be an integer")?;
    }

    Ok(config)
}

/// Periodically write the store snapshot, if configured.
fn start_snapshot_task(
    config: &StoreConfig,
    store: Arc<MemoryStore>,
) -> Option<tokio::task::JoinHandle<()>> {
    let path = config.snapshot_path.clone()?;
    if config.snapshot_interval_secs == 0 {
        return None;
    }
    let every = Duration::from_secs(config.snapshot_interval_secs);

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = store.persist_to(&path).await {
                error!("Periodic snapshot failed: {}", e);
            }
            if !attendance_store::health::check_connection(&*store).await {
                if let Some(reason) = store.last_snapshot_error() {
                    telemetry::health().store.set_unhealthy(reason);
                }
            }
        }
    }))
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
