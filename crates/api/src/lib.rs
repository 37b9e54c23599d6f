//! HTTP API layer for the attendance engine.

pub mod directory;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use directory::{DirectoryClient, DirectoryConfig};
pub use routes::router;
pub use state::AppState;
