//! Session and attendance record storage.

pub mod config;
pub mod health;
pub mod memory;
pub mod repository;

pub use config::*;
pub use memory::*;
pub use repository::*;
