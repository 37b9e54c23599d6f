//! Core types, validation and collaborator contracts for the attendance engine.

pub mod clock;
pub mod directory;
pub mod error;
pub mod ids;
pub mod limits;
pub mod record;
pub mod schedule;
pub mod session;
pub mod token;

pub use clock::*;
pub use directory::*;
pub use error::{Error, ErrorCode, Result, WindowSide};
pub use ids::*;
pub use record::*;
pub use schedule::*;
pub use session::*;
pub use token::*;
