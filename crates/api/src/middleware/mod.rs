//! Request middleware.

pub mod in_flight;
pub mod rate_limit;
