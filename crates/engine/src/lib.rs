//! Attendance engine services.
//!
//! [`SessionManager`] owns the session lifecycle, [`CheckinValidator`]
//! admits scans and overrides, and [`Aggregator`] derives reports. All
//! three share one [`EngineContext`].

pub mod checkin;
pub mod context;
pub mod reports;
pub mod sessions;


pub use checkin::CheckinValidator;
pub use context::{EngineContext, Standing};
pub use reports::*;
pub use sessions::*;

/// The three services built over one context.
#[derive(Clone)]
pub struct Engine {
    pub sessions: SessionManager,
    pub checkin: CheckinValidator,
    pub reports: Aggregator,
    ctx: EngineContext,
}

impl Engine {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            sessions: SessionManager::new(ctx.clone()),
            checkin: CheckinValidator::new(ctx.clone()),
            reports: Aggregator::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }
}
