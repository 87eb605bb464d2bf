//! Per-run context shared read-only by the scheduler and every attempt.

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::Config;
use crate::filter::AcceptanceSets;
use crate::types::ClaimResult;
use crate::window::TimeWindow;

/// Everything an attempt needs that outlives the attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub config: Config,
    pub window: TimeWindow,
    pub target_date: NaiveDate,
    pub acceptance: AcceptanceSets,
    /// When the run began, local time.
    pub started_at: NaiveDateTime,
}

impl RunContext {
    /// Build the context; the window is anchored on the day of `started_at`.
    pub fn new(config: Config, started_at: NaiveDateTime) -> ClaimResult<Self> {
        config.validate()?;
        let window = TimeWindow::around(
            started_at.date(),
            config.target_time()?,
            config.warm_up(),
            config.stop_after(),
        );
        let target_date = config.target_date()?;
        let acceptance = config.acceptance();
        Ok(Self {
            config,
            window,
            target_date,
            acceptance,
            started_at,
        })
    }
}
