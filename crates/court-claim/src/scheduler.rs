//! Time-windowed retry loop.
//!
//! Ticks at jittered intervals, runs one attempt per tick while the window
//! is open, and stops on the first success or once the window closes.
//! The stop check only happens between ticks; an attempt in flight always
//! runs to completion.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::context::RunContext;
use crate::portal::PortalDriver;
use crate::session::AcquisitionSession;
use crate::types::{AttemptOutcome, ClaimResult, RunOutcome};

/// Source of wall-clock time and suspension.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current local time.
    fn now(&self) -> NaiveDateTime;
    /// Suspend for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Local system time with tokio timers.
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Something that can make one acquisition attempt.
#[async_trait]
pub trait AttemptRunner: Send {
    /// `Err` means the attempt could not even start.
    async fn attempt(&mut self, ctx: &RunContext) -> ClaimResult<AttemptOutcome>;
}

/// Runs each attempt as a fresh `AcquisitionSession` on its own page.
pub struct SessionRunner<D> {
    driver: D,
}

impl<D: PortalDriver> SessionRunner<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl<D: PortalDriver> AttemptRunner for SessionRunner<D> {
    async fn attempt(&mut self, ctx: &RunContext) -> ClaimResult<AttemptOutcome> {
        AcquisitionSession::attempt(ctx, &self.driver).await
    }
}

/// Drives attempts across the eligibility window.
pub struct Scheduler<'a, C> {
    ctx: &'a RunContext,
    clock: C,
    rng: StdRng,
    attempts: u32,
}

impl<'a, C: Clock> Scheduler<'a, C> {
    pub fn new(ctx: &'a RunContext, clock: C) -> Self {
        Self::with_rng(ctx, clock, StdRng::from_entropy())
    }

    pub fn with_rng(ctx: &'a RunContext, clock: C, rng: StdRng) -> Self {
        Self {
            ctx,
            clock,
            rng,
            attempts: 0,
        }
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Tick until a claim succeeds or the window closes.
    pub async fn run<R: AttemptRunner + ?Sized>(&mut self, runner: &mut R) -> RunOutcome {
        let window = self.ctx.window;
        let spacing = self.ctx.config.spacing();
        tracing::info!(
            "Window {} -> {}",
            window.start.format("%Y-%m-%d %H:%M:%S"),
            window.stop.format("%Y-%m-%d %H:%M:%S")
        );

        loop {
            let now = self.clock.now();
            tracing::info!("Tick {}", now.format("%A %Y-%m-%d %H:%M:%S%.3f"));

            if window.is_closed(now) {
                tracing::info!("Window closed after {} attempts", self.attempts);
                return RunOutcome::Exhausted {
                    attempts: self.attempts,
                };
            }

            if now >= window.start {
                self.attempts += 1;
                match runner.attempt(self.ctx).await {
                    Ok(AttemptOutcome::Success(reservation)) => {
                        tracing::info!("Attempt {} succeeded", self.attempts);
                        return RunOutcome::Success(reservation);
                    }
                    Ok(other) => {
                        tracing::info!("Attempt {} ended: {}", self.attempts, other.detail());
                    }
                    Err(e) => {
                        tracing::error!("Attempt {} could not run: {e}", self.attempts);
                    }
                }
            }

            let delay = spacing.next_delay(&mut self.rng);
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Sleeping");
            self.clock.sleep(delay).await;
        }
    }
}
