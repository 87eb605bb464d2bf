//! Eligibility window and jittered tick spacing.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// When attempts are allowed, in local wall-clock time.
///
/// `start` is `target - warm_up` and `stop` is `target + stop_interval`.
/// `start <= stop` is not enforced; a degenerate window simply yields
/// no attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
}

impl TimeWindow {
    /// Derive the window around `target` on `day`.
    pub fn around(
        day: NaiveDate,
        target: NaiveTime,
        warm_up: Duration,
        stop_interval: Duration,
    ) -> Self {
        let target = day.and_time(target);
        let start = TimeDelta::from_std(warm_up)
            .ok()
            .and_then(|d| target.checked_sub_signed(d))
            .unwrap_or(NaiveDateTime::MIN);
        let stop = TimeDelta::from_std(stop_interval)
            .ok()
            .and_then(|d| target.checked_add_signed(d))
            .unwrap_or(NaiveDateTime::MAX);
        Self { start, stop }
    }

    /// Attempts may run at `now`.
    pub fn is_open(&self, now: NaiveDateTime) -> bool {
        now >= self.start && now < self.stop
    }

    /// The window can no longer open.
    pub fn is_closed(&self, now: NaiveDateTime) -> bool {
        now >= self.stop
    }
}

/// Jitter settings for the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSpacing {
    pub interval: Duration,
    pub variability: Duration,
}

impl TickSpacing {
    pub fn new(interval: Duration, variability: Duration) -> Self {
        Self {
            interval,
            variability,
        }
    }

    /// Smallest delay the spacing can produce.
    pub fn lower_bound(&self) -> Duration {
        self.interval.saturating_sub(self.variability)
    }

    /// Largest delay the spacing can produce.
    pub fn upper_bound(&self) -> Duration {
        self.interval.saturating_add(self.variability)
    }

    /// Draw the next inter-tick delay.
    ///
    /// Sampled uniformly over `[max(0, interval - variability), interval + variability]`,
    /// so a variability larger than the interval never piles draws up at zero.
    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let lo = self.lower_bound();
        let hi = self.upper_bound();
        if lo >= hi {
            return lo;
        }
        let nanos = rng.gen_range(lo.as_nanos()..=hi.as_nanos());
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}
