//! Configuration loading, resolution, and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::filter::AcceptanceSets;
use crate::layout::SiteLayout;
use crate::types::{Account, ClaimError, ClaimResult, Player};
use crate::window::TickSpacing;

/// Uniform per-operation bound on portal interactions.
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 120;

const DEFAULT_SNAPSHOT_PATH: &str = "failure.png";
const DATE_FORMAT: &str = "%d/%m/%Y";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Run configuration. Loaded once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub account: Account,
    /// Locations in priority order.
    pub locations: Vec<String>,
    /// Target day, `D/MM/YYYY`.
    pub date: String,
    /// Start hours in priority order.
    pub hours: Vec<String>,
    /// Accepted price categories.
    pub price_type: Vec<String>,
    /// Accepted court categories.
    pub court_type: Vec<String>,
    /// Roster, in submission order.
    pub players: Vec<Player>,
    /// Seconds between ticks.
    pub interval: f64,
    /// Seconds before `target_time` to start attempting.
    pub warm_up_time: f64,
    /// Seconds after `target_time` to give up.
    pub stop_interval: f64,
    /// Maximum jitter, in seconds, around `interval`.
    pub interval_variability: f64,
    /// Expected opening time, `HH:MM:SS` local.
    pub target_time: String,
    #[serde(default)]
    pub browser: BrowserOptions,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    #[serde(default)]
    pub layout: SiteLayout,
}

/// Browser settings for the portal driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserOptions {
    pub headless: bool,
    pub timeout_secs: u64,
    pub chromium_path: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            chromium_path: None,
        }
    }
}

impl BrowserOptions {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_PATH)
}

impl Config {
    /// Read, parse, and validate a config file.
    pub fn load(path: &Path) -> ClaimResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClaimError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_json(&raw)?;
        if config.account.password.is_empty() {
            if let Ok(password) = std::env::var("COURT_CLAIM_PASSWORD") {
                config.account.password = password;
            }
        }
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse without validating.
    pub fn from_json(raw: &str) -> ClaimResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn validate(&self) -> ClaimResult<()> {
        if self.account.email.trim().is_empty() {
            return invalid("account.email is empty");
        }
        if self.account.password.is_empty() {
            return invalid("account.password is empty");
        }
        if self.locations.is_empty() {
            return invalid("locations must list at least one location");
        }
        if self.hours.is_empty() {
            return invalid("hours must list at least one hour");
        }
        if let Some(bad) = self.hours.iter().find(|h| h.trim().parse::<u8>().map_or(true, |v| v > 23)) {
            return invalid(&format!("hour {bad:?} is not an hour of day"));
        }
        if self.price_type.is_empty() || self.court_type.is_empty() {
            return invalid("priceType and courtType must each accept at least one value");
        }
        if self.players.is_empty() {
            return invalid("players must list at least one player");
        }
        if let Some((i, _)) = self
            .players
            .iter()
            .enumerate()
            .find(|(_, p)| p.first_name.trim().is_empty() || p.last_name.trim().is_empty())
        {
            return invalid(&format!("player {} has an empty name", i + 1));
        }
        self.target_date()?;
        self.target_time()?;
        for (name, secs) in [
            ("interval", self.interval),
            ("warmUpTime", self.warm_up_time),
            ("stopInterval", self.stop_interval),
            ("intervalVariability", self.interval_variability),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return invalid(&format!("{name} must be a non-negative number of seconds"));
            }
        }
        if self.interval <= 0.0 {
            return invalid("interval must be greater than zero");
        }
        if self.browser.timeout_secs == 0 {
            return invalid("browser.timeoutSecs must be greater than zero");
        }
        Ok(())
    }

    pub fn target_date(&self) -> ClaimResult<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).map_err(|e| {
            ClaimError::Config(format!("date {:?} is not D/MM/YYYY: {e}", self.date))
        })
    }

    pub fn target_time(&self) -> ClaimResult<NaiveTime> {
        NaiveTime::parse_from_str(self.target_time.trim(), TIME_FORMAT).map_err(|e| {
            ClaimError::Config(format!(
                "targetTime {:?} is not HH:MM:SS: {e}",
                self.target_time
            ))
        })
    }

    pub fn warm_up(&self) -> Duration {
        seconds(self.warm_up_time)
    }

    pub fn stop_after(&self) -> Duration {
        seconds(self.stop_interval)
    }

    pub fn spacing(&self) -> TickSpacing {
        TickSpacing::new(seconds(self.interval), seconds(self.interval_variability))
    }

    pub fn acceptance(&self) -> AcceptanceSets {
        AcceptanceSets::new(self.price_type.iter().cloned(), self.court_type.iter().cloned())
    }
}

/// Seconds to a duration, saturating at `Duration::MAX`. Negative and NaN
/// values are rejected by `validate` and map to zero here.
fn seconds(secs: f64) -> Duration {
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => duration,
        Err(_) if secs > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}

fn invalid(msg: &str) -> ClaimResult<()> {
    Err(ClaimError::Config(msg.to_string()))
}

/// Resolve the config file path.
pub fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var("COURT_CLAIM_CONFIG") {
        return PathBuf::from(env_path);
    }

    let cwd_config = PathBuf::from("config.json");
    if cwd_config.exists() {
        return cwd_config;
    }

    dirs::config_dir()
        .map(|d| d.join("court-claim").join("config.json"))
        .filter(|p| p.exists())
        .unwrap_or(cwd_config)
}
