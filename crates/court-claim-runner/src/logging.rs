//! Run log: every event goes to stderr and to a per-run file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// `logfile_<timestamp>.log`, where the timestamp is the run start in
/// UTC ISO-8601 with `-`, `:` and `.` removed.
pub fn log_file_name(started_at: DateTime<Utc>) -> String {
    let stamp = started_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(['-', ':', '.'], "");
    format!("logfile_{stamp}.log")
}

/// Install the global subscriber. Returns the path of the log file.
///
/// `RUST_LOG` overrides `level` when set.
pub fn init(log_dir: &Path, level: &str, started_at: DateTime<Utc>) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let path = log_dir.join(log_file_name(started_at));
    let file = File::create(&path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(path)
}
