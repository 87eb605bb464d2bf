//! Chromium runner for court-claim: the portal driver and the run log.

pub mod chromium;
pub mod logging;
pub mod script;

pub use chromium::{find_chromium, ChromiumDriver, ChromiumPage};
pub use logging::{init as init_logging, log_file_name};
