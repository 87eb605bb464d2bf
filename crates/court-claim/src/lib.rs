//! Court Claim: contention-acquisition engine for time-boxed reservation slots.

pub mod config;
pub mod context;
pub mod filter;
pub mod layout;
pub mod portal;
pub mod scheduler;
pub mod search;
pub mod session;
pub mod types;
pub mod window;

pub use config::{resolve_config_path, BrowserOptions, Config};
pub use context::RunContext;
pub use filter::AcceptanceSets;
pub use layout::SiteLayout;
pub use portal::{ElementMutation, PortalDriver, PortalPage, Selector, WaitState};
pub use scheduler::{AttemptRunner, Clock, Scheduler, SessionRunner, SystemClock};
pub use search::{normalize_whitespace, split_descriptor, SlotSearch};
pub use session::AcquisitionSession;
pub use types::*;
pub use window::{TickSpacing, TimeWindow};
