//! Core data types for slot candidates, attempt outcomes, and errors.

use serde::{Deserialize, Serialize};

/// One participant on the reservation roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub first_name: String,
    pub last_name: String,
}

/// Portal account credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Price and court category shown next to a bookable slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDescriptor {
    pub price_type: String,
    pub court_type: String,
}

/// A slot discovered during one attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub location: String,
    pub hour: String,
    pub court_id: String,
    pub descriptor: SlotDescriptor,
}

/// A confirmed reservation as reported by the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub location: String,
    pub hour: String,
    pub court_id: String,
    /// Confirmed address, whitespace-normalized.
    pub address: String,
    /// Confirmed date and time text, whitespace-normalized.
    pub when: String,
}

/// Result of a single acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// A slot was claimed and confirmed.
    Success(Reservation),
    /// Every configured location was searched without a confirmed claim.
    NoMatch { detail: String },
    /// The attempt failed before it could finish searching.
    Error { detail: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success(_))
    }

    pub fn detail(&self) -> String {
        match self {
            AttemptOutcome::Success(r) => {
                format!("claimed court {} at {} ({})", r.court_id, r.location, r.when)
            }
            AttemptOutcome::NoMatch { detail } | AttemptOutcome::Error { detail } => {
                detail.clone()
            }
        }
    }
}

/// Terminal outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Success(Reservation),
    /// The eligibility window closed without a successful claim.
    Exhausted { attempts: u32 },
}

/// Errors that can occur while acquiring a slot.
#[derive(thiserror::Error, Debug)]
pub enum ClaimError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("No matching slot at {0}")]
    NoMatch(String),

    #[error("Reservation not confirmed: {0}")]
    Validation(String),

    #[error("Portal error: {0}")]
    Portal(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClaimError {
    /// True for failures that only rule out the current location.
    pub fn is_location_miss(&self) -> bool {
        matches!(self, ClaimError::NoMatch(_) | ClaimError::Validation(_))
    }
}

/// Convenience result type.
pub type ClaimResult<T> = Result<T, ClaimError>;
