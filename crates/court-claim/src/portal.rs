//! Portal abstraction.
//!
//! Defines the `PortalDriver` and `PortalPage` traits the acquisition
//! workflow drives. Concrete implementations (a Chromium page, an API
//! client, an in-memory fake) must bound every operation by their own
//! per-operation timeout and report expiry as `ClaimError::Timeout`.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::ClaimResult;

/// Describes which element(s) an operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    /// CSS selector.
    pub css: String,
    /// Keep only elements whose trimmed text equals this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Keep only the element nearest to the left of this anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_of: Option<Box<Selector>>,
    /// Pick the n-th remaining match (0-based).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<usize>,
}

impl Selector {
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: None,
            left_of: None,
            nth: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn left_of(mut self, anchor: Selector) -> Self {
        self.left_of = Some(Box::new(anchor));
        self
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.css)?;
        if let Some(text) = &self.text {
            write!(f, " >> text=\"{text}\"")?;
        }
        if let Some(anchor) = &self.left_of {
            write!(f, " :left-of({anchor})")?;
        }
        if let Some(n) = self.nth {
            write!(f, " >> nth={n}")?;
        }
        Ok(())
    }
}

/// Element state to wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    /// Present in the document, whatever its visibility.
    Attached,
    /// Present and rendered.
    Visible,
    /// Absent or not rendered.
    Hidden,
}

/// A change applied to an element outside the normal input path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementMutation {
    RemoveAttribute { name: String },
    SetStyle { property: String, value: String },
    RemoveClass { class: String },
}

/// Creates one portal-side session per acquisition attempt.
#[async_trait]
pub trait PortalDriver: Send + Sync {
    /// Open a fresh page with its own session state.
    async fn open_page(&self) -> ClaimResult<Box<dyn PortalPage>>;
}

/// One page of the portal, exclusively owned by the current attempt.
#[async_trait]
pub trait PortalPage: Send + Sync {
    /// Navigate to a URL.
    async fn goto(&mut self, url: &str) -> ClaimResult<()>;
    /// Wait until the current document has finished loading.
    async fn wait_for_load(&self) -> ClaimResult<()>;
    /// Whether at least one element matches.
    async fn exists(&self, selector: &Selector) -> ClaimResult<bool>;
    /// Number of matching elements.
    async fn count(&self, selector: &Selector) -> ClaimResult<usize>;
    /// Whether the first match is rendered. False when nothing matches.
    async fn is_visible(&self, selector: &Selector) -> ClaimResult<bool>;
    /// Wait for the first match to reach `state`.
    async fn wait_for(&self, selector: &Selector, state: WaitState) -> ClaimResult<()>;
    /// Click the first match.
    async fn click(&self, selector: &Selector) -> ClaimResult<()>;
    /// Click the first match and return the secondary page it opens.
    async fn click_for_popup(&self, selector: &Selector) -> ClaimResult<Box<dyn PortalPage>>;
    /// Replace the value of an input.
    async fn fill(&self, selector: &Selector, value: &str) -> ClaimResult<()>;
    /// Type into an input key by key.
    async fn type_text(&self, selector: &Selector, text: &str) -> ClaimResult<()>;
    /// Press a key on the focused element.
    async fn press_key(&self, key: &str) -> ClaimResult<()>;
    /// Current document title.
    async fn title(&self) -> ClaimResult<String>;
    /// Attribute of the first match, if set.
    async fn attribute(&self, selector: &Selector, name: &str) -> ClaimResult<Option<String>>;
    /// Text content of the first match.
    async fn text_content(&self, selector: &Selector) -> ClaimResult<String>;
    /// Inner markup of the first match.
    async fn inner_html(&self, selector: &Selector) -> ClaimResult<String>;
    /// Apply mutations to the first match.
    async fn mutate(&self, selector: &Selector, mutations: &[ElementMutation]) -> ClaimResult<()>;
    /// Save a picture of the current page.
    async fn snapshot(&self, path: &Path) -> ClaimResult<()>;
    /// Release the page and everything it holds.
    async fn close(self: Box<Self>) -> ClaimResult<()>;
}
