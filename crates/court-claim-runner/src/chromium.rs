//! Chromium-backed portal driver using chromiumoxide.
//!
//! Each `open_page` launches a fresh browser so attempts never share
//! cookies or session state. Element lookups run as JavaScript (see
//! [`crate::script`]); clicks, typing and key presses go through native
//! input events on the element the lookup tagged.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use court_claim::{
    BrowserOptions, ClaimError, ClaimResult, ElementMutation, PortalDriver, PortalPage, Selector,
    WaitState,
};

use crate::script;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. COURT_CLAIM_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("COURT_CLAIM_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches one browser per acquisition attempt.
pub struct ChromiumDriver {
    chrome_path: PathBuf,
    options: BrowserOptions,
}

impl ChromiumDriver {
    /// Resolve the browser binary. An explicit path in `options` wins.
    pub fn new(options: &BrowserOptions) -> anyhow::Result<Self> {
        let chrome_path = match &options.chromium_path {
            Some(path) if path.exists() => path.clone(),
            Some(path) => anyhow::bail!("Chromium not found at {}", path.display()),
            None => find_chromium().ok_or_else(|| {
                anyhow::anyhow!(
                    "Chromium not found. Install Chrome or set COURT_CLAIM_CHROMIUM_PATH."
                )
            })?,
        };
        tracing::info!("Using browser at {}", chrome_path.display());
        Ok(Self {
            chrome_path,
            options: options.clone(),
        })
    }

    fn browser_config(&self) -> ClaimResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(&self.chrome_path)
            .request_timeout(self.options.operation_timeout())
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !self.options.headless {
            builder = builder.with_head();
        }
        builder
            .build()
            .map_err(|e| ClaimError::Portal(format!("failed to build browser config: {e}")))
    }
}

#[async_trait]
impl PortalDriver for ChromiumDriver {
    async fn open_page(&self) -> ClaimResult<Box<dyn PortalPage>> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ClaimError::Portal(format!("failed to launch Chromium: {e}")))?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                events.abort();
                return Err(ClaimError::Portal(format!("failed to create new page: {e}")));
            }
        };

        Ok(Box::new(ChromiumPage {
            page,
            browser: Arc::new(Mutex::new(browser)),
            events: Some(events),
            timeout: self.options.operation_timeout(),
        }))
    }
}

/// Probe result for snippets that report whether the element was found.
#[derive(Deserialize)]
struct Found {
    found: bool,
}

#[derive(Deserialize)]
struct FoundValue {
    found: bool,
    value: Option<String>,
}

#[derive(Deserialize)]
struct Count {
    count: usize,
}

#[derive(Deserialize)]
struct ElementState {
    attached: bool,
    visible: bool,
}

#[derive(Deserialize)]
struct DocumentState {
    title: String,
    ready: bool,
}

/// A single Chromium page. The main page owns the browser process; popups
/// share it.
pub struct ChromiumPage {
    page: Page,
    browser: Arc<Mutex<Browser>>,
    events: Option<JoinHandle<()>>,
    timeout: Duration,
}

fn portal_error(e: impl std::fmt::Display) -> ClaimError {
    ClaimError::Portal(e.to_string())
}

impl ChromiumPage {
    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Run `fut` under the per-operation timeout.
    async fn bounded<T, F>(&self, what: impl Into<String>, fut: F) -> ClaimResult<T>
    where
        F: Future<Output = ClaimResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ClaimError::Timeout {
                what: what.into(),
                timeout_ms: self.timeout_ms(),
            }),
        }
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> ClaimResult<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| ClaimError::Portal(format!("JS execution failed: {e}")))?
            .into_value()
            .map_err(|e| ClaimError::Portal(format!("failed to convert JS result: {e:?}")))
    }

    async fn state(&self, selector: &Selector) -> ClaimResult<ElementState> {
        self.eval(script::element_state(selector)).await
    }

    /// Tag the first match and hand it back as a native element.
    async fn element(&self, selector: &Selector) -> ClaimResult<Element> {
        let tagged: Found = self.eval(script::tag_target(selector)).await?;
        if !tagged.found {
            return Err(ClaimError::ElementNotFound(selector.to_string()));
        }
        self.page
            .find_element(script::target_css())
            .await
            .map_err(portal_error)
    }

    async fn value_of(&self, selector: &Selector, script: String) -> ClaimResult<Option<String>> {
        let found: FoundValue = self.eval(script).await?;
        if !found.found {
            return Err(ClaimError::ElementNotFound(selector.to_string()));
        }
        Ok(found.value)
    }

    async fn page_ids(&self) -> ClaimResult<Vec<TargetId>> {
        let browser = self.browser.lock().await;
        let pages = browser.pages().await.map_err(portal_error)?;
        Ok(pages.iter().map(|p| p.target_id().clone()).collect())
    }
}

#[async_trait]
impl PortalPage for ChromiumPage {
    async fn goto(&mut self, url: &str) -> ClaimResult<()> {
        tracing::debug!("goto {url}");
        let start = Instant::now();
        let page = &self.page;
        self.bounded(format!("navigation to {url}"), async {
            page.goto(url)
                .await
                .map_err(|e| ClaimError::Navigation(format!("{url}: {e}")))?;
            Ok(())
        })
        .await?;
        tracing::debug!("Loaded {url} in {}ms", start.elapsed().as_millis());
        Ok(())
    }

    async fn wait_for_load(&self) -> ClaimResult<()> {
        self.bounded("page load", async {
            // Already-settled pages report an error here; readyState decides.
            if let Err(e) = self.page.wait_for_navigation().await {
                tracing::debug!("Navigation wait failed: {e}");
            }
            loop {
                let doc: DocumentState = self.eval(script::document_state().to_string()).await?;
                if doc.ready {
                    return Ok(());
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await
    }

    async fn exists(&self, selector: &Selector) -> ClaimResult<bool> {
        Ok(self.count(selector).await? > 0)
    }

    async fn count(&self, selector: &Selector) -> ClaimResult<usize> {
        let what = format!("count of {selector}");
        self.bounded(what, async {
            let count: Count = self.eval(script::count(selector)).await?;
            Ok(count.count)
        })
        .await
    }

    async fn is_visible(&self, selector: &Selector) -> ClaimResult<bool> {
        let what = format!("visibility of {selector}");
        self.bounded(what, async { Ok(self.state(selector).await?.visible) })
            .await
    }

    async fn wait_for(&self, selector: &Selector, state: WaitState) -> ClaimResult<()> {
        let what = format!("{selector} to be {state:?}");
        self.bounded(what, async {
            loop {
                let current = self.state(selector).await?;
                let reached = match state {
                    WaitState::Attached => current.attached,
                    WaitState::Visible => current.visible,
                    WaitState::Hidden => !current.visible,
                };
                if reached {
                    return Ok(());
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await
    }

    async fn click(&self, selector: &Selector) -> ClaimResult<()> {
        tracing::debug!("click {selector}");
        self.bounded(format!("click on {selector}"), async {
            let element = self.element(selector).await?;
            element.click().await.map_err(portal_error)?;
            Ok(())
        })
        .await
    }

    async fn click_for_popup(&self, selector: &Selector) -> ClaimResult<Box<dyn PortalPage>> {
        let what = format!("popup from {selector}");
        let popup = self
            .bounded(what, async {
                let before = self.page_ids().await?;
                let element = self.element(selector).await?;
                element.click().await.map_err(portal_error)?;
                loop {
                    let browser = self.browser.lock().await;
                    let pages = browser.pages().await.map_err(portal_error)?;
                    if let Some(page) = pages
                        .into_iter()
                        .find(|p| !before.contains(p.target_id()))
                    {
                        return Ok(page);
                    }
                    drop(browser);
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            })
            .await?;
        tracing::debug!("Popup opened from {selector}");
        Ok(Box::new(ChromiumPage {
            page: popup,
            browser: Arc::clone(&self.browser),
            events: None,
            timeout: self.timeout,
        }))
    }

    async fn fill(&self, selector: &Selector, value: &str) -> ClaimResult<()> {
        self.bounded(format!("fill of {selector}"), async {
            let filled: Found = self.eval(script::fill(selector, value)).await?;
            if !filled.found {
                return Err(ClaimError::ElementNotFound(selector.to_string()));
            }
            Ok(())
        })
        .await
    }

    async fn type_text(&self, selector: &Selector, text: &str) -> ClaimResult<()> {
        self.bounded(format!("typing into {selector}"), async {
            let element = self.element(selector).await?;
            element.click().await.map_err(portal_error)?;
            element.type_str(text).await.map_err(portal_error)?;
            Ok(())
        })
        .await
    }

    async fn press_key(&self, key: &str) -> ClaimResult<()> {
        self.bounded(format!("key {key}"), async {
            let focused: Found = self.eval(script::tag_focused()).await?;
            if !focused.found {
                return Err(ClaimError::ElementNotFound("focused element".to_string()));
            }
            let element = self
                .page
                .find_element(script::target_css())
                .await
                .map_err(portal_error)?;
            element.press_key(key).await.map_err(portal_error)?;
            Ok(())
        })
        .await
    }

    async fn title(&self) -> ClaimResult<String> {
        self.bounded("document title", async {
            let doc: DocumentState = self.eval(script::document_state().to_string()).await?;
            Ok(doc.title)
        })
        .await
    }

    async fn attribute(&self, selector: &Selector, name: &str) -> ClaimResult<Option<String>> {
        let what = format!("attribute {name} of {selector}");
        self.bounded(what, self.value_of(selector, script::attribute(selector, name)))
            .await
    }

    async fn text_content(&self, selector: &Selector) -> ClaimResult<String> {
        let what = format!("text of {selector}");
        let text = self
            .bounded(what, self.value_of(selector, script::text_content(selector)))
            .await?;
        Ok(text.unwrap_or_default())
    }

    async fn inner_html(&self, selector: &Selector) -> ClaimResult<String> {
        let what = format!("markup of {selector}");
        let html = self
            .bounded(what, self.value_of(selector, script::inner_html(selector)))
            .await?;
        Ok(html.unwrap_or_default())
    }

    async fn mutate(&self, selector: &Selector, mutations: &[ElementMutation]) -> ClaimResult<()> {
        self.bounded(format!("update of {selector}"), async {
            let updated: Found = self.eval(script::mutate(selector, mutations)).await?;
            if !updated.found {
                return Err(ClaimError::ElementNotFound(selector.to_string()));
            }
            Ok(())
        })
        .await
    }

    async fn snapshot(&self, path: &Path) -> ClaimResult<()> {
        self.bounded(format!("snapshot to {}", path.display()), async {
            self.page
                .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
                .await
                .map_err(portal_error)?;
            Ok(())
        })
        .await
    }

    async fn close(self: Box<Self>) -> ClaimResult<()> {
        let Some(events) = self.events else {
            let _ = self.page.close().await;
            return Ok(());
        };
        let mut browser = self.browser.lock().await;
        let closed = tokio::time::timeout(self.timeout, async {
            browser.close().await.map_err(portal_error)?;
            browser.wait().await.map_err(portal_error)?;
            Ok::<(), ClaimError>(())
        })
        .await;
        events.abort();
        match closed {
            Ok(result) => result,
            Err(_) => Err(ClaimError::Timeout {
                what: "browser shutdown".to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
