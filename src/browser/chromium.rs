//! chromiumoxide backend for [`BrowserSession`].
//!
//! One [`ChromiumSession`] owns one Chromium process, its CDP handler task
//! and a private profile directory. Every CDP call is bounded by the
//! configured page-load timeout.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::setup::{LaunchOptions, launch_browser, resolve_executable};
use super::{
    BrowserSession, Locator, SessionLauncher, TabHandle, WaitCondition, settle_or_discard,
    with_page_timeout,
};
use crate::config::{BrowserBackend, HarvestConfig};
use crate::error::BrowserError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

const VISIBLE_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    const s = window.getComputedStyle(this); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }";

const CLICKABLE_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    const s = window.getComputedStyle(this); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none' \
        && !this.disabled && s.pointerEvents !== 'none'; }";

// Script click; a synthesized mouse click misses controls under overlays
const CLICK_JS: &str = "function() { this.click(); }";

fn protocol(e: CdpError) -> BrowserError {
    BrowserError::Protocol(e.to_string())
}

/// Lookup result where "no such node" is absence.
fn optional<T>(result: Result<T, CdpError>) -> Result<Option<T>, BrowserError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CdpError::NotFound | CdpError::Chrome(_)) => Ok(None),
        Err(e) => Err(protocol(e)),
    }
}

/// Failure of an operation on an element that must still be attached.
fn required(e: CdpError, what: &str) -> BrowserError {
    match e {
        CdpError::NotFound => BrowserError::NotFound(format!("{what} detached from the page")),
        e => protocol(e),
    }
}

fn many<T>(result: Result<Vec<T>, CdpError>) -> Result<Vec<T>, BrowserError> {
    optional(result).map(Option::unwrap_or_default)
}

/// A live Chromium instance.
pub struct ChromiumSession {
    label: String,
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    user_data_dir: Option<PathBuf>,
    tabs: Vec<(TabHandle, Page)>,
    primary: TabHandle,
    active: TabHandle,
    next_tab: u64,
    call_timeout: Duration,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, BrowserError> {
        self.tabs
            .iter()
            .find(|(handle, _)| *handle == self.active)
            .map(|(_, page)| page)
            .ok_or(BrowserError::UnknownTab(self.active.0))
    }

    async fn evaluate_bool(&self, element: &Element, script: &str) -> Result<bool, BrowserError> {
        let returns = with_page_timeout(
            async { element.call_js_fn(script, false).await.map_err(protocol) },
            self.call_timeout,
            "Element check",
        )
        .await?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn satisfies(&self, element: &Element, condition: &WaitCondition) -> bool {
        let script = match condition {
            WaitCondition::Present(_) => return true,
            WaitCondition::Visible(_) => VISIBLE_JS,
            WaitCondition::Clickable(_) => CLICKABLE_JS,
        };
        match self.evaluate_bool(element, script).await {
            Ok(ok) => ok,
            Err(e) => {
                trace!("[{}] readiness check failed: {e}", self.label);
                false
            }
        }
    }

    fn cleanup_profile_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take()
            && let Err(e) = std::fs::remove_dir_all(&path)
        {
            warn!(
                "[{}] Failed to clean up profile directory {}: {e}",
                self.label,
                path.display()
            );
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    type Element = Element;

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let page = self.page()?;
        let (label, call_timeout) = (self.label.as_str(), self.call_timeout);
        let navigation_error = |e: CdpError| BrowserError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        };
        with_page_timeout(
            async {
                page.goto(url).await.map_err(navigation_error)?;
                page.wait_for_navigation().await.map_err(navigation_error)?;
                Ok(())
            },
            self.call_timeout,
            "Page navigation",
        )
        .await
    }

    async fn find_element(&self, locator: &Locator) -> Result<Option<Element>, BrowserError> {
        let page = self.page()?;
        with_page_timeout(
            async {
                match locator {
                    Locator::Css(q) => optional(page.find_element(q.as_str()).await),
                    Locator::XPath(q) => optional(page.find_xpath(q.as_str()).await),
                }
            },
            self.call_timeout,
            "Element lookup",
        )
        .await
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Element>, BrowserError> {
        let page = self.page()?;
        with_page_timeout(
            async {
                match locator {
                    Locator::Css(q) => many(page.find_elements(q.as_str()).await),
                    Locator::XPath(q) => many(page.find_xpaths(q.as_str()).await),
                }
            },
            self.call_timeout,
            "Element lookup",
        )
        .await
    }

    async fn find_within(
        &self,
        parent: &Element,
        locator: &Locator,
    ) -> Result<Option<Element>, BrowserError> {
        let Locator::Css(q) = locator else {
            return Err(BrowserError::Protocol(format!(
                "element-scoped lookup needs a CSS locator, got {locator}"
            )));
        };
        with_page_timeout(
            async { optional(parent.find_element(q.as_str()).await) },
            self.call_timeout,
            "Element lookup",
        )
        .await
    }

    async fn find_all_within(
        &self,
        parent: &Element,
        locator: &Locator,
    ) -> Result<Vec<Element>, BrowserError> {
        let Locator::Css(q) = locator else {
            return Err(BrowserError::Protocol(format!(
                "element-scoped lookup needs a CSS locator, got {locator}"
            )));
        };
        with_page_timeout(
            async { many(parent.find_elements(q.as_str()).await) },
            self.call_timeout,
            "Element lookup",
        )
        .await
    }

    async fn wait_until(
        &self,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> Result<Element, BrowserError> {
        let poll = async {
            loop {
                match self.find_element(condition.locator()).await {
                    Ok(Some(element)) => {
                        if self.satisfies(&element, condition).await {
                            return element;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => trace!("[{}] poll for {condition} failed: {e}", self.label),
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| BrowserError::timeout(format!("Wait for {condition}"), timeout))
    }

    async fn click(&self, element: &Element) -> Result<(), BrowserError> {
        with_page_timeout(
            async {
                element
                    .call_js_fn(CLICK_JS, false)
                    .await
                    .map_err(|e| required(e, "click target"))?;
                Ok(())
            },
            self.call_timeout,
            "Click",
        )
        .await
    }

    async fn read_text(&self, element: &Element) -> Result<Option<String>, BrowserError> {
        with_page_timeout(
            async { element.inner_text().await.map_err(protocol) },
            self.call_timeout,
            "Read text",
        )
        .await
    }

    async fn read_attribute(
        &self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        with_page_timeout(
            async { element.attribute(name).await.map_err(protocol) },
            self.call_timeout,
            "Read attribute",
        )
        .await
    }

    async fn current_url(&self) -> Result<Option<String>, BrowserError> {
        let page = self.page()?;
        with_page_timeout(
            async { page.url().await.map_err(protocol) },
            self.call_timeout,
            "Read URL",
        )
        .await
    }

    fn primary_tab(&self) -> TabHandle {
        self.primary
    }

    async fn new_tab(&mut self, url: &str) -> Result<TabHandle, BrowserError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| BrowserError::Protocol("session already quit".into()))?;
        let (label, call_timeout) = (self.label.as_str(), self.call_timeout);
        let navigation_error = |e: CdpError| BrowserError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        };
        let page = with_page_timeout(
            async { browser.new_page(url).await.map_err(navigation_error) },
            call_timeout,
            "Open tab",
        )
        .await?;
        let loading = page.clone();
        let page = settle_or_discard(
            page,
            with_page_timeout(
                async move {
                    loading
                        .wait_for_navigation()
                        .await
                        .map(|_| ())
                        .map_err(navigation_error)
                },
                call_timeout,
                "Tab navigation",
            ),
            move |page| async move {
                let closed = with_page_timeout(
                    async { page.close().await.map_err(protocol) },
                    call_timeout,
                    "Close tab",
                )
                .await;
                if let Err(e) = closed {
                    warn!("[{label}] Failed to close unfinished tab {url}: {e}");
                }
            },
        )
        .await?;

        let handle = TabHandle(self.next_tab);
        self.next_tab += 1;
        self.tabs.push((handle, page));
        Ok(handle)
    }

    async fn switch_tab(&mut self, tab: TabHandle) -> Result<(), BrowserError> {
        let page = self
            .tabs
            .iter()
            .find(|(handle, _)| *handle == tab)
            .map(|(_, page)| page)
            .ok_or(BrowserError::UnknownTab(tab.0))?;
        with_page_timeout(
            async {
                page.bring_to_front().await.map_err(protocol)?;
                Ok(())
            },
            self.call_timeout,
            "Switch tab",
        )
        .await?;
        self.active = tab;
        Ok(())
    }

    async fn close_tab(&mut self) -> Result<(), BrowserError> {
        if self.active == self.primary {
            return Err(BrowserError::Protocol("refusing to close the primary tab".into()));
        }
        let index = self
            .tabs
            .iter()
            .position(|(handle, _)| *handle == self.active)
            .ok_or(BrowserError::UnknownTab(self.active.0))?;
        let (_, page) = self.tabs.swap_remove(index);
        self.active = self.primary;

        with_page_timeout(
            async { page.close().await.map_err(protocol) },
            self.call_timeout,
            "Close tab",
        )
        .await
    }

    async fn quit(&mut self) -> Result<(), BrowserError> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };
        self.tabs.clear();

        debug!("[{}] Closing browser", self.label);
        match tokio::time::timeout(self.call_timeout, browser.close()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("[{}] Failed to close browser: {e}", self.label),
            Err(_) => warn!("[{}] Browser close timed out", self.label),
        }
        // Chrome must release the profile before the directory goes
        if let Err(e) = browser.wait().await {
            warn!("[{}] Failed to wait for browser exit: {e}", self.label);
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        self.cleanup_profile_dir();
        info!("[{}] Browser session closed", self.label);
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        if self.browser.is_some() {
            warn!(
                "[{}] Session dropped without quit - removing profile in Drop",
                self.label
            );
            // Browser::drop kills the child process
            self.browser = None;
            self.cleanup_profile_dir();
        }
    }
}

/// Launches [`ChromiumSession`]s from one resolved executable.
pub struct ChromiumLauncher {
    backend: BrowserBackend,
    headless: bool,
    profile_root: PathBuf,
    call_timeout: Duration,
    executable: OnceCell<PathBuf>,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            backend: config.backend(),
            headless: config.headless(),
            profile_root: config.chrome_data_root(),
            call_timeout: config.page_load_timeout(),
            executable: OnceCell::new(),
        }
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn launch(&self, label: &str) -> Result<ChromiumSession, BrowserError> {
        // Resolved once so concurrent workers never race a managed download
        let executable = self
            .executable
            .get_or_try_init(|| resolve_executable(self.backend))
            .await
            .map_err(|e| BrowserError::Launch(format!("{e:#}")))?;

        let user_data_dir = self
            .profile_root
            .join(format!("{label}_{}", uuid::Uuid::new_v4().simple()));
        let options = LaunchOptions {
            headless: self.headless,
            user_data_dir: user_data_dir.clone(),
            request_timeout: self.call_timeout,
        };

        let (browser, handler) = launch_browser(executable, &options)
            .await
            .map_err(|e| BrowserError::Launch(format!("{e:#}")))?;

        let mut session = ChromiumSession {
            label: label.to_string(),
            browser: Some(browser),
            handler: Some(handler),
            user_data_dir: Some(user_data_dir),
            tabs: Vec::new(),
            primary: TabHandle(0),
            active: TabHandle(0),
            next_tab: 1,
            call_timeout: self.call_timeout,
        };

        let primary = match session.browser.as_ref() {
            Some(browser) => {
                with_page_timeout(
                    async { browser.new_page("about:blank").await.map_err(protocol) },
                    self.call_timeout,
                    "Open tab",
                )
                .await
            }
            None => Err(BrowserError::Launch("browser vanished during launch".into())),
        };
        match primary {
            Ok(page) => session.tabs.push((TabHandle(0), page)),
            Err(e) => {
                let _ = session.quit().await;
                return Err(BrowserError::Launch(e.to_string()));
            }
        }

        info!("[{label}] Browser session ready");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_click_target_is_not_found() {
        let err = required(CdpError::NotFound, "click target");
        assert!(matches!(err, BrowserError::NotFound(ref what) if what.contains("click target")));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_other_cdp_failures_stay_protocol_errors() {
        let err = required(CdpError::msg("socket closed"), "click target");
        assert!(matches!(err, BrowserError::Protocol(_)));
    }
}
