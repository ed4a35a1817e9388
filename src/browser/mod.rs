//! Browser automation surface
//!
//! Scanners and liveness workers drive a page through [`BrowserSession`]
//! only. [`chromium`] is the shipped backend; tests provide a scripted one.
//!
//! Element absence is a value (`Ok(None)` or an empty `Vec`), not an error.
//! Only expired waits and protocol failures surface as [`BrowserError`].

pub mod chromium;
pub mod setup;
pub mod timeout;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BrowserError;

pub use chromium::{ChromiumLauncher, ChromiumSession};
pub use timeout::{settle_or_discard, with_page_timeout};

/// How to find an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "query", rename_all = "lowercase")]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(query: impl Into<String>) -> Self {
        Self::Css(query.into())
    }

    pub fn xpath(query: impl Into<String>) -> Self {
        Self::XPath(query.into())
    }

    #[must_use]
    pub fn query(&self) -> &str {
        match self {
            Self::Css(q) | Self::XPath(q) => q,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(q) => write!(f, "css:{q}"),
            Self::XPath(q) => write!(f, "xpath:{q}"),
        }
    }
}

/// Readiness a bounded wait polls for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// Attached to the document.
    Present(Locator),
    /// Present and rendered with a non-empty box.
    Visible(Locator),
    /// Visible and not disabled.
    Clickable(Locator),
}

impl WaitCondition {
    #[must_use]
    pub fn locator(&self) -> &Locator {
        match self {
            Self::Present(l) | Self::Visible(l) | Self::Clickable(l) => l,
        }
    }
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(l) => write!(f, "present {l}"),
            Self::Visible(l) => write!(f, "visible {l}"),
            Self::Clickable(l) => write!(f, "clickable {l}"),
        }
    }
}

/// Stable identifier of a tab within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabHandle(pub u64);

/// One independent browser instance with its own tabs.
///
/// Queries run against the active tab. A session is owned by exactly one
/// scanner or worker; it is never shared.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Element: Send + Sync;

    /// Load `url` in the active tab.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    async fn find_element(&self, locator: &Locator)
    -> Result<Option<Self::Element>, BrowserError>;

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Self::Element>, BrowserError>;

    async fn find_within(
        &self,
        parent: &Self::Element,
        locator: &Locator,
    ) -> Result<Option<Self::Element>, BrowserError>;

    async fn find_all_within(
        &self,
        parent: &Self::Element,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>, BrowserError>;

    /// Poll until `condition` holds or `timeout` elapses.
    ///
    /// Expiry is always [`BrowserError::Timeout`].
    async fn wait_until(
        &self,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> Result<Self::Element, BrowserError>;

    async fn click(&self, element: &Self::Element) -> Result<(), BrowserError>;

    async fn read_text(&self, element: &Self::Element) -> Result<Option<String>, BrowserError>;

    async fn read_attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    async fn current_url(&self) -> Result<Option<String>, BrowserError>;

    /// The tab the session started with.
    fn primary_tab(&self) -> TabHandle;

    /// Open `url` in a new tab. The active tab does not change.
    async fn new_tab(&mut self, url: &str) -> Result<TabHandle, BrowserError>;

    async fn switch_tab(&mut self, tab: TabHandle) -> Result<(), BrowserError>;

    /// Close the active tab and make the primary tab active.
    ///
    /// Closing the primary tab is refused.
    async fn close_tab(&mut self) -> Result<(), BrowserError>;

    /// Release the browser. Idempotent.
    async fn quit(&mut self) -> Result<(), BrowserError>;
}

/// Creates independent sessions, one per scanner or worker.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: BrowserSession + 'static;

    /// `label` names the session in logs and in its profile directory.
    async fn launch(&self, label: &str) -> Result<Self::Session, BrowserError>;
}
