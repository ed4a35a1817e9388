//! Core configuration types for a harvest run
//!
//! `HarvestConfig` carries everything the scanners and liveness workers need
//! to know about the target site and the browser: selectors, wait bounds,
//! pool size and launch options.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::browser::Locator;
use crate::error::ConfigError;
use crate::utils::{
    DEFAULT_BASE_URL, DEFAULT_ELEMENT_TIMEOUT_SECS, DEFAULT_LIVENESS_TIMEOUT_SECS,
    DEFAULT_LIVENESS_WORKERS, DEFAULT_PAGE_LOAD_TIMEOUT_SECS, DEFAULT_PAGINATION_TIMEOUT_SECS,
    DEFAULT_SEARCH_TIMEOUT_SECS,
};

/// Where the Chromium executable comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserBackend {
    /// System install if one is found, otherwise a managed download.
    #[default]
    Auto,
    /// System install only.
    System,
    /// Always the managed download.
    Managed,
}

impl FromStr for BrowserBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "system" => Ok(Self::System),
            "managed" => Ok(Self::Managed),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BrowserBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::System => "system",
            Self::Managed => "managed",
        })
    }
}

/// Every element locator the crawl depends on.
///
/// Defaults match the live catalog's markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSelectors {
    /// Link from the landing page into the used-cars section.
    pub used_cars_link: Locator,
    /// Submit button of the used-cars search form.
    pub search_button: Locator,
    /// `<option>`s of the brand dropdown on the search form.
    pub brand_options: Locator,
    /// One listing card on a catalog page. The last card is a trailer.
    pub card: Locator,
    /// Link inside a card; CSS, scoped to the card.
    pub card_link: Locator,
    pub next_page: Locator,
    pub previous_page: Locator,
    pub last_page: Locator,
    /// Pagination item of the page currently shown.
    pub active_page: Locator,
    /// Listing detail header.
    pub listing_header: Locator,
    /// Heading inside the header; CSS, scoped to the header.
    pub listing_heading: Locator,
    /// Price-bearing headings inside the header; CSS, scoped to the header.
    pub listing_price_headings: Locator,
    /// XPath template for a detail table value; `{label}` is substituted.
    pub field_value_template: String,
}

impl Default for CatalogSelectors {
    fn default() -> Self {
        Self {
            used_cars_link: Locator::xpath("//a[@href='./autosusados']/img"),
            search_button: Locator::xpath("//button[contains(text(), 'BUSCAR')]"),
            brand_options: Locator::css("select[name='brand'] option"),
            card: Locator::css(".card"),
            card_link: Locator::css("a"),
            next_page: Locator::css(".page-item.page-next .page-link"),
            previous_page: Locator::css(".page-item.page-prev .page-link"),
            last_page: Locator::css(".page-item.page-last .page-link"),
            active_page: Locator::css(".page-item.active .page-link"),
            listing_header: Locator::css(".carheader"),
            listing_heading: Locator::css("h1"),
            listing_price_headings: Locator::css("h1, h3"),
            field_value_template: "//td[contains(text(), '{label}')]/following-sibling::td"
                .to_string(),
        }
    }
}

impl CatalogSelectors {
    /// Locator of the value cell next to the `label` cell.
    #[must_use]
    pub fn field_value(&self, label: &str) -> Locator {
        Locator::xpath(self.field_value_template.replace("{label}", label))
    }
}

/// Main configuration for a harvest run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub(crate) base_url: String,
    pub(crate) selectors: CatalogSelectors,

    /// Bound on the next/previous control becoming clickable.
    ///
    /// Expiry ends the scan in that direction.
    pub(crate) pagination_timeout_secs: u64,
    pub(crate) element_timeout_secs: u64,
    pub(crate) search_timeout_secs: u64,
    /// Bound on every single browser call, navigation included.
    pub(crate) page_load_timeout_secs: u64,
    pub(crate) liveness_timeout_secs: u64,

    pub(crate) liveness_workers: usize,
    /// Element whose presence proves a listing page is still live.
    pub(crate) liveness_marker: Locator,

    pub(crate) headless: bool,
    pub(crate) backend: BrowserBackend,
    /// Parent of the per-session Chrome profile directories.
    pub(crate) chrome_data_root: Option<PathBuf>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            selectors: CatalogSelectors::default(),
            pagination_timeout_secs: DEFAULT_PAGINATION_TIMEOUT_SECS,
            element_timeout_secs: DEFAULT_ELEMENT_TIMEOUT_SECS,
            search_timeout_secs: DEFAULT_SEARCH_TIMEOUT_SECS,
            page_load_timeout_secs: DEFAULT_PAGE_LOAD_TIMEOUT_SECS,
            liveness_timeout_secs: DEFAULT_LIVENESS_TIMEOUT_SECS,
            liveness_workers: DEFAULT_LIVENESS_WORKERS,
            liveness_marker: Locator::css(".carheader"),
            headless: true,
            backend: BrowserBackend::Auto,
            chrome_data_root: None,
        }
    }
}
