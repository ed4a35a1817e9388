//! Getter methods for `HarvestConfig`

use std::path::PathBuf;
use std::time::Duration;

use crate::browser::Locator;

use super::types::{BrowserBackend, CatalogSelectors, HarvestConfig};

impl HarvestConfig {
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn selectors(&self) -> &CatalogSelectors {
        &self.selectors
    }

    #[must_use]
    pub fn pagination_timeout(&self) -> Duration {
        Duration::from_secs(self.pagination_timeout_secs)
    }

    #[must_use]
    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    /// Bound on the search button; the form is slow to become interactive.
    #[must_use]
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    #[must_use]
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    #[must_use]
    pub fn liveness_workers(&self) -> usize {
        self.liveness_workers
    }

    #[must_use]
    pub fn liveness_marker(&self) -> &Locator {
        &self.liveness_marker
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn backend(&self) -> BrowserBackend {
        self.backend
    }

    /// Parent directory for per-session Chrome profiles.
    ///
    /// Falls back to a directory under the system temp dir.
    #[must_use]
    pub fn chrome_data_root(&self) -> PathBuf {
        self.chrome_data_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("listing_harvest_profiles"))
    }
}
