//! Type-safe builder for `HarvestConfig` using the typestate pattern
//!
//! `build()` only exists once a base URL has been supplied.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::browser::Locator;
use crate::error::ConfigError;
use crate::utils::MAX_LIVENESS_WORKERS;

use super::types::{BrowserBackend, CatalogSelectors, HarvestConfig};

const MAX_TIMEOUT_SECS: u64 = 600;

// Type states for the builder
pub struct WithBaseUrl;

pub struct HarvestConfigBuilder<State = ()> {
    config: HarvestConfig,
    _phantom: PhantomData<State>,
}

impl HarvestConfig {
    /// Create a builder starting from the defaults
    #[must_use]
    pub fn builder() -> HarvestConfigBuilder<()> {
        HarvestConfigBuilder {
            config: HarvestConfig::default(),
            _phantom: PhantomData,
        }
    }

    /// Reopen a finished config for overrides, e.g. from command-line flags
    #[must_use]
    pub fn into_builder(self) -> HarvestConfigBuilder<WithBaseUrl> {
        HarvestConfigBuilder {
            config: self,
            _phantom: PhantomData,
        }
    }

    /// Load a JSON config file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: HarvestConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the base URL and every numeric bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.base_url.clone(),
                message: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }

        for (field, value) in [
            ("pagination_timeout_secs", self.pagination_timeout_secs),
            ("element_timeout_secs", self.element_timeout_secs),
            ("search_timeout_secs", self.search_timeout_secs),
            ("page_load_timeout_secs", self.page_load_timeout_secs),
            ("liveness_timeout_secs", self.liveness_timeout_secs),
        ] {
            check_range(field, value, 1, MAX_TIMEOUT_SECS)?;
        }
        check_range(
            "liveness_workers",
            self.liveness_workers as u64,
            1,
            MAX_LIVENESS_WORKERS as u64,
        )
    }
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            min,
            max,
            value,
        })
    }
}

impl HarvestConfigBuilder<()> {
    pub fn base_url(mut self, url: impl Into<String>) -> HarvestConfigBuilder<WithBaseUrl> {
        self.config.base_url = url.into();
        HarvestConfigBuilder {
            config: self.config,
            _phantom: PhantomData,
        }
    }
}

// Build method only available when the base URL is set
impl HarvestConfigBuilder<WithBaseUrl> {
    pub fn build(self) -> Result<HarvestConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// Optional settings, available at any state
impl<State> HarvestConfigBuilder<State> {
    #[must_use]
    pub fn selectors(mut self, selectors: CatalogSelectors) -> Self {
        self.config.selectors = selectors;
        self
    }

    #[must_use]
    pub fn pagination_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pagination_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn element_timeout_secs(mut self, secs: u64) -> Self {
        self.config.element_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn search_timeout_secs(mut self, secs: u64) -> Self {
        self.config.search_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn page_load_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_load_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn liveness_timeout_secs(mut self, secs: u64) -> Self {
        self.config.liveness_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn liveness_workers(mut self, workers: usize) -> Self {
        self.config.liveness_workers = workers;
        self
    }

    #[must_use]
    pub fn liveness_marker(mut self, marker: Locator) -> Self {
        self.config.liveness_marker = marker;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn backend(mut self, backend: BrowserBackend) -> Self {
        self.config.backend = backend;
        self
    }

    #[must_use]
    pub fn chrome_data_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.chrome_data_root = Some(dir.into());
        self
    }
}
