//! Configuration for harvest runs
//!
//! `HarvestConfig` plus its typestate builder, JSON loading and validation.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::{HarvestConfigBuilder, WithBaseUrl};
pub use types::{BrowserBackend, CatalogSelectors, HarvestConfig};
