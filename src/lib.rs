pub mod browser;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod harvest_state;
pub mod listing;
pub mod liveness;
pub mod normalizer;
pub mod registry;
pub mod scanner;
pub mod store;
pub mod utils;

pub use browser::{
    BrowserSession, ChromiumLauncher, ChromiumSession, Locator, SessionLauncher, TabHandle,
    WaitCondition,
};
pub use config::{BrowserBackend, CatalogSelectors, HarvestConfig};
pub use coordinator::{HarvestReport, harvest_catalog};
pub use error::{BrowserError, ConfigError, ExtractError, HarvestError, NormalizeError, StoreError};
pub use extractor::{ExtractedListing, ListingExtractor, ListingField, RawListing};
pub use harvest_state::{CancelReason, ConvergenceCursors, HarvestState, ScanDirection};
pub use listing::Listing;
pub use liveness::{LivenessPool, LivenessReport};
pub use registry::KnownUrlRegistry;
pub use scanner::{CrawlScanner, ScanReport, ScanStats, Termination};
pub use store::{InsertOutcome, ListingStore, SharedStore, SqliteListingStore};
