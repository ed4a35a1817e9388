//! Shared configuration constants for the harvester
//!
//! Default values and fixed factors used throughout the crate, kept in one
//! place to avoid magic numbers in the crawl and normalization code.

/// Catalog entry point.
pub const DEFAULT_BASE_URL: &str = "https://crautos.com/index.cfm";

/// Wait bound for the next/previous pagination control.
///
/// A control that is not clickable within this window means the scanner has
/// run out of pages in its direction.
pub const DEFAULT_PAGINATION_TIMEOUT_SECS: u64 = 10;

/// Wait bound for catalog cards and other in-page elements.
pub const DEFAULT_ELEMENT_TIMEOUT_SECS: u64 = 10;

/// Wait bound for the search button on the used-cars form.
///
/// The form is script-heavy and slow to become interactive.
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 60;

/// Timeout for a single `navigate` call.
pub const DEFAULT_PAGE_LOAD_TIMEOUT_SECS: u64 = 30;

/// Wait bound for the liveness marker on a revisited listing.
pub const DEFAULT_LIVENESS_TIMEOUT_SECS: u64 = 10;

/// Size of the liveness worker pool in the observed deployment.
pub const DEFAULT_LIVENESS_WORKERS: usize = 4;

/// Upper bound on liveness workers; each one owns a Chromium process.
pub const MAX_LIVENESS_WORKERS: usize = 32;

/// Statute mile to kilometer.
pub const MILE_TO_KM: f64 = 1.60934;

/// Accepted model-year range for heading tokens.
pub const MIN_MODEL_YEAR: u16 = 1900;
pub const MAX_MODEL_YEAR: u16 = 2050;

/// Default SQLite database file.
pub const DEFAULT_DATABASE_FILE: &str = "listings.sqlite";

/// Chrome user agent string passed at launch
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
