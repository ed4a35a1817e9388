//! Error taxonomy for the harvester.
//!
//! Each layer owns an error type. Only `HarvestError` can stop a pass, and only
//! while the first browser session is being set up; every other error is
//! recovered at the listing, page, scanner or worker level that produced it.

use std::time::Duration;

/// Browser automation failures.
///
/// Element absence is not an error (lookups return `Option`); `NotFound` is
/// reserved for operations that require an element to exist, such as
/// clicking a control located by a previous wait.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrowserError {
    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("{what} timeout after {}s", .after.as_secs())]
    Timeout { what: String, after: Duration },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser protocol error: {0}")]
    Protocol(String),

    #[error("Failed to launch browser session: {0}")]
    Launch(String),

    #[error("Unknown tab handle {0}")]
    UnknownTab(u64),
}

impl BrowserError {
    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            after,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Listing store failures. Always non-fatal to a pass.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record for {url}: {message}")]
    Corrupt { url: String, message: String },

    #[error("Failed to open store: {0}")]
    Open(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Single-listing extraction failure. The scanner skips the listing.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Page is not a listing: {0}")]
    UnrecognizedPage(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Reason a raw field value could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("empty value")]
    Empty,

    #[error("no distance unit in {0:?}")]
    MissingUnit(String),

    #[error("invalid number in {0:?}")]
    InvalidNumber(String),

    #[error("unknown month {0:?}")]
    UnknownMonth(String),

    #[error("unrecognized date {0:?}")]
    InvalidDate(String),

    #[error("unrecognized yes/no flag {0:?}")]
    InvalidFlag(String),
}

/// Invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid base URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        max: u64,
        value: u64,
    },

    #[error("Unknown browser backend {0:?} (expected auto, system or managed)")]
    UnknownBackend(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure to set up a harvest pass at all.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("Could not start the forward scanner session: {0}")]
    SessionLaunch(#[source] BrowserError),

    #[error("Could not enter the catalog: {0}")]
    CatalogEntry(#[source] BrowserError),
}
