//! Known-URL registry
//!
//! Process-scoped set of listing URLs that were already in the store when the
//! crawl started. Both scanners consult it; whichever meets a known URL first
//! claims it, so the reconciliation step for that URL runs once per run.

use std::collections::HashSet;

use parking_lot::Mutex;

/// Thread-safe set of known listing URLs behind a single lock.
#[derive(Debug, Default)]
pub struct KnownUrlRegistry {
    urls: Mutex<HashSet<String>>,
}

impl KnownUrlRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add URLs to the set. Duplicates collapse.
    pub fn seed<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = self.urls.lock();
        set.extend(urls.into_iter().map(Into::into));
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.urls.lock().contains(url)
    }

    /// Remove a URL; returns whether it was present.
    pub fn remove(&self, url: &str) -> bool {
        self.urls.lock().remove(url)
    }

    /// Atomically check for and remove `url`.
    ///
    /// Returns `true` for exactly one caller per seeded URL, however many
    /// scanners race on it.
    pub fn try_claim(&self, url: &str) -> bool {
        self.urls.lock().remove(url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.lock().is_empty()
    }
}
