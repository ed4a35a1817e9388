//! Listing store
//!
//! The persistence boundary. [`ListingStore`] is the contract the crawl and
//! liveness passes consume; [`SqliteListingStore`] is the bundled backend.
//! [`SharedStore`] wraps any backend with the write-serialization that the
//! scanners and liveness workers share.

pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::error::StoreResult;
use crate::listing::Listing;

pub use sqlite::SqliteListingStore;

/// CRUD over listing records keyed by URL.
///
/// Each operation is individually atomic; callers never need a transaction
/// spanning two calls.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Every stored URL, exited or not.
    async fn list_all_urls(&self) -> StoreResult<Vec<String>>;

    /// URLs whose `date_exited` is still unset.
    async fn list_unexited_urls(&self) -> StoreResult<Vec<String>>;

    async fn exists(&self, url: &str) -> StoreResult<bool>;

    async fn fetch(&self, url: &str) -> StoreResult<Option<Listing>>;

    async fn insert(&self, listing: &Listing) -> StoreResult<()>;

    /// Set `date_exited` if it is unset.
    ///
    /// Returns `true` when this call made the transition, `false` when the
    /// URL is unknown or was already marked.
    async fn mark_exited(&self, url: &str, date: NaiveDate) -> StoreResult<bool>;
}

/// Outcome of a guarded insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyPresent,
}

/// A store shared across scanners and workers, with one lock for all calls.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<dyn ListingStore>,
    lock: Arc<Mutex<()>>,
}

impl SharedStore {
    pub fn new(inner: Arc<dyn ListingStore>) -> Self {
        Self {
            inner,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn list_all_urls(&self) -> StoreResult<Vec<String>> {
        let _guard = self.lock.lock().await;
        self.inner.list_all_urls().await
    }

    pub async fn list_unexited_urls(&self) -> StoreResult<Vec<String>> {
        let _guard = self.lock.lock().await;
        self.inner.list_unexited_urls().await
    }

    pub async fn exists(&self, url: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock().await;
        self.inner.exists(url).await
    }

    pub async fn fetch(&self, url: &str) -> StoreResult<Option<Listing>> {
        let _guard = self.lock.lock().await;
        self.inner.fetch(url).await
    }

    /// Insert unless a record with the same URL exists.
    ///
    /// The existence check and the insert happen under one lock hold, so two
    /// scanners extracting the same new URL write it once.
    pub async fn insert_if_absent(&self, listing: &Listing) -> StoreResult<InsertOutcome> {
        let _guard = self.lock.lock().await;
        if self.inner.exists(&listing.url).await? {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        self.inner.insert(listing).await?;
        Ok(InsertOutcome::Inserted)
    }

    pub async fn mark_exited(&self, url: &str, date: NaiveDate) -> StoreResult<bool> {
        let _guard = self.lock.lock().await;
        self.inner.mark_exited(url, date).await
    }
}

impl std::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStore").finish_non_exhaustive()
    }
}
