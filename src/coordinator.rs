//! Convergence coordinator
//!
//! Runs one harvest pass: seeds the known-URL registry from the store, reads
//! the brand list once, then launches a forward and a backward scanner that
//! meet in the middle of the catalog.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::browser::{BrowserSession, SessionLauncher, WaitCondition};
use crate::config::HarvestConfig;
use crate::error::{BrowserError, HarvestError};
use crate::extractor::{ListingExtractor, capture_brand_tokens};
use crate::harvest_state::{CancelReason, HarvestState, ScanDirection};
use crate::scanner::{CrawlScanner, ScanReport, open_search_form};
use crate::store::SharedStore;

/// Outcome of one harvest pass.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub forward: ScanReport,
    /// `None` when the backward session could not be launched.
    pub backward: Option<ScanReport>,
    pub brands: Vec<String>,
    /// Known URLs seeded into the registry at start.
    pub known_urls: usize,
    /// Known URLs no scanner saw during the pass.
    pub unclaimed_urls: usize,
    pub cancel_reason: Option<CancelReason>,
}

impl HarvestReport {
    #[must_use]
    pub fn inserted(&self) -> usize {
        self.scans().map(|r| r.stats.inserted).sum()
    }

    #[must_use]
    pub fn marked_exited(&self) -> usize {
        self.scans().map(|r| r.stats.marked_exited).sum()
    }

    /// Pages processed by both scanners together.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.scans().map(|r| r.stats.pages.len()).sum()
    }

    pub fn scans(&self) -> impl Iterator<Item = &ScanReport> {
        std::iter::once(&self.forward).chain(self.backward.as_ref())
    }
}

async fn join_scanner(
    direction: ScanDirection,
    handle: JoinHandle<ScanReport>,
    state: &HarvestState,
) -> ScanReport {
    match handle.await {
        Ok(report) => report,
        Err(e) => {
            let message = format!("scanner task aborted: {e}");
            warn!(%direction, "{message}");
            state
                .cancel
                .raise(CancelReason::Failed(direction, message.clone()));
            ScanReport::lost(direction, message)
        }
    }
}

/// Run the forward and backward scanners to convergence.
///
/// Only failing to start the forward scanner is an error. A backward session
/// that will not launch leaves the forward scanner to cover the catalog alone.
pub async fn harvest_catalog<L: SessionLauncher>(
    launcher: &L,
    store: SharedStore,
    config: Arc<HarvestConfig>,
) -> Result<HarvestReport, HarvestError> {
    let state = HarvestState::new(store);

    match state.store.list_all_urls().await {
        Ok(urls) => state.registry.seed(urls),
        Err(e) => warn!(error = %e, "Could not read known URLs; every link is treated as new"),
    }
    let known_urls = state.registry.len();
    info!(known_urls, "Seeded known-URL registry");

    let mut forward_session = launcher
        .launch("forward")
        .await
        .map_err(HarvestError::SessionLaunch)?;

    let brands = match read_brands(&mut forward_session, &config).await {
        Ok(brands) => brands,
        Err(e) => {
            if let Err(quit_err) = forward_session.quit().await {
                warn!(error = %quit_err, "Failed to quit forward session");
            }
            return Err(HarvestError::CatalogEntry(e));
        }
    };
    info!(count = brands.len(), "Captured brand tokens");
    let brands: Arc<[String]> = brands.into();
    let extractor = ListingExtractor::new(config.selectors().clone(), Arc::clone(&brands));

    let backward_session = match launcher.launch("backward").await {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(error = %e, "Backward session failed to launch; scanning forward only");
            None
        }
    };

    let forward = tokio::spawn(
        CrawlScanner::new(
            ScanDirection::Forward,
            forward_session,
            Arc::clone(&state),
            Arc::clone(&config),
            extractor.clone(),
        )
        .run(),
    );
    let backward = backward_session.map(|session| {
        tokio::spawn(
            CrawlScanner::new(
                ScanDirection::Backward,
                session,
                Arc::clone(&state),
                Arc::clone(&config),
                extractor,
            )
            .run(),
        )
    });

    let forward = join_scanner(ScanDirection::Forward, forward, &state).await;
    let backward = match backward {
        Some(handle) => Some(join_scanner(ScanDirection::Backward, handle, &state).await),
        None => None,
    };

    let report = HarvestReport {
        forward,
        backward,
        brands: brands.to_vec(),
        known_urls,
        unclaimed_urls: state.registry.len(),
        cancel_reason: state.cancel.reason(),
    };
    info!(
        pages = report.pages(),
        inserted = report.inserted(),
        marked_exited = report.marked_exited(),
        unclaimed = report.unclaimed_urls,
        "Harvest pass finished"
    );
    Ok(report)
}

async fn read_brands<S: BrowserSession>(
    session: &mut S,
    config: &HarvestConfig,
) -> Result<Vec<String>, BrowserError> {
    open_search_form(session, config).await?;
    // The dropdown is filled after the form renders
    session
        .wait_until(
            &WaitCondition::Present(config.selectors().brand_options.clone()),
            config.element_timeout(),
        )
        .await?;
    capture_brand_tokens(session, config.selectors()).await
}
