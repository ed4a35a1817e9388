//! Crawl scanner
//!
//! One scanner walks the catalog in one direction with its own browser
//! session. It claims pages through [`ConvergenceCursors`], reconciles links
//! already in the store and extracts the new ones in a detail tab.
//!
//! Cancellation is consulted before every page fetch, never in the middle of
//! a page: a page a scanner owns is always processed to the end.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::time::Instant;

use crate::browser::{BrowserSession, WaitCondition};
use crate::config::HarvestConfig;
use crate::error::{BrowserError, ExtractError};
use crate::extractor::{ExtractedListing, ListingExtractor};
use crate::harvest_state::{Advance, CancelReason, HarvestState, ScanDirection};
use crate::store::InsertOutcome;
use crate::utils::today;

const CARD_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Navigate to the used-cars search form.
pub async fn open_search_form<S: BrowserSession>(
    session: &mut S,
    config: &HarvestConfig,
) -> Result<(), BrowserError> {
    let selectors = config.selectors();
    session.navigate(config.base_url()).await?;
    let link = session
        .wait_until(
            &WaitCondition::Clickable(selectors.used_cars_link.clone()),
            config.element_timeout(),
        )
        .await?;
    session.click(&link).await?;
    debug!(
        "Entered used-cars section at {}",
        session.current_url().await?.unwrap_or_default()
    );
    Ok(())
}

/// Press the search button on the form, opening catalog page 1.
pub async fn submit_search<S: BrowserSession>(
    session: &S,
    config: &HarvestConfig,
) -> Result<(), BrowserError> {
    let button = session
        .wait_until(
            &WaitCondition::Clickable(config.selectors().search_button.clone()),
            config.search_timeout(),
        )
        .await?;
    session.click(&button).await
}

/// How a scanner's run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// No page control in this direction within the pagination timeout.
    Exhausted,
    /// The next page already belongs to the other scanner.
    Crossed,
    /// The other scanner raised the cancellation signal.
    Cancelled,
    /// The backward scanner found no pages the forward one does not own.
    NoRoom,
    /// An error escaped the scan loop.
    Failed(String),
}

/// Explicit scan states; see [`CrawlScanner::run`].
#[derive(Debug)]
pub enum ScannerState {
    Navigating,
    ListingPage,
    Extracting(Vec<String>),
    Paginating,
    Terminated(Termination),
}

/// Counters accumulated during one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Catalog pages processed, in order.
    pub pages: Vec<usize>,
    pub links_seen: usize,
    pub inserted: usize,
    /// Known URLs whose exit date this scanner set.
    pub marked_exited: usize,
    /// Known URLs that were already marked.
    pub already_exited: usize,
    /// New URLs the other scanner stored first.
    pub duplicates: usize,
    pub extraction_failures: usize,
    pub field_warnings: usize,
    pub store_failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub direction: ScanDirection,
    pub stats: ScanStats,
    pub termination: Termination,
}

impl ScanReport {
    /// Report for a scanner task that never returned one.
    #[must_use]
    pub fn lost(direction: ScanDirection, message: String) -> Self {
        Self {
            direction,
            stats: ScanStats::default(),
            termination: Termination::Failed(message),
        }
    }
}

/// A single-direction catalog walker.
pub struct CrawlScanner<S: BrowserSession> {
    direction: ScanDirection,
    session: S,
    state: Arc<HarvestState>,
    config: Arc<HarvestConfig>,
    extractor: ListingExtractor,
    page: usize,
    previous_first_link: Option<String>,
    stats: ScanStats,
}

impl<S: BrowserSession> CrawlScanner<S> {
    pub fn new(
        direction: ScanDirection,
        session: S,
        state: Arc<HarvestState>,
        config: Arc<HarvestConfig>,
        extractor: ListingExtractor,
    ) -> Self {
        Self {
            direction,
            session,
            state,
            config,
            extractor,
            page: 1,
            previous_first_link: None,
            stats: ScanStats::default(),
        }
    }

    /// Drive the state machine to termination, then quit the session.
    pub async fn run(mut self) -> ScanReport {
        let direction = self.direction;
        let mut state = ScannerState::Navigating;

        let termination = loop {
            if matches!(state, ScannerState::Navigating | ScannerState::Paginating)
                && self.state.cancel.is_raised()
            {
                state = ScannerState::Terminated(Termination::Cancelled);
            }

            state = match state {
                ScannerState::Navigating => match self.enter_catalog().await {
                    Ok(true) => ScannerState::ListingPage,
                    Ok(false) => ScannerState::Terminated(Termination::NoRoom),
                    Err(e) => self.fail(format!("catalog entry: {e}")),
                },
                ScannerState::ListingPage => match self.collect_links().await {
                    Ok(links) => {
                        info!(
                            "[{direction}] page {}: {} listing links",
                            self.page,
                            links.len()
                        );
                        self.stats.pages.push(self.page);
                        self.stats.links_seen += links.len();
                        ScannerState::Extracting(links)
                    }
                    Err(e) => self.fail(format!("page {}: {e}", self.page)),
                },
                ScannerState::Extracting(links) => {
                    let mut next = ScannerState::Paginating;
                    for link in &links {
                        if let Err(e) = self.process_link(link).await {
                            next = self.fail(format!("page {} at {link}: {e}", self.page));
                            break;
                        }
                    }
                    next
                }
                ScannerState::Paginating => match self.paginate().await {
                    Ok(Advance::Claimed(page)) => {
                        self.page = page;
                        ScannerState::ListingPage
                    }
                    Ok(Advance::Crossed) => {
                        info!("[{direction}] cursors met after page {}", self.page);
                        self.state.cancel.raise(CancelReason::Crossed(direction));
                        ScannerState::Terminated(Termination::Crossed)
                    }
                    Err(e) if e.is_timeout() => {
                        info!("[{direction}] no more pages after page {}", self.page);
                        self.state.cancel.raise(CancelReason::Exhausted(direction));
                        ScannerState::Terminated(Termination::Exhausted)
                    }
                    Err(e) => self.fail(format!("pagination after page {}: {e}", self.page)),
                },
                ScannerState::Terminated(termination) => break termination,
            };
        };

        if let Err(e) = self.session.quit().await {
            warn!("[{direction}] failed to quit browser session: {e}");
        }
        info!(
            "[{direction}] scanner finished ({termination:?}) after {} pages",
            self.stats.pages.len()
        );

        ScanReport {
            direction,
            stats: self.stats,
            termination,
        }
    }

    fn fail(&self, message: String) -> ScannerState {
        error!("[{}] scanner failed: {message}", self.direction);
        self.state
            .cancel
            .raise(CancelReason::Failed(self.direction, message.clone()));
        ScannerState::Terminated(Termination::Failed(message))
    }

    /// Reach the first page of this direction.
    ///
    /// `Ok(false)` means the backward scanner has nothing to claim.
    async fn enter_catalog(&mut self) -> Result<bool, BrowserError> {
        open_search_form(&mut self.session, &self.config).await?;
        submit_search(&self.session, &self.config).await?;

        if self.direction == ScanDirection::Forward {
            self.page = 1;
            return Ok(true);
        }

        let selectors = self.config.selectors();
        let last = match self
            .session
            .wait_until(
                &WaitCondition::Clickable(selectors.last_page.clone()),
                self.config.pagination_timeout(),
            )
            .await
        {
            Ok(control) => control,
            Err(e) if e.is_timeout() => {
                info!("[backward] no last-page control; catalog fits on one page");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        self.session.click(&last).await?;

        let Some(last_page) = self.read_active_page().await? else {
            warn!("[backward] could not read the last page number");
            return Ok(false);
        };
        if !self.state.cursors.begin_backward(last_page) {
            info!(
                "[backward] page {last_page} already reached by the forward scanner (at {})",
                self.state.cursors.forward()
            );
            return Ok(false);
        }
        self.page = last_page;
        Ok(true)
    }

    /// Number shown by the active pagination item once it moves past page 1.
    async fn read_active_page(&self) -> Result<Option<usize>, BrowserError> {
        let locator = &self.config.selectors().active_page;
        let deadline = Instant::now() + self.config.element_timeout();
        let mut number = None;
        loop {
            if let Some(item) = self.session.find_element(locator).await? {
                number = self
                    .session
                    .read_text(&item)
                    .await?
                    .and_then(|text| text.trim().parse::<usize>().ok());
            }
            if number.is_some_and(|n| n > 1) || Instant::now() >= deadline {
                return Ok(number);
            }
            tokio::time::sleep(CARD_POLL_INTERVAL).await;
        }
    }

    async fn card_links(&self) -> Result<Vec<String>, BrowserError> {
        let selectors = self.config.selectors();
        let cards = self.session.find_elements(&selectors.card).await?;
        let base = self.session.current_url().await?;
        let base = base.as_deref().and_then(|u| url::Url::parse(u).ok());

        // The last card on every page is a trailer, not a listing
        let listing_cards = cards.len().saturating_sub(1);
        let mut links = Vec::with_capacity(listing_cards);
        for card in cards.iter().take(listing_cards) {
            let Some(anchor) = self.session.find_within(card, &selectors.card_link).await? else {
                debug!("[{}] card without a link on page {}", self.direction, self.page);
                continue;
            };
            if let Some(href) = self.session.read_attribute(&anchor, "href").await? {
                let resolved = base
                    .as_ref()
                    .and_then(|b| b.join(&href).ok())
                    .map_or(href, String::from);
                links.push(resolved);
            }
        }
        Ok(links)
    }

    /// Links of the current page, once it differs from the previous page.
    async fn collect_links(&mut self) -> Result<Vec<String>, BrowserError> {
        let timeout = self.config.element_timeout();
        match self
            .session
            .wait_until(
                &WaitCondition::Visible(self.config.selectors().card.clone()),
                timeout,
            )
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_timeout() => {
                warn!("[{}] no cards on page {}", self.direction, self.page);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        }

        let deadline = Instant::now() + timeout;
        let links = loop {
            let links = self.card_links().await?;
            let stale = links.first().is_some() && links.first() == self.previous_first_link.as_ref();
            if !stale || Instant::now() >= deadline {
                break links;
            }
            tokio::time::sleep(CARD_POLL_INTERVAL).await;
        };
        self.previous_first_link = links.first().cloned();
        Ok(links)
    }

    /// Reconcile or extract one link.
    ///
    /// Only a broken session is an error; listing-level failures are counted.
    async fn process_link(&mut self, url: &str) -> Result<(), BrowserError> {
        if self.state.registry.try_claim(url) {
            match self.state.store.mark_exited(url, today()).await {
                Ok(true) => {
                    debug!("[{}] marked exited: {url}", self.direction);
                    self.stats.marked_exited += 1;
                }
                Ok(false) => self.stats.already_exited += 1,
                Err(e) => {
                    warn!("[{}] store error marking {url}: {e}", self.direction);
                    self.stats.store_failures += 1;
                }
            }
            return Ok(());
        }

        let extracted = match self.extract_in_tab(url).await? {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("[{}] skipping {url}: {e}", self.direction);
                self.stats.extraction_failures += 1;
                return Ok(());
            }
        };
        self.stats.field_warnings += extracted.warnings.len();

        match self.state.store.insert_if_absent(&extracted.listing).await {
            Ok(InsertOutcome::Inserted) => {
                info!(
                    "[{}] saved {} ({url})",
                    self.direction,
                    extracted.listing.title()
                );
                self.stats.inserted += 1;
            }
            Ok(InsertOutcome::AlreadyPresent) => {
                debug!("[{}] already stored: {url}", self.direction);
                self.stats.duplicates += 1;
            }
            Err(e) => {
                warn!("[{}] store error saving {url}: {e}", self.direction);
                self.stats.store_failures += 1;
            }
        }
        Ok(())
    }

    /// Extract `url` in a detail tab that is closed on every path.
    ///
    /// The outer error means the session could not return to the catalog.
    async fn extract_in_tab(
        &mut self,
        url: &str,
    ) -> Result<Result<ExtractedListing, ExtractError>, BrowserError> {
        let catalog = self.session.primary_tab();
        let tab = match self.session.new_tab(url).await {
            Ok(tab) => tab,
            Err(e) => return Ok(Err(e.into())),
        };

        let extracted = match self.session.switch_tab(tab).await {
            Ok(()) => self.extractor.extract(&self.session, url).await,
            Err(e) => Err(e.into()),
        };

        self.session.switch_tab(tab).await?;
        self.session.close_tab().await?;
        self.session.switch_tab(catalog).await?;
        Ok(extracted)
    }

    async fn paginate(&mut self) -> Result<Advance, BrowserError> {
        let selectors = self.config.selectors();
        let control = match self.direction {
            ScanDirection::Forward => &selectors.next_page,
            ScanDirection::Backward => &selectors.previous_page,
        };
        let element = self
            .session
            .wait_until(
                &WaitCondition::Clickable(control.clone()),
                self.config.pagination_timeout(),
            )
            .await?;
        self.session.click(&element).await?;
        Ok(self.state.cursors.advance(self.direction))
    }
}
