//! Test doubles for the harvester test suite
//!
//! [`MockSite`] is a scripted catalog: numbered result pages of listing cards
//! plus one trailer card each, and the listing pages behind them.
//! [`MockSession`] answers the default `CatalogSelectors` against it, and
//! [`MemoryListingStore`] stands in for SQLite.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use listing_harvest::error::{StoreError, StoreResult};
use listing_harvest::{
    BrowserError, BrowserSession, CatalogSelectors, HarvestConfig, Listing, ListingStore, Locator,
    ScanDirection, SessionLauncher, SharedStore, TabHandle, WaitCondition,
};

pub const ORIGIN: &str = "https://catalog.test";
const TRAILER_HREF: &str = "/autosusados/promocion";

pub fn base_url() -> String {
    format!("{ORIGIN}/")
}

pub fn listing_url(page: usize, index: usize) -> String {
    format!("{ORIGIN}/autosusados/detalle/{page}-{index}")
}

/// Config pointed at the mock site with short waits.
pub fn test_config(workers: usize) -> Arc<HarvestConfig> {
    Arc::new(
        HarvestConfig::builder()
            .base_url(base_url())
            .pagination_timeout_secs(1)
            .element_timeout_secs(1)
            .search_timeout_secs(1)
            .liveness_timeout_secs(1)
            .liveness_workers(workers)
            .build()
            .expect("valid test config"),
    )
}

/// Contents of one listing detail page.
#[derive(Debug, Clone)]
pub struct MockListing {
    /// Full text of the primary `h1`, possibly several lines.
    pub heading: String,
    /// `h1`/`h3` texts inside the header, the `h1` included.
    pub header_texts: Vec<String>,
    /// Detail rows as (label, value cell).
    pub fields: Vec<(&'static str, String)>,
}

impl MockListing {
    pub fn volvo() -> Self {
        let h1 = "Volvo S60 2012\n¢7,500,000".to_string();
        Self {
            heading: h1.clone(),
            header_texts: vec![h1, "($ 14,395)*".into()],
            fields: vec![
                ("Cilindrada", "2000 cc".into()),
                ("# de pasajeros", "5".into()),
                ("Kilometraje", "98,000 kms".into()),
                ("# de puertas", "4".into()),
                ("Fecha de ingreso", "3 de julio del 2024".into()),
            ],
        }
    }

    pub fn mercedes() -> Self {
        let h1 = "Mercedes Benz B200 2013\n¢8,075,500".to_string();
        Self {
            heading: h1.clone(),
            header_texts: vec![h1, "($ 15,500)*".into()],
            fields: vec![
                ("Cilindrada", "1600 cc".into()),
                ("# de pasajeros", "5".into()),
                ("Kilometraje", "93,000 kms".into()),
                ("# de puertas", "4".into()),
                ("Fecha de ingreso", "1 de agosto del 2024".into()),
                ("Ya pagó impuestos", "SI".into()),
            ],
        }
    }
}

/// What the mock site recorded.
#[derive(Debug, Default, Clone)]
pub struct SiteLog {
    /// (session label, page) for every read of a page's cards.
    pub card_reads: Vec<(String, usize)>,
    /// Listing URLs opened in detail tabs.
    pub tabs_opened: Vec<String>,
    pub navigations: Vec<String>,
    pub quits: Vec<String>,
    /// Detail tabs still open when their session quit.
    pub leaked_tabs: usize,
    /// Length of `card_reads` when a scripted control failure fired.
    pub failed_after_reads: Option<usize>,
}

pub struct MockSite {
    selectors: CatalogSelectors,
    brands: Vec<String>,
    pages: Vec<Vec<String>>,
    listings: HashMap<String, MockListing>,
    broken: HashSet<String>,
    failing_controls: HashMap<(ScanDirection, usize), BrowserError>,
    brand_dropdown: bool,
    log: Mutex<SiteLog>,
}

impl MockSite {
    /// A catalog with the given result pages of absolute listing URLs.
    pub fn new(pages: Vec<Vec<String>>) -> Self {
        Self {
            selectors: CatalogSelectors::default(),
            brands: vec!["Volvo".into(), "Mercedes".into(), "Toyota".into()],
            pages,
            listings: HashMap::new(),
            broken: HashSet::new(),
            failing_controls: HashMap::new(),
            brand_dropdown: true,
            log: Mutex::new(SiteLog::default()),
        }
    }

    /// `total` pages of `per_page` listings; every listing has a Volvo page.
    pub fn catalog(total: usize, per_page: usize) -> Self {
        let pages: Vec<Vec<String>> = (1..=total)
            .map(|p| (0..per_page).map(|i| listing_url(p, i)).collect())
            .collect();
        let mut site = Self::new(pages.clone());
        for url in pages.into_iter().flatten() {
            site.listings.insert(url, MockListing::volvo());
        }
        site
    }

    pub fn with_listing(mut self, url: impl Into<String>, listing: MockListing) -> Self {
        self.listings.insert(url.into(), listing);
        self
    }

    /// Remove a listing page; the URL then renders as a not-found page.
    pub fn without_listing(mut self, url: &str) -> Self {
        self.listings.remove(url);
        self
    }

    /// Navigation to `url` fails outright.
    pub fn with_broken(mut self, url: impl Into<String>) -> Self {
        self.broken.insert(url.into());
        self
    }

    /// Clicking the pagination control for `direction` on `page` fails.
    pub fn with_failing_control(
        mut self,
        direction: ScanDirection,
        page: usize,
        error: BrowserError,
    ) -> Self {
        self.failing_controls.insert((direction, page), error);
        self
    }

    /// The search form renders without its brand dropdown.
    pub fn without_brand_dropdown(mut self) -> Self {
        self.brand_dropdown = false;
        self
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn all_urls(&self) -> Vec<String> {
        self.pages.iter().flatten().cloned().collect()
    }

    pub fn log(&self) -> SiteLog {
        self.log.lock().clone()
    }

    fn view_for(&self, url: &str) -> View {
        if url == base_url() {
            View::Home
        } else if self.listings.contains_key(url) {
            View::Listing(url.to_string())
        } else {
            View::Missing(url.to_string())
        }
    }

    fn brand_options(&self) -> Vec<(String, String)> {
        let mut options = vec![
            ("00".to_string(), "Todas las marcas".to_string()),
            (String::new(), " ".to_string()),
        ];
        options.extend(
            self.brands
                .iter()
                .enumerate()
                .map(|(i, b)| ((i + 1).to_string(), format!(" {b} "))),
        );
        options
    }

    fn query(&self, view: &View, locator: &Locator) -> Vec<MockElement> {
        let sel = &self.selectors;
        let total = self.total_pages();
        match view {
            View::Home if *locator == sel.used_cars_link => vec![MockElement::UsedCarsLink],
            View::SearchForm if *locator == sel.search_button => vec![MockElement::SearchButton],
            View::SearchForm if *locator == sel.brand_options && self.brand_dropdown => {
                (0..self.brand_options().len())
                    .map(MockElement::BrandOption)
                    .collect()
            }
            View::Catalog(p) => {
                let p = *p;
                if *locator == sel.card {
                    (0..=self.pages[p - 1].len())
                        .map(|i| MockElement::Card(p, i))
                        .collect()
                } else if *locator == sel.next_page && p < total {
                    vec![MockElement::NextPage]
                } else if *locator == sel.previous_page && p > 1 {
                    vec![MockElement::PreviousPage]
                } else if *locator == sel.last_page && p < total {
                    vec![MockElement::LastPage]
                } else if *locator == sel.active_page {
                    vec![MockElement::ActivePage(p)]
                } else {
                    Vec::new()
                }
            }
            View::Listing(url) => {
                if *locator == sel.listing_header {
                    return vec![MockElement::Header(url.clone())];
                }
                self.listings[url]
                    .fields
                    .iter()
                    .enumerate()
                    .filter(|(_, (label, _))| sel.field_value(label) == *locator)
                    .map(|(i, _)| MockElement::FieldCell(url.clone(), i))
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    fn query_within(&self, parent: &MockElement, locator: &Locator) -> Vec<MockElement> {
        let sel = &self.selectors;
        match parent {
            MockElement::Card(p, i) if *locator == sel.card_link => {
                vec![MockElement::CardLink(*p, *i)]
            }
            MockElement::Header(url) if *locator == sel.listing_heading => {
                vec![MockElement::Heading(url.clone())]
            }
            MockElement::Header(url) if *locator == sel.listing_price_headings => {
                let count = self.listings[url].header_texts.len();
                (0..count)
                    .map(|i| MockElement::HeaderText(url.clone(), i))
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    fn text(&self, element: &MockElement) -> Option<String> {
        match element {
            MockElement::BrandOption(i) => Some(self.brand_options()[*i].1.clone()),
            MockElement::ActivePage(p) => Some(format!(" {p} ")),
            MockElement::Heading(url) => Some(self.listings[url].heading.clone()),
            MockElement::HeaderText(url, i) => Some(self.listings[url].header_texts[*i].clone()),
            MockElement::FieldCell(url, i) => Some(self.listings[url].fields[*i].1.clone()),
            _ => Some(String::new()),
        }
    }

    fn attribute(&self, element: &MockElement, name: &str) -> Option<String> {
        match (element, name) {
            (MockElement::BrandOption(i), "value") => Some(self.brand_options()[*i].0.clone()),
            (MockElement::CardLink(p, i), "href") => match self.pages[p - 1].get(*i) {
                Some(url) => Some(url.strip_prefix(ORIGIN).unwrap_or(url).to_string()),
                None => Some(TRAILER_HREF.to_string()),
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum View {
    Blank,
    Home,
    SearchForm,
    Catalog(usize),
    Listing(String),
    Missing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockElement {
    UsedCarsLink,
    SearchButton,
    BrandOption(usize),
    Card(usize, usize),
    CardLink(usize, usize),
    NextPage,
    PreviousPage,
    LastPage,
    ActivePage(usize),
    Header(String),
    Heading(String),
    HeaderText(String, usize),
    FieldCell(String, usize),
}

#[derive(Debug)]
struct Tabs {
    views: Vec<(TabHandle, View)>,
    active: TabHandle,
    next: u64,
    quit: bool,
}

impl Tabs {
    fn active_view(&self) -> View {
        self.views
            .iter()
            .find(|(h, _)| *h == self.active)
            .map(|(_, v)| v.clone())
            .unwrap_or(View::Blank)
    }

    fn set_active_view(&mut self, view: View) {
        let active = self.active;
        if let Some((_, v)) = self.views.iter_mut().find(|(h, _)| *h == active) {
            *v = view;
        }
    }
}

pub struct MockSession {
    label: String,
    site: Arc<MockSite>,
    tabs: Mutex<Tabs>,
}

impl MockSession {
    pub fn new(label: &str, site: Arc<MockSite>) -> Self {
        Self {
            label: label.to_string(),
            site,
            tabs: Mutex::new(Tabs {
                views: vec![(TabHandle(0), View::Blank)],
                active: TabHandle(0),
                next: 1,
                quit: false,
            }),
        }
    }

    fn active_view(&self) -> View {
        self.tabs.lock().active_view()
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    type Element = MockElement;

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.site.log.lock().navigations.push(url.to_string());
        if self.site.broken.contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_RESET".into(),
            });
        }
        let view = self.site.view_for(url);
        self.tabs.lock().set_active_view(view);
        Ok(())
    }

    async fn find_element(&self, locator: &Locator) -> Result<Option<MockElement>, BrowserError> {
        Ok(self.site.query(&self.active_view(), locator).into_iter().next())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<MockElement>, BrowserError> {
        let view = self.active_view();
        if let View::Catalog(p) = view
            && *locator == self.site.selectors.card
        {
            self.site.log.lock().card_reads.push((self.label.clone(), p));
        }
        Ok(self.site.query(&view, locator))
    }

    async fn find_within(
        &self,
        parent: &MockElement,
        locator: &Locator,
    ) -> Result<Option<MockElement>, BrowserError> {
        Ok(self.site.query_within(parent, locator).into_iter().next())
    }

    async fn find_all_within(
        &self,
        parent: &MockElement,
        locator: &Locator,
    ) -> Result<Vec<MockElement>, BrowserError> {
        Ok(self.site.query_within(parent, locator))
    }

    async fn wait_until(
        &self,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> Result<MockElement, BrowserError> {
        self.site
            .query(&self.active_view(), condition.locator())
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::timeout(format!("Wait for {condition}"), timeout))
    }

    async fn click(&self, element: &MockElement) -> Result<(), BrowserError> {
        let mut tabs = self.tabs.lock();
        let control = match (element, tabs.active_view()) {
            (MockElement::NextPage, View::Catalog(p)) => Some((ScanDirection::Forward, p)),
            (MockElement::PreviousPage, View::Catalog(p)) => Some((ScanDirection::Backward, p)),
            _ => None,
        };
        if let Some(error) = control.and_then(|c| self.site.failing_controls.get(&c)) {
            let mut log = self.site.log.lock();
            log.failed_after_reads = Some(log.card_reads.len());
            return Err(error.clone());
        }
        let next = match (element, tabs.active_view()) {
            (MockElement::UsedCarsLink, View::Home) => View::SearchForm,
            (MockElement::SearchButton, View::SearchForm) => View::Catalog(1),
            (MockElement::NextPage, View::Catalog(p)) => View::Catalog(p + 1),
            (MockElement::PreviousPage, View::Catalog(p)) => View::Catalog(p - 1),
            (MockElement::LastPage, View::Catalog(_)) => View::Catalog(self.site.total_pages()),
            _ => return Ok(()),
        };
        tabs.set_active_view(next);
        Ok(())
    }

    async fn read_text(&self, element: &MockElement) -> Result<Option<String>, BrowserError> {
        Ok(self.site.text(element))
    }

    async fn read_attribute(
        &self,
        element: &MockElement,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        Ok(self.site.attribute(element, name))
    }

    async fn current_url(&self) -> Result<Option<String>, BrowserError> {
        Ok(match self.active_view() {
            View::Blank => None,
            View::Home => Some(base_url()),
            View::SearchForm => Some(format!("{ORIGIN}/autosusados")),
            View::Catalog(p) => Some(format!("{ORIGIN}/autosusados/resultados?pagina={p}")),
            View::Listing(url) | View::Missing(url) => Some(url),
        })
    }

    fn primary_tab(&self) -> TabHandle {
        TabHandle(0)
    }

    async fn new_tab(&mut self, url: &str) -> Result<TabHandle, BrowserError> {
        self.site.log.lock().tabs_opened.push(url.to_string());
        let view = self.site.view_for(url);
        let mut tabs = self.tabs.lock();
        let handle = TabHandle(tabs.next);
        tabs.next += 1;
        tabs.views.push((handle, view));
        Ok(handle)
    }

    async fn switch_tab(&mut self, tab: TabHandle) -> Result<(), BrowserError> {
        let mut tabs = self.tabs.lock();
        if !tabs.views.iter().any(|(h, _)| *h == tab) {
            return Err(BrowserError::UnknownTab(tab.0));
        }
        tabs.active = tab;
        Ok(())
    }

    async fn close_tab(&mut self) -> Result<(), BrowserError> {
        let mut tabs = self.tabs.lock();
        if tabs.active == TabHandle(0) {
            return Err(BrowserError::Protocol("refusing to close the primary tab".into()));
        }
        let active = tabs.active;
        tabs.views.retain(|(h, _)| *h != active);
        tabs.active = TabHandle(0);
        Ok(())
    }

    async fn quit(&mut self) -> Result<(), BrowserError> {
        let mut tabs = self.tabs.lock();
        if tabs.quit {
            return Ok(());
        }
        tabs.quit = true;
        let mut log = self.site.log.lock();
        log.quits.push(self.label.clone());
        log.leaked_tabs += tabs.views.len().saturating_sub(1);
        Ok(())
    }
}

/// Hands out [`MockSession`]s; labels in `failing` refuse to launch.
pub struct MockLauncher {
    site: Arc<MockSite>,
    failing: HashSet<String>,
    launched: Mutex<Vec<String>>,
}

impl MockLauncher {
    pub fn new(site: Arc<MockSite>) -> Self {
        Self {
            site,
            failing: HashSet::new(),
            launched: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, label: &str) -> Self {
        self.failing.insert(label.to_string());
        self
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().clone()
    }
}

#[async_trait]
impl SessionLauncher for MockLauncher {
    type Session = MockSession;

    async fn launch(&self, label: &str) -> Result<MockSession, BrowserError> {
        if self.failing.contains(label) {
            return Err(BrowserError::Launch(format!("{label}: no display")));
        }
        self.launched.lock().push(label.to_string());
        Ok(MockSession::new(label, Arc::clone(&self.site)))
    }
}

/// In-memory listing store.
#[derive(Default)]
pub struct MemoryListingStore {
    rows: Mutex<BTreeMap<String, Listing>>,
    fail_writes: AtomicBool,
}

impl MemoryListingStore {
    pub fn with_listings(listings: impl IntoIterator<Item = Listing>) -> Self {
        let store = Self::default();
        store
            .rows
            .lock()
            .extend(listings.into_iter().map(|l| (l.url.clone(), l)));
        store
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, url: &str) -> Option<Listing> {
        self.rows.lock().get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Open("store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn list_all_urls(&self) -> StoreResult<Vec<String>> {
        Ok(self.rows.lock().keys().cloned().collect())
    }

    async fn list_unexited_urls(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|l| !l.is_exited())
            .map(|l| l.url.clone())
            .collect())
    }

    async fn exists(&self, url: &str) -> StoreResult<bool> {
        Ok(self.rows.lock().contains_key(url))
    }

    async fn fetch(&self, url: &str) -> StoreResult<Option<Listing>> {
        Ok(self.get(url))
    }

    async fn insert(&self, listing: &Listing) -> StoreResult<()> {
        self.check_writable()?;
        self.rows
            .lock()
            .insert(listing.url.clone(), listing.clone());
        Ok(())
    }

    async fn mark_exited(&self, url: &str, date: NaiveDate) -> StoreResult<bool> {
        self.check_writable()?;
        let mut rows = self.rows.lock();
        match rows.get_mut(url) {
            Some(listing) if listing.date_exited.is_none() => {
                listing.date_exited = Some(date);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Wrap a memory store for the passes, keeping a handle for assertions.
pub fn shared(store: MemoryListingStore) -> (Arc<MemoryListingStore>, SharedStore) {
    let store = Arc::new(store);
    let shared = SharedStore::new(Arc::clone(&store) as Arc<dyn ListingStore>);
    (store, shared)
}
