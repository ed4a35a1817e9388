//! Listing extraction
//!
//! Reads a rendered listing page into a [`RawListing`] of captured strings,
//! then normalizes those into a [`Listing`]. Reading needs the browser;
//! normalizing is pure and never fails as a whole. A field that does not
//! normalize stays `None` and is reported as a [`FieldWarning`].

pub mod fields;
pub mod heading;
pub mod prices;

use std::sync::Arc;

use log::{debug, warn};

use crate::browser::BrowserSession;
use crate::config::CatalogSelectors;
use crate::error::{BrowserError, ExtractError, NormalizeError};
use crate::listing::Listing;

pub use fields::ListingField;
pub use heading::{HeadingParts, parse_heading};
pub use prices::{Prices, extract_prices};

/// Strings captured from one listing page, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    /// First line of the primary heading.
    pub heading: Option<String>,
    /// Every heading and sub-heading text in the header.
    pub header_texts: Vec<String>,
    /// Value cells of the detail rows that were present.
    pub fields: Vec<(ListingField, String)>,
}

/// A value that was captured but did not normalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    pub field: ListingField,
    pub raw: String,
    pub reason: NormalizeError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedListing {
    pub listing: Listing,
    pub warnings: Vec<FieldWarning>,
}

impl RawListing {
    /// Build the typed record for `url`.
    #[must_use]
    pub fn normalize(&self, url: &str, brands: &[String]) -> ExtractedListing {
        let mut listing = Listing::new(url);
        let mut warnings = Vec::new();

        if let Some(heading) = &self.heading {
            let parts = parse_heading(heading, brands);
            if parts.brand.is_none() {
                debug!("{url}: no known brand prefixes heading {heading:?}");
            }
            listing.brand = parts.brand;
            listing.model = parts.model;
            listing.year = parts.year;
        }

        let prices = extract_prices(self.header_texts.iter().map(String::as_str));
        listing.price_colones = prices.colones;
        listing.price_dollars = prices.dollars;

        for (field, raw) in &self.fields {
            match field.apply(raw, &mut listing) {
                Ok(()) => {}
                // Blank cells are absent values
                Err(NormalizeError::Empty) => {}
                Err(reason) => {
                    warn!("{url}: could not normalize {field} {raw:?}: {reason}");
                    warnings.push(FieldWarning {
                        field: *field,
                        raw: raw.clone(),
                        reason,
                    });
                }
            }
        }

        ExtractedListing { listing, warnings }
    }
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(String::from)
}

/// Reads listing pages with the configured selectors and brand tokens.
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    selectors: CatalogSelectors,
    brands: Arc<[String]>,
}

impl ListingExtractor {
    #[must_use]
    pub fn new(selectors: CatalogSelectors, brands: impl Into<Arc<[String]>>) -> Self {
        Self {
            selectors,
            brands: brands.into(),
        }
    }

    #[must_use]
    pub fn brands(&self) -> &[String] {
        &self.brands
    }

    /// Capture the active tab's listing page.
    ///
    /// Fails only when the page has no listing header at all. Missing detail
    /// rows are skipped.
    pub async fn read_page<S: BrowserSession>(
        &self,
        session: &S,
    ) -> Result<RawListing, ExtractError> {
        let header = session
            .find_element(&self.selectors.listing_header)
            .await?
            .ok_or_else(|| {
                ExtractError::UnrecognizedPage(format!(
                    "no element matches {}",
                    self.selectors.listing_header
                ))
            })?;

        let heading = match session
            .find_within(&header, &self.selectors.listing_heading)
            .await?
        {
            Some(h1) => session.read_text(&h1).await?.as_deref().and_then(first_line),
            None => None,
        };

        let mut header_texts = Vec::new();
        for element in session
            .find_all_within(&header, &self.selectors.listing_price_headings)
            .await?
        {
            if let Some(text) = session.read_text(&element).await? {
                header_texts.push(text.trim().to_string());
            }
        }

        let mut fields = Vec::with_capacity(ListingField::ALL.len());
        for field in ListingField::ALL {
            let locator = self.selectors.field_value(field.label());
            if let Some(cell) = session.find_element(&locator).await?
                && let Some(text) = session.read_text(&cell).await?
            {
                fields.push((field, text.trim().to_string()));
            }
        }

        Ok(RawListing {
            heading,
            header_texts,
            fields,
        })
    }

    /// Read and normalize the active tab as the listing at `url`.
    pub async fn extract<S: BrowserSession>(
        &self,
        session: &S,
        url: &str,
    ) -> Result<ExtractedListing, ExtractError> {
        let raw = self.read_page(session).await?;
        Ok(raw.normalize(url, &self.brands))
    }
}

/// Brand names from the search form's brand dropdown.
///
/// The placeholder option (value `"00"`) and blank options are skipped.
pub async fn capture_brand_tokens<S: BrowserSession>(
    session: &S,
    selectors: &CatalogSelectors,
) -> Result<Vec<String>, BrowserError> {
    let mut brands = Vec::new();
    for option in session.find_elements(&selectors.brand_options).await? {
        let value = session.read_attribute(&option, "value").await?;
        if !matches!(value.as_deref().map(str::trim), Some(v) if !v.is_empty() && v != "00") {
            continue;
        }
        if let Some(text) = session.read_text(&option).await? {
            let text = text.trim();
            if !text.is_empty() {
                brands.push(text.to_string());
            }
        }
    }
    debug!("Captured {} brand tokens", brands.len());
    Ok(brands)
}
