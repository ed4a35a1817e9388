//! Brand / model / year from the listing heading.

use crate::utils::{MAX_MODEL_YEAR, MIN_MODEL_YEAR};

/// Parts recovered from a heading such as `"Volvo S60 2012"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadingParts {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<u16>,
}

fn model_year(token: &str) -> Option<u16> {
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token
        .parse()
        .ok()
        .filter(|y| (MIN_MODEL_YEAR..=MAX_MODEL_YEAR).contains(y))
}

/// Split `heading` using the catalog's brand tokens.
///
/// The first brand, in `brands` order, that prefixes the heading wins. The
/// year is the first whitespace token of four digits in the accepted range.
/// The model is what remains once the brand prefix and that year token are
/// removed, and is only filled when a year was found.
#[must_use]
pub fn parse_heading(heading: &str, brands: &[String]) -> HeadingParts {
    let heading = heading.trim();
    let Some(brand) = brands
        .iter()
        .find(|b| !b.is_empty() && heading.starts_with(b.as_str()))
    else {
        return HeadingParts::default();
    };

    let Some(year) = heading.split_whitespace().find_map(model_year) else {
        return HeadingParts {
            brand: Some(brand.clone()),
            ..HeadingParts::default()
        };
    };

    let year_token = year.to_string();
    let mut year_removed = false;
    let model = heading[brand.len()..]
        .split_whitespace()
        .filter(|token| {
            if !year_removed && *token == year_token {
                year_removed = true;
                return false;
            }
            true
        })
        .collect::<Vec<_>>()
        .join(" ");

    HeadingParts {
        brand: Some(brand.clone()),
        model: (!model.is_empty()).then_some(model),
        year: Some(year),
    }
}
