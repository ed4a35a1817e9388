//! Advertised prices from header texts.

use std::sync::LazyLock;

use regex::Regex;

use crate::normalizer::price_amount;

// Parentheses and a trailing `*` sit outside the captured digits
static COLONES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"¢\s*(\d[\d,]*)").expect("colones pattern is valid"));

static DOLLARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s*(\d[\d,]*)").expect("dollars pattern is valid"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Prices {
    pub colones: Option<i64>,
    pub dollars: Option<i64>,
}

fn lowest(re: &Regex, texts: &[&str]) -> Option<i64> {
    texts
        .iter()
        .flat_map(|text| re.captures_iter(text))
        .filter_map(|caps| price_amount(&caps[1]).ok())
        .min()
}

/// Scan every header text for both currencies; the lowest amount of each wins.
#[must_use]
pub fn extract_prices<'a, I>(texts: I) -> Prices
where
    I: IntoIterator<Item = &'a str>,
{
    let texts: Vec<&str> = texts.into_iter().collect();
    Prices {
        colones: lowest(&COLONES_RE, &texts),
        dollars: lowest(&DOLLARS_RE, &texts),
    }
}
