//! The listing record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One vehicle advertisement, keyed by its URL.
///
/// Once persisted, the only field that changes is `date_exited`, and only
/// through [`crate::store::ListingStore::mark_exited`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub url: String,

    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<u16>,
    pub body_style: Option<String>,
    pub passengers: Option<u8>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub condition: Option<String>,
    pub exterior_color: Option<String>,
    pub interior_color: Option<String>,
    pub doors: Option<u8>,
    pub province: Option<String>,
    /// Electric vehicles only.
    pub battery_range_km: Option<i64>,
    /// Electric vehicles only; numeric text with the energy unit stripped.
    pub battery_capacity: Option<String>,

    pub price_colones: Option<i64>,
    pub price_dollars: Option<i64>,
    pub negotiable: Option<bool>,
    pub taxes_paid: Option<bool>,
    pub accepts_trade_in: Option<bool>,

    /// Numeric text with the `cc` unit stripped.
    pub engine_displacement: Option<String>,
    pub mileage_km: Option<i64>,

    pub date_entered: Option<NaiveDate>,
    pub date_exited: Option<NaiveDate>,
}

impl Listing {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_exited(&self) -> bool {
        self.date_exited.is_some()
    }

    /// Short description for log lines.
    #[must_use]
    pub fn title(&self) -> String {
        [
            self.brand.as_deref(),
            self.model.as_deref(),
            self.year.map(|y| y.to_string()).as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }
}
