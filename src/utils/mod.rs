pub mod constants;

pub use constants::*;

use chrono::NaiveDate;

/// Local calendar date, as written into `date_exited`.
#[must_use]
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
