//! Field normalization
//!
//! Pure conversions from captured listing text into typed values. Every
//! function is total: malformed input yields a [`NormalizeError`] describing
//! what was wrong, never a panic. The listing builder in
//! [`crate::extractor`] turns those errors into `None` plus a warning.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::NormalizeError;
use crate::utils::MILE_TO_KM;

static DISTANCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*)\s*(kms|km|millas|milla)\b").expect("distance pattern is valid")
});

static ENTRY_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,2})\s+de\s+(\p{L}+)\s+del?\s+(\d{4})\s*$")
        .expect("entry date pattern is valid")
});

static LEADING_INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)").expect("integer pattern is valid"));

/// Trimmed text; empty input is an error.
pub fn text(raw: &str) -> Result<String, NormalizeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::Empty);
    }
    Ok(trimmed.to_string())
}

/// Engine displacement: `"2000 cc"` becomes `"2000"`.
pub fn engine_displacement(raw: &str) -> Result<String, NormalizeError> {
    strip_unit_suffix(raw, "cc")
}

/// Battery capacity: `"62 kWh"` becomes `"62"`.
pub fn battery_capacity(raw: &str) -> Result<String, NormalizeError> {
    strip_unit_suffix(raw, "kwh")
}

fn strip_unit_suffix(raw: &str, unit: &str) -> Result<String, NormalizeError> {
    let trimmed = raw.trim();
    let value = match trimmed.len().checked_sub(unit.len()) {
        Some(split)
            if trimmed.is_char_boundary(split)
                && trimmed[split..].eq_ignore_ascii_case(unit) =>
        {
            trimmed[..split].trim_end()
        }
        _ => trimmed,
    };
    if value.is_empty() {
        return Err(NormalizeError::Empty);
    }
    Ok(value.to_string())
}

/// Distance in kilometers from `<number><unit>` text.
///
/// Kilometer units pass through, mile units are converted with
/// [`MILE_TO_KM`] and truncated. Thousands separators are ignored:
/// `"60,000 millas"` is `96560`.
pub fn distance_km(raw: &str) -> Result<i64, NormalizeError> {
    if raw.trim().is_empty() {
        return Err(NormalizeError::Empty);
    }
    let caps = DISTANCE_RE
        .captures(raw)
        .ok_or_else(|| NormalizeError::MissingUnit(raw.to_string()))?;

    let value: i64 = caps[1]
        .replace(',', "")
        .parse()
        .map_err(|_| NormalizeError::InvalidNumber(raw.to_string()))?;

    if caps[2].to_lowercase().starts_with("milla") {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let km = (value as f64 * MILE_TO_KM).trunc() as i64;
        Ok(km)
    } else {
        Ok(value)
    }
}

/// Price digits with thousands separators, e.g. `"8,075,500"`.
pub fn price_amount(digits: &str) -> Result<i64, NormalizeError> {
    let cleaned: String = digits.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(NormalizeError::Empty);
    }
    cleaned
        .parse()
        .map_err(|_| NormalizeError::InvalidNumber(digits.to_string()))
}

/// Long-form Spanish date: `"3 de julio del 2024"`.
pub fn entry_date(raw: &str) -> Result<NaiveDate, NormalizeError> {
    if raw.trim().is_empty() {
        return Err(NormalizeError::Empty);
    }
    let caps = ENTRY_DATE_RE
        .captures(raw)
        .ok_or_else(|| NormalizeError::InvalidDate(raw.to_string()))?;

    let day: u32 = caps[1]
        .parse()
        .map_err(|_| NormalizeError::InvalidDate(raw.to_string()))?;
    let month = spanish_month(&caps[2])
        .ok_or_else(|| NormalizeError::UnknownMonth(caps[2].to_string()))?;
    let year: i32 = caps[3]
        .parse()
        .map_err(|_| NormalizeError::InvalidDate(raw.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| NormalizeError::InvalidDate(raw.to_string()))
}

fn spanish_month(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        // Costa Rican usage is "setiembre"
        "septiembre" | "setiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    };
    Some(month)
}

/// `SI`/`NO` table flags.
pub fn yes_no(raw: &str) -> Result<bool, NormalizeError> {
    match raw.trim().to_uppercase().as_str() {
        "SI" | "SÍ" => Ok(true),
        "NO" => Ok(false),
        "" => Err(NormalizeError::Empty),
        _ => Err(NormalizeError::InvalidFlag(raw.to_string())),
    }
}

/// Small leading integer, e.g. passenger or door counts.
pub fn count(raw: &str) -> Result<u8, NormalizeError> {
    if raw.trim().is_empty() {
        return Err(NormalizeError::Empty);
    }
    LEADING_INT_RE
        .captures(raw)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| NormalizeError::InvalidNumber(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_kilometers_pass_through() {
        assert_eq!(distance_km("98,000 kms"), Ok(98_000));
        assert_eq!(distance_km("93,000 kms"), Ok(93_000));
        assert_eq!(distance_km("400 km"), Ok(400));
        assert_eq!(distance_km("12,500 KMS"), Ok(12_500));
    }

    #[test]
    fn test_distance_miles_convert_and_truncate() {
        assert_eq!(distance_km("60,000 millas"), Ok(96_560));
        assert_eq!(distance_km("1 milla"), Ok(1));
        assert_eq!(distance_km("10 Millas"), Ok(16));
    }

    #[test]
    fn test_distance_without_unit_is_an_error() {
        assert_eq!(
            distance_km("98000"),
            Err(NormalizeError::MissingUnit("98000".to_string()))
        );
        assert_eq!(distance_km("   "), Err(NormalizeError::Empty));
        assert!(distance_km("muchos kms").is_err());
    }

    #[test]
    fn test_distance_overflow_is_an_error() {
        assert!(matches!(
            distance_km("99999999999999999999999 kms"),
            Err(NormalizeError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_entry_date() {
        assert_eq!(
            entry_date("3 de julio del 2024"),
            Ok(NaiveDate::from_ymd_opt(2024, 7, 3).unwrap())
        );
        assert_eq!(
            entry_date("01 de Agosto del 2024"),
            Ok(NaiveDate::from_ymd_opt(2024, 8, 1).unwrap())
        );
        assert_eq!(
            entry_date("15 de setiembre de 2023"),
            Ok(NaiveDate::from_ymd_opt(2023, 9, 15).unwrap())
        );
    }

    #[test]
    fn test_entry_date_rejects_bad_input() {
        assert_eq!(
            entry_date("3 de julius del 2024"),
            Err(NormalizeError::UnknownMonth("julius".to_string()))
        );
        assert!(matches!(
            entry_date("31 de febrero del 2024"),
            Err(NormalizeError::InvalidDate(_))
        ));
        assert!(matches!(
            entry_date("2024-07-03"),
            Err(NormalizeError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_unit_suffixes() {
        assert_eq!(engine_displacement("2000 cc"), Ok("2000".to_string()));
        assert_eq!(engine_displacement("1600"), Ok("1600".to_string()));
        assert_eq!(engine_displacement(" cc"), Err(NormalizeError::Empty));
        assert_eq!(battery_capacity("62 kWh"), Ok("62".to_string()));
    }

    #[test]
    fn test_flags_and_counts() {
        assert_eq!(yes_no("SI"), Ok(true));
        assert_eq!(yes_no(" sí "), Ok(true));
        assert_eq!(yes_no("NO"), Ok(false));
        assert!(yes_no("tal vez").is_err());
        assert_eq!(count("5"), Ok(5));
        assert_eq!(count("4 puertas"), Ok(4));
        assert!(count("cinco").is_err());
    }

    #[test]
    fn test_price_amount() {
        assert_eq!(price_amount("8,075,500"), Ok(8_075_500));
        assert_eq!(price_amount("15,500"), Ok(15_500));
        assert_eq!(price_amount(""), Err(NormalizeError::Empty));
    }
}
