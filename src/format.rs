//! Display helpers for record pages: short dates and US-dollar amounts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("'{0}' is not a recognised date")]
    InvalidDate(String),
    #[error("unsupported locale '{0}'")]
    UnknownLocale(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "en-GB")]
    EnGb,
    #[serde(rename = "de-DE")]
    De,
}

impl FromStr for Locale {
    type Err = FormatError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" => Ok(Self::EnUs),
            "en-gb" => Ok(Self::EnGb),
            "de" | "de-de" => Ok(Self::De),
            _ => Err(FormatError::UnknownLocale(raw.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EnUs => "en-US",
            Self::EnGb => "en-GB",
            Self::De => "de-DE",
        })
    }
}

const EN_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const EN_GB_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sept", "Oct", "Nov", "Dec",
];
const DE_MONTHS: [&str; 12] = [
    "Jan.", "Feb.", "März", "Apr.", "Mai", "Juni", "Juli", "Aug.", "Sept.", "Okt.", "Nov.", "Dez.",
];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a date-like string. Plain `YYYY-MM-DD` is a calendar date and is never
/// shifted through a time zone.
pub fn parse_date(input: &str) -> Result<NaiveDate, FormatError> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|datetime| datetime.date())
        .ok_or_else(|| FormatError::InvalidDate(input.to_string()))
}

/// Short human date: numeric year, abbreviated month, numeric day.
pub fn format_naive_date(date: NaiveDate, locale: Locale) -> String {
    let month = date.month0() as usize;
    let (day, year) = (date.day(), date.year());
    match locale {
        Locale::EnUs => format!("{} {day}, {year}", EN_MONTHS[month]),
        Locale::EnGb => format!("{day} {} {year}", EN_GB_MONTHS[month]),
        Locale::De => format!("{day}. {} {year}", DE_MONTHS[month]),
    }
}

pub fn format_date(input: &str, locale: Locale) -> Result<String, FormatError> {
    parse_date(input).map(|date| format_naive_date(date, locale))
}

/// en-US currency rendering of a dollar amount, e.g. `$1,234.50`.
///
/// Rounding is half away from zero on the shortest decimal form of `amount`, so
/// `1.005` renders as `$1.01`.
pub fn format_currency(amount: f64) -> String {
    if amount.is_nan() {
        return String::from("$NaN");
    }
    let sign = if amount.is_sign_negative() { "-" } else { "" };
    if amount.is_infinite() {
        return format!("{sign}$∞");
    }

    let (whole, cents) = round_to_cents(amount.abs());
    format!("{sign}${}.{cents}", group_thousands(&whole))
}

/// Split a non-negative finite number into integer digits and two fraction
/// digits, rounding half away from zero on the shortest decimal form.
fn round_to_cents(magnitude: f64) -> (String, String) {
    let fixed = match Decimal::from_str(&magnitude.to_string()) {
        Ok(value) => format!(
            "{:.2}",
            value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        ),
        // Beyond Decimal's 96-bit range; cents are below f64 precision there.
        Err(_) => format!("{magnitude:.2}"),
    };
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    (whole.to_string(), cents.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_us_dates() {
        assert_eq!(format_date("2024-01-05", Locale::EnUs).unwrap(), "Jan 5, 2024");
        assert_eq!(
            format_date("2023-09-30T23:15:00+05:30", Locale::EnUs).unwrap(),
            "Sep 30, 2023"
        );
        assert_eq!(
            format_date("2022-12-01 08:00:00", Locale::EnUs).unwrap(),
            "Dec 1, 2022"
        );
    }

    #[test]
    fn formats_other_locales() {
        assert_eq!(format_date("2024-09-05", Locale::EnGb).unwrap(), "5 Sept 2024");
        assert_eq!(format_date("2024-03-05", Locale::De).unwrap(), "5. März 2024");
    }

    #[test]
    fn rejects_garbage_dates() {
        assert_eq!(
            format_date("next tuesday", Locale::EnUs),
            Err(FormatError::InvalidDate("next tuesday".into()))
        );
        assert!(format_date("2024-02-30", Locale::EnUs).is_err());
    }

    #[test]
    fn parses_locale_tags() {
        assert_eq!("en_GB".parse::<Locale>().unwrap(), Locale::EnGb);
        assert_eq!("de".parse::<Locale>().unwrap(), Locale::De);
        assert!("fr-FR".parse::<Locale>().is_err());
    }

    #[test]
    fn formats_currency() {
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(1.005), "$1.01");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(-42.0), "-$42.00");
        assert_eq!(format_currency(f64::NAN), "$NaN");
        assert_eq!(format_currency(f64::NEG_INFINITY), "-$∞");
    }

    #[test]
    fn currency_rounding_holds_at_the_extremes() {
        assert_eq!(format_currency(0.005), "$0.01");
        assert_eq!(format_currency(0.004), "$0.00");
        assert_eq!(format_currency(-0.005), "-$0.01");
        assert_eq!(format_currency(1e20), "$100,000,000,000,000,000,000.00");

        let huge = format_currency(1e30);
        assert!(huge.starts_with("$1,000,000,000,000,000,0"), "{huge}");
        assert!(huge.ends_with(".00"), "{huge}");
    }
}
