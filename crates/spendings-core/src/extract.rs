//! Text extractors for chat messages
//!
//! Pure pattern matchers that pull a price, an optional calendar date and a
//! list of hashtags out of free text. They never consult state, so running
//! them twice on the same text always yields the same result.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(\w+)").unwrap());

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+(?:\.\d+)?\b").unwrap());

/// Date patterns in priority order, each paired with its chrono format.
static DATE_PATTERNS: LazyLock<[(Regex, &'static str); 4]> = LazyLock::new(|| {
    [
        (Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap(), "%Y-%m-%d"),
        (Regex::new(r"\d{2}-\d{2}-\d{4}").unwrap(), "%d-%m-%Y"),
        (Regex::new(r"\d{2}\.\d{2}\.\d{4}").unwrap(), "%d.%m.%Y"),
        (Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap(), "%m/%d/%Y"),
    ]
});

/// Extraction misses
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no price was found")]
    NoPrice,

    #[error("no date was found in the text")]
    NoDate,
}

/// Extract hashtag names (without `#`) in order of appearance.
///
/// Repeated hashtags are kept; callers deduplicate by name if they need to.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    HASHTAG_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Extract the first numeric token that parses as a finite price.
pub fn extract_price(text: &str) -> Result<f64, ExtractError> {
    PRICE_RE
        .find_iter(text)
        .find_map(|m| m.as_str().parse::<f64>().ok().filter(|p| p.is_finite()))
        .ok_or(ExtractError::NoPrice)
}

/// Extract the first valid date under the highest-priority pattern that has one.
///
/// Supported formats, in priority order: `YYYY-MM-DD`, `DD-MM-YYYY`,
/// `DD.MM.YYYY`, `MM/DD/YYYY`. Matches that are not real calendar dates
/// (month 13, day 33, ...) are skipped.
pub fn extract_date(text: &str) -> Result<NaiveDate, ExtractError> {
    DATE_PATTERNS
        .iter()
        .find_map(|(re, format)| {
            re.find_iter(text)
                .find_map(|m| NaiveDate::parse_from_str(m.as_str(), format).ok())
        })
        .ok_or(ExtractError::NoDate)
}
