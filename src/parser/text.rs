//! Locale-tolerant parsers for the text fragments found on campaign pages.
//!
//! Every function maps a string to an `Option`; `None` is a missing field,
//! never an error.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:,\d{3})*(?:\.\d+)?)").unwrap());
static RAISED_OF_TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$\s*(\d+(?:,\d{3})*(?:\.\d+)?)\s+of\s+\S*?\$\s*(\d+(?:,\d{3})*(?:\.\d+)?)").unwrap()
});
static DAYS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*days?\b").unwrap());
static FIRST_INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").unwrap());
static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").unwrap());
static DONORS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d[\d,]*)\s+(?:donors?|backers?)").unwrap());
static INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d[\d,]*)").unwrap());
static STARTED_ON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Started on\s+(\d{1,2}/\d{1,2}/\d{4})").unwrap());
// Separator covers en-dash, em-dash, hyphen, the mis-decoded "â€“" and "to".
static DATE_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}\s+\p{L}+\.?,?\s+\d{4})\s*(?:–|—|-|â€“|â€”|\bto\b)\s*(\d{1,2}\s+\p{L}+\.?,?\s+\d{4})").unwrap()
});

const CLOSED_MARKERS: &[&str] = &["has ended", "campaign ended", "closed", "completed", "expired"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d %B %Y", "%d %b %Y", "%d %B, %Y", "%d %b, %Y"];

/// `"S$1,234.50"` -> `1234.5`. Currency symbols and thousands separators are ignored.
pub fn parse_amount(text: &str) -> Option<f64> {
    let caps = AMOUNT_RE.captures(text)?;
    number(&caps[1])
}

/// `"$1,200 of $5,000"` -> `(1200.0, 5000.0)`.
pub fn parse_raised_of_target(text: &str) -> Option<(f64, f64)> {
    let caps = RAISED_OF_TARGET_RE.captures(text)?;
    Some((number(&caps[1])?, number(&caps[2])?))
}

/// `"5 days left"` -> 5, `"Campaign has ended"` -> 0, `"Days to go: 12"` -> 12.
///
/// Closed markers win over any number in the text.
pub fn parse_days(text: &str) -> Option<i64> {
    let lower = text.to_lowercase();
    if CLOSED_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(0);
    }
    DAYS_RE
        .captures(text)
        .or_else(|| FIRST_INT_RE.captures(text))
        .and_then(|c| c[1].parse().ok())
}

/// `"82.5%"` -> 82.5.
pub fn parse_percentage(text: &str) -> Option<f64> {
    let caps = PERCENT_RE.captures(text)?;
    caps[1].parse().ok()
}

/// `"From 12 Donors"` -> 12; a bare count such as `"1,204"` also parses.
pub fn parse_donors(text: &str) -> Option<i64> {
    let caps = DONORS_RE.captures(text).or_else(|| INT_RE.captures(text))?;
    caps[1].replace(',', "").parse().ok()
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim().trim_end_matches('.');
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// `"1 March 2024 – 30 April 2024"` -> both ends.
pub fn parse_date_range(text: &str) -> Option<(Option<NaiveDate>, Option<NaiveDate>)> {
    let caps = DATE_RANGE_RE.captures(text)?;
    Some((parse_date(&caps[1]), parse_date(&caps[2])))
}

/// `"Started on 05/03/2024"` -> 2024-03-05 (day first).
pub fn parse_started_on(text: &str) -> Option<NaiveDate> {
    let caps = STARTED_ON_RE.captures(text)?;
    NaiveDate::parse_from_str(&caps[1], "%d/%m/%Y").ok()
}

fn number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn amounts() {
        assert_eq!(parse_amount("S$1,234.50"), Some(1234.50));
        assert_eq!(parse_amount("S$999"), Some(999.00));
        assert_eq!(parse_amount("  $12,000,000 raised"), Some(12_000_000.0));
        assert_eq!(parse_amount("no money here"), None);
    }

    #[test]
    fn raised_of_target() {
        assert_eq!(parse_raised_of_target("$1,200 of $5,000"), Some((1200.0, 5000.0)));
        assert_eq!(parse_raised_of_target("S$80.50 of S$100"), Some((80.5, 100.0)));
        assert_eq!(parse_raised_of_target("$1,200 raised"), None);
    }

    #[test]
    fn days() {
        assert_eq!(parse_days("5 days left"), Some(5));
        assert_eq!(parse_days("1 day left"), Some(1));
        assert_eq!(parse_days("Campaign has ended"), Some(0));
        assert_eq!(parse_days("This campaign is closed"), Some(0));
        assert_eq!(parse_days("12\n Days to go"), Some(12));
        assert_eq!(parse_days("No days information found"), None);
        assert_eq!(parse_days("Days to go: 12"), Some(12));
        assert_eq!(parse_days("Campaign ended 3 days ago"), Some(0));
    }

    #[test]
    fn percentages() {
        assert_eq!(parse_percentage("82.5%"), Some(82.5));
        assert_eq!(parse_percentage("Raised 100 %"), Some(100.0));
        assert_eq!(parse_percentage("n/a"), None);
    }

    #[test]
    fn donors() {
        assert_eq!(parse_donors("From 12 Donors"), Some(12));
        assert_eq!(parse_donors("From 1 Donor"), Some(1));
        assert_eq!(parse_donors("1,204"), Some(1204));
        assert_eq!(parse_donors("none yet"), None);
    }

    #[test]
    fn dates() {
        assert_eq!(parse_date("2024-03-05"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("05/03/2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("5 March 2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("5 Mar 2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("March 5th"), None);
    }

    #[test]
    fn date_range_separators() {
        let expected = Some((Some(date(2024, 3, 1)), Some(date(2024, 4, 30))));
        assert_eq!(parse_date_range("1 March 2024 – 30 April 2024"), expected);
        assert_eq!(parse_date_range("1 March 2024 — 30 April 2024"), expected);
        assert_eq!(parse_date_range("1 March 2024 - 30 April 2024"), expected);
        assert_eq!(parse_date_range("1 March 2024 â€“ 30 April 2024"), expected);
        assert_eq!(parse_date_range("Campaign period: 1 March 2024 to 30 April 2024"), expected);
        assert_eq!(parse_date_range("1 March 2024"), None);
    }

    #[test]
    fn started_on() {
        assert_eq!(parse_started_on("Started on 05/03/2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_started_on("Starts soon"), None);
    }
}
