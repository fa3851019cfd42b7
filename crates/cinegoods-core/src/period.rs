//! Parsing of free-text event periods.
//!
//! CGV prints periods as `YY.MM.DD ~ YY.MM.DD`; Lotte and Megabox use
//! four-digit years. Only the start date matters for the upcoming check.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static SHORT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})\.(\d{2})\.(\d{2})").expect("valid short date regex"));

/// Returns the first `YY.MM.DD` date in `text`, interpreted as 20YY.
///
/// Returns `None` when no such pattern exists or it names an impossible date.
#[must_use]
pub fn parse_short_start_date(text: &str) -> Option<NaiveDate> {
    let caps = SHORT_DATE.captures(text)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(2000 + year, month, day)
}

/// `true` when the period starts strictly after `today`.
///
/// Unparseable periods are never upcoming.
#[must_use]
pub fn is_upcoming(period: &str, today: NaiveDate) -> bool {
    parse_short_start_date(period).is_some_and(|start| start > today)
}
