//! Canonical `YYYY-MM-DD - Sender - Title` document titles.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static CANONICAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2}) - (.+?) - (.+)$").unwrap()
});

/// A classification result split into its three segments.
///
/// Unknown date parts are zero-filled (`0000-00-00`, `2021-03-00`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTitle {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub sender: String,
    pub title: String,
}

impl CanonicalTitle {
    /// Parse a classification string.
    ///
    /// Returns `None` when the string does not have the canonical shape or
    /// carries an impossible date such as `2021-13-40`.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = CANONICAL_PATTERN.captures(raw.trim())?;

        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;

        let year = (year != 0).then_some(year);
        let month = (month != 0).then_some(month);
        let day = (day != 0).then_some(day);

        // A known day without a known month (or month without year) is not canonical.
        if (day.is_some() && month.is_none()) || (month.is_some() && year.is_none()) {
            return None;
        }
        if let Some(m) = month {
            if m > 12 {
                return None;
            }
        }
        if let (Some(y), Some(m), Some(d)) = (year, month, day) {
            NaiveDate::from_ymd_opt(y, m, d)?;
        }

        let sender = caps[4].trim().to_string();
        let title = caps[5].trim().to_string();
        if sender.is_empty() || title.is_empty() {
            return None;
        }

        Some(Self {
            year,
            month,
            day,
            sender,
            title,
        })
    }

    /// The full calendar date, when every part is known.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year?, self.month?, self.day?)
    }
}

impl fmt::Display for CanonicalTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} - {} - {}",
            self.year.unwrap_or(0),
            self.month.unwrap_or(0),
            self.day.unwrap_or(0),
            self.sender,
            self.title
        )
    }
}
