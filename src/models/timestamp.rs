//! Display timestamps stored on every event record
//!
//! Records carry `"HH:mm dd/MM/yyyy"` strings. Older imports may carry ISO
//! `yyyy-MM-dd...` strings instead; both shapes are accepted when reading.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;

/// Persisted timestamp layout (24-hour, zero-padded)
pub const DISPLAY_FORMAT: &str = "%H:%M %d/%m/%Y";

pub fn format_display<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(DISPLAY_FORMAT).to_string()
}

/// Current local time in display format
pub fn now_display() -> String {
    format_display(&Local::now())
}

/// Extract `(year, month, day)` from a display or ISO timestamp.
///
/// The date token is the whitespace-separated piece containing `/`
/// (`dd/MM/yyyy`) or starting with digits followed by `-` (ISO).
pub fn date_parts(timestamp: &str) -> Option<(i32, u32, u32)> {
    for token in timestamp.split_whitespace() {
        if token.contains('/') {
            let mut parts = token.split('/');
            let day = parts.next()?.trim().parse().ok()?;
            let month = parts.next()?.trim().parse().ok()?;
            let year = parts.next()?.trim().parse().ok()?;
            return Some((year, month, day));
        }

        let digits = token.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 && token[digits..].starts_with('-') {
            let date = token.split('T').next()?;
            let mut parts = date.split('-');
            let year = parts.next()?.parse().ok()?;
            let month = parts.next()?.parse().ok()?;
            let day = parts
                .next()
                .and_then(|d| d.get(..2).unwrap_or(d).parse().ok())
                .unwrap_or(1);
            return Some((year, month, day));
        }
    }
    None
}

/// Parse a timestamp for ordering. Date-only values sort at midnight.
pub fn parse(timestamp: &str) -> Option<NaiveDateTime> {
    let timestamp = timestamp.trim();
    if let Ok(at) = NaiveDateTime::parse_from_str(timestamp, DISPLAY_FORMAT) {
        return Some(at);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(at.naive_local());
    }
    date_of(timestamp).and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// `(year, month)` of a timestamp
pub fn month_of(timestamp: &str) -> Option<(i32, u32)> {
    date_parts(timestamp).map(|(y, m, _)| (y, m))
}

/// Calendar date of a timestamp
pub fn date_of(timestamp: &str) -> Option<NaiveDate> {
    date_parts(timestamp).and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
}

/// A `YYYY-MM` month selector. Day of month is never considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(try_from = "String")]
pub struct MonthFilter {
    pub year: i32,
    pub month: u32,
}

impl MonthFilter {
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: chrono::Datelike::year(&today),
            month: chrono::Datelike::month(&today),
        }
    }

    /// Whether the record timestamp falls inside this month
    pub fn contains(&self, timestamp: &str) -> bool {
        month_of(timestamp) == Some((self.year, self.month))
    }
}

impl std::str::FromStr for MonthFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("Invalid month '{}', expected YYYY-MM", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }
}

impl TryFrom<String> for MonthFilter {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
