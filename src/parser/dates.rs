//! Timestamp grammars used by the forum.
//!
//! The forum renders timestamps either as an explicit date
//! (`January 05, 2023, 03:04:05 PM`) or, for the current day, as
//! `Today at 03:04:05 PM`. Guest views are rendered in UTC, so both forms are
//! interpreted as UTC wall-clock time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use super::ParseError;

/// Regex fragment matching an explicit forum date.
pub const EXPLICIT_PATTERN: &str =
    r"[A-Z][a-z]{2,8} \d{2}, \d{4}, \d{2}:\d{2}:\d{2} (?:AM|PM)";

/// Regex fragment matching the time part of a `Today at ...` timestamp.
pub const TIME_PATTERN: &str = r"\d{2}:\d{2}:\d{2} (?:AM|PM)";

const EXPLICIT_FORMAT: &str = "%B %d, %Y, %I:%M:%S %p";
const TIME_FORMAT: &str = "%I:%M:%S %p";
const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A timestamp captured from forum markup, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForumTimestamp<'a> {
    /// `January 05, 2023, 03:04:05 PM`
    Explicit(&'a str),
    /// The `03:04:05 PM` part of `Today at 03:04:05 PM`
    Today(&'a str),
}

impl ForumTimestamp<'_> {
    /// Resolve to an instant, using `today` as the calendar date for the
    /// `Today` form.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidDatetime`] when the text has the right
    /// shape but is not a real date or time (e.g. day 32).
    pub fn resolve(self, today: NaiveDate) -> Result<DateTime<Utc>, ParseError> {
        let naive = match self {
            Self::Explicit(value) => NaiveDateTime::parse_from_str(value, EXPLICIT_FORMAT)
                .map_err(|source| ParseError::InvalidDatetime {
                    value: value.to_string(),
                    source,
                })?,
            Self::Today(value) => {
                let time = NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|source| {
                    ParseError::InvalidDatetime {
                        value: format!("Today at {value}"),
                        source,
                    }
                })?;
                today.and_time(time)
            }
        };
        Ok(naive.and_utc())
    }
}

/// Format an instant the way it is persisted: `YYYY-MM-DDTHH:MM:SSZ`.
#[must_use]
pub fn format_utc(datetime: &DateTime<Utc>) -> String {
    datetime.format(UTC_FORMAT).to_string()
}
