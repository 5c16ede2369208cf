pub mod dates;

pub use dates::parse_flexible_date;

use chrono::{Duration, Months, NaiveDate};
use serde::Serialize;
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ranges shorter than this are fetched in one request
pub const DEFAULT_CHUNK_THRESHOLD_DAYS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum DateRangeError {
    #[error("invalid {field} date '{value}', expected YYYY-MM-DD")]
    Parse {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("unrecognized date expression: {0}")]
    Unrecognized(String),
    #[error("invalid quarter: {0}")]
    InvalidQuarter(u32),
}

/// Half-open `[start, end)` date window. A missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TimeWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    /// GitHub search `created:` qualifier for this window, or None when unbounded.
    ///
    /// GitHub's `a..b` range is inclusive, so the exclusive end is pulled back a day.
    pub fn search_qualifier(&self) -> Option<String> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                let last = end.pred_opt().unwrap_or(end);
                Some(format!(
                    "created:{}..{}",
                    start.format(DATE_FORMAT),
                    last.format(DATE_FORMAT)
                ))
            }
            (Some(start), None) => Some(format!("created:>={}", start.format(DATE_FORMAT))),
            (None, Some(end)) => Some(format!("created:<{}", end.format(DATE_FORMAT))),
            (None, None) => None,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |d: Option<NaiveDate>| {
            d.map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| "*".to_string())
        };
        write!(f, "{} to {}", bound(self.start), bound(self.end))
    }
}

/// Parse a strict `YYYY-MM-DD` date. Empty input means "no bound".
pub fn parse_date(field: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, DateRangeError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|source| DateRangeError::Parse {
                field,
                value: s.to_string(),
                source,
            }),
    }
}

/// Splits a date range into month-sized windows for parallel retrieval.
#[derive(Debug, Clone)]
pub struct TimeWindowPlanner {
    chunk_threshold: Duration,
}

impl Default for TimeWindowPlanner {
    fn default() -> Self {
        Self::new(Duration::days(DEFAULT_CHUNK_THRESHOLD_DAYS))
    }
}

impl TimeWindowPlanner {
    pub fn new(chunk_threshold: Duration) -> Self {
        Self { chunk_threshold }
    }

    /// Parse both bounds and plan windows. Parse failures produce no windows.
    pub fn plan(&self, since: Option<&str>, until: Option<&str>) -> Result<Vec<TimeWindow>, DateRangeError> {
        let since = parse_date("since", since)?;
        let until = parse_date("until", until)?;
        Ok(self.plan_dates(since, until))
    }

    /// Plan windows over `[since, until)`.
    ///
    /// Returns a single window when either bound is missing or the range is
    /// shorter than the chunk threshold; otherwise contiguous one-month windows
    /// with the last one truncated at `until`.
    pub fn plan_dates(&self, since: Option<NaiveDate>, until: Option<NaiveDate>) -> Vec<TimeWindow> {
        let (start, end) = match (since, until) {
            (Some(start), Some(end)) if end - start >= self.chunk_threshold => (start, end),
            _ => return vec![TimeWindow::new(since, until)],
        };

        // Boundaries are offsets from `start` so a month-end clamp doesn't carry over
        let mut windows = Vec::new();
        let mut current = start;
        let mut months = 1;
        while current < end {
            let next = start
                .checked_add_months(Months::new(months))
                .map_or(end, |d| d.min(end));
            windows.push(TimeWindow::new(Some(current), Some(next)));
            current = next;
            months += 1;
        }
        windows
    }
}
