use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use regex::Regex;
use std::sync::LazyLock;

use super::DateRangeError;

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*(day|week|month|year)s?\s*ago$").expect("relative date pattern")
});
static MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").expect("month pattern"));
static QUARTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-q(\d)$").expect("quarter pattern"));
static LAST_WEEKDAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^last\s+(\w+)$").expect("weekday pattern"));

/// Resolve a human date expression relative to `today`.
///
/// Accepted forms: `YYYY-MM-DD`, `today`, `yesterday`, `N days|weeks|months|years ago`,
/// `YYYY-MM` (first of that month), `YYYY-Qn` (first day of the quarter) and
/// `last <weekday>` (most recent such day strictly before today).
pub fn parse_flexible_date(input: &str, today: NaiveDate) -> Result<NaiveDate, DateRangeError> {
    let input = input.trim().to_lowercase();
    let unrecognized = || DateRangeError::Unrecognized(input.clone());

    if let Ok(date) = NaiveDate::parse_from_str(&input, "%Y-%m-%d") {
        return Ok(date);
    }

    match input.as_str() {
        "today" => return Ok(today),
        "yesterday" => return Ok(today - Duration::days(1)),
        _ => {}
    }

    if let Some(caps) = RELATIVE.captures(&input) {
        let n: u32 = caps[1].parse().map_err(|_| unrecognized())?;
        let date = match &caps[2] {
            "day" => today.checked_sub_signed(Duration::days(n.into())),
            "week" => today.checked_sub_signed(Duration::weeks(n.into())),
            "month" => today.checked_sub_months(Months::new(n)),
            _ => n
                .checked_mul(12)
                .and_then(|months| today.checked_sub_months(Months::new(months))),
        };
        return date.ok_or_else(unrecognized);
    }

    if let Some(caps) = MONTH.captures(&input) {
        let year: i32 = caps[1].parse().map_err(|_| unrecognized())?;
        let month: u32 = caps[2].parse().map_err(|_| unrecognized())?;
        return NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(unrecognized);
    }

    if let Some(caps) = QUARTER.captures(&input) {
        let year: i32 = caps[1].parse().map_err(|_| unrecognized())?;
        let quarter: u32 = caps[2].parse().map_err(|_| unrecognized())?;
        if !(1..=4).contains(&quarter) {
            return Err(DateRangeError::InvalidQuarter(quarter));
        }
        return NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1).ok_or_else(unrecognized);
    }

    if let Some(caps) = LAST_WEEKDAY.captures(&input) {
        let target: Weekday = caps[1].parse().map_err(|_| unrecognized())?;
        let mut days = today.weekday().num_days_from_sunday() as i64
            - target.num_days_from_sunday() as i64;
        if days <= 0 {
            days += 7;
        }
        return Ok(today - Duration::days(days));
    }

    Err(unrecognized())
}
