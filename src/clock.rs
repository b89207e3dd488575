//! Time source and calendar-date helpers.
//!
//! Everything that depends on "now" takes a [`Clock`] so handlers and tests
//! can pin time explicitly.

use chrono::{Local, NaiveDate, Utc};

/// Source of the current instant and the current calendar date.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;

    /// Today's calendar date in the panel's local time zone.
    fn today(&self) -> NaiveDate;

    /// Today's date as `YYYY-MM-DD`.
    fn today_iso(&self) -> String {
        self.today().format("%Y-%m-%d").to_string()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a fixed instant and date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub millis: i64,
    pub date: NaiveDate,
}

impl FixedClock {
    pub fn new(millis: i64, date: NaiveDate) -> Self {
        Self { millis, date }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.millis
    }

    fn today(&self) -> NaiveDate {
        self.date
    }
}

/// `true` when `expire_date` is set and falls strictly before `today`.
///
/// ISO `YYYY-MM-DD` strings sort in date order, so a plain string
/// comparison is enough and never fails on odd input.
pub fn is_before_today(expire_date: &str, today: NaiveDate) -> bool {
    let expire_date = expire_date.trim();
    if expire_date.is_empty() {
        return false;
    }
    expire_date < today.format("%Y-%m-%d").to_string().as_str()
}

/// `"2026-03-25"` -> `"25/03/2026"`. Anything that is not an ISO date is
/// returned trimmed but otherwise untouched.
pub fn format_date_human(iso: &str) -> String {
    let iso = iso.trim();
    match NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
        Ok(date) if iso.len() == 10 => date.format("%d/%m/%Y").to_string(),
        _ => iso.to_string(),
    }
}

/// Parse an admin-supplied expiry date. Empty input means "never expires".
pub fn parse_expire_date(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return Some(String::new());
    }
    if input.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fixed_clock_today_iso() {
        let clock = FixedClock::new(1_000, date(2026, 3, 5));
        assert_eq!(clock.now_millis(), 1_000);
        assert_eq!(clock.today_iso(), "2026-03-05");
    }

    #[test]
    fn test_is_before_today() {
        let today = date(2026, 3, 25);
        assert!(is_before_today("2026-03-24", today));
        assert!(is_before_today("2020-01-01", today));
        assert!(!is_before_today("2026-03-25", today));
        assert!(!is_before_today("2026-03-26", today));
        assert!(!is_before_today("", today));
        assert!(!is_before_today("   ", today));
    }

    #[test]
    fn test_format_date_human() {
        assert_eq!(format_date_human("2026-03-25"), "25/03/2026");
        assert_eq!(format_date_human(" 2026-03-25 "), "25/03/2026");
        assert_eq!(format_date_human("next week"), "next week");
        assert_eq!(format_date_human(""), "");
    }

    #[test]
    fn test_parse_expire_date() {
        assert_eq!(parse_expire_date("2026-12-31").as_deref(), Some("2026-12-31"));
        assert_eq!(parse_expire_date("").as_deref(), Some(""));
        assert_eq!(parse_expire_date("2026-13-01"), None);
        assert_eq!(parse_expire_date("31/12/2026"), None);
        assert_eq!(parse_expire_date("2026-1-1"), None);
    }
}
