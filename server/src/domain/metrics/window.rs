//! Reporting windows
//!
//! Windows are anchored at the last microsecond of the current UTC day, so
//! every call made during the same day produces identical bounds. The
//! response cache relies on that: identical bounds mean identical cache keys.

use chrono::{DateTime, Duration, Utc};

use crate::utils::time::{start_of_utc_day, to_api_timestamp};

/// Source of "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Which of the two comparable windows to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// The lookback period ending today
    Current,
    /// The equally long period immediately before `Current`
    Previous,
}

/// Closed date range sent to the events API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// `start` formatted as a query parameter
    pub fn start_param(&self) -> String {
        to_api_timestamp(&self.start)
    }

    /// `end` formatted as a query parameter
    pub fn end_param(&self) -> String {
        to_api_timestamp(&self.end)
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

/// Last representable instant of `now`'s UTC day
pub fn day_anchor(now: DateTime<Utc>) -> DateTime<Utc> {
    start_of_utc_day(&now) + Duration::days(1) - Duration::microseconds(1)
}

/// Compute the window for `period`.
///
/// `lookback_days` must be positive; configuration loading rejects zero.
pub fn compute_window(now: DateTime<Utc>, lookback_days: u32, period: Period) -> TimeWindow {
    let anchor = day_anchor(now);
    let span = Duration::days(i64::from(lookback_days));

    match period {
        Period::Current => TimeWindow {
            start: anchor - span,
            end: anchor,
        },
        Period::Previous => TimeWindow {
            start: anchor - span - span,
            end: anchor - span,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, h, m, 0).unwrap()
    }

    #[test]
    fn test_current_window_ends_at_last_instant_of_day() {
        let window = compute_window(at(13, 37), 3, Period::Current);
        assert_eq!(window.end_param(), "2024-05-10T23:59:59.999999+00:00");
        assert_eq!(window.start_param(), "2024-05-07T23:59:59.999999+00:00");
    }

    #[test]
    fn test_previous_window_abuts_current() {
        let now = at(8, 0);
        let current = compute_window(now, 3, Period::Current);
        let previous = compute_window(now, 3, Period::Previous);

        assert_eq!(previous.end, current.start);
        assert_eq!(previous.length(), current.length());
        assert_eq!(previous.start_param(), "2024-05-04T23:59:59.999999+00:00");
    }

    #[test]
    fn test_window_length_matches_lookback() {
        for days in [1, 3, 7, 30] {
            let window = compute_window(at(0, 0), days, Period::Current);
            assert_eq!(window.length(), Duration::days(i64::from(days)));
            assert!(window.start < window.end);
        }
    }

    #[test]
    fn test_same_day_is_idempotent() {
        let early = compute_window(at(1, 0), 3, Period::Current);
        let late = compute_window(at(23, 0), 3, Period::Current);
        assert_eq!(early, late);

        let early = compute_window(at(1, 0), 3, Period::Previous);
        let late = compute_window(at(23, 0), 3, Period::Previous);
        assert_eq!(early, late);
    }

    #[test]
    fn test_midnight_belongs_to_new_day() {
        let before = Utc.with_ymd_and_hms(2024, 5, 10, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 5, 11, 0, 0, 0).unwrap();

        let a = compute_window(before, 3, Period::Current);
        let b = compute_window(after, 3, Period::Current);
        assert_eq!(b.end - a.end, Duration::days(1));
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock(at(12, 0));
        assert_eq!(clock.now(), at(12, 0));
    }
}
