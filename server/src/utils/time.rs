//! Time utility functions

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};

/// Format a timestamp the way the events API expects window bounds:
/// RFC 3339, microsecond precision, explicit `+00:00` offset.
pub fn to_api_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Truncate a timestamp to midnight of its UTC calendar day
pub fn start_of_utc_day(dt: &DateTime<Utc>) -> DateTime<Utc> {
    dt.date_naive().and_time(NaiveTime::MIN).and_utc()
}
