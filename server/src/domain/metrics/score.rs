//! Threshold scoring
//!
//! Every threshold pair is ascending and "lower is better". Metrics where
//! higher is better are scored under an `inverse_` key and the caller feeds
//! the complement (`inverse_apdex` is fed `1 - apdex`).

use std::fmt;

use serde::Serialize;

/// Metric keys understood by [`score`]
pub mod keys {
    pub const TTFB: &str = "ttfb";
    pub const FCP: &str = "fcp";
    pub const INP: &str = "inp";
    pub const HTTP_FAILURE_RATE: &str = "http_failure_rate";
    pub const HTTP_AVG_DURATION: &str = "http_avg_duration";
    pub const BACKEND_FAILURE_RATE: &str = "backend_failure_rate";
    pub const INVERSE_APDEX: &str = "inverse_apdex";
    pub const CACHE_MISS_RATE: &str = "cache_miss_rate";
    pub const QUEUE_AVG_PROCESSING: &str = "queue_avg_processing";
    pub const QUEUE_AVG_TIME_IN_QUEUE: &str = "queue_avg_time_in_queue";
}

/// Qualitative rating of a metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Score {
    Good,
    Meh,
    Poor,
}

impl Score {
    pub fn label(&self) -> &'static str {
        match self {
            Score::Good => "Good",
            Score::Meh => "Meh",
            Score::Poor => "Poor",
        }
    }

    /// Lowercase label, used as a CSS class
    pub fn css_class(&self) -> &'static str {
        match self {
            Score::Good => "good",
            Score::Meh => "meh",
            Score::Poor => "poor",
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `[low, high]` boundaries, `low < high`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub low: f64,
    pub high: f64,
}

const fn t(low: f64, high: f64) -> Threshold {
    Threshold { low, high }
}

// Durations in milliseconds, rates as fractions.
static THRESHOLDS: &[(&str, Threshold)] = &[
    (keys::TTFB, t(200.0, 400.0)),
    (keys::FCP, t(1000.0, 3000.0)),
    (keys::INP, t(200.0, 400.0)),
    (keys::HTTP_FAILURE_RATE, t(0.02, 0.05)),
    (keys::HTTP_AVG_DURATION, t(800.0, 1500.0)),
    (keys::BACKEND_FAILURE_RATE, t(0.02, 0.05)),
    (keys::INVERSE_APDEX, t(0.1, 0.3)),
    (keys::CACHE_MISS_RATE, t(0.1, 0.3)),
    (keys::QUEUE_AVG_PROCESSING, t(200.0, 800.0)),
    (keys::QUEUE_AVG_TIME_IN_QUEUE, t(200.0, 800.0)),
];

/// Look up the thresholds of a metric
pub fn threshold(metric: &str) -> Option<Threshold> {
    THRESHOLDS
        .iter()
        .find(|(name, _)| *name == metric)
        .map(|(_, t)| *t)
}

/// Rate `value` against the thresholds of `metric`.
///
/// Returns `None` for metrics without thresholds.
pub fn score(metric: &str, value: f64) -> Option<Score> {
    let Threshold { low, high } = threshold(metric)?;
    let score = if value < low {
        Score::Good
    } else if value < high {
        Score::Meh
    } else {
        Score::Poor
    };
    Some(score)
}
