//! Display formatting for metric values

/// Unit cascade used by [`fmt_duration`]: divide by the factor while the
/// value is at least that large.
///
/// The calendar is approximate: a month is four weeks and a year is twelve
/// such months.
const DURATION_STEPS: &[(f64, &str)] = &[
    (1000.0, "s"),
    (60.0, "m"),
    (60.0, "h"),
    (24.0, "d"),
    (7.0, "wk"),
    (4.0, "mo"),
    (12.0, "yr"),
];

/// Fraction as a percentage: `0.05` -> `"5.0%"`
pub fn fmt_percentage(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Fraction as a signed percentage: `0.05` -> `"+5.0%"`, `-0.02` -> `"-2.0%"`
pub fn fmt_percentage_signed(value: f64) -> String {
    format!("{:+.1}%", value * 100.0)
}

/// Two decimal places
pub fn fmt_round_2(value: f64) -> String {
    format!("{:.2}", value)
}

/// Milliseconds scaled to the largest unit that keeps the value below the
/// next step, one decimal place: `1500` -> `"1.5s"`, `90000` -> `"1.5m"`
pub fn fmt_duration(ms: f64) -> String {
    let mut value = ms;
    let mut unit = "ms";

    for &(factor, next_unit) in DURATION_STEPS {
        if value < factor {
            break;
        }
        value /= factor;
        unit = next_unit;
    }

    format!("{:.1}{}", value, unit)
}
