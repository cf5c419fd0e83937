//! Formatting helpers shared across CLIs.

use crate::types::MetricType;

/// Placeholder shown for missing values.
pub const MISSING: &str = "-";

/// Format minutes since midnight as `HH:MM`. Negative input clamps to `00:00`.
pub fn format_hhmm(minutes: f64) -> String {
    let m = if minutes.is_finite() {
        minutes.floor().max(0.0) as i64
    } else {
        0
    };
    format!("{:02}:{:02}", m / 60, m % 60)
}

/// Parse `H:MM` or `HH:MM` (00:00 to 23:59) into minutes since midnight.
pub fn parse_hhmm(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let (hh, mm) = s.split_once(':')?;
    if hh.is_empty() || hh.len() > 2 || mm.len() != 2 {
        return None;
    }
    if !hh.bytes().all(|b| b.is_ascii_digit()) || !mm.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hh: u32 = hh.parse().ok()?;
    let mm: u32 = mm.parse().ok()?;
    if hh > 23 || mm > 59 {
        return None;
    }
    Some(f64::from(hh * 60 + mm))
}

/// Format a number with up to `decimals` places, dropping a zero fraction.
pub fn format_number(value: f64, decimals: usize) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.*}", decimals, value)
    }
}

/// Format a stored value the way its metric type is entered.
pub fn format_value(metric_type: MetricType, value: f64) -> String {
    match metric_type {
        MetricType::Checkbox => {
            if value != 0.0 {
                "yes".to_string()
            } else {
                "no".to_string()
            }
        }
        MetricType::Hhmm => format_hhmm(value),
        MetricType::Number | MetricType::Time => format_number(value, 2),
    }
}

/// Format an optional number, or [`MISSING`].
pub fn format_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => MISSING.to_string(),
    }
}
