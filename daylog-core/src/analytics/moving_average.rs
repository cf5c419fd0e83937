//! Trailing moving averages for a single metric.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::MAX_WINDOW_DAYS;
use crate::dates::add_days;
use crate::error::{Error, Result};
use crate::types::LogEntry;

/// One point of a moving-average series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaPoint {
    pub metric_id: String,
    pub period: u32,
    pub date: NaiveDate,
    pub ma_value: Option<f64>,
}

/// A raw logged value, as plotted under the average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Moving average plus the raw series it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaSeries {
    pub ma: Vec<MaPoint>,
    pub raw: Vec<RawPoint>,
}

/// Reject periods outside `1..=3650` days.
pub fn validate_period(period: u32) -> Result<()> {
    if period == 0 || period > MAX_WINDOW_DAYS {
        return Err(Error::InvalidInput(format!(
            "period must be between 1 and {}, got {}",
            MAX_WINDOW_DAYS, period
        )));
    }
    Ok(())
}

/// Trailing `period`-day average at every date the metric was logged.
///
/// Each point averages the finite values dated in `[date - (period - 1), date]`.
/// Calendar gaps shrink the sample rather than counting as zero.
pub fn moving_average(metric_id: &str, logs: &[LogEntry], period: u32) -> Result<Vec<MaPoint>> {
    validate_period(period)?;

    let series = raw_series(metric_id, logs);
    let mut points = Vec::with_capacity(series.len());

    // Two-pointer sliding window over the date-sorted series
    let mut lo = 0;
    let mut sum = 0.0;
    let mut count = 0usize;

    for hi in 0..series.len() {
        let date = series[hi].date;
        if series[hi].value.is_finite() {
            sum += series[hi].value;
            count += 1;
        }

        let window_start = add_days(date, -(i64::from(period) - 1));
        while series[lo].date < window_start {
            if series[lo].value.is_finite() {
                sum -= series[lo].value;
                count -= 1;
            }
            lo += 1;
        }

        points.push(MaPoint {
            metric_id: metric_id.to_string(),
            period,
            date,
            ma_value: (count > 0).then(|| sum / count as f64),
        });
    }

    Ok(points)
}

/// The metric's logged values in date order.
pub fn raw_series(metric_id: &str, logs: &[LogEntry]) -> Vec<RawPoint> {
    let mut raw: Vec<RawPoint> = logs
        .iter()
        .filter(|l| l.metric_id == metric_id)
        .map(|l| RawPoint {
            date: l.date,
            value: l.value,
        })
        .collect();
    raw.sort_by_key(|p| p.date);
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_trailing_window() {
        let logs = vec![
            LogEntry::new(d("2024-01-01"), "w", 2.0),
            LogEntry::new(d("2024-01-02"), "w", 4.0),
            LogEntry::new(d("2024-01-03"), "w", 6.0),
            LogEntry::new(d("2024-01-06"), "w", 10.0),
            LogEntry::new(d("2024-01-02"), "other", 100.0),
        ];

        let ma = moving_average("w", &logs, 3).unwrap();
        let values: Vec<_> = ma.iter().map(|p| p.ma_value).collect();
        assert_eq!(values, vec![Some(2.0), Some(3.0), Some(4.0), Some(10.0)]);
        assert_eq!(ma[3].date, d("2024-01-06"));
        assert!(ma.iter().all(|p| p.period == 3 && p.metric_id == "w"));
    }

    #[test]
    fn test_period_one_is_raw_value() {
        let logs = vec![
            LogEntry::new(d("2024-01-01"), "w", 2.0),
            LogEntry::new(d("2024-01-02"), "w", 4.0),
        ];
        let ma = moving_average("w", &logs, 1).unwrap();
        assert_eq!(ma[1].ma_value, Some(4.0));
    }

    #[test]
    fn test_period_bounds() {
        assert!(matches!(moving_average("w", &[], 0), Err(Error::InvalidInput(_))));
        assert!(matches!(moving_average("w", &[], 3651), Err(Error::InvalidInput(_))));
        assert!(moving_average("w", &[], 3650).unwrap().is_empty());
    }

    #[test]
    fn test_raw_series_sorted() {
        let logs = vec![
            LogEntry::new(d("2024-01-03"), "w", 3.0),
            LogEntry::new(d("2024-01-01"), "w", 1.0),
        ];
        let raw = raw_series("w", &logs);
        assert_eq!(raw[0].date, d("2024-01-01"));
        assert_eq!(raw[1].value, 3.0);
    }
}
