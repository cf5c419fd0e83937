//! Lifetime and recent-window statistics.
//!
//! These are the per-metric tables on the stats page: one row per checkbox
//! metric, one per numeric metric, and one per (numeric metric, window size).
//! Metrics with no rows still get a row with zero counts and null values.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::streaks::{compute_streaks, StreakStats};
use crate::dates::{add_days, days_between};
use crate::types::{LogEntry, MetricConfig};

/// Lifetime stats for one checkbox metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckboxLifetimeStats {
    pub metric_id: String,
    pub metric_name: String,
    pub private: bool,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Inclusive span from `first_date` to `last_date`
    pub days_on_record: i64,
    /// Distinct dates with a row
    pub days_tracked: i64,
    pub total_true: i64,
    pub total_false: i64,
    /// Fraction of tracked days that were true, `0.0..=1.0`
    pub pct_true_lifetime: Option<f64>,
    /// Mean gap in days between consecutive true dates
    pub avg_days_between_true: Option<f64>,
}

/// Lifetime stats for one numeric (`number`, `time`, `hhmm`) metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericLifetimeStats {
    pub metric_id: String,
    pub metric_name: String,
    pub private: bool,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub days_on_record: i64,
    pub days_tracked: i64,
    pub value_count: i64,
    pub avg_value: Option<f64>,
    /// Sample standard deviation; null below two values
    pub stddev_value: Option<f64>,
    pub min_value: Option<f64>,
    pub min_value_date: Option<NaiveDate>,
    pub max_value: Option<f64>,
    pub max_value_date: Option<NaiveDate>,
}

/// Numeric stats restricted to the last `window_days` days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericRecentStats {
    pub metric_id: String,
    pub metric_name: String,
    pub private: bool,
    pub window_days: u32,
    pub days_tracked_recent: i64,
    pub value_count_recent: i64,
    pub avg_value_recent: Option<f64>,
    pub stddev_value_recent: Option<f64>,
    pub min_value_recent: Option<f64>,
    pub max_value_recent: Option<f64>,
    pub first_date_recent: Option<NaiveDate>,
    pub last_date_recent: Option<NaiveDate>,
}

/// Everything the stats page shows, computed in one pass over the rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub checkbox_lifetime: Vec<CheckboxLifetimeStats>,
    pub checkbox_streaks: Vec<StreakStats>,
    pub numeric_lifetime: Vec<NumericLifetimeStats>,
    pub numeric_recent: Vec<NumericRecentStats>,
}

/// Running aggregate over `(date, value)` pairs visited in date order.
#[derive(Debug, Default)]
struct ValueStats {
    count: i64,
    sum: f64,
    min: Option<(f64, NaiveDate)>,
    max: Option<(f64, NaiveDate)>,
    values: Vec<f64>,
}

impl ValueStats {
    fn from_rows<'a>(rows: impl Iterator<Item = &'a LogEntry>) -> Self {
        let mut stats = Self::default();
        for row in rows.filter(|r| r.value.is_finite()) {
            stats.count += 1;
            stats.sum += row.value;
            stats.values.push(row.value);
            // Strict comparisons keep the earliest date on ties
            if stats.min.map_or(true, |(v, _)| row.value < v) {
                stats.min = Some((row.value, row.date));
            }
            if stats.max.map_or(true, |(v, _)| row.value > v) {
                stats.max = Some((row.value, row.date));
            }
        }
        stats
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    fn sample_stddev(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        let mean = self.mean()?;
        let ss: f64 = self.values.iter().map(|v| (v - mean).powi(2)).sum();
        Some((ss / (self.count - 1) as f64).sqrt())
    }
}

/// Date bounds and distinct-day count over a metric's rows.
struct Coverage {
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
    days_tracked: i64,
}

impl Coverage {
    fn of(rows: &[&LogEntry]) -> Self {
        let dates: BTreeSet<NaiveDate> = rows.iter().map(|r| r.date).collect();
        Self {
            first: dates.first().copied(),
            last: dates.last().copied(),
            days_tracked: dates.len() as i64,
        }
    }

    fn days_on_record(&self) -> i64 {
        match (self.first, self.last) {
            (Some(first), Some(last)) => days_between(first, last) + 1,
            _ => 0,
        }
    }
}

/// Rows for one metric, sorted by date.
fn rows_for<'a>(metric: &MetricConfig, logs: &'a [LogEntry]) -> Vec<&'a LogEntry> {
    let mut rows: Vec<&LogEntry> = logs.iter().filter(|l| l.metric_id == metric.metric_id).collect();
    rows.sort_by_key(|r| r.date);
    rows
}

/// Lifetime stats for a checkbox metric.
pub fn checkbox_lifetime(metric: &MetricConfig, logs: &[LogEntry]) -> CheckboxLifetimeStats {
    let rows = rows_for(metric, logs);
    let coverage = Coverage::of(&rows);

    let true_dates: BTreeSet<NaiveDate> = rows.iter().filter(|r| r.is_true()).map(|r| r.date).collect();
    let total_true = rows.iter().filter(|r| r.is_true()).count() as i64;
    let total_false = rows.len() as i64 - total_true;

    let avg_days_between_true = match (true_dates.first(), true_dates.last()) {
        (Some(first), Some(last)) if true_dates.len() >= 2 => {
            Some(days_between(*first, *last) as f64 / (true_dates.len() - 1) as f64)
        }
        _ => None,
    };

    CheckboxLifetimeStats {
        metric_id: metric.metric_id.clone(),
        metric_name: metric.metric_name.clone(),
        private: metric.private,
        first_date: coverage.first,
        last_date: coverage.last,
        days_on_record: coverage.days_on_record(),
        days_tracked: coverage.days_tracked,
        total_true,
        total_false,
        pct_true_lifetime: (coverage.days_tracked > 0)
            .then(|| total_true as f64 / coverage.days_tracked as f64),
        avg_days_between_true,
    }
}

/// Lifetime stats for a numeric metric.
pub fn numeric_lifetime(metric: &MetricConfig, logs: &[LogEntry]) -> NumericLifetimeStats {
    let rows = rows_for(metric, logs);
    let coverage = Coverage::of(&rows);
    let values = ValueStats::from_rows(rows.iter().copied());

    NumericLifetimeStats {
        metric_id: metric.metric_id.clone(),
        metric_name: metric.metric_name.clone(),
        private: metric.private,
        first_date: coverage.first,
        last_date: coverage.last,
        days_on_record: coverage.days_on_record(),
        days_tracked: coverage.days_tracked,
        value_count: values.count,
        avg_value: values.mean(),
        stddev_value: values.sample_stddev(),
        min_value: values.min.map(|(v, _)| v),
        min_value_date: values.min.map(|(_, d)| d),
        max_value: values.max.map(|(v, _)| v),
        max_value_date: values.max.map(|(_, d)| d),
    }
}

/// Numeric stats over `[today - (window_days - 1), today]`.
pub fn numeric_recent(
    metric: &MetricConfig,
    logs: &[LogEntry],
    window_days: u32,
    today: NaiveDate,
) -> NumericRecentStats {
    let start = add_days(today, -(i64::from(window_days.max(1)) - 1));
    let rows: Vec<&LogEntry> = rows_for(metric, logs)
        .into_iter()
        .filter(|r| r.date >= start && r.date <= today)
        .collect();
    let coverage = Coverage::of(&rows);
    let values = ValueStats::from_rows(rows.iter().copied());

    NumericRecentStats {
        metric_id: metric.metric_id.clone(),
        metric_name: metric.metric_name.clone(),
        private: metric.private,
        window_days,
        days_tracked_recent: coverage.days_tracked,
        value_count_recent: values.count,
        avg_value_recent: values.mean(),
        stddev_value_recent: values.sample_stddev(),
        min_value_recent: values.min.map(|(v, _)| v),
        max_value_recent: values.max.map(|(v, _)| v),
        first_date_recent: coverage.first,
        last_date_recent: coverage.last,
    }
}

/// Build the full stats report for every active metric.
pub fn build_stats_report(
    metrics: &[MetricConfig],
    logs: &[LogEntry],
    windows: &[u32],
    today: NaiveDate,
) -> StatsReport {
    let mut active: Vec<&MetricConfig> = metrics.iter().filter(|m| m.active).collect();
    active.sort_by(|a, b| a.metric_id.cmp(&b.metric_id));

    let mut windows: Vec<u32> = windows.iter().copied().filter(|w| *w > 0).collect();
    windows.sort_unstable();
    windows.dedup();

    let checkbox_lifetime = active
        .iter()
        .filter(|m| !m.metric_type.is_numeric())
        .map(|m| checkbox_lifetime(m, logs))
        .collect();

    let numeric: Vec<&MetricConfig> = active.iter().copied().filter(|m| m.metric_type.is_numeric()).collect();

    let numeric_lifetime = numeric.iter().map(|m| numeric_lifetime(m, logs)).collect();

    let numeric_recent = numeric
        .iter()
        .flat_map(|m| windows.iter().map(move |w| (*m, *w)))
        .map(|(m, w)| numeric_recent(m, logs, w, today))
        .collect();

    StatsReport {
        checkbox_lifetime,
        checkbox_streaks: compute_streaks(metrics, logs, today),
        numeric_lifetime,
        numeric_recent,
    }
}
