//! Trailing 7-day summary shown under the log form.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::add_days;
use crate::types::{LogEntry, MetricConfig, MetricType};

/// Days in the summary window, including the end date.
pub const SUMMARY_WINDOW_DAYS: i64 = 7;

/// One metric's aggregate over the summary window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub metric_id: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    /// Checkbox: true rows. Numeric: rows with a finite value.
    pub n_rows: i64,
    pub sum_7d: Option<f64>,
    pub count_true_7d: Option<i64>,
    pub avg_7d: Option<f64>,
}

impl SummaryRow {
    fn empty(metric: &MetricConfig) -> Self {
        Self {
            metric_id: metric.metric_id.clone(),
            metric_type: metric.metric_type,
            n_rows: 0,
            sum_7d: None,
            count_true_7d: None,
            avg_7d: None,
        }
    }
}

/// Inclusive `(start, end)` bounds of the window ending at `requested`,
/// with the end clamped to `today`.
pub fn summary_window(requested: NaiveDate, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let end = requested.min(today);
    (add_days(end, -(SUMMARY_WINDOW_DAYS - 1)), end)
}

/// Summarize the window ending at `min(requested, today)` for every active,
/// non-private metric. Sorted by `(type, metric_id)`.
pub fn summarize_7d(
    metrics: &[MetricConfig],
    logs: &[LogEntry],
    requested: NaiveDate,
    today: NaiveDate,
) -> Vec<SummaryRow> {
    let (start, end) = summary_window(requested, today);

    let mut by_metric: HashMap<&str, Vec<f64>> = HashMap::new();
    for log in logs.iter().filter(|l| l.date >= start && l.date <= end) {
        by_metric.entry(log.metric_id.as_str()).or_default().push(log.value);
    }

    let mut rows: Vec<SummaryRow> = metrics
        .iter()
        .filter(|m| m.active && !m.private)
        .map(|m| {
            let mut row = SummaryRow::empty(m);
            let Some(values) = by_metric.get(m.metric_id.as_str()) else {
                return row;
            };

            if m.metric_type == MetricType::Checkbox {
                let count_true = values.iter().filter(|v| **v != 0.0 && !v.is_nan()).count() as i64;
                row.n_rows = count_true;
                row.count_true_7d = Some(count_true);
            } else {
                let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
                row.n_rows = finite.len() as i64;
                if !finite.is_empty() {
                    let sum: f64 = finite.iter().sum();
                    row.sum_7d = Some(sum);
                    row.avg_7d = Some(sum / finite.len() as f64);
                }
            }
            row
        })
        .collect();

    rows.sort_by(|a, b| {
        a.metric_type
            .as_str()
            .cmp(b.metric_type.as_str())
            .then_with(|| a.metric_id.cmp(&b.metric_id))
    });

    tracing::debug!(start = %start, end = %end, metrics = rows.len(), "Computed 7-day summary");

    rows
}
