//! Database-backed entry points for the analytics engines.
//!
//! Each function fetches the owner's rows it needs and hands them to the
//! matching pure engine. Fetch failures propagate; the engines never fail.

use chrono::NaiveDate;

use super::hints::{compute_date_hints, DateHints};
use super::lifetime::{build_stats_report, StatsReport};
use super::moving_average::{moving_average, raw_series, validate_period, MaSeries};
use super::streaks::{compute_streaks, StreakStats};
use super::summary::{summarize_7d, summary_window, SummaryRow};
use crate::db::{Database, LogFilter, MetricFilter};
use crate::error::{Error, Result};

/// Date hints for `owner` as of `today`.
pub fn date_hints_report(db: &Database, owner: &str, today: NaiveDate) -> Result<DateHints> {
    let metrics = db.list_metrics(owner, &MetricFilter::active())?;
    let logs = db.list_logs(owner, &LogFilter::default())?;
    Ok(compute_date_hints(today, &metrics, &logs))
}

/// 7-day summary for the window ending at `min(requested, today)`.
pub fn summary_report(
    db: &Database,
    owner: &str,
    requested: NaiveDate,
    today: NaiveDate,
) -> Result<Vec<SummaryRow>> {
    let metrics = db.list_metrics(
        owner,
        &MetricFilter {
            active: Some(true),
            private: Some(false),
            ..Default::default()
        },
    )?;
    if metrics.is_empty() {
        return Ok(Vec::new());
    }

    let (start, end) = summary_window(requested, today);
    let logs = db.list_logs(
        owner,
        &LogFilter {
            from: Some(start),
            to: Some(end),
            metric_ids: Some(metrics.iter().map(|m| m.metric_id.clone()).collect()),
            ..Default::default()
        },
    )?;

    Ok(summarize_7d(&metrics, &logs, requested, today))
}

/// Streaks for every active checkbox metric.
pub fn streaks_report(db: &Database, owner: &str, today: NaiveDate) -> Result<Vec<StreakStats>> {
    let metrics = db.list_metrics(owner, &MetricFilter::active())?;
    let logs = db.list_logs(owner, &LogFilter::default())?;
    Ok(compute_streaks(&metrics, &logs, today))
}

/// Lifetime, streak and recent-window stats for every active metric.
pub fn stats_report(db: &Database, owner: &str, windows: &[u32], today: NaiveDate) -> Result<StatsReport> {
    let metrics = db.list_metrics(owner, &MetricFilter::active())?;
    let logs = db.list_logs(owner, &LogFilter::default())?;

    let report = build_stats_report(&metrics, &logs, windows, today);
    tracing::debug!(
        owner,
        checkbox = report.checkbox_lifetime.len(),
        numeric = report.numeric_lifetime.len(),
        "Built stats report"
    );
    Ok(report)
}

/// Moving average and raw series for one metric.
pub fn ma_report(db: &Database, owner: &str, metric_id: &str, period: u32) -> Result<MaSeries> {
    validate_period(period)?;

    if db.get_metric(owner, metric_id)?.is_none() {
        return Err(Error::MetricNotFound(metric_id.to_string()));
    }

    let logs = db.list_logs(owner, &LogFilter::metric(metric_id))?;
    Ok(MaSeries {
        ma: moving_average(metric_id, &logs, period)?,
        raw: raw_series(metric_id, &logs),
    })
}
