//! Completion tracking and the "which day should I log next" hint.
//!
//! A day is complete when every required metric has a row for it. The hint
//! points at the day after the last complete day, never later than today.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{add_days, days_between};
use crate::types::{LogEntry, MetricConfig};

/// Logging progress for one owner as of `today`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateHints {
    pub today: NaiveDate,
    /// Latest date with any row, for any metric
    pub last_log_date: Option<NaiveDate>,
    /// Latest date on which every required metric was logged
    pub last_required_complete_date: Option<NaiveDate>,
    /// Day the log form should open on; never after `today`
    pub suggested_date: NaiveDate,
    /// Days strictly between the last complete day and today
    pub missing_required_days: i64,
    pub required_days_completed: i64,
    pub required_days_possible: i64,
}

impl DateHints {
    fn empty(today: NaiveDate, last_log_date: Option<NaiveDate>) -> Self {
        Self {
            today,
            last_log_date,
            last_required_complete_date: None,
            suggested_date: today,
            missing_required_days: 0,
            required_days_completed: 0,
            required_days_possible: 0,
        }
    }

    /// Share of possible required days that were completed, `0.0..=1.0`.
    pub fn completion_ratio(&self) -> f64 {
        if self.required_days_possible <= 0 {
            0.0
        } else {
            self.required_days_completed as f64 / self.required_days_possible as f64
        }
    }
}

/// Compute date hints from an owner's metric definitions and log rows.
///
/// `metrics` may contain every definition; only active, required,
/// non-calculated ones form the required set. `logs` should contain all of
/// the owner's rows so `last_log_date` covers every metric.
pub fn compute_date_hints(today: NaiveDate, metrics: &[MetricConfig], logs: &[LogEntry]) -> DateHints {
    let last_log_date = logs.iter().map(|l| l.date).max();

    let required: Vec<&MetricConfig> = metrics.iter().filter(|m| m.counts_as_required()).collect();
    if required.is_empty() {
        return DateHints::empty(today, last_log_date);
    }

    let mut hints = DateHints::empty(today, last_log_date);

    if let Some(start) = required.iter().filter_map(|m| m.effective_required_start()).min() {
        let required_ids: HashSet<&str> = required.iter().map(|m| m.metric_id.as_str()).collect();

        let mut by_date: BTreeMap<NaiveDate, HashSet<&str>> = BTreeMap::new();
        for log in logs {
            if log.date >= start && required_ids.contains(log.metric_id.as_str()) {
                by_date.entry(log.date).or_default().insert(log.metric_id.as_str());
            }
        }

        let complete_dates: Vec<NaiveDate> = by_date
            .iter()
            .filter(|(_, ids)| ids.len() == required_ids.len())
            .map(|(date, _)| *date)
            .collect();

        hints.last_required_complete_date = complete_dates.last().copied();
        hints.required_days_possible = (days_between(start, today) + 1).max(0);
        hints.required_days_completed =
            complete_dates.iter().filter(|d| **d <= today).count() as i64;
    }

    hints.suggested_date = match (hints.last_required_complete_date, last_log_date) {
        (Some(complete), _) => {
            hints.missing_required_days = (days_between(complete, today) - 1).max(0);
            add_days(complete, 1).min(today)
        }
        (None, Some(last)) => last.min(today),
        (None, None) => today,
    };

    tracing::debug!(
        today = %today,
        suggested = %hints.suggested_date,
        missing = hints.missing_required_days,
        "Computed date hints"
    );

    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::types::{MetricType, NewMetric};

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn required(id: &str, start: &str) -> MetricConfig {
        let mut m = NewMetric::new(id, id, MetricType::Checkbox);
        m.required = true;
        m.start_date = Some(d(start));
        m.into()
    }

    fn log(date: &str, id: &str) -> LogEntry {
        LogEntry::new(d(date), id, 1.0)
    }

    #[test]
    fn test_gap_after_last_complete_day() {
        let metrics = vec![required("a", "2024-03-01"), required("b", "2024-03-01")];
        let logs = vec![
            log("2024-03-01", "a"),
            log("2024-03-01", "b"),
            log("2024-03-02", "a"),
            log("2024-03-02", "b"),
            log("2024-03-03", "a"),
        ];

        let hints = compute_date_hints(d("2024-03-05"), &metrics, &logs);
        assert_eq!(hints.last_log_date, Some(d("2024-03-03")));
        assert_eq!(hints.last_required_complete_date, Some(d("2024-03-02")));
        assert_eq!(hints.missing_required_days, 2);
        assert_eq!(hints.suggested_date, d("2024-03-03"));
        assert_eq!(hints.required_days_possible, 5);
        assert_eq!(hints.required_days_completed, 2);
    }

    #[test]
    fn test_no_required_metrics() {
        let mut optional: MetricConfig = NewMetric::new("x", "X", MetricType::Number).into();
        optional.start_date = Some(d("2024-01-01"));
        let logs = vec![log("2024-01-10", "x")];

        let hints = compute_date_hints(d("2024-02-01"), &[optional], &logs);
        assert_eq!(hints.missing_required_days, 0);
        assert_eq!(hints.suggested_date, d("2024-02-01"));
        assert_eq!(hints.required_days_possible, 0);
        assert_eq!(hints.required_days_completed, 0);
        assert_eq!(hints.last_log_date, Some(d("2024-01-10")));
    }

    #[test]
    fn test_calculated_and_inactive_metrics_are_not_required() {
        let mut calc = required("calc", "2024-01-01");
        calc.is_calculated = true;
        let mut inactive = required("old", "2024-01-01");
        inactive.active = false;
        let metrics = vec![required("a", "2024-01-01"), calc, inactive];

        let hints = compute_date_hints(d("2024-01-02"), &metrics, &[log("2024-01-01", "a")]);
        assert_eq!(hints.last_required_complete_date, Some(d("2024-01-01")));
        assert_eq!(hints.suggested_date, d("2024-01-02"));
        assert_eq!(hints.missing_required_days, 0);
    }

    #[test]
    fn test_no_resolvable_start_falls_back_to_last_log() {
        let mut m: MetricConfig = NewMetric::new("a", "A", MetricType::Checkbox).into();
        m.required = true;
        let logs = vec![log("2024-01-05", "a")];

        let hints = compute_date_hints(d("2024-01-09"), &[m], &logs);
        assert_eq!(hints.last_required_complete_date, None);
        assert_eq!(hints.missing_required_days, 0);
        assert_eq!(hints.suggested_date, d("2024-01-05"));
        assert_eq!(hints.required_days_possible, 0);
    }

    #[test]
    fn test_required_since_overrides_start_date() {
        let mut a = required("a", "2024-01-01");
        a.required_since = Some(d("2024-01-08"));
        let logs = vec![log("2024-01-03", "a"), log("2024-01-09", "a")];

        let hints = compute_date_hints(d("2024-01-10"), &[a], &logs);
        assert_eq!(hints.required_days_possible, 3);
        assert_eq!(hints.required_days_completed, 1);
        assert_eq!(hints.last_required_complete_date, Some(d("2024-01-09")));
    }

    #[test]
    fn test_suggested_date_never_after_today() {
        let metrics = vec![required("a", "2024-01-01")];

        // Complete today: next day would be tomorrow
        let hints = compute_date_hints(d("2024-01-05"), &metrics, &[log("2024-01-05", "a")]);
        assert_eq!(hints.suggested_date, d("2024-01-05"));
        assert_eq!(hints.missing_required_days, 0);

        // Rows logged in the future
        let hints = compute_date_hints(d("2024-01-05"), &metrics, &[log("2024-02-01", "a")]);
        assert!(hints.suggested_date <= hints.today);
        assert_eq!(hints.required_days_completed, 0);

        // Required start after today
        let late = vec![required("a", "2024-06-01")];
        let hints = compute_date_hints(d("2024-01-05"), &late, &[]);
        assert_eq!(hints.required_days_possible, 0);
        assert_eq!(hints.suggested_date, d("2024-01-05"));
    }

    #[test]
    fn test_idempotent() {
        let metrics = vec![required("a", "2024-03-01"), required("b", "2024-03-01")];
        let logs = vec![log("2024-03-01", "a"), log("2024-03-01", "b")];
        let first = serde_json::to_string(&compute_date_hints(d("2024-03-04"), &metrics, &logs)).unwrap();
        let second = serde_json::to_string(&compute_date_hints(d("2024-03-04"), &metrics, &logs)).unwrap();
        assert_eq!(first, second);
    }
}
