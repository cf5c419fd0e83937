//! Checkbox streaks.
//!
//! Walks every calendar day from the first tracked day to today. A day with
//! no row counts as false, which is why this walks the calendar instead of
//! looking only at the sparse true dates.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{day_range, days_between};
use crate::types::{LogEntry, MetricConfig};

/// Streak statistics for one checkbox metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakStats {
    pub metric_id: String,
    pub metric_name: String,
    pub private: bool,
    /// Consecutive true days ending today
    pub current_streak_true: i64,
    /// Longest run of true days ever
    pub longest_streak_true: i64,
    /// Consecutive false (or unlogged) days ending today
    pub current_streak_false: i64,
    pub longest_streak_false: i64,
    pub last_true_date: Option<NaiveDate>,
    /// Days from `last_true_date` to today
    pub days_since_last_true: Option<i64>,
}

impl StreakStats {
    fn empty(metric: &MetricConfig) -> Self {
        Self {
            metric_id: metric.metric_id.clone(),
            metric_name: metric.metric_name.clone(),
            private: metric.private,
            current_streak_true: 0,
            longest_streak_true: 0,
            current_streak_false: 0,
            longest_streak_false: 0,
            last_true_date: None,
            days_since_last_true: None,
        }
    }
}

/// Compute streaks for `metric` as of `today`.
///
/// `logs` may include rows for other metrics; they are ignored, as are rows
/// dated after `today`. A metric with no rows gets an all-zero result.
pub fn compute_streak(metric: &MetricConfig, logs: &[LogEntry], today: NaiveDate) -> StreakStats {
    let mut stats = StreakStats::empty(metric);

    let rows: Vec<&LogEntry> = logs
        .iter()
        .filter(|l| l.metric_id == metric.metric_id && l.date <= today)
        .collect();

    let Some(first_log) = rows.iter().map(|l| l.date).min() else {
        return stats;
    };

    let earliest = match metric.start_date {
        Some(start) => start.min(first_log),
        None => first_log,
    };

    let true_dates: HashSet<NaiveDate> = rows.iter().filter(|l| l.is_true()).map(|l| l.date).collect();

    let mut run_true = 0i64;
    let mut run_false = 0i64;

    for day in day_range(earliest, today) {
        if true_dates.contains(&day) {
            run_true += 1;
            run_false = 0;
            stats.longest_streak_true = stats.longest_streak_true.max(run_true);
            stats.last_true_date = Some(day);
        } else {
            run_false += 1;
            run_true = 0;
            stats.longest_streak_false = stats.longest_streak_false.max(run_false);
        }
    }

    stats.current_streak_true = run_true;
    stats.current_streak_false = run_false;
    stats.days_since_last_true = stats.last_true_date.map(|d| days_between(d, today));

    stats
}

/// Streaks for every active checkbox metric, sorted by `metric_id`.
pub fn compute_streaks(metrics: &[MetricConfig], logs: &[LogEntry], today: NaiveDate) -> Vec<StreakStats> {
    let mut out: Vec<StreakStats> = metrics
        .iter()
        .filter(|m| m.active && !m.metric_type.is_numeric())
        .map(|m| compute_streak(m, logs, today))
        .collect();
    out.sort_by(|a, b| a.metric_id.cmp(&b.metric_id));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::types::{MetricType, NewMetric};

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn checkbox(id: &str) -> MetricConfig {
        NewMetric::new(id, id, MetricType::Checkbox).into()
    }

    #[test]
    fn test_current_and_longest() {
        let m = checkbox("walk");
        let logs = vec![
            LogEntry::new(d("2024-01-01"), "walk", 1.0),
            LogEntry::new(d("2024-01-02"), "walk", 1.0),
            LogEntry::new(d("2024-01-03"), "walk", 0.0),
            LogEntry::new(d("2024-01-04"), "walk", 1.0),
        ];

        let stats = compute_streak(&m, &logs, d("2024-01-04"));
        assert_eq!(stats.current_streak_true, 1);
        assert_eq!(stats.longest_streak_true, 2);
        assert_eq!(stats.current_streak_false, 0);
        assert_eq!(stats.longest_streak_false, 1);
        assert_eq!(stats.last_true_date, Some(d("2024-01-04")));
        assert_eq!(stats.days_since_last_true, Some(0));
    }

    #[test]
    fn test_missing_days_count_as_false() {
        let m = checkbox("walk");
        let logs = vec![
            LogEntry::new(d("2024-01-01"), "walk", 1.0),
            LogEntry::new(d("2024-01-02"), "walk", 1.0),
        ];

        let stats = compute_streak(&m, &logs, d("2024-01-06"));
        assert_eq!(stats.current_streak_true, 0);
        assert_eq!(stats.longest_streak_true, 2);
        assert_eq!(stats.current_streak_false, 4);
        assert_eq!(stats.days_since_last_true, Some(4));
    }

    #[test]
    fn test_start_date_extends_walk_backwards() {
        let mut m = checkbox("walk");
        m.start_date = Some(d("2023-12-25"));
        let logs = vec![LogEntry::new(d("2024-01-01"), "walk", 1.0)];

        let stats = compute_streak(&m, &logs, d("2024-01-01"));
        assert_eq!(stats.longest_streak_false, 7);
        assert_eq!(stats.current_streak_true, 1);
    }

    #[test]
    fn test_no_rows() {
        let m = checkbox("walk");
        let other = vec![LogEntry::new(d("2024-01-01"), "gym", 1.0)];

        let stats = compute_streak(&m, &other, d("2024-01-04"));
        assert_eq!(stats, StreakStats::empty(&m));
    }

    #[test]
    fn test_rows_after_today_are_ignored() {
        let m = checkbox("walk");
        let logs = vec![
            LogEntry::new(d("2024-01-03"), "walk", 1.0),
            LogEntry::new(d("2024-01-05"), "walk", 1.0),
        ];

        let stats = compute_streak(&m, &logs, d("2024-01-04"));
        assert_eq!(stats.last_true_date, Some(d("2024-01-03")));
        assert_eq!(stats.current_streak_false, 1);
    }

    #[test]
    fn test_compute_streaks_only_active_checkboxes() {
        let mut inactive = checkbox("old");
        inactive.active = false;
        let metrics = vec![
            checkbox("b"),
            checkbox("a"),
            inactive,
            NewMetric::new("n", "n", MetricType::Number).into(),
        ];

        let all = compute_streaks(&metrics, &[], d("2024-01-04"));
        let ids: Vec<_> = all.iter().map(|s| s.metric_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
