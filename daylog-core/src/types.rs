//! Core domain types for daylog
//!
//! These types mirror the two stored tables (`config` and `log`) and the
//! write requests accepted for them. Everything the analytics engines
//! derive lives in [`crate::analytics`].
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Owner** | The identity whose metrics and logs are being read or written |
//! | **Metric** | A named, typed quantity logged at most once per day |
//! | **Required metric** | A metric whose presence counts toward day completion |
//! | **Calculated metric** | A metric derived from an expression over other metrics |
//! | **Completion day** | A day on which every required metric has a logged value |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================
// Metric types
// ============================================

/// How a metric's value is entered and displayed.
///
/// `time` and `hhmm` are both stored as minutes since midnight; they differ
/// only in input/display formatting. `checkbox` values are stored as 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Checkbox,
    Number,
    Time,
    Hhmm,
}

impl MetricType {
    /// Returns the identifier used in database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Checkbox => "checkbox",
            MetricType::Number => "number",
            MetricType::Time => "time",
            MetricType::Hhmm => "hhmm",
        }
    }

    /// Whether values of this type are aggregated as plain numbers.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, MetricType::Checkbox)
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checkbox" => Ok(MetricType::Checkbox),
            "number" => Ok(MetricType::Number),
            "time" => Ok(MetricType::Time),
            "hhmm" => Ok(MetricType::Hhmm),
            _ => Err(format!("unknown metric type: {}", s)),
        }
    }
}

// ============================================
// Metric configuration
// ============================================

/// One metric definition owned by a single owner (a `config` row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Unique per owner, immutable, `[A-Za-z0-9_]+`
    pub metric_id: String,
    /// Display name
    pub metric_name: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    /// Inactive metrics are hidden from forms and most stats
    pub active: bool,
    /// Private metrics are hidden from shared/summary views
    pub private: bool,
    /// Counts toward required-day completion
    pub required: bool,
    /// Date from which the metric counts as required
    pub required_since: Option<NaiveDate>,
    /// First date the metric is considered active for logging
    pub start_date: Option<NaiveDate>,
    /// Pre-filled when no value is logged for the day
    pub default_value: Option<f64>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    /// Comma-separated blacklist of numeric values
    pub disallowed_values: Option<String>,
    pub show_ma: bool,
    pub ma_periods_csv: Option<String>,
    pub group: Option<String>,
    pub group_order: Option<i64>,
    pub metric_order: Option<i64>,
    /// Value is derived from `calc_expr` rather than entered
    pub is_calculated: bool,
    pub calc_expr: Option<String>,
}

impl MetricConfig {
    /// Date from which this metric counts toward completion:
    /// `required_since`, falling back to `start_date`.
    pub fn effective_required_start(&self) -> Option<NaiveDate> {
        self.required_since.or(self.start_date)
    }

    /// Whether this metric participates in required-day completion.
    ///
    /// Calculated metrics are never entered directly, so they are never
    /// enforced even if flagged as required.
    pub fn counts_as_required(&self) -> bool {
        self.active && self.required && !self.is_calculated
    }

    /// Non-blank calculation expression, if this is a calculated metric.
    pub fn expression(&self) -> Option<&str> {
        if !self.is_calculated {
            return None;
        }
        self.calc_expr
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    /// Moving-average periods parsed from `ma_periods_csv`.
    ///
    /// Unparseable or non-positive entries are skipped; duplicates are removed
    /// while keeping the configured order.
    pub fn ma_periods(&self) -> Vec<u32> {
        let mut seen = HashSet::new();
        self.ma_periods_csv
            .as_deref()
            .unwrap_or("")
            .split(',')
            .filter_map(|part| part.trim().parse::<u32>().ok())
            .filter(|p| *p > 0 && seen.insert(*p))
            .collect()
    }

    /// Values rejected by `disallowed_values`.
    pub fn disallowed_set(&self) -> Vec<f64> {
        self.disallowed_values
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<f64>().ok())
            .filter(|n| n.is_finite())
            .collect()
    }
}

/// Fields accepted when creating a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMetric {
    pub metric_id: String,
    pub metric_name: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    #[serde(default)]
    pub private: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub required_since: Option<NaiveDate>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub default_value: Option<f64>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub disallowed_values: Option<String>,
    #[serde(default)]
    pub show_ma: bool,
    #[serde(default)]
    pub ma_periods_csv: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub group_order: Option<i64>,
    #[serde(default)]
    pub metric_order: Option<i64>,
    #[serde(default)]
    pub is_calculated: bool,
    #[serde(default)]
    pub calc_expr: Option<String>,
}

fn default_true() -> bool {
    true
}

impl NewMetric {
    /// A new active metric with every optional field unset.
    pub fn new(metric_id: &str, metric_name: &str, metric_type: MetricType) -> Self {
        Self {
            metric_id: metric_id.to_string(),
            metric_name: metric_name.to_string(),
            metric_type,
            private: false,
            active: true,
            required: false,
            required_since: None,
            start_date: None,
            default_value: None,
            min_value: None,
            max_value: None,
            disallowed_values: None,
            show_ma: false,
            ma_periods_csv: None,
            group: None,
            group_order: None,
            metric_order: None,
            is_calculated: false,
            calc_expr: None,
        }
    }
}

impl From<NewMetric> for MetricConfig {
    fn from(m: NewMetric) -> Self {
        Self {
            metric_id: m.metric_id,
            metric_name: m.metric_name,
            metric_type: m.metric_type,
            active: m.active,
            private: m.private,
            required: m.required,
            required_since: m.required_since,
            start_date: m.start_date,
            default_value: m.default_value,
            min_value: m.min_value,
            max_value: m.max_value,
            disallowed_values: m.disallowed_values,
            show_ma: m.show_ma,
            ma_periods_csv: m.ma_periods_csv,
            group: m.group,
            group_order: m.group_order,
            metric_order: m.metric_order,
            is_calculated: m.is_calculated,
            calc_expr: m.calc_expr,
        }
    }
}

/// Partial update of a metric definition.
///
/// `None` leaves a field unchanged. For nullable columns, `Some(None)` clears
/// the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricUpdate {
    pub metric_name: Option<String>,
    pub metric_type: Option<MetricType>,
    pub private: Option<bool>,
    pub active: Option<bool>,
    pub required: Option<bool>,
    pub required_since: Option<Option<NaiveDate>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub default_value: Option<Option<f64>>,
    pub min_value: Option<Option<f64>>,
    pub max_value: Option<Option<f64>>,
    pub disallowed_values: Option<Option<String>>,
    pub show_ma: Option<bool>,
    pub ma_periods_csv: Option<Option<String>>,
    pub group: Option<Option<String>>,
    pub group_order: Option<Option<i64>>,
    pub metric_order: Option<Option<i64>>,
    pub is_calculated: Option<bool>,
    pub calc_expr: Option<Option<String>>,
}

impl MetricUpdate {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        *self == MetricUpdate::default()
    }
}

// ============================================
// Log entries
// ============================================

/// One logged value (a `log` row) for the current owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub date: NaiveDate,
    pub metric_id: String,
    pub value: f64,
}

impl LogEntry {
    pub fn new(date: NaiveDate, metric_id: &str, value: f64) -> Self {
        Self {
            date,
            metric_id: metric_id.to_string(),
            value,
        }
    }

    /// Checkbox truthiness: any nonzero, non-NaN value.
    pub fn is_true(&self) -> bool {
        self.value != 0.0 && !self.value.is_nan()
    }
}

/// A value to save for one metric on one day. `None` clears the day's row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogWrite {
    pub metric_id: String,
    pub value: Option<f64>,
}

impl LogWrite {
    pub fn set(metric_id: &str, value: f64) -> Self {
        Self {
            metric_id: metric_id.to_string(),
            value: Some(value),
        }
    }

    pub fn clear(metric_id: &str) -> Self {
        Self {
            metric_id: metric_id.to_string(),
            value: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric() -> MetricConfig {
        MetricConfig {
            metric_id: "sleep".to_string(),
            metric_name: "Sleep".to_string(),
            metric_type: MetricType::Number,
            active: true,
            private: false,
            required: true,
            required_since: None,
            start_date: None,
            default_value: None,
            min_value: None,
            max_value: None,
            disallowed_values: None,
            show_ma: false,
            ma_periods_csv: None,
            group: None,
            group_order: None,
            metric_order: None,
            is_calculated: false,
            calc_expr: None,
        }
    }

    #[test]
    fn test_metric_type_round_trip() {
        for t in [
            MetricType::Checkbox,
            MetricType::Number,
            MetricType::Time,
            MetricType::Hhmm,
        ] {
            assert_eq!(t.as_str().parse::<MetricType>().unwrap(), t);
        }
        assert!("integer".parse::<MetricType>().is_err());
    }

    #[test]
    fn test_effective_required_start_falls_back() {
        let mut m = metric();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let since = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(m.effective_required_start(), None);

        m.start_date = Some(start);
        assert_eq!(m.effective_required_start(), Some(start));

        m.required_since = Some(since);
        assert_eq!(m.effective_required_start(), Some(since));
    }

    #[test]
    fn test_calculated_metrics_never_required() {
        let mut m = metric();
        assert!(m.counts_as_required());
        m.is_calculated = true;
        assert!(!m.counts_as_required());
        m.is_calculated = false;
        m.active = false;
        assert!(!m.counts_as_required());
    }

    #[test]
    fn test_ma_periods_parsing() {
        let mut m = metric();
        m.ma_periods_csv = Some(" 7, 30,abc,0,30 ,90".to_string());
        assert_eq!(m.ma_periods(), vec![7, 30, 90]);
    }

    #[test]
    fn test_disallowed_set() {
        let mut m = metric();
        m.disallowed_values = Some("0, 2.5,,x".to_string());
        assert_eq!(m.disallowed_set(), vec![0.0, 2.5]);
    }

    #[test]
    fn test_config_serializes_type_field() {
        let json = serde_json::to_value(metric()).unwrap();
        assert_eq!(json["type"], "number");
        assert!(json.get("metric_type").is_none());
    }

    #[test]
    fn test_metric_update_is_empty() {
        assert!(MetricUpdate::default().is_empty());
        let update = MetricUpdate {
            start_date: Some(None),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
