//! Day-level logging workflow: what the form shows and what a save accepts.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analytics::expr::{calculated_values, NumericContext};
use crate::db::{Database, LogFilter, MetricFilter, SaveSummary};
use crate::error::{Error, Result};
use crate::format::format_value;
use crate::types::{LogEntry, LogWrite, MetricConfig, MetricType};
use crate::validate::{parse_input, validate_value};

/// Where a form field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Logged,
    Default,
    Calculated,
    Empty,
}

/// One metric's row in the daily log form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub metric_id: String,
    pub metric_name: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub group: Option<String>,
    pub required: bool,
    pub value: Option<f64>,
    pub source: ValueSource,
}

impl FormField {
    /// Value formatted the way it is entered, or `None` when empty.
    pub fn display(&self) -> Option<String> {
        self.value.map(|v| format_value(self.metric_type, v))
    }
}

/// Build the log form for one day.
///
/// `metrics` should already be in display order; inactive ones are skipped.
/// Unlogged fields fall back to `default_value` (a checkbox default counts
/// as checked at `>= 0.5`). Calculated fields are evaluated over the values
/// the form shows, defaults included.
pub fn day_form(metrics: &[MetricConfig], logs_for_day: &[LogEntry]) -> Vec<FormField> {
    let logged: HashMap<&str, f64> = logs_for_day
        .iter()
        .map(|l| (l.metric_id.as_str(), l.value))
        .collect();

    let active: Vec<&MetricConfig> = metrics.iter().filter(|m| m.active).collect();

    let mut fields: Vec<FormField> = active
        .iter()
        .map(|m| {
            let (value, source) = match (logged.get(m.metric_id.as_str()), m.default_value) {
                (Some(v), _) => (Some(*v), ValueSource::Logged),
                (None, Some(default)) if m.metric_type == MetricType::Checkbox => {
                    (Some(if default >= 0.5 { 1.0 } else { 0.0 }), ValueSource::Default)
                }
                (None, Some(default)) => (Some(default), ValueSource::Default),
                (None, None) => (None, ValueSource::Empty),
            };
            FormField {
                metric_id: m.metric_id.clone(),
                metric_name: m.metric_name.clone(),
                metric_type: m.metric_type,
                group: m.group.clone(),
                required: m.counts_as_required(),
                value,
                source,
            }
        })
        .collect();

    let shown: Vec<LogEntry> = fields
        .iter()
        .filter_map(|f| {
            f.value.map(|v| LogEntry {
                date: NaiveDate::MIN,
                metric_id: f.metric_id.clone(),
                value: v,
            })
        })
        .collect();
    let owned: Vec<MetricConfig> = active.iter().map(|m| (*m).clone()).collect();
    let ctx = NumericContext::from_day(&owned, &shown);

    for (metric_id, value) in calculated_values(&owned, &ctx) {
        if let Some(field) = fields.iter_mut().find(|f| f.metric_id == metric_id) {
            field.value = value;
            field.source = if value.is_some() {
                ValueSource::Calculated
            } else {
                ValueSource::Empty
            };
        }
    }

    fields
}

/// Load the form for `date` from the database.
pub fn load_day_form(db: &Database, owner: &str, date: NaiveDate) -> Result<Vec<FormField>> {
    let metrics = db.list_metrics(owner, &MetricFilter::active())?;
    let logs = db.list_logs(owner, &LogFilter::on(date))?;
    Ok(day_form(&metrics, &logs))
}

/// Validate and save one day's values.
///
/// Every entry is checked before anything is written: unknown metrics,
/// calculated metrics and out-of-bounds values reject the whole batch.
pub fn save_entries(
    db: &Database,
    owner: &str,
    date: NaiveDate,
    entries: &[LogWrite],
) -> Result<SaveSummary> {
    let metrics: HashMap<String, MetricConfig> = db
        .list_metrics(owner, &MetricFilter::default())?
        .into_iter()
        .map(|m| (m.metric_id.clone(), m))
        .collect();

    for entry in entries {
        let metric = metrics
            .get(&entry.metric_id)
            .ok_or_else(|| Error::MetricNotFound(entry.metric_id.clone()))?;

        if metric.is_calculated {
            return Err(Error::InvalidValue {
                metric_id: metric.metric_id.clone(),
                message: "calculated metrics cannot be logged directly".to_string(),
            });
        }

        if let Some(value) = entry.value {
            validate_value(metric, value)?;
        }
    }

    db.save_log(owner, date, entries)
}

/// Parse raw `(metric_id, input)` pairs and save them.
///
/// Blank input clears the metric for the day.
pub fn save_inputs(
    db: &Database,
    owner: &str,
    date: NaiveDate,
    inputs: &[(String, String)],
) -> Result<SaveSummary> {
    let mut entries = Vec::with_capacity(inputs.len());
    for (metric_id, raw) in inputs {
        let metric = db
            .get_metric(owner, metric_id)?
            .ok_or_else(|| Error::MetricNotFound(metric_id.clone()))?;
        entries.push(LogWrite {
            metric_id: metric_id.clone(),
            value: parse_input(&metric, raw)?,
        });
    }
    save_entries(db, owner, date, &entries)
}
