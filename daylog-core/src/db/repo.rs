//! Database repository layer
//!
//! Owner-scoped reads and writes for the `config` and `log` tables. Every
//! query takes the owner id explicitly; nothing here ever returns rows from
//! more than one owner.

use crate::dates::{format_date, parse_date};
use crate::error::{Error, Result};
use crate::types::*;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, ToSql};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Outcome of a [`Database::save_log`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Rows inserted or overwritten
    pub upserted: usize,
    /// Rows removed because their value was cleared
    pub deleted: usize,
    /// Metrics whose `start_date` was filled in by this save
    pub start_dates_set: usize,
}

/// Database handle over a single SQLite connection
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn();
        super::schema::run_migrations(&conn)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves SQLite itself consistent.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ============================================
    // Metric configuration
    // ============================================

    /// List an owner's metrics, sorted by `(group_order, group, metric_order, metric_id)`.
    pub fn list_metrics(&self, owner: &str, filter: &MetricFilter) -> Result<Vec<MetricConfig>> {
        let conn = self.conn();

        let mut sql = String::from("SELECT * FROM config WHERE owner_id = ?");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(owner.to_string())];

        if let Some(active) = filter.active {
            sql.push_str(" AND active = ?");
            params.push(Box::new(active));
        }
        if let Some(required) = filter.required {
            sql.push_str(" AND required = ?");
            params.push(Box::new(required));
        }
        if let Some(private) = filter.private {
            sql.push_str(" AND private = ?");
            params.push(Box::new(private));
        }
        if let Some(metric_type) = filter.metric_type {
            sql.push_str(" AND type = ?");
            params.push(Box::new(metric_type.as_str().to_string()));
        }

        // SQLite sorts NULLs first in ascending order
        sql.push_str(r#" ORDER BY group_order ASC, "group" ASC, metric_order ASC, metric_id ASC"#);

        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let metrics = stmt
            .query_map(params_refs.as_slice(), Self::row_to_metric)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(metrics)
    }

    /// Get one metric definition
    pub fn get_metric(&self, owner: &str, metric_id: &str) -> Result<Option<MetricConfig>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT * FROM config WHERE owner_id = ? AND metric_id = ?",
            [owner, metric_id],
            Self::row_to_metric,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Insert a new metric definition.
    ///
    /// Returns [`Error::DuplicateMetric`] if the owner already has this `metric_id`.
    pub fn insert_metric(&self, owner: &str, metric: &NewMetric) -> Result<()> {
        crate::validate::validate_new_metric(metric)?;

        let conn = self.conn();
        let inserted = conn.execute(
            r#"
            INSERT INTO config (owner_id, metric_id, metric_name, type, active, private,
                                required, required_since, start_date, default_value,
                                min_value, max_value, disallowed_values, show_ma,
                                ma_periods_csv, "group", group_order, metric_order,
                                is_calculated, calc_expr)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                    ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
            "#,
            params![
                owner,
                metric.metric_id,
                metric.metric_name.trim(),
                metric.metric_type.as_str(),
                metric.active,
                metric.private,
                metric.required,
                metric.required_since.map(format_date),
                metric.start_date.map(format_date),
                metric.default_value,
                metric.min_value,
                metric.max_value,
                metric.disallowed_values,
                metric.show_ma,
                metric.ma_periods_csv,
                metric.group,
                metric.group_order,
                metric.metric_order,
                metric.is_calculated,
                metric.calc_expr,
            ],
        );

        match inserted {
            Ok(_) => {
                tracing::info!(owner, metric_id = %metric.metric_id, "Metric created");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(Error::DuplicateMetric(metric.metric_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Update any subset of a metric's fields.
    pub fn update_metric(&self, owner: &str, metric_id: &str, update: &MetricUpdate) -> Result<()> {
        if let Some(name) = &update.metric_name {
            if name.trim().is_empty() {
                return Err(Error::InvalidMetric("metric_name must not be empty".to_string()));
            }
        }

        if update.min_value.is_some() || update.max_value.is_some() {
            let current = self
                .get_metric(owner, metric_id)?
                .ok_or_else(|| Error::MetricNotFound(metric_id.to_string()))?;
            let min = update.min_value.unwrap_or(current.min_value);
            let max = update.max_value.unwrap_or(current.max_value);
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(Error::InvalidMetric(format!(
                        "min_value {} is greater than max_value {}",
                        min, max
                    )));
                }
            }
        }

        let mut sets: Vec<&'static str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        macro_rules! set {
            ($field:expr, $column:literal, $map:expr) => {
                if let Some(v) = &$field {
                    sets.push(concat!($column, " = ?"));
                    params.push(Box::new(($map)(v.clone())));
                }
            };
        }

        set!(update.metric_name, "metric_name", |v: String| v.trim().to_string());
        set!(update.metric_type, "type", |v: MetricType| v.as_str().to_string());
        set!(update.private, "private", |v: bool| v);
        set!(update.active, "active", |v: bool| v);
        set!(update.required, "required", |v: bool| v);
        set!(update.required_since, "required_since", |v: Option<NaiveDate>| v
            .map(format_date));
        set!(update.start_date, "start_date", |v: Option<NaiveDate>| v.map(format_date));
        set!(update.default_value, "default_value", |v: Option<f64>| v);
        set!(update.min_value, "min_value", |v: Option<f64>| v);
        set!(update.max_value, "max_value", |v: Option<f64>| v);
        set!(update.disallowed_values, "disallowed_values", |v: Option<String>| v);
        set!(update.show_ma, "show_ma", |v: bool| v);
        set!(update.ma_periods_csv, "ma_periods_csv", |v: Option<String>| v);
        set!(update.group, "\"group\"", |v: Option<String>| v);
        set!(update.group_order, "group_order", |v: Option<i64>| v);
        set!(update.metric_order, "metric_order", |v: Option<i64>| v);
        set!(update.is_calculated, "is_calculated", |v: bool| v);
        set!(update.calc_expr, "calc_expr", |v: Option<String>| v);

        let conn = self.conn();

        if sets.is_empty() {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM config WHERE owner_id = ? AND metric_id = ?)",
                [owner, metric_id],
                |r| r.get(0),
            )?;
            return if exists {
                Ok(())
            } else {
                Err(Error::MetricNotFound(metric_id.to_string()))
            };
        }

        let sql = format!(
            "UPDATE config SET {} WHERE owner_id = ? AND metric_id = ?",
            sets.join(", ")
        );
        params.push(Box::new(owner.to_string()));
        params.push(Box::new(metric_id.to_string()));
        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let changed = conn.execute(&sql, params_refs.as_slice())?;
        if changed == 0 {
            return Err(Error::MetricNotFound(metric_id.to_string()));
        }

        tracing::info!(owner, metric_id, fields = sets.len(), "Metric updated");
        Ok(())
    }

    fn row_to_metric(row: &Row) -> rusqlite::Result<MetricConfig> {
        let type_str: String = row.get("type")?;
        let metric_type = type_str.parse::<MetricType>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::from(e))
        })?;

        Ok(MetricConfig {
            metric_id: row.get("metric_id")?,
            metric_name: row.get("metric_name")?,
            metric_type,
            active: row.get("active")?,
            private: row.get("private")?,
            required: row.get("required")?,
            required_since: date_column(row, "required_since")?,
            start_date: date_column(row, "start_date")?,
            default_value: row.get("default_value")?,
            min_value: row.get("min_value")?,
            max_value: row.get("max_value")?,
            disallowed_values: row.get("disallowed_values")?,
            show_ma: row.get("show_ma")?,
            ma_periods_csv: row.get("ma_periods_csv")?,
            group: row.get("group")?,
            group_order: row.get("group_order")?,
            metric_order: row.get("metric_order")?,
            is_calculated: row.get("is_calculated")?,
            calc_expr: row.get("calc_expr")?,
        })
    }

    // ============================================
    // Log operations
    // ============================================

    /// List an owner's log rows, sorted by `(date, metric_id)`.
    pub fn list_logs(&self, owner: &str, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        if matches!(&filter.metric_ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let conn = self.conn();

        let mut sql = String::from("SELECT date, metric_id, value FROM log WHERE owner_id = ?");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(owner.to_string())];

        if let Some(date) = filter.date {
            sql.push_str(" AND date = ?");
            params.push(Box::new(format_date(date)));
        }
        if let Some(from) = filter.from {
            sql.push_str(" AND date >= ?");
            params.push(Box::new(format_date(from)));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND date <= ?");
            params.push(Box::new(format_date(to)));
        }
        if let Some(ids) = &filter.metric_ids {
            let placeholders = vec!["?"; ids.len()].join(", ");
            sql.push_str(&format!(" AND metric_id IN ({})", placeholders));
            for id in ids {
                params.push(Box::new(id.clone()));
            }
        }

        sql.push_str(" ORDER BY date ASC, metric_id ASC");

        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_refs.as_slice(), Self::row_to_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Most recent date with any log row for this owner
    pub fn last_log_date(&self, owner: &str) -> Result<Option<NaiveDate>> {
        let conn = self.conn();
        let last: Option<String> =
            conn.query_row("SELECT MAX(date) FROM log WHERE owner_id = ?", [owner], |r| {
                r.get(0)
            })?;
        last.map(|s| parse_date(&s)).transpose()
    }

    /// Save one day's values for an owner.
    ///
    /// Entries with a value are upserted on `(owner, date, metric_id)`,
    /// entries with `None` delete that day's row. Metrics that received a
    /// value and have no `start_date` get `start_date = date`. All of it
    /// happens in one transaction; concurrent saves are last-write-wins.
    pub fn save_log(&self, owner: &str, date: NaiveDate, entries: &[LogWrite]) -> Result<SaveSummary> {
        let date_str = format_date(date);
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut summary = SaveSummary::default();

        {
            let mut upsert = tx.prepare(
                r#"
                INSERT INTO log (owner_id, date, metric_id, value)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(owner_id, date, metric_id) DO UPDATE SET
                    value = excluded.value
                "#,
            )?;
            let mut delete =
                tx.prepare("DELETE FROM log WHERE owner_id = ?1 AND date = ?2 AND metric_id = ?3")?;
            let mut fill_start = tx.prepare(
                "UPDATE config SET start_date = ?1
                 WHERE owner_id = ?2 AND metric_id = ?3 AND start_date IS NULL",
            )?;

            let mut started = std::collections::HashSet::new();
            for entry in entries {
                match entry.value {
                    Some(value) => {
                        summary.upserted +=
                            upsert.execute(params![owner, date_str, entry.metric_id, value])?;
                        if started.insert(entry.metric_id.as_str()) {
                            summary.start_dates_set +=
                                fill_start.execute(params![date_str, owner, entry.metric_id])?;
                        }
                    }
                    None => {
                        summary.deleted +=
                            delete.execute(params![owner, date_str, entry.metric_id])?;
                    }
                }
            }
        }

        tx.commit()?;

        tracing::info!(
            owner,
            date = %date_str,
            upserted = summary.upserted,
            deleted = summary.deleted,
            start_dates_set = summary.start_dates_set,
            "Log saved"
        );

        Ok(summary)
    }

    fn row_to_log(row: &Row) -> rusqlite::Result<LogEntry> {
        let date = date_column(row, "date")?.ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Null, Box::from("log.date is null"))
        })?;
        Ok(LogEntry {
            date,
            metric_id: row.get("metric_id")?,
            value: row.get("value")?,
        })
    }
}

/// Read a nullable `YYYY-MM-DD` column.
fn date_column(row: &Row, name: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(name)?;
    raw.map(|s| {
        parse_date(&s).map_err(|e| {
            let idx = row.as_ref().column_index(name).unwrap_or(0);
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        })
    })
    .transpose()
}

/// Filter for listing metric definitions
#[derive(Debug, Default, Clone)]
pub struct MetricFilter {
    pub active: Option<bool>,
    pub required: Option<bool>,
    pub private: Option<bool>,
    pub metric_type: Option<MetricType>,
}

impl MetricFilter {
    /// Only active metrics
    pub fn active() -> Self {
        Self {
            active: Some(true),
            ..Default::default()
        }
    }
}

/// Filter for listing log rows
#[derive(Debug, Default, Clone)]
pub struct LogFilter {
    /// Exact date
    pub date: Option<NaiveDate>,
    /// Inclusive lower bound
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound
    pub to: Option<NaiveDate>,
    /// Restrict to these metric ids (empty matches nothing)
    pub metric_ids: Option<Vec<String>>,
}

impl LogFilter {
    /// Rows on a single day
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Default::default()
        }
    }

    /// Rows for one metric
    pub fn metric(metric_id: &str) -> Self {
        Self {
            metric_ids: Some(vec![metric_id.to_string()]),
            ..Default::default()
        }
    }
}
