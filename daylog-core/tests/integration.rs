//! Integration tests for daylog
//!
//! These tests drive the full flow through a file-backed database: define
//! metrics, save days through the logbook, then read every report back.

use chrono::NaiveDate;
use daylog_core::analytics::report::{
    date_hints_report, ma_report, stats_report, streaks_report, summary_report,
};
use daylog_core::dates::parse_date;
use daylog_core::logbook::{load_day_form, save_entries, save_inputs, ValueSource};
use daylog_core::{Database, Error, LogFilter, LogWrite, MetricType, NewMetric};
use tempfile::TempDir;

const OWNER: &str = "alice";

fn d(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

/// Open a migrated database inside a temp dir
fn open_db() -> (TempDir, Database) {
    daylog_core::logging::init_test();
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("daylog/data.db")).unwrap();
    db.migrate().unwrap();
    (dir, db)
}

fn required(id: &str, metric_type: MetricType) -> NewMetric {
    let mut m = NewMetric::new(id, id, metric_type);
    m.required = true;
    m
}

fn inputs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============================================
// Date hints
// ============================================

#[test]
fn test_date_hints_after_partial_day() {
    let (_dir, db) = open_db();
    db.insert_metric(OWNER, &required("a", MetricType::Checkbox)).unwrap();
    db.insert_metric(OWNER, &required("b", MetricType::Number)).unwrap();

    for date in ["2024-03-01", "2024-03-02"] {
        save_inputs(&db, OWNER, d(date), &inputs(&[("a", "yes"), ("b", "2")])).unwrap();
    }
    save_inputs(&db, OWNER, d("2024-03-03"), &inputs(&[("a", "yes")])).unwrap();

    let hints = date_hints_report(&db, OWNER, d("2024-03-05")).unwrap();
    assert_eq!(hints.last_log_date, Some(d("2024-03-03")));
    assert_eq!(hints.last_required_complete_date, Some(d("2024-03-02")));
    assert_eq!(hints.missing_required_days, 2);
    assert_eq!(hints.suggested_date, d("2024-03-03"));
    assert_eq!(hints.required_days_completed, 2);
    assert_eq!(hints.required_days_possible, 5);

    let json = serde_json::to_value(&hints).unwrap();
    assert_eq!(json["suggested_date"], "2024-03-03");
    assert_eq!(json["today"], "2024-03-05");
}

#[test]
fn test_date_hints_without_required_metrics() {
    let (_dir, db) = open_db();
    db.insert_metric(OWNER, &NewMetric::new("mood", "Mood", MetricType::Number))
        .unwrap();
    save_inputs(&db, OWNER, d("2024-03-01"), &inputs(&[("mood", "3")])).unwrap();

    let hints = date_hints_report(&db, OWNER, d("2024-03-05")).unwrap();
    assert_eq!(hints.missing_required_days, 0);
    assert_eq!(hints.suggested_date, d("2024-03-05"));
    assert_eq!(hints.required_days_possible, 0);
}

// ============================================
// Summaries and stats
// ============================================

#[test]
fn test_summary_and_streaks() {
    let (_dir, db) = open_db();
    db.insert_metric(OWNER, &NewMetric::new("steps", "Steps", MetricType::Number))
        .unwrap();
    db.insert_metric(OWNER, &NewMetric::new("walk", "Walk", MetricType::Checkbox))
        .unwrap();

    let days = [
        ("2024-01-01", "1", "yes"),
        ("2024-01-02", "2", "yes"),
        ("2024-01-03", "3", "no"),
        ("2024-01-04", "", "yes"),
    ];
    for (date, steps, walk) in days {
        let mut pairs = vec![("walk", walk)];
        if !steps.is_empty() {
            pairs.push(("steps", steps));
        }
        save_inputs(&db, OWNER, d(date), &inputs(&pairs)).unwrap();
    }

    let summary = summary_report(&db, OWNER, d("2024-01-04"), d("2024-01-04")).unwrap();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].metric_id, "walk");
    assert_eq!(summary[0].n_rows, 3);
    assert_eq!(summary[0].count_true_7d, Some(3));
    assert_eq!(summary[1].n_rows, 3);
    assert_eq!(summary[1].sum_7d, Some(6.0));
    assert_eq!(summary[1].avg_7d, Some(2.0));

    let streaks = streaks_report(&db, OWNER, d("2024-01-04")).unwrap();
    assert_eq!(streaks.len(), 1);
    assert_eq!(streaks[0].current_streak_true, 1);
    assert_eq!(streaks[0].longest_streak_true, 2);
}

#[test]
fn test_stats_report_and_idempotence() {
    let (_dir, db) = open_db();
    db.insert_metric(OWNER, &NewMetric::new("sleep", "Sleep", MetricType::Number))
        .unwrap();
    db.insert_metric(OWNER, &NewMetric::new("gym", "Gym", MetricType::Checkbox))
        .unwrap();
    let mut hidden = NewMetric::new("secret", "Secret", MetricType::Number);
    hidden.private = true;
    db.insert_metric(OWNER, &hidden).unwrap();

    for (date, sleep) in [("2024-01-01", 6.0), ("2024-01-02", 8.0), ("2024-01-05", 7.0)] {
        save_entries(
            &db,
            OWNER,
            d(date),
            &[LogWrite::set("sleep", sleep), LogWrite::set("gym", 1.0)],
        )
        .unwrap();
    }

    let today = d("2024-01-05");
    let first = stats_report(&db, OWNER, &[7, 30], today).unwrap();
    let second = stats_report(&db, OWNER, &[7, 30], today).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    let sleep = first
        .numeric_lifetime
        .iter()
        .find(|r| r.metric_id == "sleep")
        .unwrap();
    assert_eq!(sleep.value_count, 3);
    assert_eq!(sleep.avg_value, Some(7.0));
    assert_eq!(sleep.days_on_record, 5);
    assert_eq!(sleep.max_value_date, Some(d("2024-01-02")));

    // Private metrics are reported but flagged
    let secret = first
        .numeric_lifetime
        .iter()
        .find(|r| r.metric_id == "secret")
        .unwrap();
    assert!(secret.private);
    assert_eq!(secret.value_count, 0);

    assert_eq!(first.numeric_recent.len(), 4);
    let gym = &first.checkbox_lifetime[0];
    assert_eq!(gym.total_true, 3);
    assert_eq!(gym.pct_true_lifetime, Some(1.0));
    assert_eq!(gym.avg_days_between_true, Some(2.0));
}

#[test]
fn test_moving_average_report() {
    let (_dir, db) = open_db();
    db.insert_metric(OWNER, &NewMetric::new("weight", "Weight", MetricType::Number))
        .unwrap();
    for (date, w) in [("2024-01-01", 80.0), ("2024-01-02", 82.0), ("2024-01-10", 78.0)] {
        save_entries(&db, OWNER, d(date), &[LogWrite::set("weight", w)]).unwrap();
    }

    let series = ma_report(&db, OWNER, "weight", 7).unwrap();
    assert_eq!(series.raw.len(), 3);
    assert_eq!(series.ma.len(), 3);
    assert_eq!(series.ma[1].ma_value, Some(81.0));
    assert_eq!(series.ma[2].ma_value, Some(78.0));

    assert!(matches!(
        ma_report(&db, OWNER, "weight", 4000),
        Err(Error::InvalidInput(_))
    ));
}

// ============================================
// Logging workflow
// ============================================

#[test]
fn test_owner_isolation() {
    let (_dir, db) = open_db();
    db.insert_metric("alice", &required("a", MetricType::Checkbox)).unwrap();
    db.insert_metric("bob", &required("a", MetricType::Checkbox)).unwrap();

    save_inputs(&db, "bob", d("2024-03-01"), &inputs(&[("a", "yes")])).unwrap();

    assert!(db.list_logs("alice", &LogFilter::default()).unwrap().is_empty());
    let hints = date_hints_report(&db, "alice", d("2024-03-05")).unwrap();
    assert_eq!(hints.last_log_date, None);
    assert_eq!(hints.suggested_date, d("2024-03-05"));
}

#[test]
fn test_calculated_metric_in_form() {
    let (_dir, db) = open_db();
    db.insert_metric(OWNER, &NewMetric::new("steps", "Steps", MetricType::Number))
        .unwrap();
    let mut km = NewMetric::new("km", "Km", MetricType::Number);
    km.is_calculated = true;
    km.calc_expr = Some("steps / 1250".to_string());
    db.insert_metric(OWNER, &km).unwrap();

    let day = d("2024-03-01");
    save_inputs(&db, OWNER, day, &inputs(&[("steps", "5000")])).unwrap();

    let form = load_day_form(&db, OWNER, day).unwrap();
    let km = form.iter().find(|f| f.metric_id == "km").unwrap();
    assert_eq!(km.value, Some(4.0));
    assert_eq!(km.source, ValueSource::Calculated);

    let err = save_inputs(&db, OWNER, day, &inputs(&[("km", "3")])).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));
}

#[test]
fn test_reopen_preserves_data() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.db");
    {
        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        db.insert_metric(OWNER, &NewMetric::new("mood", "Mood", MetricType::Number))
            .unwrap();
        save_inputs(&db, OWNER, d("2024-03-01"), &inputs(&[("mood", "4")])).unwrap();
    }

    let db = Database::open(&path).unwrap();
    db.migrate().unwrap();
    let mood = db.get_metric(OWNER, "mood").unwrap().unwrap();
    assert_eq!(mood.start_date, Some(d("2024-03-01")));
    assert_eq!(db.last_log_date(OWNER).unwrap(), Some(d("2024-03-01")));
}
