//! daylog-stats - aggregate views over logged metrics
//!
//! Computes date hints, the 7-day summary, checkbox streaks, lifetime and
//! recent-window stats, and moving averages for one owner.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use daylog_core::analytics::report::{
    date_hints_report, ma_report, stats_report, streaks_report, summary_report,
};
use daylog_core::analytics::{DateHints, MaSeries, StatsReport, StreakStats, SummaryRow};
use daylog_core::dates::{format_date, parse_date, today_utc};
use daylog_core::format::{format_opt, MISSING};
use daylog_core::config::MAX_WINDOW_DAYS;
use daylog_core::{Config, Database};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "daylog-stats")]
#[command(about = "Show statistics for logged metrics")]
#[command(version)]
struct Args {
    /// Owner whose data is read (default: from config)
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_date_arg)]
    today: Option<NaiveDate>,

    /// Output format: text (default) or json
    #[arg(short, long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Include metrics marked private
    #[arg(long, global = true)]
    show_private: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Required-day completion and the suggested date to log next
    Hints,

    /// Trailing 7-day summary for public metrics
    Summary {
        /// Last day of the window (clamped to today)
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },

    /// Checkbox streaks
    Streaks,

    /// Lifetime and recent-window stats
    Lifetime {
        /// Recent window sizes in days (default: from config)
        #[arg(short, long = "window", value_parser = parse_window_arg)]
        windows: Vec<u32>,
    },

    /// Moving average for one metric
    Ma {
        metric_id: String,

        /// Window in days (default: the metric's first MA period, then config)
        #[arg(short, long)]
        period: Option<u32>,
    },
}

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn parse_window_arg(s: &str) -> std::result::Result<u32, String> {
    let days: u32 = s.parse().map_err(|e| format!("{}", e))?;
    if days == 0 || days > MAX_WINDOW_DAYS {
        return Err(format!("window must be between 1 and {} days", MAX_WINDOW_DAYS));
    }
    Ok(days)
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        daylog_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let owner = args.owner.clone().unwrap_or_else(|| config.owner.clone());
    let today = args.today.unwrap_or_else(today_utc);
    let json = args.format == "json";

    match args.command {
        Command::Hints => {
            let hints = date_hints_report(&db, &owner, today).context("failed to compute date hints")?;
            if json {
                print_json(&hints)
            } else {
                print_hints(&hints);
                Ok(())
            }
        }
        Command::Summary { date } => {
            let rows = summary_report(&db, &owner, date.unwrap_or(today), today)
                .context("failed to compute summary")?;
            if json {
                print_json(&rows)
            } else {
                print_summary(&rows);
                Ok(())
            }
        }
        Command::Streaks => {
            let mut streaks = streaks_report(&db, &owner, today).context("failed to compute streaks")?;
            streaks.retain(|s| args.show_private || !s.private);
            if json {
                print_json(&streaks)
            } else {
                print_streaks(&streaks);
                Ok(())
            }
        }
        Command::Lifetime { windows } => {
            let windows = if windows.is_empty() {
                config.stats.recent_windows.clone()
            } else {
                windows
            };
            let mut report =
                stats_report(&db, &owner, &windows, today).context("failed to compute stats")?;
            if !args.show_private {
                hide_private(&mut report);
            }
            if json {
                print_json(&report)
            } else {
                print_lifetime(&report);
                Ok(())
            }
        }
        Command::Ma { metric_id, period } => {
            let period = match period {
                Some(p) => p,
                None => db
                    .get_metric(&owner, &metric_id)?
                    .and_then(|m| m.ma_periods().first().copied())
                    .unwrap_or(config.stats.default_ma_period),
            };
            let series = ma_report(&db, &owner, &metric_id, period)
                .with_context(|| format!("failed to compute moving average for '{}'", metric_id))?;
            if json {
                print_json(&series)
            } else {
                print_ma(&metric_id, period, &series);
                Ok(())
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn hide_private(report: &mut StatsReport) {
    report.checkbox_lifetime.retain(|r| !r.private);
    report.checkbox_streaks.retain(|r| !r.private);
    report.numeric_lifetime.retain(|r| !r.private);
    report.numeric_recent.retain(|r| !r.private);
}

fn date_or_missing(date: Option<NaiveDate>) -> String {
    date.map(format_date).unwrap_or_else(|| MISSING.to_string())
}

fn print_hints(hints: &DateHints) {
    println!("Today:                 {}", format_date(hints.today));
    println!("Last log date:         {}", date_or_missing(hints.last_log_date));
    println!(
        "Last complete day:     {}",
        date_or_missing(hints.last_required_complete_date)
    );
    println!("Suggested date:        {}", format_date(hints.suggested_date));
    println!("Missing required days: {}", hints.missing_required_days);
    if hints.required_days_possible > 0 {
        println!(
            "Required days:         {} / {} ({:.0}%)",
            hints.required_days_completed,
            hints.required_days_possible,
            hints.completion_ratio() * 100.0
        );
    }
}

fn print_summary(rows: &[SummaryRow]) {
    if rows.is_empty() {
        println!("No public metrics.");
        return;
    }
    println!("{:<20} {:<9} {:>6} {:>10} {:>6} {:>10}", "METRIC", "TYPE", "N", "SUM", "TRUE", "AVG");
    for row in rows {
        println!(
            "{:<20} {:<9} {:>6} {:>10} {:>6} {:>10}",
            row.metric_id,
            row.metric_type.as_str(),
            row.n_rows,
            format_opt(row.sum_7d, 2),
            row.count_true_7d
                .map(|c| c.to_string())
                .unwrap_or_else(|| MISSING.to_string()),
            format_opt(row.avg_7d, 2)
        );
    }
}

fn print_streaks(streaks: &[StreakStats]) {
    if streaks.is_empty() {
        println!("No checkbox metrics.");
        return;
    }
    println!(
        "{:<20} {:>8} {:>8} {:>8} {:>8} {:<10} {:>6}",
        "METRIC", "CUR", "BEST", "CUR-OFF", "BEST-OFF", "LAST", "SINCE"
    );
    for s in streaks {
        println!(
            "{:<20} {:>8} {:>8} {:>8} {:>8} {:<10} {:>6}",
            s.metric_id,
            s.current_streak_true,
            s.longest_streak_true,
            s.current_streak_false,
            s.longest_streak_false,
            date_or_missing(s.last_true_date),
            s.days_since_last_true
                .map(|d| d.to_string())
                .unwrap_or_else(|| MISSING.to_string())
        );
    }
}

fn print_lifetime(report: &StatsReport) {
    println!("Checkbox metrics");
    println!("================");
    for r in &report.checkbox_lifetime {
        println!(
            "{:<20} {:>5} tracked  {:>5} true  {:>7}  every {} days  ({} to {})",
            r.metric_id,
            r.days_tracked,
            r.total_true,
            r.pct_true_lifetime
                .map(|p| format!("{:.1}%", p * 100.0))
                .unwrap_or_else(|| MISSING.to_string()),
            format_opt(r.avg_days_between_true, 1),
            date_or_missing(r.first_date),
            date_or_missing(r.last_date)
        );
    }

    println!();
    println!("Numeric metrics");
    println!("===============");
    for r in &report.numeric_lifetime {
        println!(
            "{:<20} n={:<5} avg {:>10}  sd {:>8}  min {:>10} ({})  max {:>10} ({})",
            r.metric_id,
            r.value_count,
            format_opt(r.avg_value, 2),
            format_opt(r.stddev_value, 2),
            format_opt(r.min_value, 2),
            date_or_missing(r.min_value_date),
            format_opt(r.max_value, 2),
            date_or_missing(r.max_value_date)
        );
    }

    if !report.numeric_recent.is_empty() {
        println!();
        println!("Recent windows");
        println!("==============");
        for r in &report.numeric_recent {
            println!(
                "{:<20} {:>4}d  n={:<4} avg {:>10}  sd {:>8}  min {:>10}  max {:>10}",
                r.metric_id,
                r.window_days,
                r.value_count_recent,
                format_opt(r.avg_value_recent, 2),
                format_opt(r.stddev_value_recent, 2),
                format_opt(r.min_value_recent, 2),
                format_opt(r.max_value_recent, 2)
            );
        }
    }
}

fn print_ma(metric_id: &str, period: u32, series: &MaSeries) {
    println!("{} ({}-day moving average)", metric_id, period);
    if series.ma.is_empty() {
        println!("No values logged.");
        return;
    }
    println!("{:<10} {:>10} {:>10}", "DATE", "VALUE", "MA");
    for (raw, ma) in series.raw.iter().zip(&series.ma) {
        println!(
            "{:<10} {:>10} {:>10}",
            format_date(raw.date),
            format!("{:.2}", raw.value),
            format_opt(ma.ma_value, 2)
        );
    }
}
