//! daylog - record daily metrics from the command line
//!
//! Manages metric definitions and the values logged for each day.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/daylog/data.db (~/.local/share/daylog/data.db)
//! - Config: $XDG_CONFIG_HOME/daylog/config.toml (~/.config/daylog/config.toml)
//! - Logs: $XDG_STATE_HOME/daylog/daylog.log

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use daylog_core::analytics::expr::{eval_calc_expr, NumericContext};
use daylog_core::analytics::report::date_hints_report;
use daylog_core::dates::{format_date, parse_date, today_utc};
use daylog_core::format::{format_number, MISSING};
use daylog_core::logbook::{load_day_form, save_inputs, ValueSource};
use daylog_core::{Config, Database, MetricFilter, MetricType, MetricUpdate, NewMetric};

#[derive(Parser)]
#[command(name = "daylog")]
#[command(about = "Record daily metrics")]
#[command(version)]
struct Args {
    /// Owner whose data is read and written (default: from config)
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_date_arg)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage metric definitions
    Metric {
        #[command(subcommand)]
        command: MetricCommand,
    },

    /// Record or inspect one day's values
    Log {
        #[command(subcommand)]
        command: LogCommand,
    },

    /// Evaluate a calculation expression, e.g. `daylog calc "a / b" a=3 b=4`
    Calc {
        /// Expression over metric ids
        expr: String,

        /// Identifier values as name=value (use name= for a missing value)
        bindings: Vec<String>,
    },
}

#[derive(Subcommand)]
enum MetricCommand {
    /// Create a new metric
    Add(AddMetric),

    /// Change fields of an existing metric
    Update(UpdateMetric),

    /// List metric definitions in display order
    List {
        /// Include inactive metrics
        #[arg(short, long)]
        all: bool,

        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

#[derive(ClapArgs)]
struct AddMetric {
    /// Identifier, letters, digits and underscores only
    metric_id: String,

    /// Display name
    name: String,

    /// checkbox, number, time or hhmm
    #[arg(short = 't', long = "type", default_value = "number", value_parser = parse_type_arg)]
    metric_type: MetricType,

    #[arg(long)]
    private: bool,

    /// Create the metric inactive
    #[arg(long)]
    inactive: bool,

    #[arg(long)]
    required: bool,

    #[arg(long, value_parser = parse_date_arg)]
    required_since: Option<NaiveDate>,

    #[arg(long, value_parser = parse_date_arg)]
    start_date: Option<NaiveDate>,

    #[arg(long = "default")]
    default_value: Option<f64>,

    #[arg(long = "min")]
    min_value: Option<f64>,

    #[arg(long = "max")]
    max_value: Option<f64>,

    /// Comma-separated values that may not be logged
    #[arg(long)]
    disallow: Option<String>,

    #[arg(long)]
    show_ma: bool,

    /// Comma-separated moving-average periods
    #[arg(long, default_value = "7,30,90")]
    ma_periods: String,

    #[arg(long)]
    group: Option<String>,

    #[arg(long)]
    group_order: Option<i64>,

    #[arg(long = "order")]
    metric_order: Option<i64>,

    /// Make this a calculated metric with the given expression
    #[arg(long)]
    calc: Option<String>,
}

#[derive(ClapArgs)]
struct UpdateMetric {
    metric_id: String,

    #[arg(long)]
    name: Option<String>,

    #[arg(short = 't', long = "type", value_parser = parse_type_arg)]
    metric_type: Option<MetricType>,

    #[arg(long)]
    private: Option<bool>,

    #[arg(long)]
    active: Option<bool>,

    #[arg(long)]
    required: Option<bool>,

    #[arg(long, value_parser = parse_date_arg)]
    required_since: Option<NaiveDate>,

    #[arg(long, value_parser = parse_date_arg)]
    start_date: Option<NaiveDate>,

    #[arg(long = "default")]
    default_value: Option<f64>,

    #[arg(long = "min")]
    min_value: Option<f64>,

    #[arg(long = "max")]
    max_value: Option<f64>,

    #[arg(long)]
    disallow: Option<String>,

    #[arg(long)]
    show_ma: Option<bool>,

    #[arg(long)]
    ma_periods: Option<String>,

    #[arg(long)]
    group: Option<String>,

    #[arg(long)]
    group_order: Option<i64>,

    #[arg(long = "order")]
    metric_order: Option<i64>,

    /// Set the calculation expression (marks the metric calculated)
    #[arg(long)]
    calc: Option<String>,

    /// Stop treating the metric as calculated
    #[arg(long, conflicts_with = "calc")]
    no_calc: bool,

    /// Clear a nullable field (repeatable), e.g. --clear min --clear group
    #[arg(long, value_parser = [
        "required_since", "start_date", "default", "min", "max", "disallow",
        "ma_periods", "group", "group_order", "order",
    ])]
    clear: Vec<String>,
}

#[derive(Subcommand)]
enum LogCommand {
    /// Set values as metric=value (blank value clears it)
    Set {
        entries: Vec<String>,

        /// Day to log (default: the suggested date)
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },

    /// Remove values for the given metrics
    Clear {
        metric_ids: Vec<String>,

        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },

    /// Show the log form for a day
    Show {
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,

        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn parse_type_arg(s: &str) -> std::result::Result<MetricType, String> {
    s.parse()
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        daylog_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let owner = args.owner.clone().unwrap_or_else(|| config.owner.clone());
    let today = args.today.unwrap_or_else(today_utc);

    match args.command {
        Command::Calc { expr, bindings } => cmd_calc(&expr, &bindings),
        Command::Metric { command } => {
            let db = open_db()?;
            match command {
                MetricCommand::Add(add) => cmd_metric_add(&db, &owner, add),
                MetricCommand::Update(update) => cmd_metric_update(&db, &owner, update),
                MetricCommand::List { all, format } => cmd_metric_list(&db, &owner, all, &format),
            }
        }
        Command::Log { command } => {
            let db = open_db()?;
            match command {
                LogCommand::Set { entries, date } => {
                    let date = resolve_date(&db, &owner, date, today)?;
                    let inputs = entries
                        .iter()
                        .map(|e| parse_binding(e))
                        .collect::<Result<Vec<_>>>()?;
                    cmd_log_save(&db, &owner, date, &inputs)
                }
                LogCommand::Clear { metric_ids, date } => {
                    let date = resolve_date(&db, &owner, date, today)?;
                    let inputs: Vec<_> = metric_ids.into_iter().map(|id| (id, String::new())).collect();
                    cmd_log_save(&db, &owner, date, &inputs)
                }
                LogCommand::Show { date, format } => {
                    let date = resolve_date(&db, &owner, date, today)?;
                    cmd_log_show(&db, &owner, date, &format)
                }
            }
        }
    }
}

fn open_db() -> Result<Database> {
    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;
    Ok(db)
}

/// Explicit date, or the suggested date from the owner's hints.
fn resolve_date(db: &Database, owner: &str, date: Option<NaiveDate>, today: NaiveDate) -> Result<NaiveDate> {
    if let Some(date) = date {
        return Ok(date);
    }
    let hints = date_hints_report(db, owner, today).context("failed to compute date hints")?;
    if hints.missing_required_days > 0 {
        eprintln!(
            "Note: {} day(s) missing required metrics since {}",
            hints.missing_required_days,
            hints
                .last_required_complete_date
                .map(format_date)
                .unwrap_or_else(|| MISSING.to_string())
        );
    }
    Ok(hints.suggested_date)
}

/// Split `name=value`. The value may be empty.
fn parse_binding(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("expected name=value, got '{}'", raw))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn cmd_calc(expr: &str, bindings: &[String]) -> Result<()> {
    let mut ctx = NumericContext::new();
    for binding in bindings {
        let (name, value) = parse_binding(binding)?;
        let value = if value.is_empty() {
            None
        } else {
            Some(
                value
                    .parse::<f64>()
                    .with_context(|| format!("invalid number for {}: '{}'", name, value))?,
            )
        };
        ctx.set(name, value);
    }

    match eval_calc_expr(expr, &ctx) {
        Some(v) => println!("{}", format_number(v, 4)),
        None => println!("null"),
    }
    Ok(())
}

fn cmd_metric_add(db: &Database, owner: &str, add: AddMetric) -> Result<()> {
    let mut metric = NewMetric::new(&add.metric_id, &add.name, add.metric_type);
    metric.private = add.private;
    metric.active = !add.inactive;
    metric.required = add.required;
    metric.required_since = add.required_since;
    metric.start_date = add.start_date;
    metric.default_value = add.default_value;
    metric.min_value = add.min_value;
    metric.max_value = add.max_value;
    metric.disallowed_values = add.disallow;
    metric.show_ma = add.show_ma;
    metric.ma_periods_csv = Some(add.ma_periods);
    metric.group = add.group;
    metric.group_order = add.group_order;
    metric.metric_order = add.metric_order;
    metric.is_calculated = add.calc.is_some();
    metric.calc_expr = add.calc;

    db.insert_metric(owner, &metric)
        .with_context(|| format!("failed to add metric '{}'", metric.metric_id))?;

    println!("Added metric {} ({})", metric.metric_id, metric.metric_type);
    Ok(())
}

fn cmd_metric_update(db: &Database, owner: &str, u: UpdateMetric) -> Result<()> {
    let clears = |field: &str| u.clear.iter().any(|c| c == field);

    let update = MetricUpdate {
        metric_name: u.name.clone(),
        metric_type: u.metric_type,
        private: u.private,
        active: u.active,
        required: u.required,
        required_since: nullable(clears("required_since"), u.required_since),
        start_date: nullable(clears("start_date"), u.start_date),
        default_value: nullable(clears("default"), u.default_value),
        min_value: nullable(clears("min"), u.min_value),
        max_value: nullable(clears("max"), u.max_value),
        disallowed_values: nullable(clears("disallow"), u.disallow.clone()),
        show_ma: u.show_ma,
        ma_periods_csv: nullable(clears("ma_periods"), u.ma_periods.clone()),
        group: nullable(clears("group"), u.group.clone()),
        group_order: nullable(clears("group_order"), u.group_order),
        metric_order: nullable(clears("order"), u.metric_order),
        is_calculated: if u.calc.is_some() {
            Some(true)
        } else if u.no_calc {
            Some(false)
        } else {
            None
        },
        calc_expr: u.calc.clone().map(Some),
    };

    if update.is_empty() {
        anyhow::bail!("nothing to update for '{}'", u.metric_id);
    }

    db.update_metric(owner, &u.metric_id, &update)
        .with_context(|| format!("failed to update metric '{}'", u.metric_id))?;

    println!("Updated metric {}", u.metric_id);
    Ok(())
}

/// `Some(None)` when the field is being cleared, otherwise the new value if any.
fn nullable<T>(cleared: bool, value: Option<T>) -> Option<Option<T>> {
    if cleared {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn cmd_metric_list(db: &Database, owner: &str, all: bool, format: &str) -> Result<()> {
    let filter = if all {
        MetricFilter::default()
    } else {
        MetricFilter::active()
    };
    let metrics = db.list_metrics(owner, &filter).context("failed to list metrics")?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    if metrics.is_empty() {
        println!("No metrics defined. Add one with `daylog metric add <id> <name>`.");
        return Ok(());
    }

    println!("{:<20} {:<24} {:<9} {:<12} FLAGS", "ID", "NAME", "TYPE", "GROUP");
    for m in &metrics {
        let mut flags = Vec::new();
        if !m.active {
            flags.push("inactive".to_string());
        }
        if m.required {
            flags.push("required".to_string());
        }
        if m.private {
            flags.push("private".to_string());
        }
        if let Some(expr) = m.expression() {
            flags.push(format!("calc: {}", expr));
        }
        println!(
            "{:<20} {:<24} {:<9} {:<12} {}",
            m.metric_id,
            m.metric_name,
            m.metric_type.as_str(),
            m.group.as_deref().unwrap_or(MISSING),
            flags.join(", ")
        );
    }
    Ok(())
}

fn cmd_log_save(db: &Database, owner: &str, date: NaiveDate, inputs: &[(String, String)]) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("no metrics given");
    }

    let summary = save_inputs(db, owner, date, inputs)
        .with_context(|| format!("failed to save log for {}", format_date(date)))?;

    println!(
        "Saved {}: {} set, {} cleared",
        format_date(date),
        summary.upserted,
        summary.deleted
    );
    Ok(())
}

fn cmd_log_show(db: &Database, owner: &str, date: NaiveDate, format: &str) -> Result<()> {
    let form = load_day_form(db, owner, date).context("failed to load day")?;

    if format == "json" {
        let output = serde_json::json!({
            "date": format_date(date),
            "fields": form,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", format_date(date));
    let mut current_group: Option<&str> = None;
    for field in &form {
        let group = field.group.as_deref().map(str::trim).filter(|g| !g.is_empty());
        let group = group.unwrap_or("Ungrouped");
        if current_group != Some(group) {
            println!();
            println!("[{}]", group);
            current_group = Some(group);
        }

        let marker = match field.source {
            ValueSource::Default => " (default)",
            ValueSource::Calculated => " (calculated)",
            ValueSource::Logged | ValueSource::Empty => "",
        };
        println!(
            "  {}{:<22} {}{}",
            if field.required { "*" } else { " " },
            field.metric_name,
            field.display().unwrap_or_else(|| MISSING.to_string()),
            marker
        );
    }
    Ok(())
}
