//! # daylog-core
//!
//! Core library for daylog - a personal daily-metrics tracker.
//!
//! This library provides:
//! - Domain types for metric definitions and daily log rows
//! - Database storage layer with SQLite
//! - The analytics engines: expression evaluation, date hints, streaks,
//!   7-day summaries, lifetime/recent stats and moving averages
//! - Input parsing and validation for logged values
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through two layers:
//! - **Stored:** `config` and `log` rows in SQLite, always scoped to an owner
//! - **Derived:** aggregates computed on demand by pure functions over those
//!   rows and a reference date (never stored)
//!
//! ## Example
//!
//! ```rust,no_run
//! use daylog_core::{analytics, Config, Database};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let today = daylog_core::dates::today_utc();
//! let hints = analytics::report::date_hints_report(&db, &config.owner, today)
//!     .expect("failed to compute date hints");
//! println!("suggested date: {}", hints.suggested_date);
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::{Database, LogFilter, MetricFilter};
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod format;
pub mod logbook;
pub mod logging;
pub mod types;
pub mod validate;
