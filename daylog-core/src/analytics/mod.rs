//! Analytics for daylog
//!
//! Everything here is derived on demand from stored rows:
//! - [`expr`]: calculated-metric expressions
//! - [`hints`]: required-day completion and the suggested log date
//! - [`streaks`]: checkbox streaks
//! - [`summary`]: trailing 7-day summary
//! - [`lifetime`]: lifetime and recent-window stats
//! - [`moving_average`]: trailing averages per metric
//!
//! The engines are pure functions of (metric definitions, log rows, today).
//! [`report`] wires them to the [`Database`](crate::Database).

pub mod expr;
pub mod hints;
pub mod lifetime;
pub mod moving_average;
pub mod report;
pub mod streaks;
pub mod summary;

pub use expr::{calculated_values, eval_calc_expr, NumericContext};
pub use hints::{compute_date_hints, DateHints};
pub use lifetime::{
    build_stats_report, checkbox_lifetime, numeric_lifetime, numeric_recent, CheckboxLifetimeStats,
    NumericLifetimeStats, NumericRecentStats, StatsReport,
};
pub use moving_average::{moving_average, MaPoint, MaSeries, RawPoint};
pub use streaks::{compute_streak, compute_streaks, StreakStats};
pub use summary::{summarize_7d, SummaryRow};
