//! Database layer for daylog
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Owner-scoped repository queries for metric definitions and daily logs

pub mod repo;
pub mod schema;

pub use repo::{Database, LogFilter, MetricFilter, SaveSummary};
