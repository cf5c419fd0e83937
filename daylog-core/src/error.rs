//! Error types for daylog-core

use thiserror::Error;

/// Main error type for the daylog-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Metric not found for this owner
    #[error("metric not found: {0}")]
    MetricNotFound(String),

    /// A metric with this id already exists for this owner
    #[error("metric_id already exists for this owner: {0}")]
    DuplicateMetric(String),

    /// Metric definition failed validation
    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    /// A logged value was rejected for its metric
    #[error("invalid value for {metric_id}: {message}")]
    InvalidValue { metric_id: String, message: String },

    /// Date string was not `YYYY-MM-DD`
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Other malformed caller input
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for daylog-core
pub type Result<T> = std::result::Result<T, Error>;
