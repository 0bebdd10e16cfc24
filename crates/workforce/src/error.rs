//! Error types for workforce metric computations.

use thiserror::Error;

/// Result type for workforce operations.
pub type Result<T> = std::result::Result<T, WorkforceError>;

/// Errors that can occur while preparing a roster or computing metrics.
#[derive(Debug, Error)]
pub enum WorkforceError {
    /// Missing required column in the roster frame
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A date field could not be parsed
    #[error("Invalid {field} for employee {employee_id}: {value:?}")]
    InvalidDate {
        /// Employee the row belongs to
        employee_id: String,
        /// Field that failed to parse
        field: &'static str,
        /// Raw value as supplied
        value: String,
    },

    /// A row violates a record invariant
    #[error("Invalid record for employee {employee_id}: {reason}")]
    InvalidRecord {
        /// Employee the row belongs to
        employee_id: String,
        /// Human-readable description of the violation
        reason: String,
    },

    /// Not enough observations for the requested computation
    #[error("Insufficient data: need {required} observations, got {available}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Available number of observations
        available: usize,
    },

    /// Unknown period granularity
    #[error("Unknown granularity: {0} (expected month, quarter or year)")]
    UnknownGranularity(String),

    /// Unknown grouping key
    #[error("Unknown group key: {0} (expected department, contract_type or job_title)")]
    UnknownGroupKey(String),

    /// Metric not found in registry
    #[error("Metric not found: {0}")]
    NotFound(String),

    /// Classifier error
    #[error("Model error: {0}")]
    Model(String),

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
