//! Error types for the enrollment-forecast library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while loading data, fitting models or reporting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// The input file does not exist.
    #[error("input file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// The input table is malformed (year column, frequency, cell values).
    #[error("data format error: {0}")]
    DataFormat(String),

    /// The optimizer did not converge, or no candidate model could be fitted.
    #[error("convergence error: {0}")]
    Convergence(String),

    /// Chart rendering or saving failed.
    #[error("plot error: {0}")]
    Plot(String),

    /// Writing an output file failed.
    #[error("i/o error: {0}")]
    Io(String),

    /// Future exogenous data does not match the regressors used for fitting.
    #[error("exogenous mismatch: {0}")]
    ExogMismatch(String),

    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Missing values detected when not allowed.
    #[error("missing values detected in data")]
    MissingValues,

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        ForecastError::Io(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Io(err.to_string())
    }
}
