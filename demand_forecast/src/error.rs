//! Error types for the demand_forecast crate

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the demand_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A required column is missing or unusable
    #[error("Schema error: {0}")]
    Schema(String),

    /// A single value could not be parsed; callers recover by dropping the row
    #[error("Parse error: {0}")]
    Parse(String),

    /// A parameter is outside its allowed range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A data or model file does not exist
    #[error("File not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// Normalization of a column without variance
    #[error("Degenerate column: {0}")]
    DegenerateColumn(String),

    /// Prediction input does not match the columns the model was trained on
    #[error("Schema mismatch: model expects {expected:?}, got {actual:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// Failure inside a regression kernel
    #[error("Model error: {0}")]
    Model(#[from] demand_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),

    /// Error while encoding or decoding artifacts and configuration
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}
