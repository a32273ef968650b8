//! Error types for point reads.

use meteo_common::TimeError;
use storage::StorageError;
use thiserror::Error;

/// Errors raised while reading, mixing or bias correcting a variable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReaderError {
    /// The dataset, variable or grid cell has no data at all.
    #[error("not found: {0}")]
    NotFound(String),

    /// Reading data or weights failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Bias correction was requested but no reference weights are usable.
    #[error("no usable bias correction weights for {variable} in {domain}")]
    MissingReferenceWeights { variable: String, domain: String },

    /// Samples remained missing after every mixer source was used.
    #[error("{missing} samples of {variable} are not covered by any source")]
    IncompleteCoverage { variable: String, missing: usize },

    /// No dataset covers the requested coordinate.
    #[error("no data is available for this location")]
    NoDataForLocation,

    /// The requested time range cannot be served by the dataset.
    #[error("invalid time range: {0}")]
    InvalidTimerange(String),

    /// A static field needed by a derived variable is missing.
    #[error("static field {field} is missing in {domain}")]
    MissingStatic { field: String, domain: String },

    /// Unknown variable or domain name.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ReaderError {
    pub fn missing_weights(variable: impl Into<String>, domain: impl Into<String>) -> Self {
        Self::MissingReferenceWeights {
            variable: variable.into(),
            domain: domain.into(),
        }
    }

    pub fn invalid_timerange(msg: impl Into<String>) -> Self {
        Self::InvalidTimerange(msg.into())
    }
}

impl From<StorageError> for ReaderError {
    fn from(err: StorageError) -> Self {
        match err {
            e @ StorageError::NotFound { .. } => Self::NotFound(e.to_string()),
            StorageError::Io(msg) => Self::Io(msg),
        }
    }
}

impl From<TimeError> for ReaderError {
    fn from(err: TimeError) -> Self {
        Self::InvalidTimerange(err.to_string())
    }
}

impl From<grid_processor::GridError> for ReaderError {
    fn from(err: grid_processor::GridError) -> Self {
        Self::NotFound(err.to_string())
    }
}

/// Result type for point reads.
pub type Result<T> = std::result::Result<T, ReaderError>;
