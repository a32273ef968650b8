//! Storage error types.

use thiserror::Error;

/// Errors raised by a [`crate::TimeSeriesStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The dataset, variable or grid cell has no data at all.
    #[error("no data for {dataset}/{variable} at gridpoint {gridpoint}")]
    NotFound {
        dataset: String,
        variable: String,
        gridpoint: usize,
    },

    /// Reading or decoding failed.
    #[error("storage read failed: {0}")]
    Io(String),
}

impl StorageError {
    pub fn not_found(dataset: &str, variable: &str, gridpoint: usize) -> Self {
        Self::NotFound {
            dataset: dataset.to_string(),
            variable: variable.to_string(),
            gridpoint,
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
