//! Error types for grid lookups.

use thiserror::Error;

/// Errors that can occur while describing or querying a grid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// The grid definition itself is unusable.
    #[error("invalid grid definition: {0}")]
    InvalidGrid(String),

    /// A gridpoint index is outside the grid.
    #[error("gridpoint {gridpoint} is outside a grid of {count} cells")]
    GridpointOutOfRange { gridpoint: usize, count: usize },
}

impl GridError {
    /// Create an InvalidGrid error.
    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }
}

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
