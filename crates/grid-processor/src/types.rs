//! Core types for grid lookups.

use serde::{Deserialize, Serialize};

/// How a grid cell is chosen for a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSelectionMode {
    /// Prefer land cells with an elevation close to the requested one.
    #[default]
    Land,
    /// Prefer sea cells.
    Sea,
    /// Plain nearest cell.
    Nearest,
}

impl GridSelectionMode {
    /// Parse from string (case-insensitive). Unknown values fall back to `Land`.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sea" => Self::Sea,
            "nearest" => Self::Nearest,
            _ => Self::Land,
        }
    }
}

impl std::fmt::Display for GridSelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Land => write!(f, "land"),
            Self::Sea => write!(f, "sea"),
            Self::Nearest => write!(f, "nearest"),
        }
    }
}

/// A fractional position between four grid cells.
///
/// `gridpoint` is the lower-left cell; the fractions are in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint2DFraction {
    pub gridpoint: usize,
    pub x_fraction: f32,
    pub y_fraction: f32,
}

/// A resolved location on a dataset grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GridPosition {
    /// A single grid cell.
    Point(usize),
    /// A bilinear blend of four cells.
    Fraction(GridPoint2DFraction),
}

impl GridPosition {
    /// The cell closest to the position.
    pub fn nearest_gridpoint(&self) -> usize {
        match self {
            Self::Point(gridpoint) => *gridpoint,
            Self::Fraction(fraction) => fraction.gridpoint,
        }
    }
}
