//! Grid cell elevation.

use serde::{Deserialize, Serialize};

/// Elevation stored as this value marks a sea grid cell.
pub const SEA_MARKER: f32 = -999.0;

/// Elevation of a grid cell, or a marker that the cell is sea / unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ElevationOrSea {
    Elevation(f32),
    Sea,
    NoData,
}

impl ElevationOrSea {
    /// Decode a raw static-field value.
    pub fn from_raw(value: f32) -> Self {
        if value.is_nan() {
            Self::NoData
        } else if value <= SEA_MARKER {
            Self::Sea
        } else {
            Self::Elevation(value)
        }
    }

    /// Elevation in metres. Sea is 0, unknown is NaN.
    pub fn numeric(&self) -> f32 {
        match self {
            Self::Elevation(e) => *e,
            Self::Sea => 0.0,
            Self::NoData => f32::NAN,
        }
    }

    pub fn is_sea(&self) -> bool {
        matches!(self, Self::Sea)
    }
}
