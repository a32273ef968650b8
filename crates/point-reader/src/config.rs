//! Configuration for point readers.

use grid_processor::GridSelectionMode;
use serde::{Deserialize, Serialize};

/// Configuration for building readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Apply bias correction to climate model output.
    pub bias_correction: bool,

    /// How the grid cell is chosen for a coordinate.
    pub cell_selection: GridSelectionMode,

    /// How reference weights are located on the reference grid.
    pub reference_weights: ReferenceWeightsMode,

    /// What the mixer does with samples no source covers.
    pub coverage: CoveragePolicy,

    /// Capacity of the process-wide weight curve cache.
    pub weight_cache_entries: usize,

    /// Default panel tilt in degrees for tilted irradiance.
    pub tilt: f32,

    /// Default panel azimuth in degrees (0 = south, 90 = west).
    pub azimuth: f32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            bias_correction: true,
            cell_selection: GridSelectionMode::Land,
            reference_weights: ReferenceWeightsMode::Nearest,
            coverage: CoveragePolicy::AllowGaps,
            weight_cache_entries: 4096,
            tilt: 0.0,
            azimuth: 0.0,
        }
    }
}

impl ReaderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("BIAS_CORRECTION") {
            config.bias_correction = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("CELL_SELECTION") {
            config.cell_selection = GridSelectionMode::from_str(&val);
        }

        if let Ok(val) = std::env::var("REFERENCE_WEIGHTS") {
            config.reference_weights = ReferenceWeightsMode::from_str(&val);
        }

        if let Ok(val) = std::env::var("MIXER_COVERAGE") {
            config.coverage = CoveragePolicy::from_str(&val);
        }

        if let Ok(val) = std::env::var("WEIGHT_CACHE_ENTRIES") {
            if let Ok(entries) = val.parse() {
                config.weight_cache_entries = entries;
            }
        }

        if let Ok(val) = std::env::var("PANEL_TILT") {
            if let Ok(tilt) = val.parse() {
                config.tilt = tilt;
            }
        }

        if let Ok(val) = std::env::var("PANEL_AZIMUTH") {
            if let Ok(azimuth) = val.parse() {
                config.azimuth = azimuth;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.weight_cache_entries == 0 {
            return Err("weight_cache_entries must be > 0".to_string());
        }

        if !(0.0..=90.0).contains(&self.tilt) {
            return Err("tilt must be between 0 and 90 degrees".to_string());
        }

        if !(-180.0..=180.0).contains(&self.azimuth) {
            return Err("azimuth must be between -180 and 180 degrees".to_string());
        }

        Ok(())
    }
}

/// Where reference weights are read on the reference grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceWeightsMode {
    /// Terrain-optimised nearest cell.
    #[default]
    Nearest,
    /// Bilinear blend of the four surrounding cells.
    Interpolated,
}

impl ReferenceWeightsMode {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "interpolated" | "bilinear" => Self::Interpolated,
            _ => Self::Nearest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Interpolated => "interpolated",
        }
    }
}

impl std::fmt::Display for ReferenceWeightsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mixer behaviour for samples no source covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoveragePolicy {
    /// Return the series with NaN gaps and log a warning.
    #[default]
    AllowGaps,
    /// Fail with `IncompleteCoverage`.
    RequireComplete,
}

impl CoveragePolicy {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "require_complete" | "strict" => Self::RequireComplete,
            _ => Self::AllowGaps,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowGaps => "allow_gaps",
            Self::RequireComplete => "require_complete",
        }
    }
}

impl std::fmt::Display for CoveragePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
