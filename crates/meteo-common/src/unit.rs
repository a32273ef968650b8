//! Physical units and unit-tagged sample buffers.

use serde::{Deserialize, Serialize};

/// Physical unit attached to a series of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiUnit {
    Celsius,
    Kelvin,
    Percentage,
    Fraction,
    Millimetre,
    Centimetre,
    Metre,
    MetrePerSecond,
    DegreeDirection,
    WattPerSquareMetre,
    MegajoulePerSquareMetre,
    Pascal,
    Hectopascal,
    Kilopascal,
    Seconds,
    Dimensionless,
    DimensionlessInteger,
    WmoCode,
    GddCelsius,
    MicrogramsPerCubicMetre,
    GrainsPerCubicMetre,
    PartsPerMillion,
    CubicMetrePerCubicMetre,
}

impl SiUnit {
    /// Short symbol used when rendering a series.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Kelvin => "K",
            Self::Percentage => "%",
            Self::Fraction => "fraction",
            Self::Millimetre => "mm",
            Self::Centimetre => "cm",
            Self::Metre => "m",
            Self::MetrePerSecond => "m/s",
            Self::DegreeDirection => "°",
            Self::WattPerSquareMetre => "W/m²",
            Self::MegajoulePerSquareMetre => "MJ/m²",
            Self::Pascal => "Pa",
            Self::Hectopascal => "hPa",
            Self::Kilopascal => "kPa",
            Self::Seconds => "s",
            Self::Dimensionless => "",
            Self::DimensionlessInteger => "",
            Self::WmoCode => "wmo code",
            Self::GddCelsius => "GDD °C",
            Self::MicrogramsPerCubicMetre => "μg/m³",
            Self::GrainsPerCubicMetre => "grains/m³",
            Self::PartsPerMillion => "ppm",
            Self::CubicMetrePerCubicMetre => "m³/m³",
        }
    }

    /// Whether values in this unit are temperatures in degrees Celsius.
    pub fn is_celsius(&self) -> bool {
        matches!(self, Self::Celsius)
    }
}

impl std::fmt::Display for SiUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// An ordered series of samples aligned 1:1 with a time range.
///
/// `NaN` marks a sample no source could supply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAndUnit {
    pub data: Vec<f32>,
    pub unit: SiUnit,
}

impl DataAndUnit {
    pub fn new(data: Vec<f32>, unit: SiUnit) -> Self {
        Self { data, unit }
    }

    /// A series of `count` missing samples.
    pub fn missing(count: usize, unit: SiUnit) -> Self {
        Self {
            data: vec![f32::NAN; count],
            unit,
        }
    }

    /// Apply `f` elementwise, keeping the unit.
    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            data: self.data.into_iter().map(f).collect(),
            unit: self.unit,
        }
    }

    /// Replace the unit, keeping the samples.
    pub fn with_unit(self, unit: SiUnit) -> Self {
        Self {
            data: self.data,
            unit,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of missing samples.
    pub fn count_missing(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}
