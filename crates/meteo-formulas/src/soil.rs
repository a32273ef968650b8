//! ERA5 soil classes and soil moisture index.

/// ERA5 soil texture class. Code 0 is water and has no class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoilType {
    Coarse = 1,
    Medium = 2,
    MediumFine = 3,
    Fine = 4,
    VeryFine = 5,
    Organic = 6,
    TropicalOrganic = 7,
}

impl SoilType {
    /// Parse the numeric class stored in the static soil type field.
    pub fn from_code(code: f32) -> Option<Self> {
        if code.is_nan() {
            return None;
        }
        match code.round() as i32 {
            1 => Some(Self::Coarse),
            2 => Some(Self::Medium),
            3 => Some(Self::MediumFine),
            4 => Some(Self::Fine),
            5 => Some(Self::VeryFine),
            6 => Some(Self::Organic),
            7 => Some(Self::TropicalOrganic),
            _ => None,
        }
    }

    /// Permanent wilting point in m³/m³
    pub fn wilting_point(self) -> f32 {
        match self {
            Self::Coarse => 0.059,
            Self::Medium => 0.151,
            Self::MediumFine => 0.133,
            Self::Fine => 0.279,
            Self::VeryFine => 0.335,
            Self::Organic => 0.267,
            Self::TropicalOrganic => 0.151,
        }
    }

    /// Field capacity in m³/m³
    pub fn field_capacity(self) -> f32 {
        match self {
            Self::Coarse => 0.244,
            Self::Medium => 0.347,
            Self::MediumFine => 0.383,
            Self::Fine => 0.448,
            Self::VeryFine => 0.541,
            Self::Organic => 0.663,
            Self::TropicalOrganic => 0.347,
        }
    }

    /// Plant available water index: 0 at wilting point, 1 at field capacity.
    pub fn soil_moisture_index(self, soil_moisture: f32) -> f32 {
        if soil_moisture.is_nan() {
            return f32::NAN;
        }
        let pwp = self.wilting_point();
        let fc = self.field_capacity();
        ((soil_moisture - pwp) / (fc - pwp)).clamp(0.0, 1.0)
    }
}

/// Soil moisture index for a series. An unknown soil class yields NaN.
pub fn soil_moisture_index_series(soil_type: f32, soil_moisture: &[f32]) -> Vec<f32> {
    match SoilType::from_code(soil_type) {
        Some(soil) => soil_moisture
            .iter()
            .map(|sm| soil.soil_moisture_index(*sm))
            .collect(),
        None => vec![f32::NAN; soil_moisture.len()],
    }
}
