//! Dataset definitions and their readers.
//!
//! | Module | Domains | Reader |
//! |--------|---------|--------|
//! | [`cds`] | CERRA, ERA5, ERA5-Land | [`CerraReader`] |
//! | [`bom`] | BOM ACCESS-G | [`BomReader`] |
//! | [`cmip6`] | CMIP6 HighResMIP | [`Cmip6Reader`] |
//! | [`cams`] | CAMS air quality | [`CamsMixer`] |

pub mod bom;
pub mod cams;
pub mod cds;
pub mod cmip6;

pub use bom::{
    BomDomain, BomGraph, BomReader, BomVariable, BomVariableDerived, BomVariableOrDerived,
};
pub use cams::{CamsDomain, CamsMixer, CamsReader, CamsVariable};
pub use cds::{
    CdsDomain, CerraGraph, CerraReader, CerraVariable, CerraVariableDerived, CerraVariableOrDerived,
};
pub use cmip6::{
    Cmip6BiasCorrected, Cmip6Derived, Cmip6Domain, Cmip6PostBiasGraph, Cmip6PreBiasGraph,
    Cmip6PreBiasReader, Cmip6Reader, Cmip6ReaderUncorrected, Cmip6Variable,
    Cmip6VariableOrDerived, Cmip6VariableOrDerivedPostBias, Cmip6VariablePostBias,
};

use meteo_common::{DataAndUnit, SiUnit, TimerangeDtAndSettings};
use meteo_formulas::solar;

/// Convert a backwards averaged radiation to instantaneous values.
pub(crate) fn to_instant(
    data: DataAndUnit,
    lat: f32,
    lon: f32,
    time: &TimerangeDtAndSettings,
) -> DataAndUnit {
    let factor = solar::backwards_averaged_to_instant_factor(lat, lon, &time.time);
    DataAndUnit::new(map2(&data.data, &factor, |v, f| v * f), data.unit)
}

/// Irradiance on the panel described by the request settings.
pub(crate) fn tilted_irradiance(
    direct: &[f32],
    diffuse: &[f32],
    lat: f32,
    lon: f32,
    time: &TimerangeDtAndSettings,
    instant: bool,
) -> DataAndUnit {
    let gti = solar::tilted_irradiance(
        direct,
        diffuse,
        time.tilt,
        time.azimuth,
        lat,
        lon,
        &time.time,
        instant,
    );
    DataAndUnit::new(gti, SiUnit::WattPerSquareMetre)
}

pub(crate) fn map2(a: &[f32], b: &[f32], f: impl Fn(f32, f32) -> f32) -> Vec<f32> {
    a.iter().zip(b).map(|(&a, &b)| f(a, b)).collect()
}

pub(crate) fn map3(a: &[f32], b: &[f32], c: &[f32], f: impl Fn(f32, f32, f32) -> f32) -> Vec<f32> {
    a.iter()
        .zip(b)
        .zip(c)
        .map(|((&a, &b), &c)| f(a, b, c))
        .collect()
}
