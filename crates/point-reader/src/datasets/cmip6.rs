//! CMIP6 HighResMIP climate projections at daily resolution.
//!
//! Readers are stacked in three layers:
//!
//! ```text
//! Cmip6Reader              post-bias derived (snowfall, dewpoint, GDD, ...)
//!      │
//! Cmip6BiasCorrected       seasonal bias correction toward ERA5-Land / ERA5
//!      │
//! Cmip6PreBiasReader       pre-bias derived (ET0, VPD, soil layers, ...)
//!      │
//! GenericReaderCached      raw model output
//! ```
//!
//! Variables derived before the correction get their own weight curves;
//! variables derived after it are computed from corrected inputs.

use async_trait::async_trait;
use grid_processor::{GridSelectionMode, RegularGrid};
use meteo_common::{DataAndUnit, SiUnit, TimerangeDtAndSettings};
use meteo_formulas::{
    self as formulas, floor_zero, moving_average, soil_moisture_index_series, solar,
    MaxAndMinOrMean, SNOW_WATER_TO_DEPTH_CM,
};
use std::sync::Arc;
use storage::{StaticVariable, TimeSeriesStore};

use super::{map2, CdsDomain};
use crate::bias::{BiasCorrectable, BiasCorrector, ChangeType};
use crate::config::ReferenceWeightsMode;
use crate::domain::GenericDomain;
use crate::error::{ReaderError, Result};
use crate::reader::{
    DerivedReader, DerivedVariableGraph, GenericReader, GenericReaderCached, GenericReaderProtocol,
};
use crate::variable::{GenericVariableMixable, RawVariable, ReaderInterpolation, VariableOrDerived};
use crate::{domain_names, variable_enum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Cmip6Domain {
    CMCC_CM2_VHR4,
    FGOALS_f3_H,
    HiRAM_SIT_HR,
    MRI_AGCM3_2_S,
    EC_Earth3P_HR,
    MPI_ESM1_2_XR,
    NICAM16_8S,
}

domain_names!(Cmip6Domain {
    CMCC_CM2_VHR4 => "CMCC_CM2_VHR4",
    FGOALS_f3_H => "FGOALS_f3_H",
    HiRAM_SIT_HR => "HiRAM_SIT_HR",
    MRI_AGCM3_2_S => "MRI_AGCM3_2_S",
    EC_Earth3P_HR => "EC_Earth3P_HR",
    MPI_ESM1_2_XR => "MPI_ESM1_2_XR",
    NICAM16_8S => "NICAM16_8S",
});

impl Cmip6Domain {
    /// Some models only publish daily mean humidity.
    pub fn has_humidity_extremes(&self) -> bool {
        !matches!(self, Self::FGOALS_f3_H | Self::HiRAM_SIT_HR | Self::MPI_ESM1_2_XR)
    }
}

impl GenericDomain for Cmip6Domain {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn grid(&self) -> RegularGrid {
        match self {
            Self::CMCC_CM2_VHR4 => {
                RegularGrid::new_unchecked(1152, 768, -90.0, -180.0, 0.3125, 0.234375)
            }
            Self::FGOALS_f3_H => RegularGrid::new_unchecked(1440, 720, -89.875, -180.0, 0.25, 0.25),
            Self::HiRAM_SIT_HR => {
                RegularGrid::new_unchecked(1536, 768, -89.8828, -180.0, 0.234375, 0.234375)
            }
            Self::MRI_AGCM3_2_S => {
                RegularGrid::new_unchecked(1920, 960, -89.90625, -180.0, 0.1875, 0.1875)
            }
            Self::EC_Earth3P_HR => {
                RegularGrid::new_unchecked(1024, 512, -89.7848, -180.0, 0.3515625, 0.3515625)
            }
            Self::MPI_ESM1_2_XR => {
                RegularGrid::new_unchecked(768, 384, -89.6416, -180.0, 0.46875, 0.46875)
            }
            Self::NICAM16_8S => {
                RegularGrid::new_unchecked(1280, 640, -89.859375, -180.0, 0.28125, 0.28125)
            }
        }
    }

    fn dt_seconds(&self) -> i64 {
        86400
    }

    fn update_interval_seconds(&self) -> i64 {
        0
    }
}

variable_enum! {
    /// Daily aggregates stored for every CMIP6 model.
    pub enum Cmip6Variable {
        PressureMslMean => "pressure_msl_mean",
        Temperature2mMin => "temperature_2m_min",
        Temperature2mMax => "temperature_2m_max",
        Temperature2mMean => "temperature_2m_mean",
        CloudCoverMean => "cloud_cover_mean",
        PrecipitationSum => "precipitation_sum",
        SnowfallWaterEquivalentSum => "snowfall_water_equivalent_sum",
        RelativeHumidity2mMin => "relative_humidity_2m_min",
        RelativeHumidity2mMax => "relative_humidity_2m_max",
        RelativeHumidity2mMean => "relative_humidity_2m_mean",
        WindSpeed10mMean => "wind_speed_10m_mean",
        WindSpeed10mMax => "wind_speed_10m_max",
        SoilMoisture0To10cmMean => "soil_moisture_0_to_10cm_mean",
        ShortwaveRadiationSum => "shortwave_radiation_sum",
    }
}

impl GenericVariableMixable for Cmip6Variable {}

impl RawVariable for Cmip6Variable {
    fn unit(&self) -> SiUnit {
        use Cmip6Variable::*;
        match self {
            PressureMslMean => SiUnit::Hectopascal,
            Temperature2mMin | Temperature2mMax | Temperature2mMean => SiUnit::Celsius,
            CloudCoverMean | RelativeHumidity2mMin | RelativeHumidity2mMax | RelativeHumidity2mMean => {
                SiUnit::Percentage
            }
            PrecipitationSum | SnowfallWaterEquivalentSum => SiUnit::Millimetre,
            WindSpeed10mMean | WindSpeed10mMax => SiUnit::MetrePerSecond,
            SoilMoisture0To10cmMean => SiUnit::CubicMetrePerCubicMetre,
            ShortwaveRadiationSum => SiUnit::MegajoulePerSquareMetre,
        }
    }

    fn interpolation(&self) -> ReaderInterpolation {
        use Cmip6Variable::*;
        match self {
            PrecipitationSum | SnowfallWaterEquivalentSum | ShortwaveRadiationSum => {
                ReaderInterpolation::BackwardsSum
            }
            CloudCoverMean | RelativeHumidity2mMin | RelativeHumidity2mMax | RelativeHumidity2mMean => {
                ReaderInterpolation::Hermite {
                    bounds: Some((0.0, 100.0)),
                }
            }
            _ => ReaderInterpolation::Hermite { bounds: None },
        }
    }
}

impl BiasCorrectable for Cmip6Variable {
    fn bias_correction_type(&self) -> ChangeType {
        use Cmip6Variable::*;
        match self {
            PressureMslMean | Temperature2mMin | Temperature2mMax | Temperature2mMean => {
                ChangeType::AbsoluteChange { bounds: None }
            }
            CloudCoverMean | RelativeHumidity2mMin | RelativeHumidity2mMax | RelativeHumidity2mMean => {
                ChangeType::AbsoluteChange {
                    bounds: Some((0.0, 100.0)),
                }
            }
            PrecipitationSum | SnowfallWaterEquivalentSum | WindSpeed10mMean | WindSpeed10mMax
            | ShortwaveRadiationSum => ChangeType::RelativeChange { maximum: None },
            SoilMoisture0To10cmMean => ChangeType::AbsoluteChange {
                bounds: Some((0.0, 10e9)),
            },
        }
    }

    fn applies_lapse_rate(&self) -> bool {
        use Cmip6Variable::*;
        matches!(self, Temperature2mMin | Temperature2mMax | Temperature2mMean)
    }
}

variable_enum! {
    /// Derived before bias correction; corrected with their own weights.
    pub enum Cmip6Derived {
        Et0FaoEvapotranspirationSum => "et0_fao_evapotranspiration_sum",
        LeafWetnessProbabilityMean => "leaf_wetness_probability_mean",
        SoilMoisture0To100cmMean => "soil_moisture_0_to_100cm_mean",
        SoilMoisture0To7cmMean => "soil_moisture_0_to_7cm_mean",
        SoilMoisture7To28cmMean => "soil_moisture_7_to_28cm_mean",
        SoilMoisture28To100cmMean => "soil_moisture_28_to_100cm_mean",
        SoilTemperature0To100cmMean => "soil_temperature_0_to_100cm_mean",
        SoilTemperature0To7cmMean => "soil_temperature_0_to_7cm_mean",
        SoilTemperature7To28cmMean => "soil_temperature_7_to_28cm_mean",
        SoilTemperature28To100cmMean => "soil_temperature_28_to_100cm_mean",
        VapourPressureDeficitMax => "vapour_pressure_deficit_max",
        WindGusts10mMean => "wind_gusts_10m_mean",
        WindGusts10mMax => "wind_gusts_10m_max",
    }
}

impl GenericVariableMixable for Cmip6Derived {}

impl BiasCorrectable for Cmip6Derived {
    fn bias_correction_type(&self) -> ChangeType {
        use Cmip6Derived::*;
        match self {
            Et0FaoEvapotranspirationSum | VapourPressureDeficitMax | WindGusts10mMean
            | WindGusts10mMax => ChangeType::RelativeChange { maximum: None },
            LeafWetnessProbabilityMean => ChangeType::AbsoluteChange {
                bounds: Some((0.0, 100.0)),
            },
            SoilMoisture0To100cmMean
            | SoilMoisture0To7cmMean
            | SoilMoisture7To28cmMean
            | SoilMoisture28To100cmMean => ChangeType::AbsoluteChange {
                bounds: Some((0.0, 10e9)),
            },
            SoilTemperature0To100cmMean
            | SoilTemperature0To7cmMean
            | SoilTemperature7To28cmMean
            | SoilTemperature28To100cmMean => ChangeType::AbsoluteChange { bounds: None },
        }
    }
}

pub type Cmip6VariableOrDerived = VariableOrDerived<Cmip6Variable, Cmip6Derived>;

variable_enum! {
    /// Derived from bias corrected inputs, never corrected themselves.
    pub enum Cmip6VariablePostBias {
        SnowfallSum => "snowfall_sum",
        RainSum => "rain_sum",
        Dewpoint2mMax => "dewpoint_2m_max",
        Dewpoint2mMin => "dewpoint_2m_min",
        Dewpoint2mMean => "dewpoint_2m_mean",
        DewPoint2mMax => "dew_point_2m_max",
        DewPoint2mMin => "dew_point_2m_min",
        DewPoint2mMean => "dew_point_2m_mean",
        GrowingDegreeDaysBase0Limit50 => "growing_degree_days_base_0_limit_50",
        SoilMoistureIndex0To10cmMean => "soil_moisture_index_0_to_10cm_mean",
        SoilMoistureIndex0To100cmMean => "soil_moisture_index_0_to_100cm_mean",
        DaylightDuration => "daylight_duration",
        Windspeed2mMax => "windspeed_2m_max",
        Windspeed2mMean => "windspeed_2m_mean",
        WindSpeed2mMax => "wind_speed_2m_max",
        WindSpeed2mMean => "wind_speed_2m_mean",
        Windspeed10mMax => "windspeed_10m_max",
        Windspeed10mMean => "windspeed_10m_mean",
        Windgusts10mMean => "windgusts_10m_mean",
        Windgusts10mMax => "windgusts_10m_max",
        VaporPressureDeficitMax => "vapor_pressure_deficit_max",
    }
}

impl GenericVariableMixable for Cmip6VariablePostBias {}

pub type Cmip6VariableOrDerivedPostBias = VariableOrDerived<Cmip6VariableOrDerived, Cmip6VariablePostBias>;

/// Soil layers are estimated from the surface by nested moving averages.
const SOIL_TEMPERATURE_0_TO_7CM_DAYS: usize = 4;
const SOIL_7_TO_28CM_DAYS: usize = 6;
const SOIL_28_TO_100CM_DAYS: usize = 52;

/// Daily humidity as extremes, or as mean for models without extremes.
fn daily_humidity(max_or_mean: &[f32], min: Option<&[f32]>) -> Vec<MaxAndMinOrMean> {
    match min {
        Some(min) => max_or_mean
            .iter()
            .zip(min)
            .map(|(&max, &min)| MaxAndMinOrMean::MaxMin { max, min })
            .collect(),
        None => max_or_mean.iter().map(|&mean| MaxAndMinOrMean::Mean(mean)).collect(),
    }
}

/// Derived variables computed from raw model output.
pub struct Cmip6PreBiasGraph {
    reader: GenericReaderCached<Cmip6Domain, Cmip6Variable>,
    domain: Cmip6Domain,
}

pub type Cmip6PreBiasReader = DerivedReader<Cmip6PreBiasGraph>;

impl DerivedReader<Cmip6PreBiasGraph> {
    pub async fn new(
        domain: Cmip6Domain,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        Ok(
            GenericReaderCached::new(domain, lat, lon, elevation, mode, store)
                .await?
                .map(|reader| Self::from_graph(Cmip6PreBiasGraph { reader, domain })),
        )
    }

    pub async fn at_gridpoint(
        domain: Cmip6Domain,
        gridpoint: usize,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Self> {
        let reader = GenericReader::at_gridpoint(domain, gridpoint, store).await?;
        Ok(Self::from_graph(Cmip6PreBiasGraph {
            reader: GenericReaderCached::wrap(reader),
            domain,
        }))
    }
}

impl Cmip6PreBiasGraph {
    async fn raw(&self, variable: Cmip6Variable, time: &TimerangeDtAndSettings) -> Result<DataAndUnit> {
        self.reader.get(variable, time).await
    }

    fn humidity_variables(&self) -> Vec<Cmip6Variable> {
        if self.domain.has_humidity_extremes() {
            vec![Cmip6Variable::RelativeHumidity2mMax, Cmip6Variable::RelativeHumidity2mMin]
        } else {
            vec![Cmip6Variable::RelativeHumidity2mMean]
        }
    }

    async fn humidity(&self, time: &TimerangeDtAndSettings) -> Result<Vec<MaxAndMinOrMean>> {
        if self.domain.has_humidity_extremes() {
            let max = self.raw(Cmip6Variable::RelativeHumidity2mMax, time).await?.data;
            let min = self.raw(Cmip6Variable::RelativeHumidity2mMin, time).await?.data;
            Ok(daily_humidity(&max, Some(&min)))
        } else {
            let mean = self.raw(Cmip6Variable::RelativeHumidity2mMean, time).await?.data;
            Ok(daily_humidity(&mean, None))
        }
    }

    /// Surface soil moisture and the two moving averages below it.
    async fn soil_moisture_layers(
        &self,
        time: &TimerangeDtAndSettings,
    ) -> Result<(DataAndUnit, Vec<f32>, Vec<f32>)> {
        let surface = self.raw(Cmip6Variable::SoilMoisture0To10cmMean, time).await?;
        let middle = moving_average(&surface.data, SOIL_7_TO_28CM_DAYS);
        let deep = moving_average(&middle, SOIL_28_TO_100CM_DAYS);
        Ok((surface, middle, deep))
    }

    async fn soil_temperature_layers(
        &self,
        time: &TimerangeDtAndSettings,
    ) -> Result<(SiUnit, Vec<f32>, Vec<f32>, Vec<f32>)> {
        let air = self.raw(Cmip6Variable::Temperature2mMean, time).await?;
        let top = moving_average(&air.data, SOIL_TEMPERATURE_0_TO_7CM_DAYS);
        let middle = moving_average(&top, SOIL_7_TO_28CM_DAYS);
        let deep = moving_average(&middle, SOIL_28_TO_100CM_DAYS);
        Ok((air.unit, top, middle, deep))
    }
}

#[async_trait]
impl DerivedVariableGraph for Cmip6PreBiasGraph {
    type Raw = Cmip6Variable;
    type Derived = Cmip6Derived;
    type Inner = GenericReaderCached<Cmip6Domain, Cmip6Variable>;

    fn inner(&self) -> &Self::Inner {
        &self.reader
    }

    fn dependencies(&self, derived: Cmip6Derived) -> Vec<Cmip6VariableOrDerived> {
        use Cmip6Derived as D;
        use Cmip6Variable as R;
        use VariableOrDerived::Raw;
        let humidity = self.humidity_variables().into_iter().map(Raw);
        match derived {
            D::Et0FaoEvapotranspirationSum => vec![
                Raw(R::Temperature2mMax),
                Raw(R::Temperature2mMin),
                Raw(R::Temperature2mMean),
                Raw(R::WindSpeed10mMean),
                Raw(R::ShortwaveRadiationSum),
            ]
            .into_iter()
            .chain(humidity)
            .collect(),
            D::VapourPressureDeficitMax => vec![Raw(R::Temperature2mMax), Raw(R::Temperature2mMin)]
                .into_iter()
                .chain(humidity)
                .collect(),
            D::LeafWetnessProbabilityMean => vec![
                Raw(R::Temperature2mMax),
                Raw(R::Temperature2mMin),
                Raw(R::PrecipitationSum),
            ]
            .into_iter()
            .chain(humidity)
            .collect(),
            D::SoilMoisture0To100cmMean
            | D::SoilMoisture0To7cmMean
            | D::SoilMoisture7To28cmMean
            | D::SoilMoisture28To100cmMean => vec![Raw(R::SoilMoisture0To10cmMean)],
            D::SoilTemperature0To100cmMean
            | D::SoilTemperature0To7cmMean
            | D::SoilTemperature7To28cmMean
            | D::SoilTemperature28To100cmMean => vec![Raw(R::Temperature2mMean)],
            D::WindGusts10mMean => vec![Raw(R::WindSpeed10mMean)],
            D::WindGusts10mMax => vec![Raw(R::WindSpeed10mMax)],
        }
    }

    async fn compute(&self, derived: Cmip6Derived, time: &TimerangeDtAndSettings) -> Result<DataAndUnit> {
        use Cmip6Derived as D;
        use Cmip6Variable as R;
        Ok(match derived {
            D::Et0FaoEvapotranspirationSum => {
                let tmax = self.raw(R::Temperature2mMax, time).await?.data;
                let tmin = self.raw(R::Temperature2mMin, time).await?.data;
                let tmean = self.raw(R::Temperature2mMean, time).await?.data;
                let wind = self.raw(R::WindSpeed10mMean, time).await?.data;
                let radiation = self.raw(R::ShortwaveRadiationSum, time).await?.data;
                let humidity = self.humidity(time).await?;
                let hourly = time.time.with_dt(3600);
                let (lat, lon) = (self.reader.model_lat(), self.reader.model_lon());
                // W/m² hourly means to MJ/m² daily sums
                let exrad: Vec<f32> = solar::extraterrestrial_radiation_backwards(lat, lon, &hourly)
                    .chunks(24)
                    .map(|day| day.iter().sum::<f32>() * 0.0036)
                    .collect();
                let target = self.reader.target_elevation();
                let elevation = if target.is_nan() {
                    self.reader.model_elevation().numeric()
                } else {
                    target
                };
                let data = (0..tmax.len())
                    .map(|i| {
                        formulas::et0_evapotranspiration_daily(
                            tmax[i],
                            tmin[i],
                            tmean[i],
                            wind[i],
                            radiation[i],
                            elevation,
                            exrad.get(i).copied().unwrap_or(f32::NAN),
                            humidity[i],
                        )
                    })
                    .collect();
                DataAndUnit::new(data, SiUnit::Millimetre)
            }
            D::VapourPressureDeficitMax => {
                let tmax = self.raw(R::Temperature2mMax, time).await?.data;
                let tmin = self.raw(R::Temperature2mMin, time).await?.data;
                let humidity = self.humidity(time).await?;
                let data = (0..tmax.len())
                    .map(|i| formulas::vapour_pressure_deficit_daily(tmax[i], tmin[i], humidity[i]))
                    .collect();
                DataAndUnit::new(data, SiUnit::Kilopascal)
            }
            D::LeafWetnessProbabilityMean => {
                let tmax = self.raw(R::Temperature2mMax, time).await?.data;
                let tmin = self.raw(R::Temperature2mMin, time).await?.data;
                let precipitation = self.raw(R::PrecipitationSum, time).await?.data;
                let humidity = self.humidity(time).await?;
                let data = (0..tmax.len())
                    .map(|i| {
                        formulas::leaf_wetness_probability_daily(
                            tmax[i],
                            tmin[i],
                            humidity[i],
                            precipitation[i],
                        )
                    })
                    .collect();
                DataAndUnit::new(data, SiUnit::Percentage)
            }
            D::SoilMoisture0To100cmMean => {
                let (surface, middle, deep) = self.soil_moisture_layers(time).await?;
                let data = (0..surface.data.len())
                    .map(|i| surface.data[i] * 0.1 + middle[i] * (0.28 - 0.1) + deep[i] * (1.0 - 0.28))
                    .collect();
                DataAndUnit::new(data, surface.unit)
            }
            D::SoilMoisture0To7cmMean => self.raw(R::SoilMoisture0To10cmMean, time).await?,
            D::SoilMoisture7To28cmMean => {
                let (surface, middle, _) = self.soil_moisture_layers(time).await?;
                DataAndUnit::new(middle, surface.unit)
            }
            D::SoilMoisture28To100cmMean => {
                let (surface, _, deep) = self.soil_moisture_layers(time).await?;
                DataAndUnit::new(deep, surface.unit)
            }
            D::SoilTemperature0To100cmMean => {
                let (unit, top, middle, deep) = self.soil_temperature_layers(time).await?;
                let data = (0..top.len())
                    .map(|i| top[i] * 0.07 + middle[i] * (0.28 - 0.07) + deep[i] * (1.0 - 0.28))
                    .collect();
                DataAndUnit::new(data, unit)
            }
            D::SoilTemperature0To7cmMean => {
                let (unit, top, _, _) = self.soil_temperature_layers(time).await?;
                DataAndUnit::new(top, unit)
            }
            D::SoilTemperature7To28cmMean => {
                let (unit, _, middle, _) = self.soil_temperature_layers(time).await?;
                DataAndUnit::new(middle, unit)
            }
            D::SoilTemperature28To100cmMean => {
                let (unit, _, _, deep) = self.soil_temperature_layers(time).await?;
                DataAndUnit::new(deep, unit)
            }
            D::WindGusts10mMean => self.raw(R::WindSpeed10mMean, time).await?,
            D::WindGusts10mMax => self.raw(R::WindSpeed10mMax, time).await?,
        })
    }
}

/// Pre-bias variables moved onto the ERA5 climatology.
pub type Cmip6BiasCorrected = BiasCorrector<Cmip6PreBiasReader>;

/// Derived variables computed from bias corrected (or uncorrected) inputs.
pub struct Cmip6PostBiasGraph<R> {
    reader: R,
    domain: Cmip6Domain,
}

/// Bias corrected CMIP6 reader.
pub type Cmip6Reader = DerivedReader<Cmip6PostBiasGraph<Cmip6BiasCorrected>>;

/// CMIP6 reader without bias correction.
pub type Cmip6ReaderUncorrected = DerivedReader<Cmip6PostBiasGraph<Cmip6PreBiasReader>>;

impl<R> DerivedReader<Cmip6PostBiasGraph<R>>
where
    R: GenericReaderProtocol<MixingVar = Cmip6VariableOrDerived>,
{
    pub fn wrap(reader: R, domain: Cmip6Domain) -> Self {
        Self::from_graph(Cmip6PostBiasGraph { reader, domain })
    }
}

impl DerivedReader<Cmip6PostBiasGraph<Cmip6BiasCorrected>> {
    /// Model cell at the coordinate, corrected toward ERA5-Land where it is
    /// land and ERA5 otherwise.
    pub async fn new(
        domain: Cmip6Domain,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        Self::with_weights(domain, lat, lon, elevation, mode, ReferenceWeightsMode::Nearest, store)
            .await
    }

    /// Like [`new`](Self::new). With [`ReferenceWeightsMode::Interpolated`]
    /// the ERA5 weights are blended from the four surrounding cells instead.
    pub async fn with_weights(
        domain: Cmip6Domain,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        weights: ReferenceWeightsMode,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        let Some(model) =
            Cmip6PreBiasReader::new(domain, lat, lon, elevation, mode, store.clone()).await?
        else {
            return Ok(None);
        };
        let elevation = if elevation.is_nan() {
            model.target_elevation()
        } else {
            elevation
        };
        let corrected = match weights {
            ReferenceWeightsMode::Nearest => {
                BiasCorrector::era5_seamless(model, lat, lon, elevation, mode, store).await?
            }
            ReferenceWeightsMode::Interpolated => {
                BiasCorrector::with_interpolated_reference(model, CdsDomain::Era5Daily, lat, lon, store)
                    .await?
            }
        };
        Ok(corrected.map(|corrected| Self::wrap(corrected, domain)))
    }
}

impl DerivedReader<Cmip6PostBiasGraph<Cmip6PreBiasReader>> {
    pub async fn new(
        domain: Cmip6Domain,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        Ok(Cmip6PreBiasReader::new(domain, lat, lon, elevation, mode, store)
            .await?
            .map(|model| Self::wrap(model, domain)))
    }
}

impl<R> Cmip6PostBiasGraph<R>
where
    R: GenericReaderProtocol<MixingVar = Cmip6VariableOrDerived>,
{
    async fn raw(&self, variable: Cmip6Variable, time: &TimerangeDtAndSettings) -> Result<DataAndUnit> {
        self.reader.get(VariableOrDerived::Raw(variable), time).await
    }

    async fn pre(&self, variable: Cmip6Derived, time: &TimerangeDtAndSettings) -> Result<DataAndUnit> {
        self.reader.get(VariableOrDerived::Derived(variable), time).await
    }

    fn humidity_for(&self, wanted: Cmip6Variable) -> Cmip6Variable {
        if self.domain.has_humidity_extremes() {
            wanted
        } else {
            Cmip6Variable::RelativeHumidity2mMean
        }
    }

    async fn dewpoint(
        &self,
        humidity: Cmip6Variable,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        let tmax = self.raw(Cmip6Variable::Temperature2mMax, time).await?.data;
        let tmin = self.raw(Cmip6Variable::Temperature2mMin, time).await?.data;
        let rh = self.raw(self.humidity_for(humidity), time).await?.data;
        let data = (0..tmax.len())
            .map(|i| formulas::dewpoint_daily(tmax[i], tmin[i], rh[i]))
            .collect();
        Ok(DataAndUnit::new(data, SiUnit::Celsius))
    }

    async fn soil_moisture_index(
        &self,
        soil_moisture: Cmip6VariableOrDerived,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        let soil_type = self
            .reader
            .get_static(StaticVariable::SoilType)
            .await?
            .ok_or_else(|| ReaderError::MissingStatic {
                field: StaticVariable::SoilType.name().to_string(),
                domain: self.domain.name().to_string(),
            })?;
        let moisture = self.reader.get(soil_moisture, time).await?.data;
        Ok(DataAndUnit::new(
            soil_moisture_index_series(soil_type, &moisture),
            SiUnit::Fraction,
        ))
    }
}

#[async_trait]
impl<R> DerivedVariableGraph for Cmip6PostBiasGraph<R>
where
    R: GenericReaderProtocol<MixingVar = Cmip6VariableOrDerived>,
{
    type Raw = Cmip6VariableOrDerived;
    type Derived = Cmip6VariablePostBias;
    type Inner = R;

    fn inner(&self) -> &R {
        &self.reader
    }

    fn dependencies(&self, derived: Cmip6VariablePostBias) -> Vec<Cmip6VariableOrDerivedPostBias> {
        use Cmip6Derived as P;
        use Cmip6Variable as R;
        use Cmip6VariablePostBias as D;
        let raw = |v: Cmip6Variable| -> Cmip6VariableOrDerivedPostBias {
            VariableOrDerived::Raw(VariableOrDerived::Raw(v))
        };
        let pre = |v: Cmip6Derived| -> Cmip6VariableOrDerivedPostBias {
            VariableOrDerived::Raw(VariableOrDerived::Derived(v))
        };
        match derived {
            D::SnowfallSum => vec![raw(R::SnowfallWaterEquivalentSum)],
            D::RainSum => vec![raw(R::PrecipitationSum), raw(R::SnowfallWaterEquivalentSum)],
            D::Dewpoint2mMax | D::DewPoint2mMax => vec![
                raw(R::Temperature2mMax),
                raw(R::Temperature2mMin),
                raw(self.humidity_for(R::RelativeHumidity2mMax)),
            ],
            D::Dewpoint2mMin | D::DewPoint2mMin => vec![
                raw(R::Temperature2mMax),
                raw(R::Temperature2mMin),
                raw(self.humidity_for(R::RelativeHumidity2mMin)),
            ],
            D::Dewpoint2mMean | D::DewPoint2mMean => vec![
                raw(R::Temperature2mMax),
                raw(R::Temperature2mMin),
                raw(R::RelativeHumidity2mMean),
            ],
            D::GrowingDegreeDaysBase0Limit50 => {
                vec![raw(R::Temperature2mMax), raw(R::Temperature2mMin)]
            }
            D::SoilMoistureIndex0To10cmMean => vec![raw(R::SoilMoisture0To10cmMean)],
            D::SoilMoistureIndex0To100cmMean => vec![pre(P::SoilMoisture0To100cmMean)],
            D::DaylightDuration => vec![],
            D::Windspeed2mMax | D::WindSpeed2mMax | D::Windspeed10mMax => {
                vec![raw(R::WindSpeed10mMax)]
            }
            D::Windspeed2mMean | D::WindSpeed2mMean | D::Windspeed10mMean => {
                vec![raw(R::WindSpeed10mMean)]
            }
            D::Windgusts10mMean => vec![pre(P::WindGusts10mMean)],
            D::Windgusts10mMax => vec![pre(P::WindGusts10mMax)],
            D::VaporPressureDeficitMax => vec![pre(P::VapourPressureDeficitMax)],
        }
    }

    async fn compute(
        &self,
        derived: Cmip6VariablePostBias,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        use Cmip6Derived as P;
        use Cmip6Variable as R;
        use Cmip6VariablePostBias as D;
        Ok(match derived {
            D::SnowfallSum => self
                .raw(R::SnowfallWaterEquivalentSum, time)
                .await?
                .map(|swe| swe * SNOW_WATER_TO_DEPTH_CM)
                .with_unit(SiUnit::Centimetre),
            D::RainSum => {
                let precipitation = self.raw(R::PrecipitationSum, time).await?;
                let snow = self.raw(R::SnowfallWaterEquivalentSum, time).await?.data;
                DataAndUnit::new(
                    map2(&precipitation.data, &snow, |p, s| floor_zero(p - s)),
                    precipitation.unit,
                )
            }
            D::Dewpoint2mMax | D::DewPoint2mMax => {
                self.dewpoint(R::RelativeHumidity2mMax, time).await?
            }
            D::Dewpoint2mMin | D::DewPoint2mMin => {
                self.dewpoint(R::RelativeHumidity2mMin, time).await?
            }
            D::Dewpoint2mMean | D::DewPoint2mMean => {
                self.dewpoint(R::RelativeHumidity2mMean, time).await?
            }
            D::GrowingDegreeDaysBase0Limit50 => {
                let tmax = self.raw(R::Temperature2mMax, time).await?.data;
                let tmin = self.raw(R::Temperature2mMin, time).await?.data;
                DataAndUnit::new(
                    map2(&tmax, &tmin, |max, min| formulas::growing_degree_days(max, min, 0.0, 50.0)),
                    SiUnit::GddCelsius,
                )
            }
            D::SoilMoistureIndex0To10cmMean => {
                self.soil_moisture_index(VariableOrDerived::Raw(R::SoilMoisture0To10cmMean), time)
                    .await?
            }
            D::SoilMoistureIndex0To100cmMean => {
                self.soil_moisture_index(VariableOrDerived::Derived(P::SoilMoisture0To100cmMean), time)
                    .await?
            }
            D::DaylightDuration => DataAndUnit::new(
                solar::daylight_duration(self.reader.model_lat(), &time.time),
                SiUnit::Seconds,
            ),
            D::Windspeed2mMax | D::WindSpeed2mMax => {
                let scale = formulas::scale_wind_factor(10.0, 2.0);
                self.raw(R::WindSpeed10mMax, time).await?.map(|w| w * scale)
            }
            D::Windspeed2mMean | D::WindSpeed2mMean => {
                let scale = formulas::scale_wind_factor(10.0, 2.0);
                self.raw(R::WindSpeed10mMean, time).await?.map(|w| w * scale)
            }
            D::Windspeed10mMax => self.raw(R::WindSpeed10mMax, time).await?,
            D::Windspeed10mMean => self.raw(R::WindSpeed10mMean, time).await?,
            D::Windgusts10mMean => self.pre(P::WindGusts10mMean, time).await?,
            D::Windgusts10mMax => self.pre(P::WindGusts10mMax, time).await?,
            D::VaporPressureDeficitMax => self.pre(P::VapourPressureDeficitMax, time).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::GenericVariable;

    #[test]
    fn test_domains() {
        for domain in Cmip6Domain::ALL {
            assert_eq!(domain.as_str().parse::<Cmip6Domain>().unwrap(), *domain);
            assert_eq!(domain.dt_seconds(), 86400);
            assert!(domain.grid().find_point(47.5, 8.5).is_some());
        }
        assert!(Cmip6Domain::MRI_AGCM3_2_S.has_humidity_extremes());
        assert!(!Cmip6Domain::HiRAM_SIT_HR.has_humidity_extremes());
    }

    #[test]
    fn test_bias_correction_types() {
        assert_eq!(
            Cmip6Variable::PrecipitationSum.bias_correction_type(),
            ChangeType::RelativeChange { maximum: None }
        );
        assert_eq!(
            Cmip6Variable::RelativeHumidity2mMean.bias_correction_type().bounds(),
            Some((0.0, 100.0))
        );
        assert!(Cmip6Variable::Temperature2mMax.applies_lapse_rate());
        assert!(!Cmip6Variable::PressureMslMean.applies_lapse_rate());
        assert!(!Cmip6Derived::SoilTemperature0To7cmMean.applies_lapse_rate());
    }

    #[test]
    fn test_post_bias_names() {
        let v: Cmip6VariableOrDerivedPostBias = "soil_temperature_7_to_28cm_mean".parse().unwrap();
        assert_eq!(
            v,
            VariableOrDerived::Raw(VariableOrDerived::Derived(Cmip6Derived::SoilTemperature7To28cmMean))
        );
        let v: Cmip6VariableOrDerivedPostBias = "dew_point_2m_mean".parse().unwrap();
        assert_eq!(v.name(), "dew_point_2m_mean");
        assert!("growing_degree_days".parse::<Cmip6VariableOrDerivedPostBias>().is_err());
    }

    #[test]
    fn test_daily_humidity() {
        let extremes = daily_humidity(&[90.0], Some(&[40.0]));
        assert_eq!(extremes, vec![MaxAndMinOrMean::MaxMin { max: 90.0, min: 40.0 }]);
        let mean = daily_humidity(&[65.0], None);
        assert_eq!(mean, vec![MaxAndMinOrMean::Mean(65.0)]);
    }
}
