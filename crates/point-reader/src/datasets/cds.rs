//! Copernicus Climate Data Store reanalyses: CERRA, ERA5 and ERA5-Land.
//!
//! ERA5 and ERA5-Land serve as bias correction references; CERRA has a
//! full reader with derived variables.

use async_trait::async_trait;
use grid_processor::{GridSelectionMode, RegularGrid};
use meteo_common::{DataAndUnit, SiUnit, TimerangeDtAndSettings};
use meteo_formulas::{self as formulas, floor_zero, solar, weather_code, SNOW_WATER_TO_DEPTH_CM};
use std::sync::Arc;
use storage::TimeSeriesStore;

use super::{map2, map3, tilted_irradiance, to_instant};
use crate::domain::GenericDomain;
use crate::error::Result;
use crate::reader::{
    DerivedReader, DerivedVariableGraph, GenericReader, GenericReaderCached, GenericReaderProtocol,
};
use crate::variable::{GenericVariableMixable, RawVariable, ReaderInterpolation, VariableOrDerived};
use crate::{domain_names, variable_enum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CdsDomain {
    Cerra,
    Era5,
    Era5Land,
    Era5Daily,
    Era5LandDaily,
}

domain_names!(CdsDomain {
    Cerra => "cerra",
    Era5 => "era5",
    Era5Land => "era5_land",
    Era5Daily => "era5_daily",
    Era5LandDaily => "era5_land_daily",
});

const ERA5_GRID: RegularGrid = RegularGrid::new_unchecked(1440, 721, -90.0, -180.0, 0.25, 0.25);
const ERA5_LAND_GRID: RegularGrid = RegularGrid::new_unchecked(3600, 1801, -90.0, -180.0, 0.1, 0.1);
// Regular stand-in for the Lambert conformal CERRA grid
const CERRA_GRID: RegularGrid = RegularGrid::new_unchecked(1400, 800, 30.0, -30.0, 0.05, 0.05);

impl GenericDomain for CdsDomain {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn grid(&self) -> RegularGrid {
        match self {
            Self::Cerra => CERRA_GRID,
            Self::Era5 | Self::Era5Daily => ERA5_GRID,
            Self::Era5Land | Self::Era5LandDaily => ERA5_LAND_GRID,
        }
    }

    fn dt_seconds(&self) -> i64 {
        match self {
            Self::Cerra => 3 * 3600,
            Self::Era5 | Self::Era5Land => 3600,
            Self::Era5Daily | Self::Era5LandDaily => 86400,
        }
    }

    fn update_interval_seconds(&self) -> i64 {
        match self {
            Self::Cerra => 0,
            _ => 86400,
        }
    }
}

variable_enum! {
    /// Variables stored for CERRA.
    pub enum CerraVariable {
        Temperature2m => "temperature_2m",
        WindSpeed10m => "wind_speed_10m",
        WindDirection10m => "wind_direction_10m",
        WindSpeed100m => "wind_speed_100m",
        WindDirection100m => "wind_direction_100m",
        WindGusts10m => "wind_gusts_10m",
        RelativeHumidity2m => "relative_humidity_2m",
        CloudCoverLow => "cloud_cover_low",
        CloudCoverMid => "cloud_cover_mid",
        CloudCoverHigh => "cloud_cover_high",
        PressureMsl => "pressure_msl",
        SnowfallWaterEquivalent => "snowfall_water_equivalent",
        ShortwaveRadiation => "shortwave_radiation",
        Precipitation => "precipitation",
        DirectRadiation => "direct_radiation",
        Albedo => "albedo",
        SnowDepth => "snow_depth",
        SnowDepthWaterEquivalent => "snow_depth_water_equivalent",
    }
}

impl GenericVariableMixable for CerraVariable {}

impl RawVariable for CerraVariable {
    fn unit(&self) -> SiUnit {
        use CerraVariable::*;
        match self {
            Temperature2m => SiUnit::Celsius,
            WindSpeed10m | WindSpeed100m | WindGusts10m => SiUnit::MetrePerSecond,
            WindDirection10m | WindDirection100m => SiUnit::DegreeDirection,
            RelativeHumidity2m | CloudCoverLow | CloudCoverMid | CloudCoverHigh | Albedo => {
                SiUnit::Percentage
            }
            PressureMsl => SiUnit::Hectopascal,
            SnowfallWaterEquivalent | Precipitation | SnowDepthWaterEquivalent => SiUnit::Millimetre,
            ShortwaveRadiation | DirectRadiation => SiUnit::WattPerSquareMetre,
            SnowDepth => SiUnit::Metre,
        }
    }

    fn interpolation(&self) -> ReaderInterpolation {
        use CerraVariable::*;
        match self {
            Temperature2m | WindSpeed10m | WindSpeed100m | WindGusts10m | PressureMsl => {
                ReaderInterpolation::Hermite { bounds: None }
            }
            WindDirection10m | WindDirection100m => ReaderInterpolation::LinearDegrees,
            RelativeHumidity2m | CloudCoverLow | CloudCoverMid | CloudCoverHigh => {
                ReaderInterpolation::Hermite {
                    bounds: Some((0.0, 100.0)),
                }
            }
            SnowfallWaterEquivalent | Precipitation => ReaderInterpolation::BackwardsSum,
            ShortwaveRadiation | DirectRadiation => ReaderInterpolation::SolarBackwardsAveraged,
            Albedo | SnowDepth | SnowDepthWaterEquivalent => ReaderInterpolation::Linear,
        }
    }

    fn is_elevation_correctable(&self) -> bool {
        matches!(self, Self::Temperature2m)
    }
}

variable_enum! {
    /// Variables computed from CERRA output.
    pub enum CerraVariableDerived {
        ApparentTemperature => "apparent_temperature",
        Dewpoint2m => "dewpoint_2m",
        DewPoint2m => "dew_point_2m",
        VaporPressureDeficit => "vapor_pressure_deficit",
        VapourPressureDeficit => "vapour_pressure_deficit",
        DiffuseRadiation => "diffuse_radiation",
        SurfacePressure => "surface_pressure",
        Snowfall => "snowfall",
        Rain => "rain",
        Et0FaoEvapotranspiration => "et0_fao_evapotranspiration",
        Cloudcover => "cloudcover",
        CloudCover => "cloud_cover",
        DirectNormalIrradiance => "direct_normal_irradiance",
        Weathercode => "weathercode",
        WeatherCode => "weather_code",
        IsDay => "is_day",
        TerrestrialRadiation => "terrestrial_radiation",
        TerrestrialRadiationInstant => "terrestrial_radiation_instant",
        ShortwaveRadiationInstant => "shortwave_radiation_instant",
        DiffuseRadiationInstant => "diffuse_radiation_instant",
        DirectRadiationInstant => "direct_radiation_instant",
        DirectNormalIrradianceInstant => "direct_normal_irradiance_instant",
        GlobalTiltedIrradiance => "global_tilted_irradiance",
        GlobalTiltedIrradianceInstant => "global_tilted_irradiance_instant",
        WetBulbTemperature2m => "wet_bulb_temperature_2m",
        Windspeed10m => "windspeed_10m",
        Winddirection10m => "winddirection_10m",
        Windspeed100m => "windspeed_100m",
        Winddirection100m => "winddirection_100m",
        SunshineDuration => "sunshine_duration",
    }
}

impl GenericVariableMixable for CerraVariableDerived {}

pub type CerraVariableOrDerived = VariableOrDerived<CerraVariable, CerraVariableDerived>;

/// Derived variables of CERRA.
pub struct CerraGraph {
    reader: GenericReaderCached<CdsDomain, CerraVariable>,
}

pub type CerraReader = DerivedReader<CerraGraph>;

impl DerivedReader<CerraGraph> {
    pub async fn new(
        domain: CdsDomain,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        Ok(
            GenericReaderCached::new(domain, lat, lon, elevation, mode, store)
                .await?
                .map(|reader| Self::from_graph(CerraGraph { reader })),
        )
    }

    pub async fn at_gridpoint(
        domain: CdsDomain,
        gridpoint: usize,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Self> {
        let reader = GenericReader::at_gridpoint(domain, gridpoint, store).await?;
        Ok(Self::from_graph(CerraGraph {
            reader: GenericReaderCached::wrap(reader),
        }))
    }
}

impl CerraGraph {
    async fn raw(&self, variable: CerraVariable, time: &TimerangeDtAndSettings) -> Result<DataAndUnit> {
        self.reader.get(variable, time).await
    }

    async fn derived(
        &self,
        variable: CerraVariableDerived,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        self.compute(variable, time).await
    }

    /// Shortwave minus direct radiation, both backwards averaged.
    async fn diffuse(&self, time: &TimerangeDtAndSettings) -> Result<(Vec<f32>, Vec<f32>)> {
        let shortwave = self.raw(CerraVariable::ShortwaveRadiation, time).await?.data;
        let direct = self.raw(CerraVariable::DirectRadiation, time).await?.data;
        let diffuse = map2(&shortwave, &direct, |s, d| s - d);
        Ok((direct, diffuse))
    }

    fn lat_lon(&self) -> (f32, f32) {
        (self.reader.model_lat(), self.reader.model_lon())
    }

    async fn tilted(&self, time: &TimerangeDtAndSettings, instant: bool) -> Result<DataAndUnit> {
        let (direct, diffuse) = self.diffuse(time).await?;
        let (lat, lon) = self.lat_lon();
        Ok(tilted_irradiance(&direct, &diffuse, lat, lon, time, instant))
    }
}

#[async_trait]
impl DerivedVariableGraph for CerraGraph {
    type Raw = CerraVariable;
    type Derived = CerraVariableDerived;
    type Inner = GenericReaderCached<CdsDomain, CerraVariable>;

    fn inner(&self) -> &Self::Inner {
        &self.reader
    }

    fn dependencies(&self, derived: CerraVariableDerived) -> Vec<CerraVariableOrDerived> {
        use CerraVariable as R;
        use CerraVariableDerived as D;
        use VariableOrDerived::{Derived, Raw};
        match derived {
            D::ApparentTemperature => vec![
                Raw(R::Temperature2m),
                Raw(R::WindSpeed10m),
                Raw(R::RelativeHumidity2m),
                Raw(R::ShortwaveRadiation),
            ],
            D::Dewpoint2m | D::DewPoint2m | D::WetBulbTemperature2m => {
                vec![Raw(R::Temperature2m), Raw(R::RelativeHumidity2m)]
            }
            D::VaporPressureDeficit | D::VapourPressureDeficit => {
                vec![Raw(R::Temperature2m), Derived(D::Dewpoint2m)]
            }
            D::DiffuseRadiation | D::GlobalTiltedIrradiance | D::GlobalTiltedIrradianceInstant => {
                vec![Raw(R::ShortwaveRadiation), Raw(R::DirectRadiation)]
            }
            D::Et0FaoEvapotranspiration => vec![
                Raw(R::ShortwaveRadiation),
                Raw(R::Temperature2m),
                Raw(R::WindSpeed10m),
                Derived(D::Dewpoint2m),
            ],
            D::SurfacePressure => vec![Raw(R::PressureMsl), Raw(R::Temperature2m)],
            D::Snowfall => vec![Raw(R::SnowfallWaterEquivalent)],
            D::Rain => vec![Raw(R::Precipitation), Raw(R::SnowfallWaterEquivalent)],
            D::Cloudcover | D::CloudCover => vec![
                Raw(R::CloudCoverLow),
                Raw(R::CloudCoverMid),
                Raw(R::CloudCoverHigh),
            ],
            D::Weathercode | D::WeatherCode => vec![
                Derived(D::CloudCover),
                Raw(R::Precipitation),
                Derived(D::Snowfall),
            ],
            D::IsDay | D::TerrestrialRadiation | D::TerrestrialRadiationInstant => vec![],
            D::ShortwaveRadiationInstant => vec![Raw(R::ShortwaveRadiation)],
            D::DiffuseRadiationInstant => vec![Derived(D::DiffuseRadiation)],
            D::DirectRadiationInstant
            | D::DirectNormalIrradiance
            | D::DirectNormalIrradianceInstant
            | D::SunshineDuration => vec![Raw(R::DirectRadiation)],
            D::Windspeed10m => vec![Raw(R::WindSpeed10m)],
            D::Winddirection10m => vec![Raw(R::WindDirection10m)],
            D::Windspeed100m => vec![Raw(R::WindSpeed100m)],
            D::Winddirection100m => vec![Raw(R::WindDirection100m)],
        }
    }

    async fn compute(
        &self,
        derived: CerraVariableDerived,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        use CerraVariable as R;
        use CerraVariableDerived as D;
        let (lat, lon) = self.lat_lon();
        Ok(match derived {
            D::Dewpoint2m | D::DewPoint2m => {
                let temperature = self.raw(R::Temperature2m, time).await?;
                let humidity = self.raw(R::RelativeHumidity2m, time).await?;
                DataAndUnit::new(
                    map2(&temperature.data, &humidity.data, formulas::dewpoint),
                    temperature.unit,
                )
            }
            D::ApparentTemperature => {
                let temperature = self.raw(R::Temperature2m, time).await?.data;
                let wind = self.raw(R::WindSpeed10m, time).await?.data;
                let humidity = self.raw(R::RelativeHumidity2m, time).await?.data;
                let shortwave = self.raw(R::ShortwaveRadiation, time).await?.data;
                let data = (0..temperature.len())
                    .map(|i| {
                        formulas::apparent_temperature(
                            temperature[i],
                            humidity[i],
                            wind[i],
                            Some(shortwave[i]),
                        )
                    })
                    .collect();
                DataAndUnit::new(data, SiUnit::Celsius)
            }
            D::VaporPressureDeficit | D::VapourPressureDeficit => {
                let temperature = self.raw(R::Temperature2m, time).await?.data;
                let dewpoint = self.derived(D::Dewpoint2m, time).await?.data;
                DataAndUnit::new(
                    map2(&temperature, &dewpoint, formulas::vapour_pressure_deficit),
                    SiUnit::Kilopascal,
                )
            }
            D::Et0FaoEvapotranspiration => {
                let exrad = solar::extraterrestrial_radiation_backwards(lat, lon, &time.time);
                let shortwave = self.raw(R::ShortwaveRadiation, time).await?.data;
                let temperature = self.raw(R::Temperature2m, time).await?.data;
                let wind = self.raw(R::WindSpeed10m, time).await?.data;
                let dewpoint = self.derived(D::Dewpoint2m, time).await?.data;
                let elevation = self.reader.model_elevation().numeric();
                let data = (0..shortwave.len())
                    .map(|i| {
                        formulas::et0_evapotranspiration(
                            temperature[i],
                            wind[i],
                            dewpoint[i],
                            shortwave[i],
                            elevation,
                            exrad[i],
                            time.dt_seconds(),
                        )
                    })
                    .collect();
                DataAndUnit::new(data, SiUnit::Millimetre)
            }
            D::DiffuseRadiation => {
                let (_, diffuse) = self.diffuse(time).await?;
                DataAndUnit::new(diffuse, SiUnit::WattPerSquareMetre)
            }
            D::SurfacePressure => {
                let temperature = self.raw(R::Temperature2m, time).await?.data;
                let pressure = self.raw(R::PressureMsl, time).await?;
                let elevation = self.reader.target_elevation();
                DataAndUnit::new(
                    map2(&pressure.data, &temperature, |p, t| {
                        formulas::surface_pressure(p, t, elevation)
                    }),
                    pressure.unit,
                )
            }
            D::Cloudcover | D::CloudCover => {
                let low = self.raw(R::CloudCoverLow, time).await?.data;
                let mid = self.raw(R::CloudCoverMid, time).await?.data;
                let high = self.raw(R::CloudCoverHigh, time).await?.data;
                DataAndUnit::new(
                    map3(&low, &mid, &high, formulas::cloud_cover_total),
                    SiUnit::Percentage,
                )
            }
            D::Snowfall => self
                .raw(R::SnowfallWaterEquivalent, time)
                .await?
                .map(|swe| swe * SNOW_WATER_TO_DEPTH_CM)
                .with_unit(SiUnit::Centimetre),
            D::Rain => {
                let precipitation = self.raw(R::Precipitation, time).await?;
                let snow = self.raw(R::SnowfallWaterEquivalent, time).await?.data;
                DataAndUnit::new(
                    map2(&precipitation.data, &snow, |p, s| floor_zero(p - s)),
                    precipitation.unit,
                )
            }
            D::DirectNormalIrradiance | D::DirectNormalIrradianceInstant => {
                let direct = self.raw(R::DirectRadiation, time).await?;
                let instant = derived == D::DirectNormalIrradianceInstant;
                let dni = solar::direct_normal_irradiance_backwards(
                    &direct.data,
                    lat,
                    lon,
                    &time.time,
                    instant,
                );
                DataAndUnit::new(dni, SiUnit::WattPerSquareMetre)
            }
            D::Weathercode | D::WeatherCode => {
                let cloud_cover = self.derived(D::CloudCover, time).await?.data;
                let precipitation = self.raw(R::Precipitation, time).await?.data;
                let snowfall = self.derived(D::Snowfall, time).await?.data;
                DataAndUnit::new(
                    weather_code::calculate_series(
                        &cloud_cover,
                        &precipitation,
                        Some(&snowfall),
                        None,
                        time.dt_seconds(),
                    ),
                    SiUnit::WmoCode,
                )
            }
            D::IsDay => DataAndUnit::new(
                solar::is_day(lat, lon, &time.time),
                SiUnit::DimensionlessInteger,
            ),
            D::TerrestrialRadiation => DataAndUnit::new(
                solar::extraterrestrial_radiation_backwards(lat, lon, &time.time),
                SiUnit::WattPerSquareMetre,
            ),
            D::TerrestrialRadiationInstant => DataAndUnit::new(
                solar::extraterrestrial_radiation_instant(lat, lon, &time.time),
                SiUnit::WattPerSquareMetre,
            ),
            D::ShortwaveRadiationInstant => {
                let shortwave = self.raw(R::ShortwaveRadiation, time).await?;
                to_instant(shortwave, lat, lon, time)
            }
            D::DirectRadiationInstant => {
                let direct = self.raw(R::DirectRadiation, time).await?;
                to_instant(direct, lat, lon, time)
            }
            D::DiffuseRadiationInstant => {
                let diffuse = self.derived(D::DiffuseRadiation, time).await?;
                to_instant(diffuse, lat, lon, time)
            }
            D::GlobalTiltedIrradiance => self.tilted(time, false).await?,
            D::GlobalTiltedIrradianceInstant => self.tilted(time, true).await?,
            D::WetBulbTemperature2m => {
                let temperature = self.raw(R::Temperature2m, time).await?;
                let humidity = self.raw(R::RelativeHumidity2m, time).await?;
                DataAndUnit::new(
                    map2(&temperature.data, &humidity.data, formulas::wet_bulb_temperature),
                    temperature.unit,
                )
            }
            D::Windspeed10m => self.raw(R::WindSpeed10m, time).await?,
            D::Winddirection10m => self.raw(R::WindDirection10m, time).await?,
            D::Windspeed100m => self.raw(R::WindSpeed100m, time).await?,
            D::Winddirection100m => self.raw(R::WindDirection100m, time).await?,
            D::SunshineDuration => {
                let direct = self.raw(R::DirectRadiation, time).await?;
                DataAndUnit::new(
                    solar::sunshine_duration_backwards(&direct.data, lat, lon, &time.time),
                    SiUnit::Seconds,
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::GenericVariable;

    #[test]
    fn test_domain_names() {
        for domain in CdsDomain::ALL {
            assert_eq!(domain.as_str().parse::<CdsDomain>().unwrap(), *domain);
        }
        assert_eq!(CdsDomain::Era5LandDaily.dt_seconds(), 86400);
        assert!(CdsDomain::Era5.grid().is_global());
    }

    #[test]
    fn test_grids_locate_europe() {
        let grid = CdsDomain::Cerra.grid();
        let gridpoint = grid.find_point(47.0, 8.0).unwrap();
        let (lat, lon) = grid.coordinates(gridpoint);
        assert!((lat - 47.0).abs() < 0.05 && (lon - 8.0).abs() < 0.05);
        assert!(CdsDomain::Cerra.grid().find_point(-10.0, 8.0).is_none());
    }

    #[test]
    fn test_variable_properties() {
        assert!(CerraVariable::Temperature2m.is_elevation_correctable());
        assert!(!CerraVariable::Precipitation.is_elevation_correctable());
        assert_eq!(
            CerraVariable::Precipitation.interpolation(),
            ReaderInterpolation::BackwardsSum
        );
        let v: CerraVariableOrDerived = "windspeed_10m".parse().unwrap();
        assert_eq!(v.name(), "windspeed_10m");
    }
}
