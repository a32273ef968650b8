//! Australian Bureau of Meteorology ACCESS-G global model.

use async_trait::async_trait;
use grid_processor::{GridSelectionMode, RegularGrid};
use meteo_common::{DataAndUnit, SiUnit, TimerangeDtAndSettings};
use meteo_formulas::{self as formulas, floor_zero, solar, SNOW_WATER_TO_DEPTH_CM};
use std::sync::Arc;
use storage::TimeSeriesStore;

use super::{map2, tilted_irradiance, to_instant};
use crate::domain::GenericDomain;
use crate::error::Result;
use crate::reader::{
    DerivedReader, DerivedVariableGraph, GenericReader, GenericReaderCached, GenericReaderProtocol,
};
use crate::variable::{GenericVariableMixable, RawVariable, ReaderInterpolation, VariableOrDerived};
use crate::{domain_names, variable_enum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BomDomain {
    AccessGlobal,
}

domain_names!(BomDomain {
    AccessGlobal => "bom_access_global",
});

const ACCESS_GLOBAL_GRID: RegularGrid = RegularGrid::new_unchecked(
    2048,
    1536,
    -89.941406,
    -179.912109,
    0.17578125,
    0.1171875,
);

impl GenericDomain for BomDomain {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn grid(&self) -> RegularGrid {
        ACCESS_GLOBAL_GRID
    }

    fn dt_seconds(&self) -> i64 {
        3600
    }

    fn update_interval_seconds(&self) -> i64 {
        6 * 3600
    }
}

variable_enum! {
    /// Variables stored for ACCESS-G.
    pub enum BomVariable {
        Temperature2m => "temperature_2m",
        RelativeHumidity2m => "relative_humidity_2m",
        WindSpeed10m => "wind_speed_10m",
        WindDirection10m => "wind_direction_10m",
        WindSpeed40m => "wind_speed_40m",
        WindDirection40m => "wind_direction_40m",
        WindSpeed80m => "wind_speed_80m",
        WindDirection80m => "wind_direction_80m",
        WindSpeed120m => "wind_speed_120m",
        WindDirection120m => "wind_direction_120m",
        WindGusts10m => "wind_gusts_10m",
        ShortwaveRadiation => "shortwave_radiation",
        DirectRadiation => "direct_radiation",
        Precipitation => "precipitation",
        Showers => "showers",
        SnowfallWaterEquivalent => "snowfall_water_equivalent",
        PressureMsl => "pressure_msl",
        CloudCover => "cloud_cover",
        CloudCoverLow => "cloud_cover_low",
        CloudCoverMid => "cloud_cover_mid",
        CloudCoverHigh => "cloud_cover_high",
        WeatherCode => "weather_code",
        SoilTemperature0To10cm => "soil_temperature_0_to_10cm",
        SoilTemperature10To35cm => "soil_temperature_10_to_35cm",
        SoilTemperature35To100cm => "soil_temperature_35_to_100cm",
        SoilTemperature100To300cm => "soil_temperature_100_to_300cm",
        SoilMoisture0To10cm => "soil_moisture_0_to_10cm",
        SoilMoisture10To35cm => "soil_moisture_10_to_35cm",
        SoilMoisture35To100cm => "soil_moisture_35_to_100cm",
        SoilMoisture100To300cm => "soil_moisture_100_to_300cm",
        SnowDepth => "snow_depth",
    }
}

impl GenericVariableMixable for BomVariable {
    fn requires_offset_correction_for_mixing(&self) -> bool {
        use BomVariable::*;
        matches!(
            self,
            SoilMoisture0To10cm
                | SoilMoisture10To35cm
                | SoilMoisture35To100cm
                | SoilMoisture100To300cm
                | SnowDepth
        )
    }
}

impl RawVariable for BomVariable {
    fn unit(&self) -> SiUnit {
        use BomVariable::*;
        match self {
            Temperature2m
            | SoilTemperature0To10cm
            | SoilTemperature10To35cm
            | SoilTemperature35To100cm
            | SoilTemperature100To300cm => SiUnit::Celsius,
            RelativeHumidity2m | CloudCover | CloudCoverLow | CloudCoverMid | CloudCoverHigh => {
                SiUnit::Percentage
            }
            WindSpeed10m | WindSpeed40m | WindSpeed80m | WindSpeed120m | WindGusts10m => {
                SiUnit::MetrePerSecond
            }
            WindDirection10m | WindDirection40m | WindDirection80m | WindDirection120m => {
                SiUnit::DegreeDirection
            }
            ShortwaveRadiation | DirectRadiation => SiUnit::WattPerSquareMetre,
            Precipitation | Showers | SnowfallWaterEquivalent => SiUnit::Millimetre,
            PressureMsl => SiUnit::Hectopascal,
            WeatherCode => SiUnit::WmoCode,
            SoilMoisture0To10cm
            | SoilMoisture10To35cm
            | SoilMoisture35To100cm
            | SoilMoisture100To300cm => SiUnit::CubicMetrePerCubicMetre,
            SnowDepth => SiUnit::Metre,
        }
    }

    fn interpolation(&self) -> ReaderInterpolation {
        use BomVariable::*;
        match self {
            Temperature2m
            | SoilTemperature0To10cm
            | SoilTemperature10To35cm
            | SoilTemperature35To100cm
            | SoilTemperature100To300cm
            | PressureMsl => ReaderInterpolation::Hermite { bounds: None },
            RelativeHumidity2m | CloudCover | CloudCoverLow | CloudCoverMid | CloudCoverHigh => {
                ReaderInterpolation::Hermite {
                    bounds: Some((0.0, 100.0)),
                }
            }
            WindSpeed10m | WindSpeed40m | WindSpeed80m | WindSpeed120m | WindGusts10m => {
                ReaderInterpolation::Hermite {
                    bounds: Some((0.0, f32::INFINITY)),
                }
            }
            WindDirection10m | WindDirection40m | WindDirection80m | WindDirection120m => {
                ReaderInterpolation::LinearDegrees
            }
            ShortwaveRadiation | DirectRadiation => ReaderInterpolation::SolarBackwardsAveraged,
            Precipitation | Showers | SnowfallWaterEquivalent => ReaderInterpolation::BackwardsSum,
            WeatherCode
            | SoilMoisture0To10cm
            | SoilMoisture10To35cm
            | SoilMoisture35To100cm
            | SoilMoisture100To300cm
            | SnowDepth => ReaderInterpolation::Linear,
        }
    }

    fn is_elevation_correctable(&self) -> bool {
        matches!(self, Self::Temperature2m)
    }
}

variable_enum! {
    /// Variables computed from ACCESS-G output, including legacy names.
    pub enum BomVariableDerived {
        ApparentTemperature => "apparent_temperature",
        Relativehumidity2m => "relativehumidity_2m",
        Dewpoint2m => "dewpoint_2m",
        DewPoint2m => "dew_point_2m",
        Windspeed10m => "windspeed_10m",
        Winddirection10m => "winddirection_10m",
        Windspeed40m => "windspeed_40m",
        Winddirection40m => "winddirection_40m",
        Windspeed80m => "windspeed_80m",
        Winddirection80m => "winddirection_80m",
        Windspeed120m => "windspeed_120m",
        Winddirection120m => "winddirection_120m",
        Windgusts10m => "windgusts_10m",
        DirectNormalIrradiance => "direct_normal_irradiance",
        DirectNormalIrradianceInstant => "direct_normal_irradiance_instant",
        DirectRadiationInstant => "direct_radiation_instant",
        DiffuseRadiation => "diffuse_radiation",
        DiffuseRadiationInstant => "diffuse_radiation_instant",
        ShortwaveRadiationInstant => "shortwave_radiation_instant",
        GlobalTiltedIrradiance => "global_tilted_irradiance",
        GlobalTiltedIrradianceInstant => "global_tilted_irradiance_instant",
        Et0FaoEvapotranspiration => "et0_fao_evapotranspiration",
        VaporPressureDeficit => "vapor_pressure_deficit",
        VapourPressureDeficit => "vapour_pressure_deficit",
        SurfacePressure => "surface_pressure",
        TerrestrialRadiation => "terrestrial_radiation",
        TerrestrialRadiationInstant => "terrestrial_radiation_instant",
        Weathercode => "weathercode",
        IsDay => "is_day",
        Rain => "rain",
        Snowfall => "snowfall",
        WetBulbTemperature2m => "wet_bulb_temperature_2m",
        Cloudcover => "cloudcover",
        CloudcoverLow => "cloudcover_low",
        CloudcoverMid => "cloudcover_mid",
        CloudcoverHigh => "cloudcover_high",
        SunshineDuration => "sunshine_duration",
        SoilTemperature10To45cm => "soil_temperature_10_to_45cm",
        SoilTemperature40To100cm => "soil_temperature_40_to_100cm",
        SoilTemperature100To200cm => "soil_temperature_100_to_200cm",
        SoilMoisture10To40cm => "soil_moisture_10_to_40cm",
        SoilMoisture40To100cm => "soil_moisture_40_to_100cm",
        SoilMoisture100To200cm => "soil_moisture_100_to_200cm",
    }
}

impl GenericVariableMixable for BomVariableDerived {}

pub type BomVariableOrDerived = VariableOrDerived<BomVariable, BomVariableDerived>;

/// Derived variables of ACCESS-G.
pub struct BomGraph {
    reader: GenericReaderCached<BomDomain, BomVariable>,
}

pub type BomReader = DerivedReader<BomGraph>;

impl DerivedReader<BomGraph> {
    pub async fn new(
        domain: BomDomain,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        Ok(
            GenericReaderCached::new(domain, lat, lon, elevation, mode, store)
                .await?
                .map(|reader| Self::from_graph(BomGraph { reader })),
        )
    }

    pub async fn at_gridpoint(
        domain: BomDomain,
        gridpoint: usize,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Self> {
        let reader = GenericReader::at_gridpoint(domain, gridpoint, store).await?;
        Ok(Self::from_graph(BomGraph {
            reader: GenericReaderCached::wrap(reader),
        }))
    }
}

impl BomGraph {
    async fn raw(&self, variable: BomVariable, time: &TimerangeDtAndSettings) -> Result<DataAndUnit> {
        self.reader.get(variable, time).await
    }

    async fn derived(
        &self,
        variable: BomVariableDerived,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        self.compute(variable, time).await
    }

    fn lat_lon(&self) -> (f32, f32) {
        (self.reader.model_lat(), self.reader.model_lon())
    }

    async fn dewpoint(&self, time: &TimerangeDtAndSettings) -> Result<Vec<f32>> {
        let temperature = self.raw(BomVariable::Temperature2m, time).await?.data;
        let humidity = self.raw(BomVariable::RelativeHumidity2m, time).await?.data;
        Ok(map2(&temperature, &humidity, formulas::dewpoint))
    }

    async fn diffuse(&self, time: &TimerangeDtAndSettings) -> Result<(Vec<f32>, Vec<f32>)> {
        let shortwave = self.raw(BomVariable::ShortwaveRadiation, time).await?.data;
        let direct = self.raw(BomVariable::DirectRadiation, time).await?.data;
        let diffuse = map2(&shortwave, &direct, |s, d| s - d);
        Ok((direct, diffuse))
    }
}

#[async_trait]
impl DerivedVariableGraph for BomGraph {
    type Raw = BomVariable;
    type Derived = BomVariableDerived;
    type Inner = GenericReaderCached<BomDomain, BomVariable>;

    fn inner(&self) -> &Self::Inner {
        &self.reader
    }

    fn dependencies(&self, derived: BomVariableDerived) -> Vec<BomVariableOrDerived> {
        use BomVariable as R;
        use BomVariableDerived as D;
        use VariableOrDerived::Raw;
        match derived {
            D::ApparentTemperature => vec![
                Raw(R::Temperature2m),
                Raw(R::WindSpeed10m),
                Raw(R::RelativeHumidity2m),
                Raw(R::ShortwaveRadiation),
            ],
            D::Relativehumidity2m => vec![Raw(R::RelativeHumidity2m)],
            D::Dewpoint2m | D::DewPoint2m | D::WetBulbTemperature2m => {
                vec![Raw(R::Temperature2m), Raw(R::RelativeHumidity2m)]
            }
            D::VaporPressureDeficit | D::VapourPressureDeficit => {
                vec![Raw(R::Temperature2m), Raw(R::RelativeHumidity2m)]
            }
            D::Windspeed10m => vec![Raw(R::WindSpeed10m)],
            D::Winddirection10m => vec![Raw(R::WindDirection10m)],
            D::Windspeed40m => vec![Raw(R::WindSpeed40m)],
            D::Winddirection40m => vec![Raw(R::WindDirection40m)],
            D::Windspeed80m => vec![Raw(R::WindSpeed80m)],
            D::Winddirection80m => vec![Raw(R::WindDirection80m)],
            D::Windspeed120m => vec![Raw(R::WindSpeed120m)],
            D::Winddirection120m => vec![Raw(R::WindDirection120m)],
            D::Windgusts10m => vec![Raw(R::WindGusts10m)],
            D::DirectNormalIrradiance
            | D::DirectNormalIrradianceInstant
            | D::DirectRadiationInstant
            | D::SunshineDuration => vec![Raw(R::DirectRadiation)],
            D::DiffuseRadiation
            | D::DiffuseRadiationInstant
            | D::GlobalTiltedIrradiance
            | D::GlobalTiltedIrradianceInstant => {
                vec![Raw(R::ShortwaveRadiation), Raw(R::DirectRadiation)]
            }
            D::ShortwaveRadiationInstant => vec![Raw(R::ShortwaveRadiation)],
            D::Et0FaoEvapotranspiration => vec![
                Raw(R::ShortwaveRadiation),
                Raw(R::Temperature2m),
                Raw(R::RelativeHumidity2m),
                Raw(R::WindSpeed10m),
            ],
            D::SurfacePressure => vec![Raw(R::PressureMsl), Raw(R::Temperature2m)],
            D::TerrestrialRadiation | D::TerrestrialRadiationInstant | D::IsDay => vec![],
            D::Weathercode => vec![Raw(R::WeatherCode)],
            D::Rain => vec![
                Raw(R::Precipitation),
                Raw(R::SnowfallWaterEquivalent),
                Raw(R::Showers),
            ],
            D::Snowfall => vec![Raw(R::SnowfallWaterEquivalent)],
            D::Cloudcover => vec![Raw(R::CloudCover)],
            D::CloudcoverLow => vec![Raw(R::CloudCoverLow)],
            D::CloudcoverMid => vec![Raw(R::CloudCoverMid)],
            D::CloudcoverHigh => vec![Raw(R::CloudCoverHigh)],
            D::SoilTemperature10To45cm => vec![Raw(R::SoilTemperature10To35cm)],
            D::SoilTemperature40To100cm => vec![Raw(R::SoilTemperature35To100cm)],
            D::SoilTemperature100To200cm => vec![Raw(R::SoilTemperature100To300cm)],
            D::SoilMoisture10To40cm => vec![Raw(R::SoilMoisture10To35cm)],
            D::SoilMoisture40To100cm => vec![Raw(R::SoilMoisture35To100cm)],
            D::SoilMoisture100To200cm => vec![Raw(R::SoilMoisture100To300cm)],
        }
    }

    async fn compute(
        &self,
        derived: BomVariableDerived,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        use BomVariable as R;
        use BomVariableDerived as D;
        let (lat, lon) = self.lat_lon();
        Ok(match derived {
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
            D::Relativehumidity2m => self.raw(R::RelativeHumidity2m, time).await?,
            D::Dewpoint2m | D::DewPoint2m => {
                DataAndUnit::new(self.dewpoint(time).await?, SiUnit::Celsius)
            }
            D::WetBulbTemperature2m => {
                let temperature = self.raw(R::Temperature2m, time).await?;
                let humidity = self.raw(R::RelativeHumidity2m, time).await?;
                DataAndUnit::new(
                    map2(&temperature.data, &humidity.data, formulas::wet_bulb_temperature),
                    temperature.unit,
                )
            }
            D::VaporPressureDeficit | D::VapourPressureDeficit => {
                let temperature = self.raw(R::Temperature2m, time).await?.data;
                let dewpoint = self.dewpoint(time).await?;
                DataAndUnit::new(
                    map2(&temperature, &dewpoint, formulas::vapour_pressure_deficit),
                    SiUnit::Kilopascal,
                )
            }
            D::Windspeed10m => self.raw(R::WindSpeed10m, time).await?,
            D::Winddirection10m => self.raw(R::WindDirection10m, time).await?,
            D::Windspeed40m => self.raw(R::WindSpeed40m, time).await?,
            D::Winddirection40m => self.raw(R::WindDirection40m, time).await?,
            D::Windspeed80m => self.raw(R::WindSpeed80m, time).await?,
            D::Winddirection80m => self.raw(R::WindDirection80m, time).await?,
            D::Windspeed120m => self.raw(R::WindSpeed120m, time).await?,
            D::Winddirection120m => self.raw(R::WindDirection120m, time).await?,
            D::Windgusts10m => self.raw(R::WindGusts10m, time).await?,
            D::DirectNormalIrradiance | D::DirectNormalIrradianceInstant => {
                let direct = self.raw(R::DirectRadiation, time).await?;
                let instant = derived == D::DirectNormalIrradianceInstant;
                DataAndUnit::new(
                    solar::direct_normal_irradiance_backwards(
                        &direct.data,
                        lat,
                        lon,
                        &time.time,
                        instant,
                    ),
                    SiUnit::WattPerSquareMetre,
                )
            }
            D::DirectRadiationInstant => {
                let direct = self.raw(R::DirectRadiation, time).await?;
                to_instant(direct, lat, lon, time)
            }
            D::DiffuseRadiation => {
                let (_, diffuse) = self.diffuse(time).await?;
                DataAndUnit::new(diffuse, SiUnit::WattPerSquareMetre)
            }
            D::DiffuseRadiationInstant => {
                let diffuse = self.derived(D::DiffuseRadiation, time).await?;
                to_instant(diffuse, lat, lon, time)
            }
            D::ShortwaveRadiationInstant => {
                let shortwave = self.raw(R::ShortwaveRadiation, time).await?;
                to_instant(shortwave, lat, lon, time)
            }
            D::GlobalTiltedIrradiance | D::GlobalTiltedIrradianceInstant => {
                let (direct, diffuse) = self.diffuse(time).await?;
                let instant = derived == D::GlobalTiltedIrradianceInstant;
                tilted_irradiance(&direct, &diffuse, lat, lon, time, instant)
            }
            D::Et0FaoEvapotranspiration => {
                let exrad = solar::extraterrestrial_radiation_backwards(lat, lon, &time.time);
                let shortwave = self.raw(R::ShortwaveRadiation, time).await?.data;
                let temperature = self.raw(R::Temperature2m, time).await?.data;
                let wind = self.raw(R::WindSpeed10m, time).await?.data;
                let dewpoint = self.dewpoint(time).await?;
                let elevation = self.reader.target_elevation();
                let data = (0..shortwave.len())
                    .map(|i| {
                        formulas::et0_evapotranspiration(
                            temperature[i],
                            wind[i],
                            dewpoint[i],
                            shortwave[i],
                            elevation,
                            exrad[i],
                            3600,
                        )
                    })
                    .collect();
                DataAndUnit::new(data, SiUnit::Millimetre)
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
            D::TerrestrialRadiation => DataAndUnit::new(
                solar::extraterrestrial_radiation_backwards(lat, lon, &time.time),
                SiUnit::WattPerSquareMetre,
            ),
            D::TerrestrialRadiationInstant => DataAndUnit::new(
                solar::extraterrestrial_radiation_instant(lat, lon, &time.time),
                SiUnit::WattPerSquareMetre,
            ),
            D::Weathercode => self.raw(R::WeatherCode, time).await?,
            D::IsDay => DataAndUnit::new(
                solar::is_day(lat, lon, &time.time),
                SiUnit::DimensionlessInteger,
            ),
            D::Rain => {
                let precipitation = self.raw(R::Precipitation, time).await?;
                let snow = self.raw(R::SnowfallWaterEquivalent, time).await?.data;
                let showers = self.raw(R::Showers, time).await?.data;
                let data = (0..precipitation.data.len())
                    .map(|i| floor_zero(precipitation.data[i] - snow[i] - showers[i]))
                    .collect();
                DataAndUnit::new(data, precipitation.unit)
            }
            D::Snowfall => self
                .raw(R::SnowfallWaterEquivalent, time)
                .await?
                .map(|swe| swe * SNOW_WATER_TO_DEPTH_CM)
                .with_unit(SiUnit::Centimetre),
            D::SunshineDuration => {
                let direct = self.raw(R::DirectRadiation, time).await?;
                DataAndUnit::new(
                    solar::sunshine_duration_backwards(&direct.data, lat, lon, &time.time),
                    SiUnit::Seconds,
                )
            }
            D::Cloudcover => self.raw(R::CloudCover, time).await?,
            D::CloudcoverLow => self.raw(R::CloudCoverLow, time).await?,
            D::CloudcoverMid => self.raw(R::CloudCoverMid, time).await?,
            D::CloudcoverHigh => self.raw(R::CloudCoverHigh, time).await?,
            D::SoilTemperature10To45cm => self.raw(R::SoilTemperature10To35cm, time).await?,
            D::SoilTemperature40To100cm => self.raw(R::SoilTemperature35To100cm, time).await?,
            D::SoilTemperature100To200cm => self.raw(R::SoilTemperature100To300cm, time).await?,
            D::SoilMoisture10To40cm => self.raw(R::SoilMoisture10To35cm, time).await?,
            D::SoilMoisture40To100cm => self.raw(R::SoilMoisture35To100cm, time).await?,
            D::SoilMoisture100To200cm => self.raw(R::SoilMoisture100To300cm, time).await?,
        })
    }
}
