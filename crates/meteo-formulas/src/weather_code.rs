//! WMO weather interpretation codes derived from model output.
//!
//! Thresholds are given per hour and scaled with the time step, so the same
//! rules apply to hourly and 3-hourly data.

/// WMO weather code as used in forecast output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WeatherCode {
    ClearSky = 0,
    MainlyClear = 1,
    PartlyCloudy = 2,
    Overcast = 3,
    Fog = 45,
    DepositingRimeFog = 48,
    LightDrizzle = 51,
    ModerateDrizzle = 53,
    DenseDrizzle = 55,
    LightFreezingDrizzle = 56,
    DenseFreezingDrizzle = 57,
    LightRain = 61,
    ModerateRain = 63,
    HeavyRain = 65,
    LightFreezingRain = 66,
    HeavyFreezingRain = 67,
    SlightSnowfall = 71,
    ModerateSnowfall = 73,
    HeavySnowfall = 75,
    SnowGrains = 77,
    SlightRainShowers = 80,
    ModerateRainShowers = 81,
    HeavyRainShowers = 82,
    SlightSnowShowers = 85,
    HeavySnowShowers = 86,
    Thunderstorm = 95,
    ThunderstormSlightHail = 96,
    ThunderstormHeavyHail = 99,
}

impl WeatherCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_f32(self) -> f32 {
        self as u8 as f32
    }
}

/// Inputs of one time step. Absent inputs disable the rules using them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeatherCodeInput {
    /// Total cloud cover in %
    pub cloud_cover: f32,
    /// Precipitation sum of the time step in mm
    pub precipitation: f32,
    /// Convective part of the precipitation in mm
    pub convective_precipitation: Option<f32>,
    /// Snowfall in cm
    pub snowfall: Option<f32>,
    /// Total column precipitating ice in the step, used as a thunder proxy
    pub cape: Option<f32>,
    /// Wind gusts in m/s
    pub gusts: Option<f32>,
    /// Visibility in m
    pub visibility: Option<f32>,
    /// 2 m temperature in °C, for freezing rain
    pub temperature: Option<f32>,
    /// Whether the model reports a liquid phase below 0 °C
    pub categorical_freezing_rain: Option<bool>,
}

/// Derive a WMO code. Returns `None` when cloud cover or precipitation is
/// missing.
pub fn calculate(input: &WeatherCodeInput, dt_seconds: i64) -> Option<WeatherCode> {
    use WeatherCode::*;

    if input.cloud_cover.is_nan() || input.precipitation.is_nan() {
        return None;
    }
    let hours = (dt_seconds as f32 / 3600.0).max(1.0);
    let precipitation = input.precipitation;
    let snowfall = input.snowfall.filter(|s| !s.is_nan()).unwrap_or(0.0);
    let convective = input
        .convective_precipitation
        .filter(|c| !c.is_nan())
        .unwrap_or(0.0);

    if let Some(cape) = input.cape.filter(|c| !c.is_nan()) {
        if cape >= 3000.0 && precipitation > 0.3 * hours {
            let gusts = input.gusts.filter(|g| !g.is_nan()).unwrap_or(0.0);
            return Some(if gusts >= 28.0 {
                ThunderstormHeavyHail
            } else if gusts >= 18.0 {
                ThunderstormSlightHail
            } else {
                Thunderstorm
            });
        }
    }

    let freezing = match (input.categorical_freezing_rain, input.temperature) {
        (Some(flag), _) => flag,
        (None, Some(t)) => t < 0.0 && snowfall <= 0.0,
        (None, None) => false,
    };
    if freezing && precipitation >= 0.1 * hours && snowfall <= 0.0 {
        return Some(if precipitation >= 2.5 * hours {
            HeavyFreezingRain
        } else {
            LightFreezingRain
        });
    }

    if snowfall > 0.0 {
        let showers = convective > 0.0 && convective >= precipitation * 0.5;
        if showers {
            return Some(if snowfall >= 0.8 * hours {
                HeavySnowShowers
            } else {
                SlightSnowShowers
            });
        }
        return Some(if snowfall >= 0.8 * hours {
            HeavySnowfall
        } else if snowfall >= 0.2 * hours {
            ModerateSnowfall
        } else {
            SlightSnowfall
        });
    }

    if precipitation >= 0.1 * hours {
        let showers = convective > 0.0 && convective >= precipitation * 0.5;
        return Some(match (showers, precipitation / hours) {
            (true, p) if p >= 7.6 => HeavyRainShowers,
            (true, p) if p >= 2.5 => ModerateRainShowers,
            (true, _) => SlightRainShowers,
            (false, p) if p >= 7.6 => HeavyRain,
            (false, p) if p >= 2.5 => ModerateRain,
            (false, _) => LightRain,
        });
    }

    if let Some(visibility) = input.visibility.filter(|v| !v.is_nan()) {
        if visibility <= 1000.0 {
            return Some(Fog);
        }
    }

    Some(match input.cloud_cover {
        c if c >= 80.0 => Overcast,
        c if c >= 50.0 => PartlyCloudy,
        c if c >= 20.0 => MainlyClear,
        _ => ClearSky,
    })
}

/// Weather codes for whole series. Missing cloud cover or precipitation gives
/// NaN.
pub fn calculate_series(
    cloud_cover: &[f32],
    precipitation: &[f32],
    snowfall: Option<&[f32]>,
    convective_precipitation: Option<&[f32]>,
    dt_seconds: i64,
) -> Vec<f32> {
    cloud_cover
        .iter()
        .zip(precipitation)
        .enumerate()
        .map(|(i, (&cloud_cover, &precipitation))| {
            let input = WeatherCodeInput {
                cloud_cover,
                precipitation,
                snowfall: snowfall.and_then(|s| s.get(i).copied()),
                convective_precipitation: convective_precipitation.and_then(|c| c.get(i).copied()),
                ..Default::default()
            };
            calculate(&input, dt_seconds).map_or(f32::NAN, WeatherCode::as_f32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(cloud_cover: f32, precipitation: f32) -> WeatherCodeInput {
        WeatherCodeInput {
            cloud_cover,
            precipitation,
            ..Default::default()
        }
    }

    #[test]
    fn test_cloud_levels() {
        assert_eq!(calculate(&input(5.0, 0.0), 3600), Some(WeatherCode::ClearSky));
        assert_eq!(calculate(&input(30.0, 0.0), 3600), Some(WeatherCode::MainlyClear));
        assert_eq!(calculate(&input(60.0, 0.0), 3600), Some(WeatherCode::PartlyCloudy));
        assert_eq!(calculate(&input(95.0, 0.0), 3600), Some(WeatherCode::Overcast));
    }

    #[test]
    fn test_rain_intensity_scales_with_step() {
        assert_eq!(calculate(&input(100.0, 1.0), 3600), Some(WeatherCode::LightRain));
        assert_eq!(calculate(&input(100.0, 3.0), 3600), Some(WeatherCode::ModerateRain));
        // Same amount over three hours is light
        assert_eq!(calculate(&input(100.0, 3.0), 10800), Some(WeatherCode::LightRain));
        assert_eq!(calculate(&input(100.0, 10.0), 3600), Some(WeatherCode::HeavyRain));
    }

    #[test]
    fn test_snow_wins_over_rain() {
        let mut snow = input(100.0, 2.0);
        snow.snowfall = Some(1.0);
        assert_eq!(calculate(&snow, 3600), Some(WeatherCode::HeavySnowfall));
        snow.snowfall = Some(0.1);
        assert_eq!(calculate(&snow, 3600), Some(WeatherCode::SlightSnowfall));
        snow.convective_precipitation = Some(2.0);
        assert_eq!(calculate(&snow, 3600), Some(WeatherCode::SlightSnowShowers));
    }

    #[test]
    fn test_showers_and_thunder() {
        let mut showers = input(80.0, 3.0);
        showers.convective_precipitation = Some(2.0);
        assert_eq!(calculate(&showers, 3600), Some(WeatherCode::ModerateRainShowers));
        showers.cape = Some(3500.0);
        assert_eq!(calculate(&showers, 3600), Some(WeatherCode::Thunderstorm));
    }

    #[test]
    fn test_freezing_rain() {
        let mut freezing = input(100.0, 3.0);
        freezing.temperature = Some(-2.0);
        assert_eq!(calculate(&freezing, 3600), Some(WeatherCode::HeavyFreezingRain));
    }

    #[test]
    fn test_missing_inputs() {
        assert_eq!(calculate(&input(f32::NAN, 0.0), 3600), None);
        let codes = calculate_series(&[10.0, f32::NAN], &[0.0, 0.0], None, None, 3600);
        assert_eq!(codes[0], 0.0);
        assert!(codes[1].is_nan());
    }
}
