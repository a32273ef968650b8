//! Psychrometric and surface-layer formulas.
//!
//! Temperatures are degrees Celsius, relative humidity is percent, wind
//! speed is m/s, vapour pressure is kPa unless stated otherwise. NaN inputs
//! give NaN outputs.

/// Magnus coefficients (Alduchov & Eskridge).
const MAGNUS_B: f32 = 17.625;
const MAGNUS_C: f32 = 243.04;

/// Snow depth in cm produced by 1 mm of snow water equivalent.
pub const SNOW_WATER_TO_DEPTH_CM: f32 = 0.7;

/// Standard lapse rate in °C per metre.
pub const LAPSE_RATE: f32 = 0.0065;

/// `max(value, 0)` that keeps NaN.
pub fn floor_zero(value: f32) -> f32 {
    if value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Daily relative humidity: either the daily extremes or only the mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxAndMinOrMean {
    MaxMin { max: f32, min: f32 },
    Mean(f32),
}

/// Dewpoint from temperature and relative humidity (Magnus formula).
pub fn dewpoint(temperature: f32, relative_humidity: f32) -> f32 {
    if relative_humidity <= 0.0 {
        return f32::NAN;
    }
    let gamma = (relative_humidity / 100.0).ln()
        + MAGNUS_B * temperature / (MAGNUS_C + temperature);
    MAGNUS_C * gamma / (MAGNUS_B - gamma)
}

/// Relative humidity from temperature and dewpoint, clamped to 0..=100.
pub fn relative_humidity(temperature: f32, dewpoint: f32) -> f32 {
    let rh = 100.0
        * ((MAGNUS_B * dewpoint) / (MAGNUS_C + dewpoint)).exp()
        / ((MAGNUS_B * temperature) / (MAGNUS_C + temperature)).exp();
    rh.clamp(0.0, 100.0)
}

/// Daily dewpoint from the daily temperature extremes and a humidity value.
pub fn dewpoint_daily(temperature_max: f32, temperature_min: f32, relative_humidity: f32) -> f32 {
    dewpoint((temperature_max + temperature_min) / 2.0, relative_humidity)
}

/// Saturation vapour pressure in kPa (Tetens, FAO-56 eq. 11).
pub fn saturation_vapour_pressure(temperature: f32) -> f32 {
    0.6108 * ((17.27 * temperature) / (temperature + 237.3)).exp()
}

/// Vapour pressure deficit in kPa from temperature and dewpoint.
pub fn vapour_pressure_deficit(temperature: f32, dewpoint: f32) -> f32 {
    floor_zero(saturation_vapour_pressure(temperature) - saturation_vapour_pressure(dewpoint))
}

/// Actual vapour pressure from daily humidity (FAO-56 eq. 17 / 19).
fn actual_vapour_pressure_daily(
    temperature_max: f32,
    temperature_min: f32,
    relative_humidity: MaxAndMinOrMean,
) -> f32 {
    match relative_humidity {
        MaxAndMinOrMean::MaxMin { max, min } => {
            (saturation_vapour_pressure(temperature_min) * max / 100.0
                + saturation_vapour_pressure(temperature_max) * min / 100.0)
                / 2.0
        }
        MaxAndMinOrMean::Mean(mean) => {
            let es = (saturation_vapour_pressure(temperature_max)
                + saturation_vapour_pressure(temperature_min))
                / 2.0;
            es * mean / 100.0
        }
    }
}

/// Daily vapour pressure deficit in kPa.
pub fn vapour_pressure_deficit_daily(
    temperature_max: f32,
    temperature_min: f32,
    relative_humidity: MaxAndMinOrMean,
) -> f32 {
    let es = (saturation_vapour_pressure(temperature_max)
        + saturation_vapour_pressure(temperature_min))
        / 2.0;
    let ea = actual_vapour_pressure_daily(temperature_max, temperature_min, relative_humidity);
    floor_zero(es - ea)
}

/// Apparent temperature after Steadman, including absorbed solar radiation.
pub fn apparent_temperature(
    temperature: f32,
    relative_humidity: f32,
    wind_speed_10m: f32,
    shortwave_radiation: Option<f32>,
) -> f32 {
    let e = relative_humidity / 100.0 * 6.105 * ((17.27 * temperature) / (237.7 + temperature)).exp();
    match shortwave_radiation {
        Some(q) => {
            temperature + 0.348 * e - 0.70 * wind_speed_10m + 0.70 * q / (wind_speed_10m + 10.0)
                - 4.25
        }
        None => temperature + 0.33 * e - 0.70 * wind_speed_10m - 4.0,
    }
}

/// Wet bulb temperature (Stull 2011).
pub fn wet_bulb_temperature(temperature: f32, relative_humidity: f32) -> f32 {
    let rh = relative_humidity;
    temperature * (0.151977 * (rh + 8.313659).sqrt()).atan() + (temperature + rh).atan()
        - (rh - 1.676331).atan()
        + 0.00391838 * rh.powf(1.5) * (0.023101 * rh).atan()
        - 4.686035
}

/// Reduce mean sea level pressure to surface pressure at `elevation` metres.
///
/// The result has the unit of `pressure_msl`.
pub fn surface_pressure(pressure_msl: f32, temperature: f32, elevation: f32) -> f32 {
    if elevation.is_nan() {
        return pressure_msl;
    }
    pressure_msl
        * (1.0 - (LAPSE_RATE * elevation) / (temperature + LAPSE_RATE * elevation + 273.15))
            .powf(5.257)
}

/// Total cloud cover in percent from low, mid and high layers assuming
/// random overlap.
pub fn cloud_cover_total(low: f32, mid: f32, high: f32) -> f32 {
    let clear = (1.0 - low / 100.0) * (1.0 - mid / 100.0) * (1.0 - high / 100.0);
    ((1.0 - clear) * 100.0).clamp(0.0, 100.0)
}

/// Factor to scale wind speed from `from` metres to `to` metres using the
/// logarithmic profile of FAO-56 eq. 47.
pub fn scale_wind_factor(from: f32, to: f32) -> f32 {
    let at = |z: f32| 4.87 / (67.8 * z - 5.42).ln();
    at(from) / at(to)
}

/// Psychrometric constant in kPa/°C at `elevation` metres.
fn psychrometric_constant(elevation: f32) -> f32 {
    let pressure = 101.3 * ((293.0 - LAPSE_RATE * elevation) / 293.0).powf(5.26);
    0.000665 * pressure
}

/// Slope of the saturation vapour pressure curve in kPa/°C.
fn saturation_slope(temperature: f32) -> f32 {
    4098.0 * saturation_vapour_pressure(temperature) / (temperature + 237.3).powi(2)
}

/// Reference evapotranspiration (FAO-56 Penman-Monteith) over one time step.
///
/// Radiation is the step average in W/m². Returns mm per step.
pub fn et0_evapotranspiration(
    temperature: f32,
    wind_speed_10m: f32,
    dewpoint: f32,
    shortwave_radiation: f32,
    elevation: f32,
    extraterrestrial_radiation: f32,
    dt_seconds: i64,
) -> f32 {
    let elevation = if elevation.is_nan() { 0.0 } else { elevation };
    let hours = dt_seconds as f32 / 3600.0;
    // W/m² to MJ/m² per step
    let to_mj = dt_seconds as f32 / 1_000_000.0;
    let rs = floor_zero(shortwave_radiation) * to_mj;
    let ra = floor_zero(extraterrestrial_radiation) * to_mj;

    let ea = saturation_vapour_pressure(dewpoint);
    let es = saturation_vapour_pressure(temperature);
    let u2 = wind_speed_10m * scale_wind_factor(10.0, 2.0);

    let rso = (0.75 + 2e-5 * elevation) * ra;
    let relative_shortwave = if rso > 0.0 { (rs / rso).clamp(0.25, 1.0) } else { 0.5 };
    let sigma = 4.903e-9 / 24.0 * hours;
    let rnl = sigma
        * (temperature + 273.16).powi(4)
        * (0.34 - 0.14 * floor_zero(ea).sqrt())
        * (1.35 * relative_shortwave - 0.35);
    let rn = 0.77 * rs - rnl;
    let g = if shortwave_radiation > 0.0 { 0.1 * rn } else { 0.5 * rn };

    let delta = saturation_slope(temperature);
    let gamma = psychrometric_constant(elevation);
    let et0 = (0.408 * delta * (rn - g)
        + gamma * (37.0 * hours) / (temperature + 273.0) * u2 * (es - ea))
        / (delta + gamma * (1.0 + 0.34 * u2));
    floor_zero(et0)
}

/// Daily reference evapotranspiration (FAO-56 eq. 6) in mm.
///
/// Radiation sums are MJ/m² per day.
#[allow(clippy::too_many_arguments)]
pub fn et0_evapotranspiration_daily(
    temperature_max: f32,
    temperature_min: f32,
    temperature_mean: f32,
    wind_speed_10m_mean: f32,
    shortwave_radiation_sum: f32,
    elevation: f32,
    extraterrestrial_radiation_sum: f32,
    relative_humidity: MaxAndMinOrMean,
) -> f32 {
    let elevation = if elevation.is_nan() { 0.0 } else { elevation };
    let es = (saturation_vapour_pressure(temperature_max)
        + saturation_vapour_pressure(temperature_min))
        / 2.0;
    let ea = actual_vapour_pressure_daily(temperature_max, temperature_min, relative_humidity);
    let u2 = wind_speed_10m_mean * scale_wind_factor(10.0, 2.0);

    let rs = floor_zero(shortwave_radiation_sum);
    let rso = (0.75 + 2e-5 * elevation) * extraterrestrial_radiation_sum;
    let relative_shortwave = if rso > 0.0 { (rs / rso).clamp(0.25, 1.0) } else { 0.5 };
    let sigma = 4.903e-9;
    let rnl = sigma
        * ((temperature_max + 273.16).powi(4) + (temperature_min + 273.16).powi(4))
        / 2.0
        * (0.34 - 0.14 * floor_zero(ea).sqrt())
        * (1.35 * relative_shortwave - 0.35);
    let rn = 0.77 * rs - rnl;

    let delta = saturation_slope(temperature_mean);
    let gamma = psychrometric_constant(elevation);
    let et0 = (0.408 * delta * rn + gamma * 900.0 / (temperature_mean + 273.0) * u2 * (es - ea))
        / (delta + gamma * (1.0 + 0.34 * u2));
    floor_zero(et0)
}

/// Daily probability in percent that leaves are wet.
///
/// Any measurable precipitation wets leaves. Otherwise the probability
/// grows as the air approaches saturation around the daily minimum.
pub fn leaf_wetness_probability_daily(
    temperature_max: f32,
    temperature_min: f32,
    relative_humidity: MaxAndMinOrMean,
    precipitation: f32,
) -> f32 {
    if precipitation.is_nan() {
        return f32::NAN;
    }
    if precipitation > 0.2 {
        return 100.0;
    }
    let humid = match relative_humidity {
        MaxAndMinOrMean::MaxMin { max, .. } => max,
        MaxAndMinOrMean::Mean(mean) => {
            // Mean humidity underestimates the night-time peak
            relative_humidity_at_min(temperature_max, temperature_min, mean)
        }
    };
    ((humid - 80.0) / 20.0 * 100.0).clamp(0.0, 100.0)
}

/// Estimate humidity at the daily minimum from the daily mean.
fn relative_humidity_at_min(temperature_max: f32, temperature_min: f32, mean: f32) -> f32 {
    let td = dewpoint((temperature_max + temperature_min) / 2.0, mean);
    relative_humidity(temperature_min, td)
}

/// Growing degree days with a base and an upper limit.
pub fn growing_degree_days(temperature_max: f32, temperature_min: f32, base: f32, limit: f32) -> f32 {
    let mean = (temperature_max + temperature_min) / 2.0;
    let capped = if mean > limit { limit } else { mean };
    floor_zero(capped - base)
}

/// Backward-looking moving average over `window` samples; the first samples
/// use the shorter available window. NaN samples are skipped.
pub fn moving_average(data: &[f32], window: usize) -> Vec<f32> {
    let window = window.max(1);
    (0..data.len())
        .map(|i| {
            let from = (i + 1).saturating_sub(window);
            let (sum, count) = data[from..=i]
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0f32, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f32::NAN
            } else {
                sum / count as f32
            }
        })
        .collect()
}
