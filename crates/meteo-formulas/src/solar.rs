//! Solar geometry and irradiance decomposition.
//!
//! Gridded radiation is stored as the average over the preceding time step
//! ("backwards averaged"). The helpers here average solar geometry over the
//! same interval so that averaged fluxes can be turned into instantaneous
//! values, direct normal irradiance or irradiance on a tilted plane.
//!
//! Sun position uses the NOAA general solar position equations.

use chrono::{Datelike, TimeZone, Timelike, Utc};
use meteo_common::TimerangeDt;
use std::f64::consts::PI;

/// Solar constant in W/m².
pub const SOLAR_CONSTANT: f32 = 1361.0;

/// WMO threshold for bright sunshine in W/m² of direct normal irradiance.
pub const SUNSHINE_DNI_THRESHOLD: f32 = 120.0;

/// Ground albedo for the reflected part of tilted irradiance.
const GROUND_ALBEDO: f32 = 0.2;

/// Below this mean cosine of the zenith angle the sun is too low to derive
/// direct normal irradiance.
const MIN_COS_ZENITH: f32 = 0.0175;

/// Sub steps per second when averaging over an interval (one every 10 min).
const SUBSTEP_SECONDS: i64 = 600;

#[derive(Debug, Clone, Copy, PartialEq)]
struct SunPosition {
    cos_zenith: f32,
    /// Radians from south, positive towards west
    azimuth: f32,
    /// Extraterrestrial irradiance on a plane normal to the sun
    irradiance: f32,
}

/// Day of year (0-based, fractional) and minutes since UTC midnight.
fn calendar(unix: f64) -> Option<(f64, f64, u32)> {
    let seconds = unix.floor() as i64;
    let date = Utc.timestamp_opt(seconds, 0).single()?;
    let minutes = date.num_seconds_from_midnight() as f64 / 60.0 + (unix - seconds as f64) / 60.0;
    let days_in_year = if is_leap_year(date.year()) { 366 } else { 365 };
    Some((date.ordinal0() as f64, minutes, days_in_year))
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Solar declination (radians) and equation of time (minutes).
fn declination_and_equation_of_time(day_of_year: f64, minutes: f64, days_in_year: u32) -> (f64, f64) {
    let g = 2.0 * PI / days_in_year as f64 * (day_of_year + (minutes / 60.0 - 12.0) / 24.0);
    let declination = 0.006918 - 0.399912 * g.cos() + 0.070257 * g.sin()
        - 0.006758 * (2.0 * g).cos()
        + 0.000907 * (2.0 * g).sin()
        - 0.002697 * (3.0 * g).cos()
        + 0.00148 * (3.0 * g).sin();
    let equation_of_time = 229.18
        * (0.000075 + 0.001868 * g.cos()
            - 0.032077 * g.sin()
            - 0.014615 * (2.0 * g).cos()
            - 0.040849 * (2.0 * g).sin());
    (declination, equation_of_time)
}

fn sun_position(lat: f32, lon: f32, unix: f64) -> SunPosition {
    let Some((day_of_year, minutes, days_in_year)) = calendar(unix) else {
        return SunPosition {
            cos_zenith: f32::NAN,
            azimuth: f32::NAN,
            irradiance: f32::NAN,
        };
    };
    let (declination, equation_of_time) =
        declination_and_equation_of_time(day_of_year, minutes, days_in_year);
    let true_solar_minutes = minutes + equation_of_time + 4.0 * lon as f64;
    let hour_angle = (true_solar_minutes / 4.0 - 180.0).to_radians();
    let phi = (lat as f64).to_radians();

    let cos_zenith =
        phi.sin() * declination.sin() + phi.cos() * declination.cos() * hour_angle.cos();
    let azimuth = hour_angle
        .sin()
        .atan2(hour_angle.cos() * phi.sin() - declination.tan() * phi.cos());
    let orbit = 2.0 * PI * day_of_year / days_in_year as f64;
    let irradiance = SOLAR_CONSTANT as f64 * (1.0 + 0.033 * orbit.cos());

    SunPosition {
        cos_zenith: cos_zenith.clamp(-1.0, 1.0) as f32,
        azimuth: azimuth as f32,
        irradiance: irradiance as f32,
    }
}

/// Mid points of the sub steps of the interval `(end - dt, end]`.
fn substeps(end: i64, dt_seconds: i64) -> impl Iterator<Item = f64> {
    let n = (dt_seconds / SUBSTEP_SECONDS).max(1);
    let step = dt_seconds as f64 / n as f64;
    let start = (end - dt_seconds) as f64;
    (0..n).map(move |i| start + (i as f64 + 0.5) * step)
}

/// Cosine of the solar zenith angle at a unix timestamp.
pub fn cos_zenith(lat: f32, lon: f32, unix: i64) -> f32 {
    sun_position(lat, lon, unix as f64).cos_zenith
}

/// Mean of `max(cos zenith, 0)` over the interval ending at `end`.
fn mean_cos_zenith(lat: f32, lon: f32, end: i64, dt_seconds: i64) -> f32 {
    let (sum, n) = substeps(end, dt_seconds).fold((0.0f32, 0usize), |(s, n), t| {
        (s + sun_position(lat, lon, t).cos_zenith.max(0.0), n + 1)
    });
    sum / n as f32
}

/// Extraterrestrial horizontal irradiance at each timestamp in W/m².
pub fn extraterrestrial_radiation_instant(lat: f32, lon: f32, time: &TimerangeDt) -> Vec<f32> {
    time.unix_timestamps()
        .into_iter()
        .map(|t| {
            let sun = sun_position(lat, lon, t as f64);
            sun.irradiance * sun.cos_zenith.max(0.0)
        })
        .collect()
}

/// Extraterrestrial horizontal irradiance averaged over the preceding time
/// step in W/m².
pub fn extraterrestrial_radiation_backwards(lat: f32, lon: f32, time: &TimerangeDt) -> Vec<f32> {
    time.unix_timestamps()
        .into_iter()
        .map(|t| {
            let (sum, n) = substeps(t, time.dt_seconds).fold((0.0f32, 0usize), |(s, n), tt| {
                let sun = sun_position(lat, lon, tt);
                (s + sun.irradiance * sun.cos_zenith.max(0.0), n + 1)
            });
            sum / n as f32
        })
        .collect()
}

/// Factor to convert a backwards averaged flux into an instantaneous value.
pub fn backwards_averaged_to_instant_factor(lat: f32, lon: f32, time: &TimerangeDt) -> Vec<f32> {
    let instant = extraterrestrial_radiation_instant(lat, lon, time);
    let averaged = extraterrestrial_radiation_backwards(lat, lon, time);
    instant
        .into_iter()
        .zip(averaged)
        .map(|(i, a)| if a <= 0.0 { 0.0 } else { i / a })
        .collect()
}

/// 1 if the sun is above the horizon at the timestamp, otherwise 0.
pub fn is_day(lat: f32, lon: f32, time: &TimerangeDt) -> Vec<f32> {
    time.unix_timestamps()
        .into_iter()
        .map(|t| if cos_zenith(lat, lon, t) > 0.0 { 1.0 } else { 0.0 })
        .collect()
}

/// Daylight duration in seconds for the UTC day of each timestamp.
pub fn daylight_duration(lat: f32, time: &TimerangeDt) -> Vec<f32> {
    time.unix_timestamps()
        .into_iter()
        .map(|t| {
            let noon = t.div_euclid(86400) * 86400 + 43200;
            let Some((day_of_year, minutes, days_in_year)) = calendar(noon as f64) else {
                return f32::NAN;
            };
            let (declination, _) = declination_and_equation_of_time(day_of_year, minutes, days_in_year);
            let phi = (lat as f64).to_radians();
            let cos_omega = (-phi.tan() * declination.tan()).clamp(-1.0, 1.0);
            let omega = cos_omega.acos().to_degrees();
            (2.0 * omega / 15.0 * 3600.0) as f32
        })
        .collect()
}

/// Direct normal irradiance from backwards averaged direct horizontal
/// radiation. With `convert_to_instant` the result is zero whenever the sun
/// is below the horizon at the timestamp itself.
pub fn direct_normal_irradiance_backwards(
    direct_radiation: &[f32],
    lat: f32,
    lon: f32,
    time: &TimerangeDt,
    convert_to_instant: bool,
) -> Vec<f32> {
    direct_radiation
        .iter()
        .zip(time.unix_timestamps())
        .map(|(&direct, t)| {
            if direct.is_nan() {
                return f32::NAN;
            }
            let mean = mean_cos_zenith(lat, lon, t, time.dt_seconds);
            if mean < MIN_COS_ZENITH {
                return 0.0;
            }
            if convert_to_instant && cos_zenith(lat, lon, t) <= 0.0 {
                return 0.0;
            }
            (direct / mean).min(SOLAR_CONSTANT * 1.05)
        })
        .collect()
}

/// Seconds of sunshine within each preceding time step.
///
/// A step is sunny when its direct normal irradiance exceeds
/// [`SUNSHINE_DNI_THRESHOLD`]; it then counts every sub step with the sun
/// above the horizon.
pub fn sunshine_duration_backwards(
    direct_radiation: &[f32],
    lat: f32,
    lon: f32,
    time: &TimerangeDt,
) -> Vec<f32> {
    let dni = direct_normal_irradiance_backwards(direct_radiation, lat, lon, time, false);
    dni.into_iter()
        .zip(time.unix_timestamps())
        .map(|(dni, t)| {
            if dni.is_nan() {
                return f32::NAN;
            }
            if dni <= SUNSHINE_DNI_THRESHOLD {
                return 0.0;
            }
            let steps: Vec<f64> = substeps(t, time.dt_seconds).collect();
            let sunny = steps
                .iter()
                .filter(|&&tt| sun_position(lat, lon, tt).cos_zenith > 0.0)
                .count();
            (time.dt_seconds as f32) * sunny as f32 / steps.len() as f32
        })
        .collect()
}

/// Global irradiance on a tilted plane.
///
/// `tilt` is degrees from horizontal, `azimuth` degrees from south with west
/// positive. Isotropic sky diffuse model plus ground reflection.
#[allow(clippy::too_many_arguments)]
pub fn tilted_irradiance(
    direct_radiation: &[f32],
    diffuse_radiation: &[f32],
    tilt: f32,
    azimuth: f32,
    lat: f32,
    lon: f32,
    time: &TimerangeDt,
    convert_backwards_to_instant: bool,
) -> Vec<f32> {
    let beta = tilt.to_radians();
    let panel_azimuth = azimuth.to_radians();
    let cos_incidence = |sun: &SunPosition| {
        let sin_zenith = (1.0 - sun.cos_zenith * sun.cos_zenith).max(0.0).sqrt();
        (sun.cos_zenith * beta.cos() + sin_zenith * beta.sin() * (sun.azimuth - panel_azimuth).cos())
            .max(0.0)
    };
    let factor = if convert_backwards_to_instant {
        backwards_averaged_to_instant_factor(lat, lon, time)
    } else {
        vec![1.0; time.count()]
    };

    direct_radiation
        .iter()
        .zip(diffuse_radiation)
        .zip(time.unix_timestamps())
        .zip(factor)
        .map(|(((&direct, &diffuse), t), factor)| {
            if direct.is_nan() || diffuse.is_nan() {
                return f32::NAN;
            }
            let (beam, direct, diffuse) = if convert_backwards_to_instant {
                let sun = sun_position(lat, lon, t as f64);
                let direct = direct * factor;
                let beam = if sun.cos_zenith < MIN_COS_ZENITH {
                    0.0
                } else {
                    direct / sun.cos_zenith * cos_incidence(&sun)
                };
                (beam, direct, diffuse * factor)
            } else {
                let (sum_cosz, sum_inc, n) = substeps(t, time.dt_seconds).fold(
                    (0.0f32, 0.0f32, 0usize),
                    |(z, i, n), tt| {
                        let sun = sun_position(lat, lon, tt);
                        (z + sun.cos_zenith.max(0.0), i + cos_incidence(&sun), n + 1)
                    },
                );
                let mean_cosz = sum_cosz / n as f32;
                let beam = if mean_cosz < MIN_COS_ZENITH {
                    0.0
                } else {
                    direct / mean_cosz * (sum_inc / n as f32)
                };
                (beam, direct, diffuse)
            };
            let sky = diffuse * (1.0 + beta.cos()) / 2.0;
            let ground = (direct + diffuse) * GROUND_ALBEDO * (1.0 - beta.cos()) / 2.0;
            beam + sky + ground
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    fn hourly(y: i32, m: u32, d: u32, hours: usize) -> TimerangeDt {
        let start = Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap();
        TimerangeDt::with_count(start, hours, 3600).unwrap()
    }

    #[test]
    fn test_noon_zenith_at_equinox() {
        // Sun is nearly overhead at the equator around noon UTC on 0° longitude
        let t = Utc.with_ymd_and_hms(2024, 3, 20, 12, 7, 0).unwrap().timestamp();
        assert_approx_eq!(cos_zenith(0.0, 0.0, t), 1.0, 0.01);
        let midnight = Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap().timestamp();
        assert!(cos_zenith(0.0, 0.0, midnight) < -0.9);
    }

    #[test]
    fn test_is_day() {
        let flags = is_day(47.0, 8.0, &hourly(2024, 6, 21, 24));
        assert_eq!(flags[0], 0.0);
        assert_eq!(flags[12], 1.0);
        assert!(flags.iter().all(|v| *v == 0.0 || *v == 1.0));
    }

    #[test]
    fn test_daylight_duration() {
        let start = Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap();
        let daily = TimerangeDt::with_count(start, 1, 86400).unwrap();
        // Geometric day length without refraction, Zurich midsummer
        let zurich = daylight_duration(47.37, &daily)[0];
        assert_approx_eq!(zurich / 3600.0, 15.75, 0.1);
        // Equator is always about 12 h, the pole in summer 24 h
        assert_approx_eq!(daylight_duration(0.0, &daily)[0] / 3600.0, 12.0, 0.1);
        assert_approx_eq!(daylight_duration(89.0, &daily)[0], 86400.0, 1.0);
        assert_approx_eq!(daylight_duration(-89.0, &daily)[0], 0.0, 1.0);
    }

    #[test]
    fn test_backwards_average_below_instant_peak() {
        let time = hourly(2024, 6, 21, 24);
        let instant = extraterrestrial_radiation_instant(47.0, 8.0, &time);
        let averaged = extraterrestrial_radiation_backwards(47.0, 8.0, &time);
        let max_instant = instant.iter().cloned().fold(0.0f32, f32::max);
        assert!(max_instant > 1100.0 && max_instant < 1400.0);
        assert_eq!(averaged[0], 0.0);
        // Daily mean of both is about the same
        let sum_i: f32 = instant.iter().sum();
        let sum_a: f32 = averaged.iter().sum();
        assert_approx_eq!(sum_i / sum_a, 1.0, 0.02);
    }

    #[test]
    fn test_instant_factor_zero_at_night() {
        let time = hourly(2024, 1, 10, 24);
        let factor = backwards_averaged_to_instant_factor(47.0, 8.0, &time);
        assert_eq!(factor[0], 0.0);
        assert!(factor[12] > 0.9 && factor[12] < 1.1);
    }

    #[test]
    fn test_dni_and_sunshine() {
        let time = hourly(2024, 6, 21, 24);
        let direct = vec![400.0; 24];
        let dni = direct_normal_irradiance_backwards(&direct, 47.0, 8.0, &time, false);
        assert_eq!(dni[0], 0.0);
        assert!(dni[12] > 400.0);
        let sunshine = sunshine_duration_backwards(&direct, 47.0, 8.0, &time);
        assert_eq!(sunshine[0], 0.0);
        assert_approx_eq!(sunshine[12], 3600.0, 1e-3);
        let none = sunshine_duration_backwards(&vec![0.0; 24], 47.0, 8.0, &time);
        assert!(none.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_horizontal_panel_equals_global() {
        let time = hourly(2024, 6, 21, 24);
        let direct = vec![300.0; 24];
        let diffuse = vec![100.0; 24];
        let gti = tilted_irradiance(&direct, &diffuse, 0.0, 0.0, 47.0, 8.0, &time, false);
        // Midday: beam on a horizontal plane is the direct radiation itself
        assert_approx_eq!(gti[12], 400.0, 1.0);
    }
}
