//! Temporal interpolation from a dataset's native step to a finer one.

use chrono::Duration;
use grid_processor::cubic_1d;
use meteo_common::TimerangeDt;
use meteo_formulas::solar;

use crate::error::{ReaderError, Result};
use crate::variable::ReaderInterpolation;

/// Fail unless `requested` is positive and evenly divides the native step.
pub(crate) fn check_step(requested: i64, native: i64) -> Result<()> {
    if requested <= 0 {
        return Err(ReaderError::invalid_timerange(format!(
            "time step must be positive, got {} s",
            requested
        )));
    }
    if requested > native || native % requested != 0 {
        return Err(ReaderError::invalid_timerange(format!(
            "time step {} s cannot be derived from the native step of {} s",
            requested, native
        )));
    }
    Ok(())
}

/// Native samples needed to interpolate `time`: one step before the first
/// timestamp and two after the last, for the hermite stencil.
pub(crate) fn native_range(time: &TimerangeDt, native_dt: i64) -> Result<TimerangeDt> {
    let covering = time.covering(native_dt);
    Ok(TimerangeDt::new(
        covering.start - Duration::seconds(native_dt),
        covering.end + Duration::seconds(2 * native_dt),
        native_dt,
    )?)
}

/// Interpolate `native` (sampled on `native_time`) onto `target`.
///
/// `lat`/`lon` are only used for solar interpolation.
pub fn interpolate_series(
    interpolation: ReaderInterpolation,
    native: &[f32],
    native_time: &TimerangeDt,
    target: &TimerangeDt,
    lat: f32,
    lon: f32,
) -> Vec<f32> {
    let start = native_time.start.timestamp();
    let native_dt = native_time.dt_seconds;
    let value = |i: i64| -> f32 {
        if i < 0 {
            return f32::NAN;
        }
        native.get(i as usize).copied().unwrap_or(f32::NAN)
    };

    if let ReaderInterpolation::SolarBackwardsAveraged = interpolation {
        let native_exrad = solar::extraterrestrial_radiation_backwards(lat, lon, native_time);
        let target_exrad = solar::extraterrestrial_radiation_backwards(lat, lon, target);
        return target
            .unix_timestamps()
            .into_iter()
            .zip(target_exrad)
            .map(|(t, exrad)| {
                let k = (t - start + native_dt - 1).div_euclid(native_dt);
                let v = value(k);
                let reference = if k < 0 {
                    f32::NAN
                } else {
                    native_exrad.get(k as usize).copied().unwrap_or(f32::NAN)
                };
                if v.is_nan() || reference.is_nan() {
                    f32::NAN
                } else if reference <= 0.0 {
                    0.0
                } else {
                    v / reference * exrad
                }
            })
            .collect();
    }

    target
        .unix_timestamps()
        .into_iter()
        .map(|t| {
            let offset = t - start;
            let i = offset.div_euclid(native_dt);
            let fraction = offset.rem_euclid(native_dt) as f32 / native_dt as f32;
            if fraction == 0.0 && interpolation != ReaderInterpolation::BackwardsSum {
                return value(i);
            }
            match interpolation {
                ReaderInterpolation::Linear => {
                    value(i) * (1.0 - fraction) + value(i + 1) * fraction
                }
                ReaderInterpolation::LinearDegrees => {
                    let a = value(i);
                    let mut delta = value(i + 1) - a;
                    if delta > 180.0 {
                        delta -= 360.0;
                    } else if delta < -180.0 {
                        delta += 360.0;
                    }
                    (a + delta * fraction).rem_euclid(360.0)
                }
                ReaderInterpolation::Hermite { bounds } => {
                    let p1 = value(i);
                    let p2 = value(i + 1);
                    if p1.is_nan() || p2.is_nan() {
                        return f32::NAN;
                    }
                    let p0 = Some(value(i - 1)).filter(|v| !v.is_nan()).unwrap_or(p1);
                    let p3 = Some(value(i + 2)).filter(|v| !v.is_nan()).unwrap_or(p2);
                    let v = cubic_1d(p0, p1, p2, p3, fraction);
                    match bounds {
                        Some((lower, upper)) => v.clamp(lower, upper),
                        None => v,
                    }
                }
                ReaderInterpolation::BackwardsSum => {
                    let k = if fraction == 0.0 { i } else { i + 1 };
                    value(k) * target.dt_seconds as f32 / native_dt as f32
                }
                ReaderInterpolation::SolarBackwardsAveraged => f32::NAN,
            }
        })
        .collect()
}
