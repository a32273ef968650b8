//! Series generators with predictable values.
//!
//! Values are simple enough to be checked by hand in assertions.

use std::f32::consts::PI;

/// `count` copies of `value`.
pub fn constant(value: f32, count: usize) -> Vec<f32> {
    vec![value; count]
}

/// `start, start + step, start + 2 * step, ...`
///
/// ```
/// use test_utils::ramp;
///
/// assert_eq!(ramp(1.0, 0.5, 3), vec![1.0, 1.5, 2.0]);
/// ```
pub fn ramp(start: f32, step: f32, count: usize) -> Vec<f32> {
    (0..count).map(|i| start + step * i as f32).collect()
}

/// Running sum of `increments`, as a cumulative variable is stored.
///
/// ```
/// use test_utils::accumulate;
///
/// assert_eq!(accumulate(10.0, &[1.0, 0.0, 2.0]), vec![11.0, 11.0, 13.0]);
/// ```
pub fn accumulate(start: f32, increments: &[f32]) -> Vec<f32> {
    increments
        .iter()
        .scan(start, |total, increment| {
            *total += increment;
            Some(*total)
        })
        .collect()
}

/// Replace the values at `indices` with NaN.
pub fn with_gaps(mut values: Vec<f32>, indices: &[usize]) -> Vec<f32> {
    for &i in indices {
        if let Some(value) = values.get_mut(i) {
            *value = f32::NAN;
        }
    }
    values
}

/// Hourly temperature with a daily cycle peaking at 14 UTC.
pub fn diurnal_temperature(mean: f32, amplitude: f32, hours: usize) -> Vec<f32> {
    (0..hours)
        .map(|h| {
            let phase = ((h % 24) as f32 - 14.0) / 24.0 * 2.0 * PI;
            mean + amplitude * phase.cos()
        })
        .collect()
}

/// Seasonal weight curve with `bins` equally spaced values over the year,
/// peaking in the first bin.
pub fn seasonal_curve(mean: f32, amplitude: f32, bins: usize) -> Vec<f32> {
    (0..bins)
        .map(|i| mean + amplitude * (i as f32 / bins as f32 * 2.0 * PI).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_with_gaps() {
        let values = with_gaps(constant(1.0, 4), &[1, 3, 9]);
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan() && values[3].is_nan());
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn test_diurnal_peak() {
        let values = diurnal_temperature(10.0, 5.0, 48);
        assert_approx_eq!(values[14], 15.0, 1e-4);
        assert_approx_eq!(values[38], 15.0, 1e-4);
        assert_approx_eq!(values[2], 5.0, 1e-4);
    }

    #[test]
    fn test_seasonal_curve() {
        let curve = seasonal_curve(2.0, 1.0, 12);
        assert_eq!(curve.len(), 12);
        assert_approx_eq!(curve[0], 3.0, 1e-6);
        assert_approx_eq!(curve[6], 1.0, 1e-5);
    }
}
