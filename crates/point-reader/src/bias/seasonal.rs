//! Seasonal climatology curves.

use meteo_common::TimerangeDt;

use super::ChangeType;

/// Mean length of a year in seconds.
const SECONDS_PER_YEAR: i64 = 31_557_600;

/// Below this control mean a relative change is not applied.
const RELATIVE_EPSILON: f32 = 1e-6;

/// A curve of `n` equally sized bins per year.
///
/// Values between bin centres are interpolated linearly; the curve wraps
/// around at the turn of the year.
#[derive(Debug, Clone, PartialEq)]
pub struct BiasCorrectionSeasonalLinear {
    pub means_per_year: Vec<f32>,
}

impl BiasCorrectionSeasonalLinear {
    pub fn new(means_per_year: Vec<f32>) -> Self {
        Self { means_per_year }
    }

    /// The curve is empty or has NaN bins.
    pub fn has_missing(&self) -> bool {
        self.means_per_year.is_empty() || self.means_per_year.iter().any(|v| v.is_nan())
    }

    pub fn value_at(&self, unix: i64) -> f32 {
        let n = self.means_per_year.len();
        if n == 0 {
            return f32::NAN;
        }
        let fraction = unix.rem_euclid(SECONDS_PER_YEAR) as f64 / SECONDS_PER_YEAR as f64;
        let position = fraction * n as f64 - 0.5;
        let lower = position.floor();
        let weight = (position - lower) as f32;
        let i0 = (lower as i64).rem_euclid(n as i64) as usize;
        let i1 = (i0 + 1) % n;
        self.means_per_year[i0] * (1.0 - weight) + self.means_per_year[i1] * weight
    }

    /// Shift `data` from the `control` climatology to this one.
    pub fn apply_offset(
        &self,
        data: &mut [f32],
        control: &BiasCorrectionSeasonalLinear,
        time: &TimerangeDt,
        change: ChangeType,
    ) {
        for (value, t) in data.iter_mut().zip(time.unix_timestamps()) {
            let reference = self.value_at(t);
            let model = control.value_at(t);
            match change {
                ChangeType::AbsoluteChange { .. } => *value += reference - model,
                ChangeType::RelativeChange { maximum } => {
                    let factor = if model.abs() < RELATIVE_EPSILON {
                        1.0
                    } else {
                        reference / model
                    };
                    let factor = match maximum {
                        Some(maximum) if factor > maximum => maximum,
                        _ => factor,
                    };
                    *value *= factor;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use test_utils::assert_approx_eq;

    fn monthly(values: impl Fn(usize) -> f32) -> BiasCorrectionSeasonalLinear {
        BiasCorrectionSeasonalLinear::new((0..12).map(values).collect())
    }

    fn days(count: usize) -> TimerangeDt {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        TimerangeDt::with_count(start, count, 86400).unwrap()
    }

    #[test]
    fn test_value_at_bin_centre_and_wrap() {
        let curve = monthly(|i| i as f32);
        // Centre of the first bin
        assert_approx_eq!(curve.value_at(SECONDS_PER_YEAR / 24), 0.0, 1e-3);
        // Centre of bin 5
        assert_approx_eq!(curve.value_at(SECONDS_PER_YEAR * 11 / 24), 5.0, 1e-3);
        // Turn of the year blends December into January
        assert_approx_eq!(curve.value_at(0), 5.5, 1e-3);
        assert!(BiasCorrectionSeasonalLinear::new(vec![]).value_at(0).is_nan());
    }

    #[test]
    fn test_absolute_change() {
        let reference = monthly(|_| 12.0);
        let control = monthly(|_| 10.0);
        let mut data = vec![1.0, f32::NAN, 3.0];
        reference.apply_offset(
            &mut data,
            &control,
            &days(3),
            ChangeType::AbsoluteChange { bounds: None },
        );
        assert_approx_eq!(data[0], 3.0, 1e-5);
        assert!(data[1].is_nan());
        assert_approx_eq!(data[2], 5.0, 1e-5);
    }

    #[test]
    fn test_relative_change_cap_and_zero_control() {
        let reference = monthly(|_| 10.0);
        let control = monthly(|_| 1.0);
        let mut data = vec![2.0, 4.0];
        reference.apply_offset(
            &mut data,
            &control,
            &days(2),
            ChangeType::RelativeChange { maximum: Some(5.0) },
        );
        assert_eq!(data, vec![10.0, 20.0]);

        let dry = monthly(|_| 0.0);
        let mut data = vec![2.0];
        reference.apply_offset(&mut data, &dry, &days(1), ChangeType::RelativeChange { maximum: None });
        assert_eq!(data, vec![2.0]);
    }

    #[test]
    fn test_has_missing() {
        assert!(monthly(|i| if i == 3 { f32::NAN } else { 1.0 }).has_missing());
        assert!(!monthly(|_| 1.0).has_missing());
    }
}
