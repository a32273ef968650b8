//! Blending primitives.
//!
//! Cumulative quantities are blended on their consecutive differences so a
//! source with a different baseline does not introduce a jump where it takes
//! over.

use meteo_formulas::floor_zero;

/// `d[0] = v[0]`, `d[x] = v[x] - v[x - 1]`.
pub fn delta_encode(values: &[f32]) -> Vec<f32> {
    let mut deltas = Vec::with_capacity(values.len());
    let mut previous: Option<f32> = None;
    for &value in values {
        deltas.push(match previous {
            None => value,
            Some(p) => value - p,
        });
        previous = Some(value);
    }
    deltas
}

/// Running sum of `deltas`. A NaN delta poisons every later sample.
pub fn delta_decode(deltas: &[f32]) -> Vec<f32> {
    let mut sum = 0.0;
    deltas
        .iter()
        .map(|d| {
            sum += d;
            sum
        })
        .collect()
}

/// Copy `source` into every NaN sample of `target`.
pub fn integrate_if_nan(target: &mut [f32], source: &[f32]) {
    for (t, s) in target.iter_mut().zip(source) {
        if t.is_nan() {
            *t = *s;
        }
    }
}

/// Delta-space accumulator for one cumulative series.
///
/// Missing differences are filled from coarser sources in turn. Decoding
/// follows the filled differences and restarts from the best known absolute
/// value after a gap no source covers.
#[derive(Debug, Clone)]
pub struct DeltaBlend {
    deltas: Vec<f32>,
    absolute: Vec<f32>,
}

impl DeltaBlend {
    /// Start from the finest source.
    pub fn new(finest: Vec<f32>) -> Self {
        Self {
            deltas: delta_encode(&finest),
            absolute: finest,
        }
    }

    /// Fill missing differences and absolute values from a coarser source.
    pub fn integrate(&mut self, coarser: &[f32]) {
        for x in 0..self.deltas.len().min(coarser.len()) {
            if self.deltas[x].is_nan() {
                self.deltas[x] = if x == 0 {
                    coarser[0]
                } else {
                    coarser[x] - coarser[x - 1]
                };
            }
            if self.absolute[x].is_nan() {
                self.absolute[x] = coarser[x];
            }
        }
    }

    /// No difference is missing.
    pub fn is_complete(&self) -> bool {
        !self.deltas.iter().any(|d| d.is_nan())
    }

    pub fn missing(&self) -> usize {
        self.deltas.iter().filter(|d| d.is_nan()).count()
    }

    /// Back to a cumulative series, floored at zero.
    ///
    /// Each run of known differences is summed with [`delta_decode`] and
    /// anchored on the absolute value at its first sample. Negative sums are
    /// clamped only once the whole series is decoded.
    pub fn decode(self) -> Vec<f32> {
        let len = self.deltas.len();
        let mut out = Vec::with_capacity(len);
        let mut start = 0;
        while start < len {
            if self.deltas[start].is_nan() || self.absolute[start].is_nan() {
                out.push(f32::NAN);
                start += 1;
                continue;
            }
            let end = self.deltas[start..]
                .iter()
                .position(|d| d.is_nan())
                .map_or(len, |offset| start + offset);
            let anchor = self.absolute[start] - self.deltas[start];
            out.extend(
                delta_decode(&self.deltas[start..end])
                    .into_iter()
                    .map(|value| value + anchor),
            );
            start = end;
        }
        out.into_iter().map(floor_zero).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_encode() {
        assert_eq!(delta_encode(&[5.0, 7.0, 6.0]), vec![5.0, 2.0, -1.0]);
        assert!(delta_encode(&[]).is_empty());
        let d = delta_encode(&[1.0, f32::NAN, 3.0]);
        assert!(d[1].is_nan() && d[2].is_nan());
    }

    #[test]
    fn test_encode_decode_identity() {
        let series: [&[f32]; 5] = [
            &[],
            &[3.5],
            &[5.0, 7.0, 6.0, 6.0],
            &[-2.0, -7.5, 1.25, 0.0, -0.5],
            &[1e4, 1e4 + 0.5, 2.0, -3e3],
        ];
        for values in series {
            let decoded = delta_decode(&delta_encode(values));
            assert_eq!(decoded.len(), values.len());
            for (d, v) in decoded.iter().zip(values) {
                assert_approx_eq!(*d, *v, 1e-3);
            }
        }
    }

    #[test]
    fn test_integrate_if_nan() {
        let mut target = vec![1.0, f32::NAN, 3.0];
        integrate_if_nan(&mut target, &[9.0, 8.0, 7.0]);
        assert_eq!(target, vec![1.0, 8.0, 3.0]);
    }

    #[test]
    fn test_blend_follows_coarse_differences() {
        // Fine source is missing index 2, the coarse one runs 100 higher
        let mut blend = DeltaBlend::new(vec![10.0, 11.0, f32::NAN, 14.0]);
        assert_eq!(blend.missing(), 2);
        blend.integrate(&[110.0, 111.0, 113.0, 114.0]);
        assert!(blend.is_complete());
        let out = blend.decode();
        assert_approx_eq!(out[2], 13.0, 1e-5);
        assert_approx_eq!(out[3], 14.0, 1e-5);
    }

    #[test]
    fn test_blend_missing_start_uses_coarse_value() {
        let mut blend = DeltaBlend::new(vec![f32::NAN, 2.0, 3.0]);
        blend.integrate(&[1.5, 2.5, 3.5]);
        let out = blend.decode();
        assert_approx_eq!(out[0], 1.5, 1e-6);
        assert_approx_eq!(out[1], 2.5, 1e-6);
        assert_approx_eq!(out[2], 3.5, 1e-6);
    }

    #[test]
    fn test_decode_restarts_after_gap() {
        let mut blend = DeltaBlend::new(vec![4.0, f32::NAN, f32::NAN, 6.0, 7.0]);
        blend.integrate(&[f32::NAN, f32::NAN, f32::NAN, f32::NAN, f32::NAN]);
        let out = blend.decode();
        assert_eq!(out[0], 4.0);
        assert!(out[1].is_nan() && out[2].is_nan() && out[3].is_nan());
        // Index 4 has a valid difference but no predecessor
        assert_eq!(out[4], 7.0);
    }

    #[test]
    fn test_clamp_applies_after_decoding() {
        // Decodes to [1, -2, 0]; the dip must not lift the last sample
        let mut blend = DeltaBlend::new(vec![1.0, f32::NAN, f32::NAN]);
        blend.integrate(&[10.0, 7.0, 9.0]);
        assert_eq!(blend.decode(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_decode_floors_negative() {
        let mut blend = DeltaBlend::new(vec![1.0, f32::NAN]);
        blend.integrate(&[5.0, 1.0]);
        let out = blend.decode();
        assert_eq!(out, vec![1.0, 0.0]);
    }
}
