//! Test support for the point reader crates.
//!
//! [`StoreFixture`] fills an in-memory store with series, weight curves and
//! static fields at explicit grid cells. The generators produce series with
//! values easy to check by hand. The assertion macros compare floats where
//! NaN marks a missing sample.
//!
//! ```ignore
//! use test_utils::{assert_series_approx_eq, constant, StoreFixture};
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// `|left - right| <= epsilon`, compared as f64. NaN never passes.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Element-wise approximate equality of two series. NaN only equals NaN.
///
/// ```ignore
/// use test_utils::assert_series_approx_eq;
///
/// assert_series_approx_eq!(&[1.0, f32::NAN], &[1.0001, f32::NAN], 0.001);
/// ```
#[macro_export]
macro_rules! assert_series_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: &[f32] = $left;
        let right: &[f32] = $right;
        assert_eq!(
            left.len(),
            right.len(),
            "series differ in length: {:?} vs {:?}",
            left,
            right
        );
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let equal = if l.is_nan() || r.is_nan() {
                l.is_nan() && r.is_nan()
            } else {
                ((*l as f64) - (*r as f64)).abs() <= $epsilon as f64
            };
            if !equal {
                panic!(
                    "assertion failed: series differ at index {}\n  left: `{:?}`,\n right: `{:?}`",
                    i, left, right
                );
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_rejects_nan() {
        assert_approx_eq!(f32::NAN, 1.0, 0.001);
    }

    #[test]
    fn test_assert_series_approx_eq_passes() {
        assert_series_approx_eq!(&[1.0, f32::NAN, 3.0], &[1.0001, f32::NAN, 3.0], 0.001);
    }

    #[test]
    #[should_panic(expected = "series differ at index 1")]
    fn test_assert_series_approx_eq_nan_mismatch() {
        assert_series_approx_eq!(&[1.0, f32::NAN], &[1.0, 2.0], 0.001);
    }
}
