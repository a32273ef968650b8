//! Spatial and 1D interpolation helpers.

use crate::grid::RegularGrid;
use crate::types::GridPoint2DFraction;

/// Bilinear interpolation on a row-major field.
///
/// If any of the four corners is NaN, the result is NaN.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if x < 0.0 || y < 0.0 || width == 0 || height == 0 {
        return f32::NAN;
    }
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    if x0 >= width || y0 >= height || data.len() < width * height {
        return f32::NAN;
    }
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = (x - x0 as f64) as f32;
    let yf = (y - y0 as f64) as f32;

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
        return f32::NAN;
    }

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    top * (1.0 - yf) + bottom * yf
}

/// The four cells around a fractional position with their bilinear weights.
///
/// Order is lower-left, lower-right, upper-left, upper-right. Cells past the
/// grid edge are clamped (wrapped in x on global grids).
pub fn bilinear_corners(grid: &RegularGrid, position: &GridPoint2DFraction) -> [(usize, f32); 4] {
    let x0 = position.gridpoint % grid.nx;
    let y0 = position.gridpoint / grid.nx;
    let x1 = if grid.is_global() {
        (x0 + 1) % grid.nx
    } else {
        (x0 + 1).min(grid.nx - 1)
    };
    let y1 = (y0 + 1).min(grid.ny - 1);
    let xf = position.x_fraction;
    let yf = position.y_fraction;
    [
        (y0 * grid.nx + x0, (1.0 - xf) * (1.0 - yf)),
        (y0 * grid.nx + x1, xf * (1.0 - yf)),
        (y1 * grid.nx + x0, (1.0 - xf) * yf),
        (y1 * grid.nx + x1, xf * yf),
    ]
}

/// Blend four time series sample by sample with fixed weights.
///
/// A step is NaN if any corner is NaN at that step. Series of unequal
/// length are blended up to the shortest one.
pub fn bilinear_blend(series: [&[f32]; 4], weights: [f32; 4]) -> Vec<f32> {
    let len = series.iter().map(|s| s.len()).min().unwrap_or(0);
    (0..len)
        .map(|t| {
            let mut acc = 0.0;
            for (s, w) in series.iter().zip(weights.iter()) {
                let v = s[t];
                if v.is_nan() {
                    return f32::NAN;
                }
                acc += v * w;
            }
            acc
        })
        .collect()
}

/// 1D cubic interpolation using a Catmull-Rom spline between `p1` and `p2`.
pub fn cubic_1d(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_bilinear_interpolate() {
        let data: Vec<f32> = vec![
            1.0, 2.0,
            3.0, 4.0,
        ];

        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.0, 0.0), 1.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.0, 0.0), 2.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.0, 1.0), 3.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.0, 1.0), 4.0);
        assert_approx_eq!(bilinear_interpolate(&data, 2, 2, 0.5, 0.5), 2.5, 1e-6);
    }

    #[test]
    fn test_bilinear_interpolate_nan_corner() {
        let data: Vec<f32> = vec![1.0, f32::NAN, 3.0, 4.0];
        assert!(bilinear_interpolate(&data, 2, 2, 0.5, 0.5).is_nan());
        assert!(bilinear_interpolate(&data, 2, 2, -1.0, 0.5).is_nan());
    }

    #[test]
    fn test_corners_weights_sum_to_one() {
        let grid = RegularGrid::new(4, 4, 0.0, 0.0, 1.0, 1.0).unwrap();
        let pos = grid.find_point_interpolated(1.25, 2.5).unwrap();
        let corners = bilinear_corners(&grid, &pos);
        let total: f32 = corners.iter().map(|(_, w)| w).sum();
        assert_approx_eq!(total, 1.0, 1e-6);
        assert_eq!(corners[0].0, 4 + 2);
        assert_eq!(corners[3].0, 2 * 4 + 3);
    }

    #[test]
    fn test_corners_clamp_at_edge() {
        let grid = RegularGrid::new(4, 4, 0.0, 0.0, 1.0, 1.0).unwrap();
        let pos = grid.find_point_interpolated(3.0, 3.0).unwrap();
        let corners = bilinear_corners(&grid, &pos);
        assert!(corners.iter().all(|(cell, _)| *cell == 15));
    }

    #[test]
    fn test_bilinear_blend() {
        let a = [0.0, 1.0, 2.0];
        let b = [10.0, 11.0, f32::NAN];
        let blended = bilinear_blend([&a, &b, &a, &b], [0.25, 0.25, 0.25, 0.25]);
        assert_approx_eq!(blended[0], 5.0, 1e-6);
        assert_approx_eq!(blended[1], 6.0, 1e-6);
        assert!(blended[2].is_nan());
    }

    #[test]
    fn test_cubic_1d_passes_through_knots() {
        assert_approx_eq!(cubic_1d(0.0, 1.0, 2.0, 3.0, 0.0), 1.0, 1e-6);
        assert_approx_eq!(cubic_1d(0.0, 1.0, 2.0, 3.0, 1.0), 2.0, 1e-6);
        assert_approx_eq!(cubic_1d(0.0, 1.0, 2.0, 3.0, 0.5), 1.5, 1e-6);
    }
}
