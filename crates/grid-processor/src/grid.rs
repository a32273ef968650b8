//! Regular latitude/longitude grids.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::types::GridPoint2DFraction;

/// A regular lat/lon grid stored row by row (`gridpoint = y * nx + x`).
///
/// `dy` may be negative for grids stored north to south.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegularGrid {
    /// Number of points in longitude direction
    pub nx: usize,
    /// Number of points in latitude direction
    pub ny: usize,
    /// Latitude of the first row
    pub lat_min: f32,
    /// Longitude of the first column
    pub lon_min: f32,
    /// Longitude step in degrees
    pub dx: f32,
    /// Latitude step in degrees
    pub dy: f32,
}

impl RegularGrid {
    /// Create a checked grid definition.
    pub fn new(nx: usize, ny: usize, lat_min: f32, lon_min: f32, dx: f32, dy: f32) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(GridError::invalid_grid(format!("empty grid {}x{}", nx, ny)));
        }
        if dx <= 0.0 || dy == 0.0 || !dx.is_finite() || !dy.is_finite() {
            return Err(GridError::invalid_grid(format!(
                "invalid resolution dx={} dy={}",
                dx, dy
            )));
        }
        Ok(Self::new_unchecked(nx, ny, lat_min, lon_min, dx, dy))
    }

    /// Create a grid from constants known to be valid.
    pub const fn new_unchecked(
        nx: usize,
        ny: usize,
        lat_min: f32,
        lon_min: f32,
        dx: f32,
        dy: f32,
    ) -> Self {
        Self {
            nx,
            ny,
            lat_min,
            lon_min,
            dx,
            dy,
        }
    }

    /// Total number of grid points.
    pub fn count(&self) -> usize {
        self.nx * self.ny
    }

    /// Fail if `gridpoint` is not a cell of this grid.
    pub fn check_gridpoint(&self, gridpoint: usize) -> Result<()> {
        if gridpoint >= self.count() {
            return Err(GridError::GridpointOutOfRange {
                gridpoint,
                count: self.count(),
            });
        }
        Ok(())
    }

    /// Whether the grid wraps around the globe in longitude.
    pub fn is_global(&self) -> bool {
        self.nx as f32 * self.dx >= 359.0
    }

    /// Fractional column for a longitude, wrapped for global grids.
    fn x_position(&self, lon: f32) -> f32 {
        let x = (lon - self.lon_min) / self.dx;
        if self.is_global() {
            x.rem_euclid(self.nx as f32)
        } else {
            x
        }
    }

    /// Fractional row for a latitude.
    fn y_position(&self, lat: f32) -> f32 {
        (lat - self.lat_min) / self.dy
    }

    /// Nearest cell as (x, y), or `None` outside the grid.
    pub fn find_point_xy(&self, lat: f32, lon: f32) -> Option<(usize, usize)> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        let mut x = self.x_position(lon).round() as isize;
        let y = self.y_position(lat).round() as isize;
        if self.is_global() && x == self.nx as isize {
            x = 0;
        }
        if x < 0 || y < 0 || x >= self.nx as isize || y >= self.ny as isize {
            return None;
        }
        Some((x as usize, y as usize))
    }

    /// Nearest cell index, or `None` outside the grid.
    pub fn find_point(&self, lat: f32, lon: f32) -> Option<usize> {
        self.find_point_xy(lat, lon).map(|(x, y)| y * self.nx + x)
    }

    /// Fractional position between the four surrounding cells.
    pub fn find_point_interpolated(&self, lat: f32, lon: f32) -> Option<GridPoint2DFraction> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        let xf = self.x_position(lon);
        let yf = self.y_position(lat);
        if xf < 0.0 || yf < 0.0 || yf > (self.ny - 1) as f32 {
            return None;
        }
        if !self.is_global() && xf > (self.nx - 1) as f32 {
            return None;
        }
        let x0 = (xf.floor() as usize).min(self.nx - 1);
        let y0 = (yf.floor() as usize).min(self.ny - 1);
        Some(GridPoint2DFraction {
            gridpoint: y0 * self.nx + x0,
            x_fraction: xf - x0 as f32,
            y_fraction: yf - y0 as f32,
        })
    }

    /// Latitude and longitude of a grid cell centre.
    pub fn coordinates(&self, gridpoint: usize) -> (f32, f32) {
        let x = gridpoint % self.nx;
        let y = gridpoint / self.nx;
        let lat = self.lat_min + y as f32 * self.dy;
        let mut lon = self.lon_min + x as f32 * self.dx;
        if lon >= 180.0 {
            lon -= 360.0;
        }
        (lat, lon)
    }

    /// Cells within `radius` cells of `gridpoint`, including itself.
    ///
    /// Columns wrap on global grids; rows never wrap.
    pub fn neighbours(&self, gridpoint: usize, radius: usize) -> Vec<usize> {
        let x = (gridpoint % self.nx) as isize;
        let y = (gridpoint / self.nx) as isize;
        let r = radius as isize;
        let mut cells = Vec::with_capacity((2 * radius + 1).pow(2));
        for yy in (y - r)..=(y + r) {
            if yy < 0 || yy >= self.ny as isize {
                continue;
            }
            for xx in (x - r)..=(x + r) {
                let xx = if self.is_global() {
                    xx.rem_euclid(self.nx as isize)
                } else if xx < 0 || xx >= self.nx as isize {
                    continue;
                } else {
                    xx
                };
                let cell = yy as usize * self.nx + xx as usize;
                if !cells.contains(&cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// Great-circle-free distance in degrees between a coordinate and a cell,
    /// good enough to rank neighbouring cells.
    pub fn distance_degrees(&self, gridpoint: usize, lat: f32, lon: f32) -> f32 {
        let (glat, glon) = self.coordinates(gridpoint);
        let mut dlon = (glon - lon).abs();
        if dlon > 180.0 {
            dlon = 360.0 - dlon;
        }
        let dlat = glat - lat;
        (dlat * dlat + dlon * dlon).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    fn global_1deg() -> RegularGrid {
        RegularGrid::new(360, 181, -90.0, -180.0, 1.0, 1.0).unwrap()
    }

    #[test]
    fn test_rejects_invalid_grid() {
        assert!(RegularGrid::new(0, 10, 0.0, 0.0, 1.0, 1.0).is_err());
        assert!(RegularGrid::new(10, 10, 0.0, 0.0, 0.0, 1.0).is_err());
        assert!(RegularGrid::new(10, 10, 0.0, 0.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_check_gridpoint() {
        let grid = RegularGrid::new(10, 10, 0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(grid.check_gridpoint(99).is_ok());
        assert_eq!(
            grid.check_gridpoint(100),
            Err(GridError::GridpointOutOfRange {
                gridpoint: 100,
                count: 100
            })
        );
    }

    #[test]
    fn test_find_point_and_coordinates() {
        let grid = global_1deg();
        let point = grid.find_point(47.3, 8.5).unwrap();
        let (lat, lon) = grid.coordinates(point);
        assert_approx_eq!(lat, 47.0, 1e-4);
        assert_approx_eq!(lon, 9.0, 1e-4);
    }

    #[test]
    fn test_global_wraps_longitude() {
        let grid = global_1deg();
        assert_eq!(grid.find_point_xy(0.0, 179.7), Some((0, 90)));
        assert_eq!(grid.find_point_xy(0.0, 190.0), Some((10, 90)));
    }

    #[test]
    fn test_regional_outside_is_none() {
        let grid = RegularGrid::new(10, 10, 40.0, 0.0, 0.5, 0.5).unwrap();
        assert!(grid.find_point(39.0, 1.0).is_none());
        assert!(grid.find_point(42.0, 6.0).is_none());
        assert!(grid.find_point(42.0, 2.0).is_some());
        assert!(grid.find_point(f32::NAN, 2.0).is_none());
    }

    #[test]
    fn test_flipped_grid() {
        // Stored north to south
        let grid = RegularGrid::new(10, 10, 50.0, 0.0, 1.0, -1.0).unwrap();
        assert_eq!(grid.find_point_xy(48.0, 3.0), Some((3, 2)));
        let (lat, _) = grid.coordinates(2 * 10 + 3);
        assert_approx_eq!(lat, 48.0, 1e-4);
    }

    #[test]
    fn test_find_point_interpolated() {
        let grid = RegularGrid::new(10, 10, 0.0, 0.0, 1.0, 1.0).unwrap();
        let pos = grid.find_point_interpolated(2.25, 3.5).unwrap();
        assert_eq!(pos.gridpoint, 2 * 10 + 3);
        assert_approx_eq!(pos.x_fraction, 0.5, 1e-5);
        assert_approx_eq!(pos.y_fraction, 0.25, 1e-5);
        assert!(grid.find_point_interpolated(-0.5, 3.0).is_none());
    }

    #[test]
    fn test_neighbours_clip_at_edges() {
        let grid = RegularGrid::new(10, 10, 0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(grid.neighbours(0, 1).len(), 4);
        assert_eq!(grid.neighbours(55, 1).len(), 9);
        assert_eq!(grid.neighbours(55, 0), vec![55]);
    }

    #[test]
    fn test_neighbours_wrap_on_global_grid() {
        let grid = global_1deg();
        let cells = grid.neighbours(90 * 360, 1);
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&(90 * 360 + 359)));
    }
}
