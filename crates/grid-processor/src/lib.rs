//! Grid geometry and grid cell lookup.
//!
//! Every dataset is stored on a regular latitude/longitude grid. A point
//! request first has to be mapped onto that grid:
//!
//! ```text
//! (lat, lon, elevation, mode)
//!      │
//!      ▼
//! RegularGrid::find_point            nearest cell
//!      │
//!      ├─► RegularGrid::neighbours   3x3 neighbourhood
//!      │
//!      └─► select_grid_point         terrain-optimised choice (land / sea)
//!
//! RegularGrid::find_point_interpolated
//!      │
//!      └─► bilinear_corners          bilinear weights of four cells
//! ```
//!
//! # Example
//!
//! ```rust
//! use grid_processor::RegularGrid;
//!
//! let grid = RegularGrid::new(360, 181, -90.0, -180.0, 1.0, 1.0).unwrap();
//! let gridpoint = grid.find_point(47.3, 8.5).unwrap();
//! let (lat, lon) = grid.coordinates(gridpoint);
//! assert_eq!((lat, lon), (47.0, 9.0));
//! ```

pub mod error;
pub mod grid;
pub mod interpolation;
pub mod select;
pub mod types;

pub use error::{GridError, Result};
pub use grid::RegularGrid;
pub use interpolation::{bilinear_blend, bilinear_corners, bilinear_interpolate, cubic_1d};
pub use select::{select_grid_point, GridCandidate};
pub use types::{GridPoint2DFraction, GridPosition, GridSelectionMode};
