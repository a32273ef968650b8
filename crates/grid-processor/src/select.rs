//! Terrain-optimised grid cell selection.

use meteo_common::ElevationOrSea;

use crate::types::GridSelectionMode;

/// A cell considered for a point request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCandidate {
    pub gridpoint: usize,
    /// Distance to the requested coordinate, any monotonic unit
    pub distance: f32,
    pub elevation: ElevationOrSea,
}

/// Pick one cell out of a neighbourhood.
///
/// - `Nearest`: smallest distance.
/// - `Land`: among land cells the one whose elevation is closest to
///   `target_elevation`; with a NaN target the nearest land cell.
/// - `Sea`: the nearest sea cell.
///
/// Land and sea fall back to the nearest cell if the neighbourhood has no
/// cell of the wanted kind. Returns `None` only for an empty slice.
pub fn select_grid_point(
    candidates: &[GridCandidate],
    target_elevation: f32,
    mode: GridSelectionMode,
) -> Option<GridCandidate> {
    let nearest = min_by_key(candidates.iter(), |c| c.distance)?;
    let selected = match mode {
        GridSelectionMode::Nearest => None,
        GridSelectionMode::Sea => {
            min_by_key(candidates.iter().filter(|c| c.elevation.is_sea()), |c| c.distance)
        }
        GridSelectionMode::Land => {
            let land = candidates
                .iter()
                .filter(|c| matches!(c.elevation, ElevationOrSea::Elevation(_)));
            if target_elevation.is_nan() {
                min_by_key(land, |c| c.distance)
            } else {
                // Ties go to the closer cell
                min_by_key(land, |c| {
                    (c.elevation.numeric() - target_elevation).abs() + c.distance * 1e-6
                })
            }
        }
    };
    Some(selected.unwrap_or(nearest))
}

fn min_by_key<'a>(
    iter: impl Iterator<Item = &'a GridCandidate>,
    key: impl Fn(&GridCandidate) -> f32,
) -> Option<GridCandidate> {
    iter.min_by(|a, b| key(a).total_cmp(&key(b))).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<GridCandidate> {
        vec![
            GridCandidate {
                gridpoint: 0,
                distance: 0.1,
                elevation: ElevationOrSea::Sea,
            },
            GridCandidate {
                gridpoint: 1,
                distance: 0.5,
                elevation: ElevationOrSea::Elevation(1500.0),
            },
            GridCandidate {
                gridpoint: 2,
                distance: 0.7,
                elevation: ElevationOrSea::Elevation(420.0),
            },
            GridCandidate {
                gridpoint: 3,
                distance: 0.3,
                elevation: ElevationOrSea::NoData,
            },
        ]
    }

    #[test]
    fn test_nearest() {
        let c = select_grid_point(&candidates(), 400.0, GridSelectionMode::Nearest).unwrap();
        assert_eq!(c.gridpoint, 0);
    }

    #[test]
    fn test_land_prefers_matching_elevation() {
        let c = select_grid_point(&candidates(), 400.0, GridSelectionMode::Land).unwrap();
        assert_eq!(c.gridpoint, 2);
        let c = select_grid_point(&candidates(), 1400.0, GridSelectionMode::Land).unwrap();
        assert_eq!(c.gridpoint, 1);
    }

    #[test]
    fn test_land_without_target_elevation_takes_nearest_land() {
        let c = select_grid_point(&candidates(), f32::NAN, GridSelectionMode::Land).unwrap();
        assert_eq!(c.gridpoint, 1);
    }

    #[test]
    fn test_land_falls_back_to_nearest() {
        let only_sea: Vec<_> = candidates()
            .into_iter()
            .filter(|c| !matches!(c.elevation, ElevationOrSea::Elevation(_)))
            .collect();
        let c = select_grid_point(&only_sea, 400.0, GridSelectionMode::Land).unwrap();
        assert_eq!(c.gridpoint, 0);
    }

    #[test]
    fn test_sea() {
        let c = select_grid_point(&candidates(), 400.0, GridSelectionMode::Sea).unwrap();
        assert_eq!(c.gridpoint, 0);
        let c = select_grid_point(&candidates()[1..], 400.0, GridSelectionMode::Sea).unwrap();
        assert_eq!(c.gridpoint, 3);
    }

    #[test]
    fn test_empty() {
        assert!(select_grid_point(&[], 0.0, GridSelectionMode::Land).is_none());
    }
}
