//! Reader for one dataset at one grid position.

use async_trait::async_trait;
use futures::future::try_join_all;
use grid_processor::{
    bilinear_blend, bilinear_corners, select_grid_point, GridCandidate, GridPosition,
    GridSelectionMode, RegularGrid,
};
use meteo_common::{DataAndUnit, ElevationOrSea, TimerangeDt, TimerangeDtAndSettings};
use meteo_formulas::LAPSE_RATE;
use std::marker::PhantomData;
use std::sync::Arc;
use storage::{StaticVariable, TimeSeriesStore};
use tracing::debug;

use super::interpolate::{check_step, interpolate_series, native_range};
use super::{GenericReaderProtocol, GridBound};
use crate::domain::GenericDomain;
use crate::error::Result;
use crate::variable::RawVariable;

/// Find the grid cell serving a coordinate.
///
/// The cell containing the coordinate and its direct neighbours are
/// candidates; their elevation is read from the store. Returns `None` when
/// the coordinate is outside the grid.
pub async fn resolve_gridpoint(
    dataset: &str,
    grid: &RegularGrid,
    lat: f32,
    lon: f32,
    elevation: f32,
    mode: GridSelectionMode,
    store: &dyn TimeSeriesStore,
) -> Result<Option<GridCandidate>> {
    let Some(nearest) = grid.find_point(lat, lon) else {
        return Ok(None);
    };
    let cells = match mode {
        GridSelectionMode::Nearest => vec![nearest],
        GridSelectionMode::Land | GridSelectionMode::Sea => grid.neighbours(nearest, 1),
    };

    let mut candidates = Vec::with_capacity(cells.len());
    for gridpoint in cells {
        let raw = store
            .read_static(dataset, StaticVariable::Elevation, gridpoint)
            .await?;
        candidates.push(GridCandidate {
            gridpoint,
            distance: grid.distance_degrees(gridpoint, lat, lon),
            elevation: raw.map_or(ElevationOrSea::NoData, ElevationOrSea::from_raw),
        });
    }

    let selected = select_grid_point(&candidates, elevation, mode);
    if let Some(cell) = &selected {
        debug!(
            dataset = dataset,
            gridpoint = cell.gridpoint,
            mode = %mode,
            candidates = candidates.len(),
            "Resolved grid cell"
        );
    }
    Ok(selected)
}

/// Reads raw variables of dataset `D` at one position.
///
/// Time steps finer than the dataset's native step are interpolated
/// according to [`RawVariable::interpolation`]. Elevation correctable
/// variables in °C are adjusted to the target elevation.
pub struct GenericReader<D, V> {
    domain: D,
    store: Arc<dyn TimeSeriesStore>,
    position: GridPosition,
    model_lat: f32,
    model_lon: f32,
    model_elevation: ElevationOrSea,
    target_elevation: f32,
    _variable: PhantomData<fn() -> V>,
}

impl<D: GenericDomain, V: RawVariable> GenericReader<D, V> {
    /// Bind to the cell serving a coordinate. `None` if the dataset does not
    /// cover it.
    pub async fn new(
        domain: D,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        let grid = domain.grid();
        let Some(cell) =
            resolve_gridpoint(domain.name(), &grid, lat, lon, elevation, mode, store.as_ref())
                .await?
        else {
            return Ok(None);
        };
        let (model_lat, model_lon) = grid.coordinates(cell.gridpoint);
        Ok(Some(Self {
            domain,
            store,
            position: GridPosition::Point(cell.gridpoint),
            model_lat,
            model_lon,
            model_elevation: cell.elevation,
            target_elevation: if elevation.is_nan() {
                cell.elevation.numeric()
            } else {
                elevation
            },
            _variable: PhantomData,
        }))
    }

    /// Bind to a bilinear blend of the four cells around a coordinate.
    pub async fn new_interpolated(
        domain: D,
        lat: f32,
        lon: f32,
        elevation: f32,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        let grid = domain.grid();
        let Some(fraction) = grid.find_point_interpolated(lat, lon) else {
            return Ok(None);
        };
        let model_elevation =
            interpolated_elevation(domain.name(), &grid, fraction, store.as_ref()).await?;
        Ok(Some(Self {
            domain,
            store,
            position: GridPosition::Fraction(fraction),
            model_lat: lat,
            model_lon: lon,
            model_elevation,
            target_elevation: if elevation.is_nan() {
                model_elevation.numeric()
            } else {
                elevation
            },
            _variable: PhantomData,
        }))
    }

    /// Bind to an explicit grid cell.
    pub async fn at_gridpoint(
        domain: D,
        gridpoint: usize,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Self> {
        let grid = domain.grid();
        grid.check_gridpoint(gridpoint)?;
        let raw = store
            .read_static(domain.name(), StaticVariable::Elevation, gridpoint)
            .await?;
        let model_elevation = raw.map_or(ElevationOrSea::NoData, ElevationOrSea::from_raw);
        let (model_lat, model_lon) = grid.coordinates(gridpoint);
        Ok(Self {
            domain,
            store,
            position: GridPosition::Point(gridpoint),
            model_lat,
            model_lon,
            model_elevation,
            target_elevation: model_elevation.numeric(),
            _variable: PhantomData,
        })
    }

    pub fn domain(&self) -> D {
        self.domain
    }

    pub fn store(&self) -> &Arc<dyn TimeSeriesStore> {
        &self.store
    }

    /// Read samples on the native raster.
    async fn read_native(&self, variable: V, time: &TimerangeDt) -> Result<DataAndUnit> {
        let dataset = self.domain.name();
        match self.position {
            GridPosition::Point(gridpoint) => Ok(self
                .store
                .read(dataset, variable.name(), gridpoint, time)
                .await?),
            GridPosition::Fraction(fraction) => {
                let corners = bilinear_corners(&self.domain.grid(), &fraction);
                let reads = try_join_all(corners.iter().map(|(gridpoint, _)| {
                    self.store.read(dataset, variable.name(), *gridpoint, time)
                }))
                .await?;
                let unit = reads[0].unit;
                let data = bilinear_blend(
                    [reads[0].data.as_slice(), reads[1].data.as_slice(), reads[2].data.as_slice(), reads[3].data.as_slice()],
                    [corners[0].1, corners[1].1, corners[2].1, corners[3].1],
                );
                Ok(DataAndUnit::new(data, unit))
            }
        }
    }

    fn correct_elevation(&self, variable: V, data: &mut DataAndUnit) {
        let model = self.model_elevation.numeric();
        let target = self.target_elevation;
        if !variable.is_elevation_correctable()
            || !data.unit.is_celsius()
            || model.is_nan()
            || target.is_nan()
            || model == target
        {
            return;
        }
        let offset = (model - target) * LAPSE_RATE;
        for value in data.data.iter_mut() {
            *value += offset;
        }
    }
}

/// Bilinear elevation of a fractional position. Falls back to the lower-left
/// cell when a corner is sea or unknown.
pub(crate) async fn interpolated_elevation(
    dataset: &str,
    grid: &RegularGrid,
    fraction: grid_processor::GridPoint2DFraction,
    store: &dyn TimeSeriesStore,
) -> Result<ElevationOrSea> {
    let corners = bilinear_corners(grid, &fraction);
    let mut elevation = 0.0;
    let mut first = ElevationOrSea::NoData;
    for (i, (gridpoint, weight)) in corners.iter().enumerate() {
        let raw = store
            .read_static(dataset, StaticVariable::Elevation, *gridpoint)
            .await?;
        let corner = raw.map_or(ElevationOrSea::NoData, ElevationOrSea::from_raw);
        if i == 0 {
            first = corner;
        }
        match corner {
            ElevationOrSea::Elevation(e) => elevation += e * weight,
            ElevationOrSea::Sea | ElevationOrSea::NoData => return Ok(first),
        }
    }
    Ok(ElevationOrSea::Elevation(elevation))
}

#[async_trait]
impl<D: GenericDomain, V: RawVariable> GenericReaderProtocol for GenericReader<D, V> {
    type MixingVar = V;

    fn model_lat(&self) -> f32 {
        self.model_lat
    }

    fn model_lon(&self) -> f32 {
        self.model_lon
    }

    fn model_elevation(&self) -> ElevationOrSea {
        self.model_elevation
    }

    fn target_elevation(&self) -> f32 {
        self.target_elevation
    }

    fn model_dt_seconds(&self) -> i64 {
        self.domain.dt_seconds()
    }

    async fn get_static(&self, variable: StaticVariable) -> Result<Option<f32>> {
        let gridpoint = self.position.nearest_gridpoint();
        Ok(self
            .store
            .read_static(self.domain.name(), variable, gridpoint)
            .await?)
    }

    async fn get(&self, variable: V, time: &TimerangeDtAndSettings) -> Result<DataAndUnit> {
        let native_dt = self.domain.dt_seconds();
        check_step(time.dt_seconds(), native_dt)?;
        if !variable.is_available_in(self.domain.name()) {
            debug!(
                dataset = self.domain.name(),
                variable = variable.name(),
                "Variable not published by dataset"
            );
            return Ok(DataAndUnit::missing(time.time.count(), variable.unit()));
        }
        let mut data = if time.dt_seconds() == native_dt {
            self.read_native(variable, &time.time).await?
        } else {
            let native_time = native_range(&time.time, native_dt)?;
            let native = self.read_native(variable, &native_time).await?;
            debug!(
                dataset = self.domain.name(),
                variable = variable.name(),
                native_dt = native_dt,
                dt = time.dt_seconds(),
                "Interpolating to a finer time step"
            );
            let values = interpolate_series(
                variable.interpolation(),
                &native.data,
                &native_time,
                &time.time,
                self.model_lat,
                self.model_lon,
            );
            DataAndUnit::new(values, native.unit)
        };
        self.correct_elevation(variable, &mut data);
        Ok(data)
    }

    async fn prefetch(&self, variable: V, time: &TimerangeDtAndSettings) -> Result<()> {
        let dataset = self.domain.name();
        let native_dt = self.domain.dt_seconds();
        check_step(time.dt_seconds(), native_dt)?;
        if !variable.is_available_in(dataset) {
            return Ok(());
        }
        let read_time = if time.dt_seconds() == native_dt {
            time.time.clone()
        } else {
            native_range(&time.time, native_dt)?
        };
        match self.position {
            GridPosition::Point(gridpoint) => {
                self.store
                    .prefetch(dataset, variable.name(), gridpoint, &read_time)
                    .await?
            }
            GridPosition::Fraction(fraction) => {
                let corners = bilinear_corners(&self.domain.grid(), &fraction);
                try_join_all(corners.iter().map(|(gridpoint, _)| {
                    self.store
                        .prefetch(dataset, variable.name(), *gridpoint, &read_time)
                }))
                .await?;
            }
        }
        Ok(())
    }
}

impl<D: GenericDomain, V: RawVariable> GridBound for GenericReader<D, V> {
    fn dataset(&self) -> &'static str {
        self.domain.name()
    }

    fn grid(&self) -> RegularGrid {
        self.domain.grid()
    }

    fn position(&self) -> GridPosition {
        self.position
    }
}
