//! The bias correcting reader.

use async_trait::async_trait;
use futures::future::try_join_all;
use grid_processor::{bilinear_blend, bilinear_corners, GridPosition, GridSelectionMode, RegularGrid};
use meteo_common::{DataAndUnit, ElevationOrSea, TimerangeDtAndSettings};
use meteo_formulas::LAPSE_RATE;
use std::sync::Arc;
use storage::{StaticVariable, TimeSeriesStore};
use tracing::{debug, instrument, warn};

use super::{BiasCorrectable, BiasCorrectionSeasonalLinear};
use crate::datasets::CdsDomain;
use crate::domain::GenericDomain;
use crate::error::{ReaderError, Result};
use crate::reader::{interpolated_elevation, resolve_gridpoint, GenericReaderProtocol, GridBound};
use crate::variable::GenericVariable;

/// Where reference weights are read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePoint {
    pub dataset: &'static str,
    pub grid: RegularGrid,
    pub location: GridPosition,
    pub elevation: ElevationOrSea,
    pub lat: f32,
    pub lon: f32,
}

impl ReferencePoint {
    /// The grid cell of `domain` serving a coordinate, chosen like a reader's.
    pub async fn nearest<D: GenericDomain>(
        domain: D,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: &dyn TimeSeriesStore,
    ) -> Result<Option<Self>> {
        let grid = domain.grid();
        let Some(cell) =
            resolve_gridpoint(domain.name(), &grid, lat, lon, elevation, mode, store).await?
        else {
            return Ok(None);
        };
        let (lat, lon) = grid.coordinates(cell.gridpoint);
        Ok(Some(Self {
            dataset: domain.name(),
            grid,
            location: GridPosition::Point(cell.gridpoint),
            elevation: cell.elevation,
            lat,
            lon,
        }))
    }

    /// A bilinear blend of the four cells of `domain` around a coordinate.
    pub async fn interpolated<D: GenericDomain>(
        domain: D,
        lat: f32,
        lon: f32,
        store: &dyn TimeSeriesStore,
    ) -> Result<Option<Self>> {
        let grid = domain.grid();
        let Some(fraction) = grid.find_point_interpolated(lat, lon) else {
            return Ok(None);
        };
        let elevation = interpolated_elevation(domain.name(), &grid, fraction, store).await?;
        Ok(Some(Self {
            dataset: domain.name(),
            grid,
            location: GridPosition::Fraction(fraction),
            elevation,
            lat,
            lon,
        }))
    }

    /// The weight curve of `variable` at this point. `None` if the weight
    /// dataset has no curve for one of the cells.
    pub async fn weights(
        &self,
        variable: &str,
        store: &dyn TimeSeriesStore,
    ) -> Result<Option<BiasCorrectionSeasonalLinear>> {
        read_curve(self.dataset, &self.grid, self.location, variable, store).await
    }
}

async fn read_curve(
    dataset: &str,
    grid: &RegularGrid,
    location: GridPosition,
    variable: &str,
    store: &dyn TimeSeriesStore,
) -> Result<Option<BiasCorrectionSeasonalLinear>> {
    match location {
        GridPosition::Point(gridpoint) => Ok(store
            .read_weights(dataset, variable, gridpoint)
            .await?
            .map(BiasCorrectionSeasonalLinear::new)),
        GridPosition::Fraction(fraction) => {
            let corners = bilinear_corners(grid, &fraction);
            let curves = try_join_all(
                corners
                    .iter()
                    .map(|(gridpoint, _)| store.read_weights(dataset, variable, *gridpoint)),
            )
            .await?;
            let curves: Option<Vec<Vec<f32>>> = curves.into_iter().collect();
            let Some(curves) = curves else {
                return Ok(None);
            };
            let n = curves[0].len();
            if curves.iter().any(|c| c.len() != n) {
                return Err(ReaderError::Io(format!(
                    "weight curves of {} in {} differ in length",
                    variable, dataset
                )));
            }
            let blended = bilinear_blend(
                [curves[0].as_slice(), curves[1].as_slice(), curves[2].as_slice(), curves[3].as_slice()],
                [corners[0].1, corners[1].1, corners[2].1, corners[3].1],
            );
            Ok(Some(BiasCorrectionSeasonalLinear::new(blended)))
        }
    }
}

/// Corrects a model reader toward one or more reference datasets.
///
/// References are tried in order; the first with a complete weight curve is
/// used. Location accessors report the first reference.
pub struct BiasCorrector<R> {
    reader: R,
    store: Arc<dyn TimeSeriesStore>,
    references: Vec<ReferencePoint>,
}

impl<R> BiasCorrector<R>
where
    R: GenericReaderProtocol + GridBound,
    R::MixingVar: BiasCorrectable,
{
    pub fn new(
        reader: R,
        store: Arc<dyn TimeSeriesStore>,
        references: Vec<ReferencePoint>,
    ) -> Result<Self> {
        if references.is_empty() {
            return Err(ReaderError::Config(
                "bias correction needs at least one reference".to_string(),
            ));
        }
        Ok(Self {
            reader,
            store,
            references,
        })
    }

    /// ERA5-Land where it is land, ERA5 otherwise. `None` if ERA5 does not
    /// cover the location.
    pub async fn era5_seamless(
        reader: R,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        let land = ReferencePoint::nearest(
            CdsDomain::Era5LandDaily,
            lat,
            lon,
            elevation,
            mode,
            store.as_ref(),
        )
        .await?
        .filter(|reference| !reference.elevation.is_sea());
        let Some(era5) =
            ReferencePoint::nearest(CdsDomain::Era5Daily, lat, lon, elevation, mode, store.as_ref())
                .await?
        else {
            return Ok(None);
        };
        let references = land.into_iter().chain(std::iter::once(era5)).collect();
        Self::new(reader, store, references).map(Some)
    }

    /// A single reference at the nearest cell of `domain`.
    pub async fn with_reference<D: GenericDomain>(
        reader: R,
        domain: D,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        let Some(reference) =
            ReferencePoint::nearest(domain, lat, lon, elevation, mode, store.as_ref()).await?
        else {
            return Ok(None);
        };
        Self::new(reader, store, vec![reference]).map(Some)
    }

    /// A single reference blended from the four cells of `domain`.
    pub async fn with_interpolated_reference<D: GenericDomain>(
        reader: R,
        domain: D,
        lat: f32,
        lon: f32,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        let Some(reference) =
            ReferencePoint::interpolated(domain, lat, lon, store.as_ref()).await?
        else {
            return Ok(None);
        };
        Self::new(reader, store, vec![reference]).map(Some)
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn references(&self) -> &[ReferencePoint] {
        &self.references
    }

    fn primary(&self) -> &ReferencePoint {
        // non-empty, checked in `new`
        &self.references[0]
    }

    /// The model's own curve at the reader's position.
    async fn control_weights(&self, variable: R::MixingVar) -> Result<BiasCorrectionSeasonalLinear> {
        let curve = read_curve(
            self.reader.dataset(),
            &self.reader.grid(),
            self.reader.position(),
            variable.name(),
            self.store.as_ref(),
        )
        .await;
        match curve {
            Ok(Some(curve)) => Ok(curve),
            Ok(None) | Err(ReaderError::NotFound(_)) => Err(ReaderError::missing_weights(
                variable.name(),
                self.reader.dataset(),
            )),
            Err(e) => Err(e),
        }
    }

    async fn reference_weights(
        &self,
        variable: R::MixingVar,
    ) -> Result<(BiasCorrectionSeasonalLinear, &ReferencePoint)> {
        for reference in &self.references {
            match reference.weights(variable.name(), self.store.as_ref()).await {
                Ok(Some(curve)) if !curve.has_missing() => return Ok((curve, reference)),
                Ok(_) | Err(ReaderError::NotFound(_)) => {
                    warn!(
                        variable = variable.name(),
                        reference = reference.dataset,
                        "Reference weights unusable, trying next reference"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        let domains: Vec<&str> = self.references.iter().map(|r| r.dataset).collect();
        Err(ReaderError::missing_weights(variable.name(), domains.join(", ")))
    }

    /// Read `variable` and move it onto the reference climatology.
    #[instrument(skip_all, fields(variable = variable.name(), dataset = self.reader.dataset()))]
    pub async fn correct(
        &self,
        variable: R::MixingVar,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        let raw = self.reader.get(variable, time).await?;
        let control = self.control_weights(variable).await?;
        let (reference, point) = self.reference_weights(variable).await?;
        let change = variable.bias_correction_type();
        debug!(reference = point.dataset, change = ?change, "Applying bias correction");

        let mut data = raw.data;
        reference.apply_offset(&mut data, &control, &time.time, change);
        if let Some((lower, upper)) = change.bounds() {
            for value in data.iter_mut() {
                *value = value.clamp(lower, upper);
            }
        }

        if variable.applies_lapse_rate() && raw.unit.is_celsius() {
            let model = point.elevation.numeric();
            let target = self.reader.target_elevation();
            if !model.is_nan() && !target.is_nan() && model != target {
                let offset = (model - target) * LAPSE_RATE;
                for value in data.iter_mut() {
                    *value += offset;
                }
            }
        }
        Ok(DataAndUnit::new(data, raw.unit))
    }
}

#[async_trait]
impl<R> GenericReaderProtocol for BiasCorrector<R>
where
    R: GenericReaderProtocol + GridBound,
    R::MixingVar: BiasCorrectable,
{
    type MixingVar = R::MixingVar;

    fn model_lat(&self) -> f32 {
        self.primary().lat
    }

    fn model_lon(&self) -> f32 {
        self.primary().lon
    }

    fn model_elevation(&self) -> ElevationOrSea {
        self.primary().elevation
    }

    fn target_elevation(&self) -> f32 {
        self.reader.target_elevation()
    }

    fn model_dt_seconds(&self) -> i64 {
        self.reader.model_dt_seconds()
    }

    async fn get_static(&self, variable: StaticVariable) -> Result<Option<f32>> {
        for reference in &self.references {
            let value = self
                .store
                .read_static(reference.dataset, variable, reference.location.nearest_gridpoint())
                .await?;
            if value.is_some() {
                return Ok(value);
            }
        }
        Ok(None)
    }

    async fn get(
        &self,
        variable: Self::MixingVar,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        self.correct(variable, time).await
    }

    async fn prefetch(&self, variable: Self::MixingVar, time: &TimerangeDtAndSettings) -> Result<()> {
        self.reader.prefetch(variable, time).await
    }
}
