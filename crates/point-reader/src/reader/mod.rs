//! Single-source readers.
//!
//! ```text
//! DerivedReader<Graph>          derived variables, two-phase evaluation
//!        │
//! GenericReaderCached<D, V>     per-request memo
//!        │
//! GenericReader<D, V>           one dataset, one grid position
//!        │
//! TimeSeriesStore               storage backend
//! ```

mod cached;
mod derived;
mod generic;
mod interpolate;

pub use cached::GenericReaderCached;
pub use derived::{DerivedReader, DerivedVariableGraph};
pub use generic::{resolve_gridpoint, GenericReader};
pub(crate) use generic::interpolated_elevation;
pub use interpolate::interpolate_series;

use async_trait::async_trait;
use futures::future::try_join_all;
use grid_processor::{GridPosition, RegularGrid};
use meteo_common::{DataAndUnit, ElevationOrSea, TimerangeDtAndSettings};
use storage::StaticVariable;

use crate::error::Result;
use crate::variable::GenericVariable;

/// The read contract every reader, mixer and corrector implements.
///
/// `prefetch` is a hint that `get` will follow. It may be called any number
/// of times and is never required before `get`.
#[async_trait]
pub trait GenericReaderProtocol: Send + Sync {
    type MixingVar: GenericVariable;

    fn model_lat(&self) -> f32;

    fn model_lon(&self) -> f32;

    fn model_elevation(&self) -> ElevationOrSea;

    /// Elevation of the requested location, the model elevation if none
    /// was given.
    fn target_elevation(&self) -> f32;

    fn model_dt_seconds(&self) -> i64;

    async fn get_static(&self, variable: StaticVariable) -> Result<Option<f32>>;

    async fn get(
        &self,
        variable: Self::MixingVar,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit>;

    async fn prefetch(&self, variable: Self::MixingVar, time: &TimerangeDtAndSettings)
        -> Result<()>;

    /// Prefetch several variables concurrently.
    async fn prefetch_many(
        &self,
        variables: &[Self::MixingVar],
        time: &TimerangeDtAndSettings,
    ) -> Result<()> {
        try_join_all(variables.iter().map(|v| self.prefetch(*v, time))).await?;
        Ok(())
    }
}

/// A reader bound to one position on one dataset grid.
///
/// Bias correction reads the model's own weight curves at this position.
pub trait GridBound {
    fn dataset(&self) -> &'static str;

    fn grid(&self) -> RegularGrid;

    fn position(&self) -> GridPosition;
}
