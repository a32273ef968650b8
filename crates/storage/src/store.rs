//! The read interface every dataset backend implements.

use async_trait::async_trait;
use meteo_common::{DataAndUnit, TimerangeDt};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

/// Time-invariant fields stored once per grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticVariable {
    /// Cell elevation in metres, `-999` for sea
    Elevation,
    /// Dominant soil type class
    SoilType,
}

impl StaticVariable {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Elevation => "elevation",
            Self::SoilType => "soil_type",
        }
    }
}

/// Asynchronous access to gridded time series.
///
/// Datasets are addressed by identifier, cells by their row-major index.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Read `variable` for every timestamp of `time`.
    ///
    /// `time.dt_seconds` must be the native step of the dataset. Timestamps
    /// the dataset does not cover are NaN.
    async fn read(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
        time: &TimerangeDt,
    ) -> StorageResult<DataAndUnit>;

    /// Read a seasonal weight curve. `None` if the weight dataset has no
    /// curve for this variable.
    async fn read_weights(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
    ) -> StorageResult<Option<Vec<f32>>>;

    /// Read a static field. `None` if the dataset does not provide it.
    async fn read_static(
        &self,
        dataset: &str,
        variable: StaticVariable,
        gridpoint: usize,
    ) -> StorageResult<Option<f32>>;

    /// Hint that `read` will be called for this key soon.
    async fn prefetch(
        &self,
        _dataset: &str,
        _variable: &str,
        _gridpoint: usize,
        _time: &TimerangeDt,
    ) -> StorageResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<S: TimeSeriesStore + ?Sized> TimeSeriesStore for std::sync::Arc<S> {
    async fn read(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
        time: &TimerangeDt,
    ) -> StorageResult<DataAndUnit> {
        (**self).read(dataset, variable, gridpoint, time).await
    }

    async fn read_weights(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
    ) -> StorageResult<Option<Vec<f32>>> {
        (**self).read_weights(dataset, variable, gridpoint).await
    }

    async fn read_static(
        &self,
        dataset: &str,
        variable: StaticVariable,
        gridpoint: usize,
    ) -> StorageResult<Option<f32>> {
        (**self).read_static(dataset, variable, gridpoint).await
    }

    async fn prefetch(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
        time: &TimerangeDt,
    ) -> StorageResult<()> {
        (**self).prefetch(dataset, variable, gridpoint, time).await
    }
}
