//! Per-request memo around a [`GenericReader`].

use async_trait::async_trait;
use grid_processor::{GridPosition, GridSelectionMode, RegularGrid};
use meteo_common::{DataAndUnit, ElevationOrSea, TimerangeDtAndSettings};
use std::collections::HashMap;
use std::sync::Arc;
use storage::{StaticVariable, TimeSeriesStore};
use tokio::sync::{Mutex, OnceCell};

use super::{GenericReader, GenericReaderProtocol, GridBound};
use crate::domain::GenericDomain;
use crate::error::Result;
use crate::variable::RawVariable;

type CacheKey<V> = (V, TimerangeDtAndSettings);

/// Memoises reads by (variable, time range).
///
/// Derived variables often share inputs; each distinct read reaches the
/// store once, even when requested concurrently. Failed reads are not
/// memoised. Lives for one request.
pub struct GenericReaderCached<D, V> {
    reader: GenericReader<D, V>,
    cache: Mutex<HashMap<CacheKey<V>, Arc<OnceCell<DataAndUnit>>>>,
}

impl<D: GenericDomain, V: RawVariable> GenericReaderCached<D, V> {
    pub fn wrap(reader: GenericReader<D, V>) -> Self {
        Self {
            reader,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn new(
        domain: D,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        Ok(GenericReader::new(domain, lat, lon, elevation, mode, store)
            .await?
            .map(Self::wrap))
    }

    pub fn inner(&self) -> &GenericReader<D, V> {
        &self.reader
    }

    pub fn domain(&self) -> D {
        self.reader.domain()
    }

    /// Number of memoised reads.
    pub async fn cached_entries(&self) -> usize {
        self.cache
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    async fn cell(&self, variable: V, time: &TimerangeDtAndSettings) -> Arc<OnceCell<DataAndUnit>> {
        let mut cache = self.cache.lock().await;
        cache
            .entry((variable, time.clone()))
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }
}

#[async_trait]
impl<D: GenericDomain, V: RawVariable> GenericReaderProtocol for GenericReaderCached<D, V> {
    type MixingVar = V;

    fn model_lat(&self) -> f32 {
        self.reader.model_lat()
    }

    fn model_lon(&self) -> f32 {
        self.reader.model_lon()
    }

    fn model_elevation(&self) -> ElevationOrSea {
        self.reader.model_elevation()
    }

    fn target_elevation(&self) -> f32 {
        self.reader.target_elevation()
    }

    fn model_dt_seconds(&self) -> i64 {
        self.reader.model_dt_seconds()
    }

    async fn get_static(&self, variable: StaticVariable) -> Result<Option<f32>> {
        self.reader.get_static(variable).await
    }

    async fn get(&self, variable: V, time: &TimerangeDtAndSettings) -> Result<DataAndUnit> {
        let cell = self.cell(variable, time).await;
        let data = cell
            .get_or_try_init(|| self.reader.get(variable, time))
            .await?;
        Ok(data.clone())
    }

    async fn prefetch(&self, variable: V, time: &TimerangeDtAndSettings) -> Result<()> {
        let cell = self.cell(variable, time).await;
        if cell.initialized() {
            return Ok(());
        }
        self.reader.prefetch(variable, time).await
    }
}

impl<D: GenericDomain, V: RawVariable> GridBound for GenericReaderCached<D, V> {
    fn dataset(&self) -> &'static str {
        self.reader.dataset()
    }

    fn grid(&self) -> RegularGrid {
        self.reader.grid()
    }

    fn position(&self) -> GridPosition {
        self.reader.position()
    }
}
