//! In-memory store backed by a serialisable snapshot.
//!
//! Used by the command-line runner (snapshot loaded from JSON) and by tests.

use async_trait::async_trait;
use meteo_common::{DataAndUnit, SiUnit, TimerangeDt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::store::{StaticVariable, TimeSeriesStore};

/// One stored series on a fixed raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSeries {
    /// Unix timestamp of the first sample
    pub start: i64,
    pub dt_seconds: i64,
    pub unit: SiUnit,
    pub values: Vec<f32>,
}

impl StoredSeries {
    /// Value at a unix timestamp, NaN when not covered.
    fn value_at(&self, timestamp: i64) -> f32 {
        let offset = timestamp - self.start;
        if offset < 0 || offset % self.dt_seconds != 0 {
            return f32::NAN;
        }
        self.values
            .get((offset / self.dt_seconds) as usize)
            .copied()
            .unwrap_or(f32::NAN)
    }
}

/// All data of one dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    /// variable -> gridpoint -> series
    #[serde(default)]
    pub series: HashMap<String, HashMap<usize, StoredSeries>>,
    /// variable -> gridpoint -> weight curve
    #[serde(default)]
    pub weights: HashMap<String, HashMap<usize, Vec<f32>>>,
    /// static field name -> gridpoint -> value
    #[serde(default)]
    pub statics: HashMap<String, HashMap<usize, f32>>,
}

/// Snapshot of every dataset, keyed by dataset identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub datasets: HashMap<String, DatasetSnapshot>,
}

/// Read counters of an [`InMemoryStore`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: u64,
    pub weight_reads: u64,
    pub prefetches: u64,
}

/// A [`TimeSeriesStore`] holding everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    snapshot: RwLock<StoreSnapshot>,
    reads: AtomicU64,
    weight_reads: AtomicU64,
    prefetches: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            ..Self::default()
        }
    }

    /// Load a JSON snapshot from disk.
    pub async fn load_json(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::io(format!("Failed to read {}: {}", path.display(), e)))?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::io(format!("Failed to parse {}: {}", path.display(), e)))?;
        debug!(
            path = %path.display(),
            datasets = snapshot.datasets.len(),
            "Loaded store snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Serialise the current content as JSON.
    pub async fn to_json(&self) -> StorageResult<String> {
        let snapshot = self.snapshot.read().await;
        serde_json::to_string(&*snapshot)
            .map_err(|e| StorageError::io(format!("Failed to serialise snapshot: {}", e)))
    }

    pub async fn insert_series(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
        series: StoredSeries,
    ) {
        let mut snapshot = self.snapshot.write().await;
        snapshot
            .datasets
            .entry(dataset.to_string())
            .or_default()
            .series
            .entry(variable.to_string())
            .or_default()
            .insert(gridpoint, series);
    }

    pub async fn insert_weights(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
        weights: Vec<f32>,
    ) {
        let mut snapshot = self.snapshot.write().await;
        snapshot
            .datasets
            .entry(dataset.to_string())
            .or_default()
            .weights
            .entry(variable.to_string())
            .or_default()
            .insert(gridpoint, weights);
    }

    pub async fn insert_static(
        &self,
        dataset: &str,
        variable: StaticVariable,
        gridpoint: usize,
        value: f32,
    ) {
        let mut snapshot = self.snapshot.write().await;
        snapshot
            .datasets
            .entry(dataset.to_string())
            .or_default()
            .statics
            .entry(variable.name().to_string())
            .or_default()
            .insert(gridpoint, value);
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.reads.load(Ordering::Relaxed),
            weight_reads: self.weight_reads.load(Ordering::Relaxed),
            prefetches: self.prefetches.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl TimeSeriesStore for InMemoryStore {
    async fn read(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
        time: &TimerangeDt,
    ) -> StorageResult<DataAndUnit> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.snapshot.read().await;
        let series = snapshot
            .datasets
            .get(dataset)
            .and_then(|d| d.series.get(variable))
            .and_then(|v| v.get(&gridpoint))
            .ok_or_else(|| StorageError::not_found(dataset, variable, gridpoint))?;
        if series.dt_seconds != time.dt_seconds {
            return Err(StorageError::io(format!(
                "{}/{} is stored every {} s, requested every {} s",
                dataset, variable, series.dt_seconds, time.dt_seconds
            )));
        }
        let data = time
            .unix_timestamps()
            .into_iter()
            .map(|t| series.value_at(t))
            .collect();
        Ok(DataAndUnit::new(data, series.unit))
    }

    async fn read_weights(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
    ) -> StorageResult<Option<Vec<f32>>> {
        self.weight_reads.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.snapshot.read().await;
        let dataset = snapshot
            .datasets
            .get(dataset)
            .ok_or_else(|| StorageError::not_found(dataset, variable, gridpoint))?;
        Ok(dataset
            .weights
            .get(variable)
            .and_then(|v| v.get(&gridpoint))
            .cloned())
    }

    async fn read_static(
        &self,
        dataset: &str,
        variable: StaticVariable,
        gridpoint: usize,
    ) -> StorageResult<Option<f32>> {
        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .datasets
            .get(dataset)
            .and_then(|d| d.statics.get(variable.name()))
            .and_then(|v| v.get(&gridpoint))
            .copied())
    }

    async fn prefetch(
        &self,
        _dataset: &str,
        _variable: &str,
        _gridpoint: usize,
        _time: &TimerangeDt,
    ) -> StorageResult<()> {
        self.prefetches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn hourly(start_hour: u32, hours: usize) -> TimerangeDt {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, start_hour, 0, 0).unwrap();
        TimerangeDt::with_count(start, hours, 3600).unwrap()
    }

    async fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().timestamp();
        store
            .insert_series(
                "era5",
                "temperature_2m",
                7,
                StoredSeries {
                    start,
                    dt_seconds: 3600,
                    unit: SiUnit::Celsius,
                    values: vec![1.0, 2.0, 3.0, 4.0],
                },
            )
            .await;
        store
    }

    #[tokio::test]
    async fn test_read_outside_coverage_is_nan() {
        let store = store().await;
        let data = store.read("era5", "temperature_2m", 7, &hourly(2, 4)).await.unwrap();
        assert_eq!(data.unit, SiUnit::Celsius);
        assert_eq!(data.data[..2], [3.0, 4.0]);
        assert!(data.data[2].is_nan() && data.data[3].is_nan());
        assert_eq!(store.stats().reads, 1);
    }

    #[tokio::test]
    async fn test_read_missing_variable() {
        let store = store().await;
        let err = store.read("era5", "rain", 7, &hourly(0, 2)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
        let err = store.read("era5", "temperature_2m", 8, &hourly(0, 2)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { gridpoint: 8, .. }));
    }

    #[tokio::test]
    async fn test_read_wrong_step() {
        let store = store().await;
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let time = TimerangeDt::with_count(start, 2, 3 * 3600).unwrap();
        let err = store.read("era5", "temperature_2m", 7, &time).await.unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[tokio::test]
    async fn test_weights_and_statics() {
        let store = store().await;
        store.insert_weights("era5", "temperature_2m", 7, vec![1.0; 12]).await;
        store.insert_static("era5", StaticVariable::Elevation, 7, 512.0).await;

        let w = store.read_weights("era5", "temperature_2m", 7).await.unwrap();
        assert_eq!(w.map(|w| w.len()), Some(12));
        assert!(store.read_weights("era5", "rain", 7).await.unwrap().is_none());
        assert!(store.read_weights("cerra", "rain", 7).await.is_err());

        let e = store.read_static("era5", StaticVariable::Elevation, 7).await.unwrap();
        assert_eq!(e, Some(512.0));
        let s = store.read_static("era5", StaticVariable::SoilType, 7).await.unwrap();
        assert_eq!(s, None);
    }

    #[tokio::test]
    async fn test_json_snapshot_roundtrip() {
        let store = store().await;
        let json = store.to_json().await.unwrap();
        let snapshot: StoreSnapshot = serde_json::from_str(&json).unwrap();
        let reloaded = InMemoryStore::from_snapshot(snapshot);
        let data = reloaded.read("era5", "temperature_2m", 7, &hourly(0, 4)).await.unwrap();
        assert_eq!(data.data, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let json = store().await.to_json().await.unwrap();
        tokio::fs::write(&path, json).await.unwrap();
        let loaded = InMemoryStore::load_json(&path).await.unwrap();
        assert!(loaded.read("era5", "temperature_2m", 7, &hourly(0, 1)).await.is_ok());
        assert!(InMemoryStore::load_json(dir.path().join("missing.json")).await.is_err());
    }
}
