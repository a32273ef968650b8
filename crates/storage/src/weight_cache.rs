//! Process-wide LRU cache for bias-correction weight curves.
//!
//! Weight curves are read-only and small (a few dozen values per cell), but
//! every corrected variable of every request reads two or more of them.
//! Wrapping a store in [`CachedWeightsStore`] keeps recently used curves in
//! memory. Time series reads pass through untouched.

use async_trait::async_trait;
use lru::LruCache;
use meteo_common::{DataAndUnit, TimerangeDt};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::store::{StaticVariable, TimeSeriesStore};

/// Cache key: dataset, variable, gridpoint
type WeightKey = (String, String, usize);

/// Statistics for the weight cache
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WeightCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl WeightCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// A store wrapper caching `read_weights` results, including absent curves.
pub struct CachedWeightsStore<S> {
    inner: S,
    cache: Arc<RwLock<LruCache<WeightKey, Option<Arc<Vec<f32>>>>>>,
    stats: Arc<RwLock<WeightCacheStats>>,
    capacity: usize,
}

impl<S: TimeSeriesStore> CachedWeightsStore<S> {
    /// Wrap `inner` with a cache holding up to `capacity` curves.
    pub fn new(inner: S, capacity: usize) -> StorageResult<Self> {
        let cache_size = NonZeroUsize::new(capacity)
            .ok_or_else(|| StorageError::io("weight cache capacity must be > 0"))?;
        Ok(Self {
            inner,
            cache: Arc::new(RwLock::new(LruCache::new(cache_size))),
            stats: Arc::new(RwLock::new(WeightCacheStats::default())),
            capacity,
        })
    }

    /// Get current cache statistics.
    pub async fn stats(&self) -> WeightCacheStats {
        let cache = self.cache.read().await;
        let mut stats = self.stats.write().await;
        stats.entries = cache.len();
        stats.clone()
    }

    /// Clear the cache.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
        *self.stats.write().await = WeightCacheStats::default();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: TimeSeriesStore> TimeSeriesStore for CachedWeightsStore<S> {
    async fn read(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
        time: &TimerangeDt,
    ) -> StorageResult<DataAndUnit> {
        self.inner.read(dataset, variable, gridpoint, time).await
    }

    async fn read_weights(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
    ) -> StorageResult<Option<Vec<f32>>> {
        let key = (dataset.to_string(), variable.to_string(), gridpoint);
        {
            let mut cache = self.cache.write().await;
            if let Some(cached) = cache.get(&key) {
                self.stats.write().await.hits += 1;
                return Ok(cached.as_ref().map(|w| w.as_ref().clone()));
            }
        }
        self.stats.write().await.misses += 1;

        // Errors are not cached
        let weights = self.inner.read_weights(dataset, variable, gridpoint).await?;
        debug!(
            dataset = dataset,
            variable = variable,
            gridpoint = gridpoint,
            found = weights.is_some(),
            "Weight cache miss"
        );
        self.cache
            .write()
            .await
            .put(key, weights.clone().map(Arc::new));
        Ok(weights)
    }

    async fn read_static(
        &self,
        dataset: &str,
        variable: StaticVariable,
        gridpoint: usize,
    ) -> StorageResult<Option<f32>> {
        self.inner.read_static(dataset, variable, gridpoint).await
    }

    async fn prefetch(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
        time: &TimerangeDt,
    ) -> StorageResult<()> {
        self.inner.prefetch(dataset, variable, gridpoint, time).await
    }
}
