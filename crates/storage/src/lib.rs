//! Storage abstractions for point reads.
//!
//! Provides:
//! - [`TimeSeriesStore`]: async reads of series, weight curves and static fields
//! - [`InMemoryStore`]: a snapshot-backed store for the CLI and tests
//! - [`CachedWeightsStore`]: a process-wide LRU in front of weight curve reads

pub mod error;
pub mod memory;
pub mod store;
pub mod weight_cache;

pub use error::{StorageError, StorageResult};
pub use memory::{DatasetSnapshot, InMemoryStore, StoreSnapshot, StoreStats, StoredSeries};
pub use store::{StaticVariable, TimeSeriesStore};
pub use weight_cache::{CachedWeightsStore, WeightCacheStats};
