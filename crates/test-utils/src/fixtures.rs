//! Common test fixtures for point reader tests.
//!
//! This module provides an in-memory store builder and time ranges that
//! represent common request scenarios.

use chrono::{DateTime, TimeZone, Utc};
use meteo_common::{SiUnit, TimerangeDt, TimerangeDtAndSettings};
use std::io::Write;
use std::sync::Arc;
use storage::{InMemoryStore, StaticVariable, StoredSeries, TimeSeriesStore};

/// Locations used across the test suite.
pub mod locations {
    /// Zurich, inside CERRA, ERA5 and ERA5-Land
    pub const ZURICH: (f32, f32) = (47.37, 8.55);

    /// Vienna, inside the European CAMS domain
    pub const VIENNA: (f32, f32) = (48.2, 16.4);

    /// Sydney, inside the BOM ACCESS global domain
    pub const SYDNEY: (f32, f32) = (-33.87, 151.21);

    /// Open Atlantic, outside every regional domain
    pub const MID_ATLANTIC: (f32, f32) = (30.0, -40.0);
}

/// Timestamp at a full hour.
pub fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// `count` hourly steps starting at `start`.
pub fn hourly(start: DateTime<Utc>, count: usize) -> TimerangeDt {
    TimerangeDt::with_count(start, count, 3600).expect("valid hourly range")
}

/// `count` daily steps starting at `start`.
pub fn daily(start: DateTime<Utc>, count: usize) -> TimerangeDt {
    TimerangeDt::with_count(start, count, 86400).expect("valid daily range")
}

/// A request without panel settings.
pub fn request(time: TimerangeDt) -> TimerangeDtAndSettings {
    TimerangeDtAndSettings::new(time)
}

/// Builder for an [`InMemoryStore`] populated cell by cell.
///
/// # Example
///
/// ```ignore
/// let fixture = StoreFixture::new();
/// fixture.elevation("era5", 7, 500.0).await;
/// fixture.series("era5", "temperature_2m", 7, &hourly(start, 4), SiUnit::Celsius, vec![1.0; 4]).await;
/// let store = fixture.shared();
/// ```
#[derive(Debug, Clone, Default)]
pub struct StoreFixture {
    store: Arc<InMemoryStore>,
}

impl StoreFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// The populated store, for inspecting read counters.
    pub fn store(&self) -> Arc<InMemoryStore> {
        self.store.clone()
    }

    /// The populated store as readers consume it.
    pub fn shared(&self) -> Arc<dyn TimeSeriesStore> {
        self.store.clone()
    }

    /// Store `values` on the raster of `time`.
    pub async fn series(
        &self,
        dataset: &str,
        variable: &str,
        gridpoint: usize,
        time: &TimerangeDt,
        unit: SiUnit,
        values: Vec<f32>,
    ) {
        assert_eq!(
            values.len(),
            time.count(),
            "fixture series {}/{} does not match its time range",
            dataset,
            variable
        );
        self.store
            .insert_series(
                dataset,
                variable,
                gridpoint,
                StoredSeries {
                    start: time.start.timestamp(),
                    dt_seconds: time.dt_seconds,
                    unit,
                    values,
                },
            )
            .await;
    }

    pub async fn weights(&self, dataset: &str, variable: &str, gridpoint: usize, curve: Vec<f32>) {
        self.store
            .insert_weights(dataset, variable, gridpoint, curve)
            .await;
    }

    pub async fn elevation(&self, dataset: &str, gridpoint: usize, metres: f32) {
        self.store
            .insert_static(dataset, StaticVariable::Elevation, gridpoint, metres)
            .await;
    }

    pub async fn soil_type(&self, dataset: &str, gridpoint: usize, class: f32) {
        self.store
            .insert_static(dataset, StaticVariable::SoilType, gridpoint, class)
            .await;
    }

    /// Write the store as a JSON snapshot to a temporary file.
    pub async fn snapshot_file(&self) -> tempfile::NamedTempFile {
        let json = self.store.to_json().await.expect("serialisable snapshot");
        let mut file = tempfile::NamedTempFile::new().expect("temporary file");
        file.write_all(json.as_bytes()).expect("snapshot written");
        file
    }
}
