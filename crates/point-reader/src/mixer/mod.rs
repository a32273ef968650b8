//! Blending several datasets into one series.
//!
//! Sources are ordered from the coarsest to the finest grid. For every
//! sample the finest source with data wins:
//!
//! ```text
//! finest  ──get──► running result ──NaN left?──► next coarser ──► ...
//! ```
//!
//! Cumulative variables are blended in delta space, see [`DeltaBlend`].

mod delta;

pub use delta::{delta_decode, delta_encode, integrate_if_nan, DeltaBlend};

use async_trait::async_trait;
use futures::future::try_join_all;
use grid_processor::GridSelectionMode;
use meteo_common::{DataAndUnit, ElevationOrSea, TimerangeDtAndSettings};
use std::sync::Arc;
use storage::{StaticVariable, TimeSeriesStore};
use tracing::{debug, instrument, warn};

use crate::config::CoveragePolicy;
use crate::domain::GenericDomain;
use crate::error::{ReaderError, Result};
use crate::reader::{GenericReaderCached, GenericReaderProtocol};
use crate::variable::{GenericVariable, GenericVariableMixable, RawVariable};

/// A reader that can be created for any domain of its dataset family.
#[async_trait]
pub trait MixerReader: GenericReaderProtocol + Sized {
    type Domain: GenericDomain;

    async fn make_reader(
        domain: Self::Domain,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>>;
}

#[async_trait]
impl<D: GenericDomain, V: RawVariable> MixerReader for GenericReaderCached<D, V> {
    type Domain = D;

    async fn make_reader(
        domain: D,
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: Arc<dyn TimeSeriesStore>,
    ) -> Result<Option<Self>> {
        GenericReaderCached::new(domain, lat, lon, elevation, mode, store).await
    }
}

/// Blends readers of increasing resolution.
///
/// Location accessors and the native time step come from the finest reader.
pub struct GenericReaderMixer<R> {
    readers: Vec<R>,
    coverage: CoveragePolicy,
}

impl<R: GenericReaderProtocol> GenericReaderMixer<R> {
    /// `readers` are ordered from the coarsest to the finest.
    pub fn new(readers: Vec<R>, coverage: CoveragePolicy) -> Result<Self> {
        if readers.is_empty() {
            return Err(ReaderError::NoDataForLocation);
        }
        Ok(Self { readers, coverage })
    }

    pub fn readers(&self) -> &[R] {
        &self.readers
    }

    pub fn coverage(&self) -> CoveragePolicy {
        self.coverage
    }

    fn finest(&self) -> &R {
        // non-empty, checked in `new`
        &self.readers[self.readers.len() - 1]
    }
}

impl<R: MixerReader> GenericReaderMixer<R> {
    /// Create a reader per domain, skipping domains that do not cover the
    /// location. `None` if no domain does.
    ///
    /// Readers are created finest first; without a requested elevation, the
    /// finest reader's elevation is used for all coarser ones.
    pub async fn from_domains(
        domains: &[R::Domain],
        lat: f32,
        lon: f32,
        elevation: f32,
        mode: GridSelectionMode,
        store: Arc<dyn TimeSeriesStore>,
        coverage: CoveragePolicy,
    ) -> Result<Option<Self>> {
        let mut elevation = elevation;
        let mut readers = Vec::with_capacity(domains.len());
        for domain in domains.iter().rev() {
            let Some(reader) =
                R::make_reader(*domain, lat, lon, elevation, mode, store.clone()).await?
            else {
                debug!(domain = domain.name(), lat = lat, lon = lon, "Domain does not cover location");
                continue;
            };
            if elevation.is_nan() {
                elevation = reader.model_elevation().numeric();
            }
            readers.push(reader);
        }
        if readers.is_empty() {
            return Ok(None);
        }
        readers.reverse();
        Ok(Some(Self { readers, coverage }))
    }
}

impl<R> GenericReaderMixer<R>
where
    R: GenericReaderProtocol,
    R::MixingVar: GenericVariableMixable,
{
    /// Blend `variable` across all sources.
    #[instrument(skip_all, fields(variable = variable.name(), sources = self.readers.len()))]
    pub async fn blend(
        &self,
        variable: R::MixingVar,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        let mut sources = self.readers.iter().rev();
        let Some(finest) = sources.next() else {
            return Err(ReaderError::NoDataForLocation);
        };
        let first = finest.get(variable, time).await?;

        let data = if variable.requires_offset_correction_for_mixing() {
            let unit = first.unit;
            let mut blend = DeltaBlend::new(first.data);
            let mut used = 1;
            for reader in sources {
                if blend.is_complete() {
                    break;
                }
                let next = reader.get(variable, time).await?;
                blend.integrate(&next.data);
                used += 1;
            }
            debug!(used = used, "Blended in delta space");
            DataAndUnit::new(blend.decode(), unit)
        } else {
            let mut data = first;
            let mut used = 1;
            for reader in sources {
                if !data.data.iter().any(|v| v.is_nan()) {
                    break;
                }
                let next = reader.get(variable, time).await?;
                integrate_if_nan(&mut data.data, &next.data);
                used += 1;
            }
            debug!(used = used, "Blended");
            data
        };

        let missing = data.count_missing();
        if missing > 0 {
            match self.coverage {
                CoveragePolicy::RequireComplete => {
                    return Err(ReaderError::IncompleteCoverage {
                        variable: variable.name().to_string(),
                        missing,
                    });
                }
                CoveragePolicy::AllowGaps => {
                    warn!(missing = missing, "Samples not covered by any source");
                }
            }
        }
        Ok(data)
    }
}

#[async_trait]
impl<R> GenericReaderProtocol for GenericReaderMixer<R>
where
    R: GenericReaderProtocol,
    R::MixingVar: GenericVariableMixable,
{
    type MixingVar = R::MixingVar;

    fn model_lat(&self) -> f32 {
        self.finest().model_lat()
    }

    fn model_lon(&self) -> f32 {
        self.finest().model_lon()
    }

    fn model_elevation(&self) -> ElevationOrSea {
        self.finest().model_elevation()
    }

    fn target_elevation(&self) -> f32 {
        self.finest().target_elevation()
    }

    fn model_dt_seconds(&self) -> i64 {
        self.finest().model_dt_seconds()
    }

    async fn get_static(&self, variable: StaticVariable) -> Result<Option<f32>> {
        self.finest().get_static(variable).await
    }

    async fn get(
        &self,
        variable: Self::MixingVar,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        self.blend(variable, time).await
    }

    async fn prefetch(&self, variable: Self::MixingVar, time: &TimerangeDtAndSettings) -> Result<()> {
        try_join_all(self.readers.iter().map(|reader| reader.prefetch(variable, time))).await?;
        Ok(())
    }
}
