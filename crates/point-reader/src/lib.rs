//! Point time series from gridded weather and climate datasets.
//!
//! A request names a location, a time range and a variable. The crate
//! resolves the variable through three layers:
//!
//! ```text
//!            ┌─────────────────────────┐
//! request ──►│ DerivedReader           │  derived variables from raw ones
//!            └───────────┬─────────────┘
//!                        │
//!        ┌───────────────┼────────────────┐
//!        ▼                                ▼
//! GenericReaderMixer              BiasCorrector
//! several datasets, finest        model moved onto a reference
//! first, gaps filled from         climatology with seasonal
//! coarser sources                 weight curves
//!        │                                │
//!        └───────────────┬────────────────┘
//!                        ▼
//!            GenericReader / GenericReaderCached
//!            one grid cell, temporal interpolation
//!                        │
//!                        ▼
//!                 TimeSeriesStore
//! ```
//!
//! All readers implement [`GenericReaderProtocol`]: `prefetch` hints upcoming
//! reads, `get` returns a [`DataAndUnit`](meteo_common::DataAndUnit) with one
//! value per requested timestamp. Missing samples are NaN.
//!
//! # Example
//!
//! ```rust,no_run
//! use point_reader::datasets::{CdsDomain, CerraReader, CerraVariableDerived};
//! use point_reader::{GenericReaderProtocol, VariableOrDerived};
//! # async fn run(store: std::sync::Arc<dyn storage::TimeSeriesStore>,
//! #              time: meteo_common::TimerangeDtAndSettings) -> point_reader::Result<()> {
//! let reader = CerraReader::new(
//!     CdsDomain::Cerra,
//!     47.37,
//!     8.55,
//!     f32::NAN,
//!     grid_processor::GridSelectionMode::Land,
//!     store,
//! )
//! .await?
//! .ok_or(point_reader::ReaderError::NoDataForLocation)?;
//! let dewpoint = reader
//!     .get(VariableOrDerived::Derived(CerraVariableDerived::Dewpoint2m), &time)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod bias;
pub mod config;
pub mod datasets;
pub mod domain;
pub mod error;
pub mod mixer;
pub mod reader;
pub mod variable;

pub use bias::{BiasCorrectable, BiasCorrectionSeasonalLinear, BiasCorrector, ChangeType, ReferencePoint};
pub use config::{CoveragePolicy, ReaderConfig, ReferenceWeightsMode};
pub use domain::GenericDomain;
pub use error::{ReaderError, Result};
pub use mixer::{GenericReaderMixer, MixerReader};
pub use reader::{
    DerivedReader, DerivedVariableGraph, GenericReader, GenericReaderCached, GenericReaderProtocol,
    GridBound,
};
pub use variable::{
    GenericVariable, GenericVariableMixable, RawVariable, ReaderInterpolation, VariableOrDerived,
};
