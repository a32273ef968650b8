//! Two-phase evaluation of derived variables.
//!
//! Each dataset describes its derived variables as a [`DerivedVariableGraph`]:
//! a fixed dependency list per variable and a rule computing it. The graph is
//! evaluated in two phases. `prefetch` walks the dependencies and hints every
//! raw read concurrently; `compute` then reads the dependencies through
//! [`DerivedVariableGraph::get_any`] in any order.

use async_trait::async_trait;
use futures::future::try_join_all;
use grid_processor::{GridPosition, RegularGrid};
use meteo_common::{DataAndUnit, ElevationOrSea, TimerangeDtAndSettings};
use storage::StaticVariable;

use super::{GenericReaderProtocol, GridBound};
use crate::error::Result;
use crate::variable::{GenericVariable, VariableOrDerived};

/// Derived variables of one dataset on top of a raw reader.
///
/// Dependency lists must be acyclic.
#[async_trait]
pub trait DerivedVariableGraph: Send + Sync {
    type Raw: GenericVariable;
    type Derived: GenericVariable;
    type Inner: GenericReaderProtocol<MixingVar = Self::Raw>;

    fn inner(&self) -> &Self::Inner;

    /// Variables read by the rule for `derived`. Empty for rules that only
    /// need the location.
    fn dependencies(&self, derived: Self::Derived) -> Vec<VariableOrDerived<Self::Raw, Self::Derived>>;

    /// Evaluate the rule for `derived`.
    async fn compute(
        &self,
        derived: Self::Derived,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit>;

    async fn get_raw(&self, raw: Self::Raw, time: &TimerangeDtAndSettings) -> Result<DataAndUnit> {
        self.inner().get(raw, time).await
    }

    /// Read a dependency inside `compute`.
    async fn get_any(
        &self,
        variable: VariableOrDerived<Self::Raw, Self::Derived>,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        match variable {
            VariableOrDerived::Raw(raw) => self.get_raw(raw, time).await,
            VariableOrDerived::Derived(derived) => self.compute(derived, time).await,
        }
    }

    /// Hint every raw read the rule for `derived` needs, recursively.
    async fn prefetch_derived(
        &self,
        derived: Self::Derived,
        time: &TimerangeDtAndSettings,
    ) -> Result<()> {
        let dependencies = self.dependencies(derived);
        try_join_all(dependencies.into_iter().map(|dependency| async move {
            match dependency {
                VariableOrDerived::Raw(raw) => self.inner().prefetch(raw, time).await,
                VariableOrDerived::Derived(derived) => self.prefetch_derived(derived, time).await,
            }
        }))
        .await?;
        Ok(())
    }

    async fn get_derived(
        &self,
        derived: Self::Derived,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        self.prefetch_derived(derived, time).await?;
        self.compute(derived, time).await
    }
}

/// Reader serving both raw and derived variables of a graph.
pub struct DerivedReader<G> {
    graph: G,
}

impl<G: DerivedVariableGraph> DerivedReader<G> {
    pub fn from_graph(graph: G) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn inner(&self) -> &G::Inner {
        self.graph.inner()
    }
}

#[async_trait]
impl<G: DerivedVariableGraph> GenericReaderProtocol for DerivedReader<G> {
    type MixingVar = VariableOrDerived<G::Raw, G::Derived>;

    fn model_lat(&self) -> f32 {
        self.graph.inner().model_lat()
    }

    fn model_lon(&self) -> f32 {
        self.graph.inner().model_lon()
    }

    fn model_elevation(&self) -> ElevationOrSea {
        self.graph.inner().model_elevation()
    }

    fn target_elevation(&self) -> f32 {
        self.graph.inner().target_elevation()
    }

    fn model_dt_seconds(&self) -> i64 {
        self.graph.inner().model_dt_seconds()
    }

    async fn get_static(&self, variable: StaticVariable) -> Result<Option<f32>> {
        self.graph.inner().get_static(variable).await
    }

    async fn get(
        &self,
        variable: Self::MixingVar,
        time: &TimerangeDtAndSettings,
    ) -> Result<DataAndUnit> {
        match variable {
            VariableOrDerived::Raw(raw) => self.graph.get_raw(raw, time).await,
            VariableOrDerived::Derived(derived) => self.graph.get_derived(derived, time).await,
        }
    }

    async fn prefetch(&self, variable: Self::MixingVar, time: &TimerangeDtAndSettings) -> Result<()> {
        match variable {
            VariableOrDerived::Raw(raw) => self.graph.inner().prefetch(raw, time).await,
            VariableOrDerived::Derived(derived) => self.graph.prefetch_derived(derived, time).await,
        }
    }
}

impl<G> GridBound for DerivedReader<G>
where
    G: DerivedVariableGraph,
    G::Inner: GridBound,
{
    fn dataset(&self) -> &'static str {
        self.graph.inner().dataset()
    }

    fn grid(&self) -> RegularGrid {
        self.graph.inner().grid()
    }

    fn position(&self) -> GridPosition {
        self.graph.inner().position()
    }
}
