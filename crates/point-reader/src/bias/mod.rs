//! Bias correction of climate model output toward a reference climatology.
//!
//! The model and the reference each provide a seasonal weight curve per grid
//! cell. A sample is shifted by the difference (or scaled by the ratio) of
//! the two curves at its time of year, then clamped into physical bounds.

mod corrector;
mod seasonal;

pub use corrector::{BiasCorrector, ReferencePoint};
pub use seasonal::BiasCorrectionSeasonalLinear;

use crate::variable::{GenericVariable, VariableOrDerived};

/// How a variable is corrected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeType {
    /// Scale by reference / control, capped at `maximum`.
    RelativeChange { maximum: Option<f32> },
    /// Add reference - control, then clamp into `bounds`.
    AbsoluteChange { bounds: Option<(f32, f32)> },
}

impl ChangeType {
    pub fn bounds(&self) -> Option<(f32, f32)> {
        match self {
            Self::RelativeChange { .. } => None,
            Self::AbsoluteChange { bounds } => *bounds,
        }
    }
}

/// A variable with a bias correction policy.
pub trait BiasCorrectable: GenericVariable {
    fn bias_correction_type(&self) -> ChangeType;

    /// Temperatures are moved from the reference cell elevation to the
    /// target elevation after correction.
    fn applies_lapse_rate(&self) -> bool {
        false
    }
}

impl<R: BiasCorrectable, D: BiasCorrectable> BiasCorrectable for VariableOrDerived<R, D> {
    fn bias_correction_type(&self) -> ChangeType {
        match self {
            Self::Raw(raw) => raw.bias_correction_type(),
            Self::Derived(derived) => derived.bias_correction_type(),
        }
    }

    fn applies_lapse_rate(&self) -> bool {
        match self {
            Self::Raw(raw) => raw.applies_lapse_rate(),
            Self::Derived(derived) => derived.applies_lapse_rate(),
        }
    }
}
