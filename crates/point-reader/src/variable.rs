//! Variable identifiers.
//!
//! Every dataset has a closed enumeration of raw variables (read from
//! storage) and one of derived variables (computed from others). A request
//! names either kind through [`VariableOrDerived`].

use meteo_common::SiUnit;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

use crate::error::ReaderError;

/// A named quantity.
pub trait GenericVariable: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Stable snake_case name, also the storage and weight key.
    fn name(&self) -> &'static str;
}

/// A variable that can be blended across datasets.
pub trait GenericVariableMixable: GenericVariable {
    /// Cumulative quantities (snow depth, soil moisture) depend on the model
    /// run history and are mixed on their differences, not their values.
    fn requires_offset_correction_for_mixing(&self) -> bool {
        false
    }
}

/// How a raw variable is interpolated to a time step finer than the
/// dataset's native one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReaderInterpolation {
    Linear,
    /// Linear along the shortest arc, for directions in degrees
    LinearDegrees,
    /// Cubic hermite, optionally clamped
    Hermite { bounds: Option<(f32, f32)> },
    /// Sums over the preceding step, split evenly
    BackwardsSum,
    /// Fluxes averaged over the preceding step, redistributed along the
    /// sun's course
    SolarBackwardsAveraged,
}

/// A variable stored in a dataset.
pub trait RawVariable: GenericVariableMixable {
    fn unit(&self) -> SiUnit;

    fn interpolation(&self) -> ReaderInterpolation;

    /// Whether the value is adjusted for the difference between grid cell and
    /// target elevation.
    fn is_elevation_correctable(&self) -> bool {
        false
    }

    /// Whether the dataset named `dataset` publishes this variable. Reads of
    /// unpublished variables return NaN without touching the store.
    fn is_available_in(&self, _dataset: &str) -> bool {
        true
    }
}

/// Either a raw or a derived variable of one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableOrDerived<R, D> {
    Raw(R),
    Derived(D),
}

impl<R: GenericVariable, D: GenericVariable> GenericVariable for VariableOrDerived<R, D> {
    fn name(&self) -> &'static str {
        match self {
            Self::Raw(raw) => raw.name(),
            Self::Derived(derived) => derived.name(),
        }
    }
}

impl<R: GenericVariableMixable, D: GenericVariableMixable> GenericVariableMixable
    for VariableOrDerived<R, D>
{
    fn requires_offset_correction_for_mixing(&self) -> bool {
        match self {
            Self::Raw(raw) => raw.requires_offset_correction_for_mixing(),
            Self::Derived(derived) => derived.requires_offset_correction_for_mixing(),
        }
    }
}

/// Raw names win when a name exists in both enumerations.
impl<R, D> FromStr for VariableOrDerived<R, D>
where
    R: FromStr,
    D: FromStr,
{
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(raw) = s.parse::<R>() {
            return Ok(Self::Raw(raw));
        }
        s.parse::<D>()
            .map(Self::Derived)
            .map_err(|_| ReaderError::UnknownVariable(s.to_string()))
    }
}

impl<R: GenericVariable, D: GenericVariable> Display for VariableOrDerived<R, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Define a variable enumeration with its snake_case names.
///
/// Generates `ALL`, [`GenericVariable`], `FromStr` and `Display`.
#[macro_export]
macro_rules! variable_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl $crate::variable::GenericVariable for $name {
            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::ReaderError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    _ => Err($crate::error::ReaderError::UnknownVariable(s.to_string())),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", $crate::variable::GenericVariable::name(self))
            }
        }
    };
}
