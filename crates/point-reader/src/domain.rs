//! Dataset descriptions.

use grid_processor::RegularGrid;
use std::fmt::Debug;

/// A gridded dataset: immutable configuration looked up by identifier.
pub trait GenericDomain: Copy + Debug + Send + Sync + 'static {
    /// Dataset identifier, used as storage key.
    fn name(&self) -> &'static str;

    fn grid(&self) -> RegularGrid;

    /// Native time step.
    fn dt_seconds(&self) -> i64;

    /// How often new data arrives, 0 for archives.
    fn update_interval_seconds(&self) -> i64;
}

/// Implement `FromStr` and `Display` for a domain enum from its names.
#[macro_export]
macro_rules! domain_names {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
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
                    _ => Err($crate::error::ReaderError::UnknownVariable(format!("domain {}", s))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}
