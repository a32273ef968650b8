//! Common types shared by the readers, formulas and storage crates.

pub mod elevation;
pub mod time;
pub mod unit;

pub use elevation::ElevationOrSea;
pub use time::{TimeError, TimerangeDt, TimerangeDtAndSettings};
pub use unit::{DataAndUnit, SiUnit};
