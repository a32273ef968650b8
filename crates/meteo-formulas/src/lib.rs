//! Pure formulas used to derive variables from raw model output.
//!
//! - [`meteorology`]: humidity, vapour pressure, evapotranspiration, wind and
//!   daily aggregates
//! - [`solar`]: sun position, extraterrestrial radiation and irradiance
//!   decomposition
//! - [`weather_code`]: WMO weather codes
//! - [`soil`]: soil classes and the soil moisture index
//!
//! All functions propagate NaN.

pub mod meteorology;
pub mod soil;
pub mod solar;
pub mod weather_code;

pub use meteorology::*;
pub use soil::{soil_moisture_index_series, SoilType};
pub use weather_code::{WeatherCode, WeatherCodeInput};
