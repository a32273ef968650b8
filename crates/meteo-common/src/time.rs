//! Equally spaced time ranges.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors raised while building a time range.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("time step must be positive, got {0} seconds")]
    InvalidStep(i64),

    #[error("range end {end} is before start {start}")]
    EndBeforeStart { start: String, end: String },

    #[error("range {start}..{end} is not a multiple of {dt_seconds} seconds")]
    NotAligned {
        start: String,
        end: String,
        dt_seconds: i64,
    },
}

/// A half-open range `[start, end)` of timestamps spaced `dt_seconds` apart.
///
/// Never mutated after construction; derived ranges are new values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UncheckedTimerange")]
pub struct TimerangeDt {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub dt_seconds: i64,
}

/// Wire form, checked through [`TimerangeDt::new`] on deserialisation.
#[derive(Deserialize)]
struct UncheckedTimerange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    dt_seconds: i64,
}

impl TryFrom<UncheckedTimerange> for TimerangeDt {
    type Error = TimeError;

    fn try_from(raw: UncheckedTimerange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end, raw.dt_seconds)
    }
}

impl TimerangeDt {
    /// Create a checked time range.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, dt_seconds: i64) -> Result<Self, TimeError> {
        if dt_seconds <= 0 {
            return Err(TimeError::InvalidStep(dt_seconds));
        }
        if end < start {
            return Err(TimeError::EndBeforeStart {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        if (end - start).num_seconds() % dt_seconds != 0 {
            return Err(TimeError::NotAligned {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
                dt_seconds,
            });
        }
        Ok(Self {
            start,
            end,
            dt_seconds,
        })
    }

    /// Create a range of `count` steps beginning at `start`.
    pub fn with_count(start: DateTime<Utc>, count: usize, dt_seconds: i64) -> Result<Self, TimeError> {
        if dt_seconds <= 0 {
            return Err(TimeError::InvalidStep(dt_seconds));
        }
        let end = start + Duration::seconds(dt_seconds * count as i64);
        Self::new(start, end, dt_seconds)
    }

    /// Number of timestamps in the range. Zero for a range that bypassed
    /// [`new`](Self::new) with a non-positive step.
    pub fn count(&self) -> usize {
        (self.end - self.start)
            .num_seconds()
            .checked_div(self.dt_seconds)
            .map_or(0, |steps| steps.max(0) as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Iterate over all timestamps.
    pub fn iter(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        (0..self.count()).map(move |i| self.start + Duration::seconds(self.dt_seconds * i as i64))
    }

    /// Unix timestamps in seconds.
    pub fn unix_timestamps(&self) -> Vec<i64> {
        let start = self.start.timestamp();
        (0..self.count() as i64)
            .map(|i| start + i * self.dt_seconds)
            .collect()
    }

    /// Same start and end with a different step. The end is extended to the
    /// next multiple of the new step.
    pub fn with_dt(&self, dt_seconds: i64) -> Self {
        let span = (self.end - self.start).num_seconds();
        let steps = (span + dt_seconds - 1) / dt_seconds;
        Self {
            start: self.start,
            end: self.start + Duration::seconds(steps * dt_seconds),
            dt_seconds,
        }
    }

    /// Smallest range on a `dt_seconds` raster (aligned to the unix epoch)
    /// that contains all timestamps of this range.
    pub fn covering(&self, dt_seconds: i64) -> Self {
        let start = self.start.timestamp().div_euclid(dt_seconds) * dt_seconds;
        let last = self.start.timestamp() + (self.count().max(1) as i64 - 1) * self.dt_seconds;
        let end = (last.div_euclid(dt_seconds) + 1) * dt_seconds;
        Self {
            start: from_unix(start),
            end: from_unix(end),
            dt_seconds,
        }
    }
}

/// Convert unix seconds to a UTC timestamp. Out-of-range input maps to the epoch.
pub fn from_unix(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_default()
}

/// A time range plus per-request rendering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerangeDtAndSettings {
    pub time: TimerangeDt,
    /// Panel tilt in degrees for tilted irradiance.
    pub tilt: f32,
    /// Panel azimuth in degrees (0 = south) for tilted irradiance.
    pub azimuth: f32,
}

impl TimerangeDtAndSettings {
    pub fn new(time: TimerangeDt) -> Self {
        Self {
            time,
            tilt: 0.0,
            azimuth: 0.0,
        }
    }

    pub fn with_panel(mut self, tilt: f32, azimuth: f32) -> Self {
        self.tilt = tilt;
        self.azimuth = azimuth;
        self
    }

    /// Same settings over a different range.
    pub fn with_time(&self, time: TimerangeDt) -> Self {
        Self {
            time,
            tilt: self.tilt,
            azimuth: self.azimuth,
        }
    }

    pub fn count(&self) -> usize {
        self.time.count()
    }

    pub fn dt_seconds(&self) -> i64 {
        self.time.dt_seconds
    }
}

impl PartialEq for TimerangeDtAndSettings {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
            && self.tilt.to_bits() == other.tilt.to_bits()
            && self.azimuth.to_bits() == other.azimuth.to_bits()
    }
}

impl Eq for TimerangeDtAndSettings {}

impl Hash for TimerangeDtAndSettings {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.time.hash(state);
        self.tilt.to_bits().hash(state);
        self.azimuth.to_bits().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_count_and_iter() {
        let range = TimerangeDt::new(t(0), t(6), 3600).unwrap();
        assert_eq!(range.count(), 6);
        let times: Vec<_> = range.iter().collect();
        assert_eq!(times[0], t(0));
        assert_eq!(times[5], t(5));
    }

    #[test]
    fn test_rejects_misaligned() {
        assert!(matches!(
            TimerangeDt::new(t(0), t(5), 2 * 3600),
            Err(TimeError::NotAligned { .. })
        ));
        assert!(matches!(
            TimerangeDt::new(t(5), t(0), 3600),
            Err(TimeError::EndBeforeStart { .. })
        ));
        assert!(matches!(
            TimerangeDt::new(t(0), t(5), 0),
            Err(TimeError::InvalidStep(0))
        ));
    }

    #[test]
    fn test_deserialize_is_checked() {
        let range = TimerangeDt::new(t(0), t(2), 3600).unwrap();
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(serde_json::from_str::<TimerangeDt>(&json).unwrap(), range);

        let zero_step = json.replace("3600", "0");
        assert!(serde_json::from_str::<TimerangeDt>(&zero_step).is_err());
    }

    #[test]
    fn test_count_of_unchecked_range() {
        let range = TimerangeDt {
            start: t(0),
            end: t(2),
            dt_seconds: 0,
        };
        assert_eq!(range.count(), 0);
        let backwards = TimerangeDt {
            start: t(2),
            end: t(0),
            dt_seconds: 3600,
        };
        assert!(backwards.is_empty());
    }

    #[test]
    fn test_covering_native_raster() {
        let range = TimerangeDt::new(t(1), t(5), 3600).unwrap();
        let native = range.covering(3 * 3600);
        assert_eq!(native.start, t(0));
        assert_eq!(native.end, t(6));
        assert_eq!(native.count(), 2);
    }

    #[test]
    fn test_with_dt_extends_end() {
        let range = TimerangeDt::new(t(0), t(2), 3600).unwrap();
        let coarse = range.with_dt(3 * 3600);
        assert_eq!(coarse.end, t(3));
    }

    #[test]
    fn test_settings_equality_uses_bits() {
        let range = TimerangeDt::new(t(0), t(2), 3600).unwrap();
        let a = TimerangeDtAndSettings::new(range.clone()).with_panel(30.0, 0.0);
        let b = TimerangeDtAndSettings::new(range).with_panel(30.0, 0.0);
        assert_eq!(a, b);
    }
}
