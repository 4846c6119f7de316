use hifitime::{Epoch, TimeScale, Unit};

use crate::constants::Constants;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// GPS time, as a rolling week counter and seconds elapsed within that week.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsTime {
    /// Week counter since GPST origin (1980-01-06)
    pub week: u32,
    /// Seconds of week
    pub seconds: f64,
}

impl GpsTime {
    pub fn new(week: u32, seconds: f64) -> Self {
        Self { week, seconds }
    }

    /// Builds [GpsTime] from any [Epoch], whatever its timescale.
    pub fn from_epoch(epoch: Epoch) -> Self {
        let (week, nanos) = epoch.to_time_scale(TimeScale::GPST).to_time_of_week();
        Self {
            week,
            seconds: nanos as f64 * 1.0E-9,
        }
    }

    /// Converts to [Epoch] expressed in [TimeScale::GPST].
    pub fn to_epoch(&self) -> Epoch {
        Epoch::from_time_of_week(self.week, 0, TimeScale::GPST) + self.seconds * Unit::Second
    }

    /// Seconds elapsed since the beginning of given `week`.
    /// Negative when self lies before that week.
    pub fn seconds_since(&self, week: u32) -> f64 {
        (self.week as f64 - week as f64) * Constants::SECONDS_PER_WEEK + self.seconds
    }

    /// Returns a copy shifted by `dt` seconds, with the week counter renormalized.
    pub fn shifted(&self, dt: f64) -> Self {
        let total = self.seconds + dt;
        let weeks = (total / Constants::SECONDS_PER_WEEK).floor();
        Self {
            week: (self.week as i64 + weeks as i64).max(0) as u32,
            seconds: total - weeks * Constants::SECONDS_PER_WEEK,
        }
    }
}

impl std::fmt::Display for GpsTime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{:.3}", self.week, self.seconds)
    }
}
