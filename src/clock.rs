use gnss::prelude::SV;

use crate::{ephemeris::NavigationParameterSet, time::GpsTime};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Satellite Vehicle Clock state, evaluated from broadcast coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Clock {
    /// Satellite Vehicle
    pub sv: SV,
    /// Instant of this state snapshot
    pub t: GpsTime,
    /// Clock offset [s], group delay removed
    pub offset: f64,
    /// Clock drift [s/s]
    pub drift: f64,
}

impl Clock {
    /// Evaluates [Clock] state of `sv` at `t`, from `set`.
    pub fn new(sv: SV, set: &NavigationParameterSet, t: GpsTime) -> Self {
        Self {
            sv,
            t,
            offset: set.clock_bias(t),
            drift: set.clock_drift(t),
        }
    }
}

impl NavigationParameterSet {
    /// Seconds elapsed between ToC and `t`. ToC is counted from `clock_week`,
    /// whether weeks got aligned or not.
    fn t_c(&self, t: GpsTime) -> f64 {
        t.seconds_since(self.clock_week) - self.toc
    }

    /// Satellite clock bias [s] at `t`. No relativistic term is applied.
    pub fn clock_bias(&self, t: GpsTime) -> f64 {
        let dt = self.t_c(t);
        self.af0 + self.af1 * dt + self.af2 * dt.powi(2) - self.tgd
    }

    /// Satellite clock drift [s/s] at `t`.
    pub fn clock_drift(&self, t: GpsTime) -> f64 {
        self.af1 + 2.0 * self.af2 * self.t_c(t)
    }
}
