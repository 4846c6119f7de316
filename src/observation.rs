use gnss::prelude::SV;

#[cfg(feature = "serde")]
use serde::Deserialize;

/// Code pseudo range observation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Observation {
    /// SV (signal emitter)
    pub sv: SV,
    /// Pseudo range [m]
    pub pseudorange: f64,
    /// Optional weight in the position fix, uniform when omitted
    pub weight: Option<f64>,
}

impl Observation {
    /// Builds new [Observation] of the pseudo range to `sv`.
    pub fn new(sv: SV, pseudorange: f64) -> Self {
        Self {
            sv,
            pseudorange,
            weight: None,
        }
    }
    /// Copies Self with given weight.
    pub fn with_weight(&self, weight: f64) -> Self {
        let mut s = *self;
        s.weight = Some(weight);
        s
    }
}
