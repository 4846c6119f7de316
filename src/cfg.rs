#[cfg(feature = "serde")]
use serde::Deserialize;

const fn default_kepler_iterations() -> usize {
    10
}

const fn default_refinement_iterations() -> usize {
    8
}

fn default_true() -> bool {
    true
}

fn default_kepler() -> IterationOpts {
    IterationOpts::kepler()
}

fn default_refinement() -> IterationOpts {
    IterationOpts::refinement()
}

/// Iterative process bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct IterationOpts {
    /// Iteration budget. Without tolerance, exactly this many iterations run.
    pub max_iterations: usize,
    /// Optional early exit threshold, on the iteration correction.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tolerance: Option<f64>,
}

impl IterationOpts {
    /// Kepler equation solving: 10 fixed-point iterations, no convergence check.
    pub const fn kepler() -> Self {
        Self {
            max_iterations: default_kepler_iterations(),
            tolerance: None,
        }
    }
    /// Position refinement: 8 iterations, no convergence check.
    pub const fn refinement() -> Self {
        Self {
            max_iterations: default_refinement_iterations(),
            tolerance: None,
        }
    }
    /// Copies Self with given early exit threshold.
    pub fn with_tolerance(&self, tolerance: f64) -> Self {
        let mut s = *self;
        s.tolerance = Some(tolerance);
        s
    }
    /// Returns true once `correction` allows to stop iterating.
    pub(crate) fn converged(&self, correction: f64) -> bool {
        self.tolerance
            .map(|tolerance| correction < tolerance)
            .unwrap_or(false)
    }
}

/// Physical effects compensated when forming the position fix.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Modeling {
    /// Correct pseudo ranges for satellite clock bias
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub sv_clock_bias: bool,
    /// Evaluate satellite position at signal transmission time
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub signal_propagation: bool,
    /// Compensate Earth rotation during signal propagation
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub earth_rotation: bool,
}

impl Default for Modeling {
    fn default() -> Self {
        Self {
            sv_clock_bias: default_true(),
            signal_propagation: default_true(),
            earth_rotation: default_true(),
        }
    }
}

/// [Solver](crate::prelude::Solver) configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Config {
    /// Kepler equation solver bounds
    #[cfg_attr(feature = "serde", serde(default = "default_kepler"))]
    pub kepler: IterationOpts,
    /// Position refinement loop bounds
    #[cfg_attr(feature = "serde", serde(default = "default_refinement"))]
    pub refinement: IterationOpts,
    /// Resolve the receiver clock bias (4 unknowns), or position only (3 unknowns)
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub clock_unknown: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modeling: Modeling,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kepler: default_kepler(),
            refinement: default_refinement(),
            clock_unknown: default_true(),
            modeling: Modeling::default(),
        }
    }
}

impl Config {
    /// Number of unknowns this setup resolves
    pub(crate) fn unknowns(&self) -> usize {
        if self.clock_unknown {
            4
        } else {
            3
        }
    }
}
