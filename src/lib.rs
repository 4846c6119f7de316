#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod apriori;
mod cfg;
mod clock;
mod constants;
mod ephemeris;
mod error;
mod kepler;
mod navigation;
mod observation;
mod rinex;
mod solver;
mod store;
mod time;

// pub export
pub use error::Error;


// prelude
pub mod prelude {
    pub use crate::apriori::AprioriPosition;
    pub use crate::cfg::{Config, IterationOpts, Modeling};
    pub use crate::clock::Clock;
    pub use crate::constants::Constants;
    pub use crate::ephemeris::{Field, Keplerian, NavigationParameterSet, Perturbations};
    pub use crate::error::Error;
    pub use crate::navigation::{
        lsq::{refine, solve, Iteration, LeastSquares, RangeMeasurement, Refinement},
        matrix::invert,
        solutions::{PVTSolution, DOP},
    };
    pub use crate::observation::Observation;
    pub use crate::rinex::{NavigationHeader, NavigationReader};
    pub use crate::solver::Solver;
    pub use crate::store::{EphemerisStore, Ingestion, Ionosphere, StoreSummary};
    pub use crate::time::GpsTime;
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Epoch, TimeScale};
    pub use nalgebra::{DMatrix, DVector, Vector3};
}
