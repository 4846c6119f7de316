//! PVT solver
use log::{debug, error, info, warn};

use itertools::Itertools;
use nalgebra::Vector3;

use crate::{
    apriori::AprioriPosition,
    cfg::Config,
    constants::Constants,
    error::Error,
    navigation::{
        lsq::{refine, RangeMeasurement},
        solutions::{PVTSolution, DOP},
    },
    observation::Observation,
    store::EphemerisStore,
    time::GpsTime,
};

/// Rotates `position` about Z by the Earth rotation during `tau` [s] of signal flight.
pub(crate) fn earth_rotation(position: Vector3<f64>, tau: f64) -> Vector3<f64> {
    let (sin, cos) = (Constants::EARTH_ANGULAR_VEL_RAD * tau).sin_cos();
    Vector3::new(
        cos * position[0] + sin * position[1],
        -sin * position[0] + cos * position[1],
        position[2],
    )
}

/// PVT Solver
#[derive(Debug, Clone)]
pub struct Solver {
    /// Solver configuration
    cfg: Config,
    /// Apriori position
    apriori: AprioriPosition,
}

impl Solver {
    /// Builds new Position solver using given Configuration settings.
    /// Refinement starts from the Earth center, unless an
    /// [AprioriPosition] is latched with [Self::with_apriori].
    pub fn new(cfg: Config) -> Self {
        if !cfg.modeling.signal_propagation && cfg.modeling.earth_rotation {
            warn!("cannot compensate Earth rotation without compensating signal propagation");
        }
        Self {
            cfg,
            apriori: AprioriPosition::default(),
        }
    }

    /// Copies Self with given [AprioriPosition].
    pub fn with_apriori(&self, apriori: AprioriPosition) -> Self {
        let mut s = self.clone();
        s.apriori = apriori;
        s
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    /// Forms the corrected range measurement of one observation.
    fn measurement(
        &self,
        store: &mut EphemerisStore,
        t: GpsTime,
        row: usize,
        obs: &Observation,
    ) -> Result<RangeMeasurement, Error> {
        let modeling = &self.cfg.modeling;
        let sv = obs.sv;

        if !obs.pseudorange.is_finite() {
            return Err(Error::InvalidMeasurement(row));
        }

        store.select(sv, t, None)?;

        let tau = obs.pseudorange / Constants::SPEED_OF_LIGHT_M_S;

        let t_clk = if modeling.signal_propagation {
            t.shifted(-tau)
        } else {
            t
        };

        let dt_sv = if modeling.sv_clock_bias {
            store.clock(sv, t_clk)?.offset
        } else {
            0.0
        };

        let t_tx = if modeling.signal_propagation {
            t_clk.shifted(-dt_sv)
        } else {
            t
        };

        let mut position = store.position(sv, t_tx, &self.cfg.kepler)?;
        if modeling.earth_rotation && modeling.signal_propagation {
            position = earth_rotation(position, tau);
        }

        let pseudorange = obs.pseudorange + dt_sv * Constants::SPEED_OF_LIGHT_M_S;
        if !pseudorange.is_finite() || position.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidMeasurement(row));
        }

        debug!(
            "{} ({}) - t_tx={} dt={:e}s ecef={:?} pr={:.3}",
            t, sv, t_tx, dt_sv, position, pseudorange
        );

        Ok(RangeMeasurement {
            position,
            pseudorange,
            weight: obs.weight,
        })
    }

    /// Resolves the receiver position at `t` from a set of pseudo range
    /// [Observation]s, selecting the ephemerides to use in `store`.
    /// Repeated satellites are only used once. Satellites that cannot be
    /// selected or modeled are dropped from this epoch.
    pub fn resolve(
        &self,
        store: &mut EphemerisStore,
        t: GpsTime,
        observations: &[Observation],
    ) -> Result<PVTSolution, Error> {
        let unknowns = self.cfg.unknowns();

        let pool = observations
            .iter()
            .unique_by(|obs| obs.sv)
            .collect::<Vec<_>>();

        if pool.len() > Constants::MAX_OBSERVATIONS {
            warn!(
                "{} - {} satellites observed, only {} are used",
                t,
                pool.len(),
                Constants::MAX_OBSERVATIONS
            );
        }

        let mut sv = Vec::with_capacity(Constants::MAX_OBSERVATIONS);
        let mut measurements = Vec::with_capacity(Constants::MAX_OBSERVATIONS);

        for obs in pool.into_iter().take(Constants::MAX_OBSERVATIONS) {
            match self.measurement(store, t, measurements.len(), obs) {
                Ok(meas) => {
                    sv.push(obs.sv);
                    measurements.push(meas);
                },
                Err(e) => warn!("{} ({}) - dropped: {}", t, obs.sv, e),
            }
        }

        if measurements.len() < unknowns {
            error!(
                "{} - not enough satellites: {}/{}",
                t,
                measurements.len(),
                unknowns
            );
            return Err(Error::NotEnoughSatellites(measurements.len(), unknowns));
        }

        if measurements.iter().any(|meas| meas.weight.is_some())
            && measurements.iter().any(|meas| meas.weight.is_none())
        {
            warn!("{} - incomplete weighting: unit weight applied", t);
        }

        let seed = self.apriori.seed(unknowns);
        let refinement = refine(&seed, &measurements, &self.cfg.refinement)?;

        let solution = &refinement.solution;
        let position = Vector3::new(solution[0], solution[1], solution[2]);
        let clock_bias = if unknowns == 4 {
            Some(solution[3] / Constants::SPEED_OF_LIGHT_M_S)
        } else {
            None
        };

        let mut pvt = PVTSolution {
            t,
            position,
            clock_bias,
            covariance: refinement.covariance,
            sv,
            iterations: refinement.iterations,
            dop: None,
        };

        let geo = pvt.geodetic();
        pvt.dop = match DOP::new(&refinement.design, geo[0], geo[1]) {
            Ok(dop) => Some(dop),
            Err(e) => {
                debug!("{} - no dop: {}", t, e);
                None
            },
        };

        info!(
            "{} - solved with {} satellites: x={:.3} y={:.3} z={:.3} (m)",
            t,
            pvt.sv.len(),
            position[0],
            position[1],
            position[2]
        );
        Ok(pvt)
    }
}
