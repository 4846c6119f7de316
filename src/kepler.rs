use log::debug;
use nalgebra::Vector3;

use crate::{
    cfg::IterationOpts, constants::Constants, ephemeris::NavigationParameterSet, time::GpsTime,
};

/// Solves Kepler's equation `E = M + e.sin(E)` by fixed point iteration,
/// seeded at `E = M`. Returns the eccentric anomaly [rad].
pub(crate) fn eccentric_anomaly(m_k: f64, e: f64, opts: &IterationOpts) -> f64 {
    let mut e_k = m_k;
    for _ in 0..opts.max_iterations {
        let next = m_k + e * e_k.sin();
        let correction = (next - e_k).abs();
        e_k = next;
        if opts.converged(correction) {
            break;
        }
    }
    e_k
}

impl NavigationParameterSet {
    /// Seconds elapsed between ToE and `t`.
    fn t_k(&self, t: GpsTime) -> f64 {
        t.seconds_since(self.reference_week) - self.toe
    }

    /// Satellite ECEF position [m] at `t`, with the default Kepler solver.
    pub fn position(&self, t: GpsTime) -> Vector3<f64> {
        self.position_with(t, &IterationOpts::kepler())
    }

    /// Satellite ECEF position [m] at `t`, with custom Kepler solver bounds.
    pub fn position_with(&self, t: GpsTime, opts: &IterationOpts) -> Vector3<f64> {
        let kepler = &self.kepler;
        let perturbations = &self.perturbations;

        let t_k = self.t_k(t);
        let a = kepler.a();

        let n0 = (Constants::EARTH_GRAVITATION / a.powi(3)).sqrt();
        let n = n0 + perturbations.dn;
        let m_k = kepler.m_0 + n * t_k;
        let e_k = eccentric_anomaly(m_k, kepler.e, opts);

        let (sin_e_k, cos_e_k) = e_k.sin_cos();
        let v_k = ((1.0 - kepler.e.powi(2)).sqrt() * sin_e_k).atan2(cos_e_k - kepler.e);

        let phi_k = v_k + kepler.omega;
        let (x2_sin_phi_k, x2_cos_phi_k) = (2.0 * phi_k).sin_cos();

        let du_k = perturbations.cuc * x2_cos_phi_k + perturbations.cus * x2_sin_phi_k;
        let dr_k = perturbations.crc * x2_cos_phi_k + perturbations.crs * x2_sin_phi_k;
        let di_k = perturbations.cic * x2_cos_phi_k + perturbations.cis * x2_sin_phi_k;

        let u_k = phi_k + du_k;
        let r_k = a * (1.0 - kepler.e * cos_e_k) + dr_k;
        let i_k = kepler.i_0 + di_k + perturbations.i_dot * t_k;

        let (xp_k, yp_k) = (r_k * u_k.cos(), r_k * u_k.sin());

        let omega_k = kepler.omega_0
            + (perturbations.omega_dot - Constants::EARTH_ANGULAR_VEL_RAD) * t_k
            - Constants::EARTH_ANGULAR_VEL_RAD * self.toe;

        let (sin_omega_k, cos_omega_k) = omega_k.sin_cos();
        let (sin_i_k, cos_i_k) = i_k.sin_cos();

        let position = Vector3::new(
            xp_k * cos_omega_k - yp_k * cos_i_k * sin_omega_k,
            xp_k * sin_omega_k + yp_k * cos_i_k * cos_omega_k,
            yp_k * sin_i_k,
        );

        debug!("{} - t_k={:.3}s e_k={:.9} ecef={:?}", t, t_k, e_k, position);
        position
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::eccentric_anomaly;
    use crate::{
        cfg::IterationOpts,
        ephemeris::{Keplerian, NavigationParameterSet, Perturbations},
        time::GpsTime,
    };
    use nalgebra::Vector3;
    use rstest::rstest;

    /// Broadcast set of a GPS satellite, week 2190
    pub(crate) fn reference_set() -> NavigationParameterSet {
        NavigationParameterSet {
            reference_week: 2190,
            clock_week: 2190,
            toc: 518400.0,
            toe: 518400.0,
            tot: 511200.0,
            af0: -1.0E-4,
            af1: 2.0E-12,
            af2: 0.0,
            tgd: -1.1E-8,
            iode: 17,
            iodc: 17,
            kepler: Keplerian {
                sqrt_a: 26561110.712759566_f64.sqrt(),
                e: 0.00534839148168,
                i_0: 0.957537602313,
                omega_0: 1.03791041521,
                m_0: 2.30316624652,
                omega: -2.3834050415,
            },
            perturbations: Perturbations {
                dn: 4.3E-9,
                i_dot: 5.11807041192e-10,
                omega_dot: -8.0467641439e-09,
                cus: 6.09830021858e-06,
                cuc: 9.85339283943e-07,
                cis: -1.54599547386e-07,
                cic: -1.04308128357e-07,
                crs: 17.3125,
                crc: 258.34375,
            },
            ..Default::default()
        }
    }

    #[rstest]
    #[case(
        GpsTime::new(2190, 518400.0),
        (16686125.479370788, 20728611.899364777, -1575153.6112306714)
    )]
    #[case(
        GpsTime::new(2190, 518418.0),
        (16684372.429430947, 20734604.418521367, -1518491.7132261298)
    )]
    #[case(
        GpsTime::new(2191, 100.0),
        (16646494.333059084, 20820699.84259459, -498373.4611927597)
    )]
    fn keplerian_orbit(#[case] t: GpsTime, #[case] ecef: (f64, f64, f64)) {
        let set = reference_set();
        let position = set.position(t);

        let err = (
            (ecef.0 - position[0]).abs(),
            (ecef.1 - position[1]).abs(),
            (ecef.2 - position[2]).abs(),
        );

        assert!(err.0 < 1.0E-3, "x(ecef) error too large {}", err.0);
        assert!(err.1 < 1.0E-3, "y(ecef) error too large {}", err.1);
        assert!(err.2 < 1.0E-3, "z(ecef) error too large {}", err.2);

        let radius = position.norm();
        assert!(radius > 26.0E6 && radius < 27.0E6, "bad orbit radius {}", radius);
    }

    #[test]
    fn deterministic_position() {
        let set = reference_set();
        let t = GpsTime::new(2190, 520000.0);
        let (p1, p2) = (set.position(t), set.position(t));
        assert_eq!(p1, p2);
        assert_eq!(p1[0].to_bits(), p2[0].to_bits());
        assert_eq!(p1[1].to_bits(), p2[1].to_bits());
        assert_eq!(p1[2].to_bits(), p2[2].to_bits());
    }

    #[test]
    fn kepler_solver() {
        let (m_k, e) = (1.2_f64, 0.01_f64);

        // 10 fixed iterations reach the fixed point for GPS-like eccentricities
        let e_k = eccentric_anomaly(m_k, e, &IterationOpts::kepler());
        assert!((e_k - m_k - e * e_k.sin()).abs() < 1.0E-12);

        // no iteration at all: seed is returned
        let opts = IterationOpts {
            max_iterations: 0,
            tolerance: None,
        };
        assert_eq!(eccentric_anomaly(m_k, e, &opts), m_k);

        // early exit stops before the budget is consumed
        let opts = IterationOpts {
            max_iterations: 50,
            tolerance: Some(1.0E-3),
        };
        let early = eccentric_anomaly(m_k, e, &opts);
        assert!((early - e_k).abs() < 1.0E-3);
        assert_ne!(early, e_k);
    }

    #[test]
    fn custom_iterations() {
        let set = reference_set();
        let t = GpsTime::new(2190, 518418.0);
        let default = set.position(t);
        let long = set.position_with(
            t,
            &IterationOpts {
                max_iterations: 30,
                tolerance: None,
            },
        );
        let err: Vector3<f64> = default - long;
        assert!(err.norm() < 1.0E-6);
    }
}
