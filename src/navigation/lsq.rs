use log::{debug, error};
use nalgebra::{DMatrix, DVector, Vector3};

use crate::{
    cfg::IterationOpts,
    constants::Constants,
    error::Error,
    navigation::matrix::{invert, normal_equations},
};

#[cfg(feature = "serde")]
use serde::Serialize;

/// One weighted least squares step.
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquares {
    /// Correction to apply to the unknowns
    pub dx: DVector<f64>,
    /// Covariance of the unknowns: (Gt.W.G)^-1
    pub covariance: DMatrix<f64>,
}

/// Solves the weighted least squares problem `G.dx = dr` for `n` rows
/// and `m` unknowns, `m` up to [Constants::MAX_UNKNOWNS].
/// Uniform weighting applies when `w` is None.
pub fn solve(
    g: &DMatrix<f64>,
    dr: &DVector<f64>,
    w: Option<&DVector<f64>>,
) -> Result<LeastSquares, Error> {
    let (n, m) = g.shape();
    if n > Constants::MAX_OBSERVATIONS {
        return Err(Error::TooManyObservations(n));
    }
    if m > Constants::MAX_UNKNOWNS {
        return Err(Error::TooManyUnknowns(m));
    }
    if m == 0 {
        return Err(Error::InvalidUnknowns(m));
    }
    if dr.len() != n || w.is_some_and(|w| w.len() != n) {
        return Err(Error::InvalidDimensions);
    }
    if n < m {
        return Err(Error::NotEnoughSatellites(n, m));
    }
    if let Some(i) = (0..n).find(|&i| {
        !dr[i].is_finite()
            || g.row(i).iter().any(|x| !x.is_finite())
            || w.is_some_and(|w| !w[i].is_finite())
    }) {
        error!("row #{}: non finite measurement", i);
        return Err(Error::InvalidMeasurement(i));
    }

    let (mut covariance, g_w_dr) = normal_equations(g, dr, w);
    invert(&mut covariance)?;

    let dx = &covariance * g_w_dr;
    Ok(LeastSquares { dx, covariance })
}

/// Satellite contribution to the position refinement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeMeasurement {
    /// Satellite ECEF position [m]
    pub position: Vector3<f64>,
    /// Corrected pseudo range [m]
    pub pseudorange: f64,
    /// Optional weight, 1.0 when omitted
    pub weight: Option<f64>,
}

impl RangeMeasurement {
    pub fn new(position: Vector3<f64>, pseudorange: f64) -> Self {
        Self {
            position,
            pseudorange,
            weight: None,
        }
    }
    pub fn with_weight(&self, weight: f64) -> Self {
        let mut s = *self;
        s.weight = Some(weight);
        s
    }
}

/// State after one refinement iteration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Iteration {
    /// Unknowns, once corrected
    pub estimate: Vec<f64>,
    /// Residual norm |dr| [m], prior to correction
    pub residual: f64,
    /// Correction norm |dx| [m]
    pub correction: f64,
}

/// Outcome of [refine].
#[derive(Debug, Clone, PartialEq)]
pub struct Refinement {
    /// Final unknowns
    pub solution: DVector<f64>,
    /// Covariance of the final step
    pub covariance: DMatrix<f64>,
    /// Line of sight matrix of the final step
    pub design: DMatrix<f64>,
    /// Per iteration history
    pub iterations: Vec<Iteration>,
}

/// Iterates [solve] from `seed`, linearizing the range equations around the
/// current estimate. `seed` is either receiver XYZ [m], or XYZ + receiver clock [m].
/// Runs `opts.max_iterations` iterations (at least one), or stops as soon as
/// the correction norm falls below `opts.tolerance`.
pub fn refine(
    seed: &DVector<f64>,
    measurements: &[RangeMeasurement],
    opts: &IterationOpts,
) -> Result<Refinement, Error> {
    let (n, m) = (measurements.len(), seed.len());
    if m > Constants::MAX_UNKNOWNS {
        return Err(Error::TooManyUnknowns(m));
    }
    if m < 3 {
        return Err(Error::InvalidUnknowns(m));
    }

    let weights = if measurements.iter().any(|meas| meas.weight.is_some()) {
        Some(DVector::from_iterator(
            n,
            measurements.iter().map(|meas| meas.weight.unwrap_or(1.0)),
        ))
    } else {
        None
    };

    let mut solution = seed.clone();
    let mut covariance = DMatrix::<f64>::zeros(m, m);
    let mut g = DMatrix::<f64>::zeros(n, m);
    let mut iterations = Vec::with_capacity(opts.max_iterations);

    for iter in 0..opts.max_iterations.max(1) {
        let position = Vector3::new(solution[0], solution[1], solution[2]);
        let clock = if m == 4 { solution[3] } else { 0.0 };

        let mut dr = DVector::<f64>::zeros(n);
        for (i, meas) in measurements.iter().enumerate() {
            let los = position - meas.position;
            let rho = los.norm();
            if rho == 0.0 {
                error!("row #{}: estimate coincides with emitter", i);
                return Err(Error::SingularMatrix);
            }
            for j in 0..3 {
                g[(i, j)] = los[j] / rho;
            }
            if m == 4 {
                g[(i, 3)] = 1.0;
            }
            dr[i] = meas.pseudorange - rho - clock;
        }

        let residual = dr.norm();
        let lsq = solve(&g, &dr, weights.as_ref())?;

        solution += &lsq.dx;
        covariance = lsq.covariance;

        let correction = lsq.dx.norm();
        debug!(
            "iteration #{} - residual={:.6} correction={:.6} x={:.3} y={:.3} z={:.3}",
            iter + 1,
            residual,
            correction,
            solution[0],
            solution[1],
            solution[2]
        );

        iterations.push(Iteration {
            estimate: solution.iter().copied().collect(),
            residual,
            correction,
        });

        if opts.converged(correction) {
            break;
        }
    }

    Ok(Refinement {
        solution,
        covariance,
        design: g,
        iterations,
    })
}

#[cfg(test)]
pub(crate) mod test {
    use super::{refine, solve, RangeMeasurement};
    use crate::{cfg::IterationOpts, error::Error};
    use nalgebra::{DMatrix, DVector, Vector3};

    /// Five satellites observed from a static site
    pub(crate) fn fixture() -> Vec<RangeMeasurement> {
        [
            (
                (-13897607.6294, -10930188.6233, 19676689.6804),
                23634878.5219,
            ),
            ((-17800899.1998, 15689920.8120, 11943543.3888), 20292688.3557),
            ((-1510958.2282, 26280096.7818, -3117646.1949), 24032055.0372),
            (
                (-12210758.3517, 20413597.0201, -11649499.5474),
                24383229.3740,
            ),
            ((-170032.6981, 17261822.6784, 20555984.4061), 22170992.8187),
        ]
        .iter()
        .map(|((x, y, z), pr)| RangeMeasurement::new(Vector3::new(*x, *y, *z), *pr))
        .collect()
    }

    #[test]
    fn fixture_convergence() {
        let seed = DVector::<f64>::zeros(3);
        let refinement = refine(&seed, &fixture(), &IterationOpts::refinement()).unwrap();

        assert_eq!(refinement.iterations.len(), 8);

        let expected = (-3947762.486700, 3364401.302068, 3699431.991886);
        let solution = &refinement.solution;
        assert!((solution[0] - expected.0).abs() < 1.0E-3);
        assert!((solution[1] - expected.1).abs() < 1.0E-3);
        assert!((solution[2] - expected.2).abs() < 1.0E-3);

        // strictly decreasing until noise floor
        let residuals = refinement
            .iterations
            .iter()
            .map(|iter| iter.residual)
            .collect::<Vec<_>>();
        for k in 1..5 {
            assert!(
                residuals[k] < residuals[k - 1],
                "residual increased at iteration #{}: {:?}",
                k + 1,
                residuals
            );
        }
        assert!(residuals[7] < 1.0E-2);

        // stable once converged
        let last = &refinement.iterations[7].estimate;
        let before = &refinement.iterations[6].estimate;
        for j in 0..3 {
            assert!((last[j] - before[j]).abs() < 1.0E-6);
        }

        assert_eq!(refinement.covariance.shape(), (3, 3));
        assert_eq!(refinement.design.shape(), (5, 3));
    }

    #[test]
    fn fixture_with_clock() {
        let seed = DVector::<f64>::zeros(4);
        let refinement = refine(&seed, &fixture(), &IterationOpts::refinement()).unwrap();

        let expected = (-3947762.486820, 3364401.302172, 3699431.991956);
        let solution = &refinement.solution;
        assert!((solution[0] - expected.0).abs() < 1.0E-3);
        assert!((solution[1] - expected.1).abs() < 1.0E-3);
        assert!((solution[2] - expected.2).abs() < 1.0E-3);
        assert!(solution[3].abs() < 1.0E-2);
        assert_eq!(refinement.covariance.shape(), (4, 4));
    }

    #[test]
    fn early_exit() {
        let seed = DVector::<f64>::zeros(3);
        let opts = IterationOpts::refinement().with_tolerance(1.0E-3);
        let refinement = refine(&seed, &fixture(), &opts).unwrap();
        assert_eq!(refinement.iterations.len(), 5);
        assert!(refinement.iterations[4].correction < 1.0E-3);

        // always one iteration at least
        let opts = IterationOpts {
            max_iterations: 0,
            tolerance: None,
        };
        let refinement = refine(&seed, &fixture(), &opts).unwrap();
        assert_eq!(refinement.iterations.len(), 1);
    }

    #[test]
    fn uniform_weights() {
        let seed = DVector::<f64>::zeros(4);
        let opts = IterationOpts::refinement();
        let uniform = refine(&seed, &fixture(), &opts).unwrap();

        let weighted = fixture()
            .iter()
            .map(|meas| meas.with_weight(1.0))
            .collect::<Vec<_>>();
        let weighted = refine(&seed, &weighted, &opts).unwrap();
        assert!((uniform.solution - weighted.solution).amax() < 1.0E-6);
    }

    #[test]
    fn collinear_geometry() {
        let measurements = [1.0E7, 2.0E7, 3.0E7, -2.0E7, -4.0E7]
            .iter()
            .map(|x| RangeMeasurement::new(Vector3::new(*x, 0.0, 0.0), x.abs()))
            .collect::<Vec<_>>();

        for m in [3, 4] {
            let seed = DVector::<f64>::zeros(m);
            assert!(matches!(
                refine(&seed, &measurements, &IterationOpts::refinement()),
                Err(Error::SingularMatrix)
            ));
        }
    }

    #[test]
    fn solve_dimensions() {
        let g = DMatrix::<f64>::from_element(17, 4, 1.0);
        let dr = DVector::<f64>::zeros(17);
        assert!(matches!(
            solve(&g, &dr, None),
            Err(Error::TooManyObservations(17))
        ));

        let g = DMatrix::<f64>::from_element(6, 5, 1.0);
        let dr = DVector::<f64>::zeros(6);
        assert!(matches!(solve(&g, &dr, None), Err(Error::TooManyUnknowns(5))));

        let g = DMatrix::<f64>::zeros(6, 0);
        assert!(matches!(solve(&g, &dr, None), Err(Error::InvalidUnknowns(0))));

        let g = DMatrix::<f64>::identity(4, 4);
        let dr = DVector::<f64>::zeros(3);
        assert!(matches!(solve(&g, &dr, None), Err(Error::InvalidDimensions)));

        let dr = DVector::<f64>::zeros(4);
        let w = DVector::<f64>::zeros(5);
        assert!(matches!(
            solve(&g, &dr, Some(&w)),
            Err(Error::InvalidDimensions)
        ));

        let g = DMatrix::<f64>::from_element(3, 4, 1.0);
        let dr = DVector::<f64>::zeros(3);
        assert!(matches!(
            solve(&g, &dr, None),
            Err(Error::NotEnoughSatellites(3, 4))
        ));
    }

    #[test]
    fn fewer_unknowns() {
        // single unknown: weighted mean of the observations
        let g = DMatrix::<f64>::from_element(4, 1, 1.0);
        let dr = DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.0]);
        let lsq = solve(&g, &dr, None).unwrap();
        assert!((lsq.dx[0] - 2.5).abs() < 1.0E-12);
        assert!((lsq.covariance[(0, 0)] - 0.25).abs() < 1.0E-12);

        // refinement needs a position at least
        let seed = DVector::<f64>::zeros(2);
        assert!(matches!(
            refine(&seed, &fixture(), &IterationOpts::refinement()),
            Err(Error::InvalidUnknowns(2))
        ));
    }

    #[test]
    fn non_finite_measurements() {
        let seed = DVector::<f64>::zeros(4);
        let opts = IterationOpts::refinement();

        let mut measurements = fixture();
        measurements[2].pseudorange = f64::NAN;
        assert!(matches!(
            refine(&seed, &measurements, &opts),
            Err(Error::InvalidMeasurement(2))
        ));

        let mut measurements = fixture();
        measurements[1].position[0] = f64::INFINITY;
        assert!(refine(&seed, &measurements, &opts).is_err());

        let mut measurements = fixture();
        measurements[3].position[2] = f64::NAN;
        assert!(refine(&seed, &measurements, &opts).is_err());

        let g = DMatrix::<f64>::identity(3, 3);
        let dr = DVector::<f64>::zeros(3);
        let w = DVector::from_row_slice(&[1.0, f64::NAN, 1.0]);
        assert!(matches!(
            solve(&g, &dr, Some(&w)),
            Err(Error::InvalidMeasurement(1))
        ));
    }

    #[test]
    fn weighted_step() {
        // two-rows-per-axis problem: weights pull the estimate
        let g = DMatrix::from_row_slice(
            6,
            3,
            &[
                1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
                0.0, 1.0,
            ],
        );
        let dr = DVector::from_row_slice(&[1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);

        let lsq = solve(&g, &dr, None).unwrap();
        assert!((lsq.dx - DVector::from_element(3, 1.5)).amax() < 1.0E-12);
        assert!((lsq.covariance - DMatrix::<f64>::identity(3, 3) * 0.5).amax() < 1.0E-12);

        let w = DVector::from_row_slice(&[3.0, 1.0, 3.0, 1.0, 3.0, 1.0]);
        let lsq = solve(&g, &dr, Some(&w)).unwrap();
        assert!((lsq.dx - DVector::from_element(3, 1.25)).amax() < 1.0E-12);
    }
}
