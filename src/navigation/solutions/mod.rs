//! PVT Solutions
use crate::{
    apriori::geodetic,
    constants::Constants,
    error::Error,
    navigation::{lsq::Iteration, matrix::invert},
    prelude::{Epoch, GpsTime, Vector3, SV},
};

use map_3d::rad2deg;
use nalgebra::base::{DMatrix, Matrix3, Matrix4};

/// Dilution of Precision
#[derive(Debug, Clone, PartialEq)]
pub struct DOP {
    /// Geometric Dilution of Precision
    pub gdop: f64,
    /// Position Dilution of Precision
    pub pdop: f64,
    /// Time Dilution of Precision
    pub tdop: f64,
    /// Horizontal Dilution of Precision
    pub hdop: f64,
    /// Vertical Dilution of Precision
    pub vdop: f64,
}

impl DOP {
    /// Builds [DOP] from line of sight matrix (one row per satellite, XYZ first),
    /// at latitude `lat` and longitude `lon` [rad].
    pub(crate) fn new(design: &DMatrix<f64>, lat: f64, lon: f64) -> Result<Self, Error> {
        let n = design.nrows();
        if n < 4 || design.ncols() < 3 {
            return Err(Error::NotEnoughSatellites(n, 4));
        }

        let mut g = DMatrix::<f64>::from_element(n, 4, 1.0);
        g.view_mut((0, 0), (n, 3))
            .copy_from(&design.view((0, 0), (n, 3)));

        let mut q = g.transpose() * &g;
        invert(&mut q)?;
        let q = Matrix4::<f64>::from_iterator(q.iter().copied());

        let pdop = (q[(0, 0)] + q[(1, 1)] + q[(2, 2)]).sqrt();
        let tdop = q[(3, 3)].sqrt();
        let gdop = (pdop.powi(2) + tdop.powi(2)).sqrt();

        let q_enu = Self::q_enu(&q, lat, lon);
        let hdop = (q_enu[(0, 0)] + q_enu[(1, 1)]).sqrt();
        let vdop = q_enu[(2, 2)].sqrt();

        Ok(Self {
            gdop,
            pdop,
            tdop,
            hdop,
            vdop,
        })
    }
    fn q_enu(q: &Matrix4<f64>, lat: f64, lon: f64) -> Matrix3<f64> {
        let r = Matrix3::<f64>::new(
            -lon.sin(),
            -lon.cos() * lat.sin(),
            lat.cos() * lon.cos(),
            lon.cos(),
            -lat.sin() * lon.sin(),
            lat.cos() * lon.sin(),
            0.0_f64,
            lat.cos(),
            lat.sin(),
        );
        let q_3x3: Matrix3<f64> = q.fixed_view::<3, 3>(0, 0).into_owned();
        r.transpose() * q_3x3 * r
    }
}

/// Receiver position fix, at one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct PVTSolution {
    /// Epoch of observation
    pub t: GpsTime,
    /// Position in [m] ECEF
    pub position: Vector3<f64>,
    /// Receiver clock bias [s], when it was resolved
    pub clock_bias: Option<f64>,
    /// Covariance of the unknowns (XYZ, optional clock [m])
    pub covariance: DMatrix<f64>,
    /// Space Vehicles that helped form this solution
    pub sv: Vec<SV>,
    /// Refinement history
    pub iterations: Vec<Iteration>,
    /// Dilution of Precision, when geometry permits
    pub dop: Option<DOP>,
}

impl PVTSolution {
    /// Epoch of observation, in [TimeScale::GPST](crate::prelude::TimeScale::GPST).
    pub fn epoch(&self) -> Epoch {
        self.t.to_epoch()
    }
    /// Geodetic coordinates (latitude [rad], longitude [rad], altitude above ellipsoid [m])
    pub fn geodetic(&self) -> Vector3<f64> {
        geodetic(&self.position)
    }
    /// Geodetic coordinates (latitude [ddeg], longitude [ddeg], altitude above ellipsoid [m])
    pub fn geodetic_ddeg(&self) -> Vector3<f64> {
        let geo = self.geodetic();
        Vector3::new(rad2deg(geo[0]), rad2deg(geo[1]), geo[2])
    }
    /// Receiver clock bias, expressed in [m]
    pub fn clock_bias_m(&self) -> Option<f64> {
        self.clock_bias
            .map(|dt| dt * Constants::SPEED_OF_LIGHT_M_S)
    }
}

#[cfg(test)]
mod test {
    use super::DOP;
    use crate::error::Error;
    use nalgebra::DMatrix;

    fn design(rows: &[(f64, f64, f64)]) -> DMatrix<f64> {
        DMatrix::from_row_iterator(
            rows.len(),
            3,
            rows.iter().flat_map(|(x, y, z)| {
                let norm = (x * x + y * y + z * z).sqrt();
                [x / norm, y / norm, z / norm]
            }),
        )
    }

    #[test]
    fn dilution_of_precision() {
        // zenith + three satellites low on the horizon, seen from the north pole
        let g = design(&[
            (0.0, 0.0, -1.0),
            (1.0, 0.0, -0.2),
            (-0.5, 0.866, -0.2),
            (-0.5, -0.866, -0.2),
        ]);
        let dop = DOP::new(&g, std::f64::consts::FRAC_PI_2, 0.0).unwrap();

        assert!(dop.gdop > dop.pdop);
        assert!(dop.pdop > dop.hdop);
        assert!((dop.gdop.powi(2) - dop.pdop.powi(2) - dop.tdop.powi(2)).abs() < 1.0E-9);
        assert!((dop.pdop.powi(2) - dop.hdop.powi(2) - dop.vdop.powi(2)).abs() < 1.0E-9);
    }

    #[test]
    fn not_enough_rows() {
        let g = design(&[(0.0, 0.0, -1.0), (1.0, 0.0, -0.2), (-0.5, 0.866, -0.2)]);
        assert!(matches!(
            DOP::new(&g, 0.0, 0.0),
            Err(Error::NotEnoughSatellites(3, 4))
        ));
    }
}
