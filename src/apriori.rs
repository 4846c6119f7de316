use crate::{constants::Constants, prelude::Vector3};
use map_3d::{deg2rad, ecef2geodetic, geodetic2ecef, rad2deg, Ellipsoid};
use nalgebra::DVector;

/// Geodetic coordinates (latitude [rad], longitude [rad], altitude [m])
/// of given ECEF position [m], on the WGS84 ellipsoid.
pub(crate) fn geodetic(ecef: &Vector3<f64>) -> Vector3<f64> {
    let (lat, lon, h) = ecef2geodetic(ecef[0], ecef[1], ecef[2], Ellipsoid::WGS84);
    Vector3::new(lat, lon, h)
}

/// Receiver state the position refinement starts from.
/// Defaults to the Earth center with a null clock offset.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct AprioriPosition {
    /// ECEF coordinates in meters
    ecef: Vector3<f64>,
    /// Receiver clock offset, in meters
    clock_offset_m: f64,
}

impl AprioriPosition {
    /// Builds Self from ECEF position [m]
    pub fn from_ecef(ecef: Vector3<f64>) -> Self {
        Self {
            ecef,
            clock_offset_m: 0.0,
        }
    }
    /// Builds Self from Geodetic coordinates (latitude [ddeg], longitude [ddeg], altitude above ellipsoid [m])
    pub fn from_geo_ddeg(lat_ddeg: f64, lon_ddeg: f64, alt_m: f64) -> Self {
        let (x, y, z) = geodetic2ecef(
            deg2rad(lat_ddeg),
            deg2rad(lon_ddeg),
            alt_m,
            Ellipsoid::WGS84,
        );
        Self::from_ecef(Vector3::new(x, y, z))
    }
    /// Copies Self with a receiver clock offset guess [s]
    pub fn with_clock_offset(&self, offset_s: f64) -> Self {
        let mut s = *self;
        s.clock_offset_m = offset_s * Constants::SPEED_OF_LIGHT_M_S;
        s
    }
    /// Returns coordinates in ECEF [m]
    pub fn ecef(&self) -> Vector3<f64> {
        self.ecef
    }
    /// Returns Geodetic coordinates (latitude [ddeg], longitude [ddeg], altitude [m])
    pub fn geodetic_ddeg(&self) -> Vector3<f64> {
        let geo = geodetic(&self.ecef);
        Vector3::new(rad2deg(geo[0]), rad2deg(geo[1]), geo[2])
    }
    /// Initial unknowns vector, for 3 (XYZ) or 4 (XYZ + clock) unknowns
    pub(crate) fn seed(&self, unknowns: usize) -> DVector<f64> {
        let mut seed = DVector::<f64>::zeros(unknowns);
        for i in 0..unknowns.min(3) {
            seed[i] = self.ecef[i];
        }
        if unknowns > 3 {
            seed[3] = self.clock_offset_m;
        }
        seed
    }
}
