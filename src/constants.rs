//! GPS and WGS-84 constants, and the capacity bounds of the navigation core.

pub struct Constants;

impl Constants {
    /// Earth mass * Gravitationnal field constant, as broadcast in GPS ICD [m^3/s^2]
    pub const EARTH_GRAVITATION: f64 = 3.986005E14;
    /// Earth rotation rate in WGS84 frame [rad/s]
    pub const EARTH_ANGULAR_VEL_RAD: f64 = 7.2921151467E-5;
    /// Speed of light [m/s]
    pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;
    /// Duration of one GPS week [s]
    pub const SECONDS_PER_WEEK: f64 = 604_800.0;

    /// Highest GPS PRN we store ephemerides for
    pub const MAX_PRN: u8 = 32;
    /// Maximal number of parameter sets kept per satellite
    pub const MAX_EPHEMERIDES: usize = 20;
    /// Default ephemeris freshness window [h]
    pub const EPHEMERIS_EXPIRE_HOURS: f64 = 2.0;
    /// Maximal number of observations (rows) in one position fix
    pub const MAX_OBSERVATIONS: usize = 16;
    /// Maximal number of unknowns: receiver XYZ + receiver clock
    pub const MAX_UNKNOWNS: usize = 4;
    /// Pivots below this magnitude make a matrix singular
    pub const SINGULARITY_THRESHOLD: f64 = 1.0E-10;

    /// Tolerance on clock epoch comparisons [s]
    pub(crate) const TIME_EPSILON_S: f64 = 0.1;
}
