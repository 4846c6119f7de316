use crate::{constants::Constants, time::GpsTime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Keplerian parameters
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keplerian {
    /// Square root of the semi major axis [m^1/2]
    pub sqrt_a: f64,
    /// Eccentricity (n.a)
    pub e: f64,
    /// Inclination angle at reference time [rad]
    pub i_0: f64,
    /// Longitude of ascending node at weekly epoch [rad]
    pub omega_0: f64,
    /// Mean anomaly at reference time [rad]
    pub m_0: f64,
    /// Argument of perigee [rad]
    pub omega: f64,
}

impl Keplerian {
    /// Semi major axis [m]
    pub fn a(&self) -> f64 {
        self.sqrt_a.powi(2)
    }
}

/// Keplerian perturbations
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Perturbations {
    /// Mean motion difference from computed value [rad.s-1]
    pub dn: f64,
    /// Inclination rate of change [rad.s-1]
    pub i_dot: f64,
    /// Right ascension rate of change [rad.s-1]
    pub omega_dot: f64,
    /// Amplitude of sine harmonic correction term of the argument
    /// of latitude [rad]
    pub cus: f64,
    /// Amplitude of cosine harmonic correction term of the argument
    /// of latitude [rad]
    pub cuc: f64,
    /// Amplitude of sine harmonic correction term of the angle of inclination [rad]
    pub cis: f64,
    /// Amplitude of cosine harmonic correction term of the angle of inclination [rad]
    pub cic: f64,
    /// Amplitude of sine harmonic correction term of the orbit radius [m]
    pub crs: f64,
    /// Amplitude of cosine harmonic correction term of the orbit radius [m]
    pub crc: f64,
}

/// One broadcast ephemeris (orbit + clock) for one satellite.
///
/// `toe` and `tot` are counted from `reference_week`. `toc` is counted from
/// `clock_week`, which the record reader fills from the record epoch; the
/// [EphemerisStore](crate::prelude::EphemerisStore) rewrites `toc` onto
/// `reference_week` on ingestion, so stored sets only ever use one week.
#[derive(Default, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavigationParameterSet {
    /// Broadcast GPS week
    pub reference_week: u32,
    /// Week `toc` is counted from
    pub clock_week: u32,
    /// Time of clock [s]
    pub toc: f64,
    /// Time of ephemeris [s]
    pub toe: f64,
    /// Transmission time of message [s]
    pub tot: f64,
    /// Clock bias [s]
    pub af0: f64,
    /// Clock drift [s/s]
    pub af1: f64,
    /// Clock drift rate [s/s^2]
    pub af2: f64,
    /// Total group delay [s]
    pub tgd: f64,
    /// Issue of data, ephemeris
    pub iode: u32,
    /// Issue of data, clock
    pub iodc: u32,
    pub kepler: Keplerian,
    pub perturbations: Perturbations,
    /// Codes on L2 channel
    pub l2_codes: f64,
    /// L2 P data flag
    pub l2p_flag: f64,
    /// User range accuracy [m]
    pub accuracy: f64,
    /// Satellite health word
    pub health: f64,
    /// Fit interval [h]
    pub fit_interval: f64,
}

/// Parameters of a [NavigationParameterSet], in broadcast record order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Toc,
    Af0,
    Af1,
    Af2,
    Iode,
    Crs,
    DeltaN,
    M0,
    Cuc,
    E,
    Cus,
    SqrtA,
    Toe,
    Cic,
    Omega0,
    Cis,
    I0,
    Crc,
    Omega,
    OmegaDot,
    IDot,
    L2Codes,
    Week,
    L2pFlag,
    Accuracy,
    Health,
    Tgd,
    Iodc,
    Tot,
    FitInterval,
}

impl Field {
    /// All fields, in the order they appear in a broadcast record.
    pub const ALL: [Field; 30] = [
        Self::Toc,
        Self::Af0,
        Self::Af1,
        Self::Af2,
        Self::Iode,
        Self::Crs,
        Self::DeltaN,
        Self::M0,
        Self::Cuc,
        Self::E,
        Self::Cus,
        Self::SqrtA,
        Self::Toe,
        Self::Cic,
        Self::Omega0,
        Self::Cis,
        Self::I0,
        Self::Crc,
        Self::Omega,
        Self::OmegaDot,
        Self::IDot,
        Self::L2Codes,
        Self::Week,
        Self::L2pFlag,
        Self::Accuracy,
        Self::Health,
        Self::Tgd,
        Self::Iodc,
        Self::Tot,
        Self::FitInterval,
    ];
}

impl NavigationParameterSet {
    /// Returns the value of any [Field], as f64.
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Toc => self.toc,
            Field::Af0 => self.af0,
            Field::Af1 => self.af1,
            Field::Af2 => self.af2,
            Field::Iode => self.iode as f64,
            Field::Crs => self.perturbations.crs,
            Field::DeltaN => self.perturbations.dn,
            Field::M0 => self.kepler.m_0,
            Field::Cuc => self.perturbations.cuc,
            Field::E => self.kepler.e,
            Field::Cus => self.perturbations.cus,
            Field::SqrtA => self.kepler.sqrt_a,
            Field::Toe => self.toe,
            Field::Cic => self.perturbations.cic,
            Field::Omega0 => self.kepler.omega_0,
            Field::Cis => self.perturbations.cis,
            Field::I0 => self.kepler.i_0,
            Field::Crc => self.perturbations.crc,
            Field::Omega => self.kepler.omega,
            Field::OmegaDot => self.perturbations.omega_dot,
            Field::IDot => self.perturbations.i_dot,
            Field::L2Codes => self.l2_codes,
            Field::Week => self.reference_week as f64,
            Field::L2pFlag => self.l2p_flag,
            Field::Accuracy => self.accuracy,
            Field::Health => self.health,
            Field::Tgd => self.tgd,
            Field::Iodc => self.iodc as f64,
            Field::Tot => self.tot,
            Field::FitInterval => self.fit_interval,
        }
    }

    /// Assigns any [Field] from its f64 value. Integer fields are rounded.
    pub fn set(&mut self, field: Field, value: f64) {
        match field {
            Field::Toc => self.toc = value,
            Field::Af0 => self.af0 = value,
            Field::Af1 => self.af1 = value,
            Field::Af2 => self.af2 = value,
            Field::Iode => self.iode = value.round() as u32,
            Field::Crs => self.perturbations.crs = value,
            Field::DeltaN => self.perturbations.dn = value,
            Field::M0 => self.kepler.m_0 = value,
            Field::Cuc => self.perturbations.cuc = value,
            Field::E => self.kepler.e = value,
            Field::Cus => self.perturbations.cus = value,
            Field::SqrtA => self.kepler.sqrt_a = value,
            Field::Toe => self.toe = value,
            Field::Cic => self.perturbations.cic = value,
            Field::Omega0 => self.kepler.omega_0 = value,
            Field::Cis => self.perturbations.cis = value,
            Field::I0 => self.kepler.i_0 = value,
            Field::Crc => self.perturbations.crc = value,
            Field::Omega => self.kepler.omega = value,
            Field::OmegaDot => self.perturbations.omega_dot = value,
            Field::IDot => self.perturbations.i_dot = value,
            Field::L2Codes => self.l2_codes = value,
            Field::Week => self.reference_week = value.round() as u32,
            Field::L2pFlag => self.l2p_flag = value,
            Field::Accuracy => self.accuracy = value,
            Field::Health => self.health = value,
            Field::Tgd => self.tgd = value,
            Field::Iodc => self.iodc = value.round() as u32,
            Field::Tot => self.tot = value,
            Field::FitInterval => self.fit_interval = value,
        }
    }

    /// Moves `toc` onto `reference_week`.
    pub(crate) fn align_weeks(&mut self) {
        if self.clock_week != self.reference_week {
            self.toc += (self.clock_week as f64 - self.reference_week as f64)
                * Constants::SECONDS_PER_WEEK;
            self.clock_week = self.reference_week;
        }
    }

    /// Time of clock, in seconds relative to `week`.
    pub(crate) fn toc_since(&self, week: u32) -> f64 {
        GpsTime::new(self.clock_week, self.toc).seconds_since(week)
    }

    /// Transmission time, in seconds relative to `week`.
    pub(crate) fn tot_since(&self, week: u32) -> f64 {
        GpsTime::new(self.reference_week, self.tot).seconds_since(week)
    }
}
