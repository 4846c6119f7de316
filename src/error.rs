use thiserror::Error;

use crate::prelude::SV;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}: ephemeris buffer full ({1} sets)")]
    CapacityExceeded(SV, usize),
    #[error("{0}: no valid ephemeris at this epoch")]
    NotFound(SV),
    #[error("{0}: missing ephemeris")]
    MissingEphemeris(SV),
    #[error("{0}: not supported")]
    UnsupportedSatellite(SV),
    #[error("singular matrix")]
    SingularMatrix,
    #[error("too many observations ({0})")]
    TooManyObservations(usize),
    #[error("too many unknowns ({0})")]
    TooManyUnknowns(usize),
    #[error("invalid number of unknowns ({0})")]
    InvalidUnknowns(usize),
    #[error("row #{0}: non finite measurement")]
    InvalidMeasurement(usize),
    #[error("design matrix, residuals and weights do not agree in size")]
    InvalidDimensions,
    #[error("not enough satellites: {0}/{1}")]
    NotEnoughSatellites(usize, usize),
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("invalid epoch: {0}")]
    InvalidEpoch(String),
    #[error("failed to parse float value")]
    ParseFloat(#[from] std::num::ParseFloatError),
    #[error("failed to parse integer value")]
    ParseInt(#[from] std::num::ParseIntError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
