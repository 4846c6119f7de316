//! RINEX v2 GPS navigation message reader.
use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::Path,
};

use hifitime::{Epoch, TimeScale};
use log::{debug, error, info, warn};

use crate::{
    ephemeris::{Field, NavigationParameterSet},
    error::Error,
    prelude::{Constellation, SV},
    store::{EphemerisStore, Ionosphere, StoreSummary},
    time::GpsTime,
};

/// Header labels start on this column
const LABEL_COLUMN: usize = 60;
/// Broadcast orbit lines following the epoch line
const ORBIT_LINES: usize = 7;
/// Width of one D19.12 field
const FIELD_WIDTH: usize = 19;
/// Orbit lines start with 3 blanks
const ORBIT_OFFSET: usize = 3;
/// Clock coefficients start after the epoch fields
const CLOCK_OFFSET: usize = 22;

/// Header content kept by the navigation core
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct NavigationHeader {
    pub ionosphere: Ionosphere,
    pub leap_seconds: i32,
}

/// Returns `width` characters of `line`, from `start`.
/// Truncated lines yield empty or shortened fields.
fn column(line: &str, start: usize, width: usize) -> &str {
    let end = (start + width).min(line.len());
    line.get(start..end).unwrap_or("")
}

/// Parses a Fortran float, `D` exponent markers included. Blank fields are null.
fn parse_float(content: &str) -> Result<f64, Error> {
    let content = content.trim();
    if content.is_empty() {
        Ok(0.0)
    } else {
        Ok(content.replace(|c: char| c == 'D' || c == 'd', "E").parse::<f64>()?)
    }
}

fn parse_int<T: std::str::FromStr<Err = std::num::ParseIntError> + Default>(
    content: &str,
) -> Result<T, Error> {
    let content = content.trim();
    if content.is_empty() {
        Ok(T::default())
    } else {
        Ok(content.parse::<T>()?)
    }
}

/// Two digits years: 80-99 is 1980-1999, 00-79 is 2000-2079.
fn full_year(year: i32) -> i32 {
    match year {
        0..=79 => year + 2000,
        80..=99 => year + 1900,
        _ => year,
    }
}

/// [NavigationReader] decodes GPS broadcast ephemerides
/// from a RINEX v2 navigation stream.
pub struct NavigationReader<R: BufRead> {
    lines: Lines<R>,
    header: Option<NavigationHeader>,
}

impl NavigationReader<BufReader<File>> {
    /// Opens a navigation file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let fd = File::open(path)?;
        Ok(Self::new(BufReader::new(fd)))
    }
}

impl<R: BufRead> NavigationReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            header: None,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, Error> {
        match self.lines.next() {
            Some(line) => Ok(Some(line?)),
            None => Ok(None),
        }
    }

    fn expect_line(&mut self) -> Result<String, Error> {
        self.next_line()?.ok_or_else(|| {
            error!("unexpected end of navigation data");
            Error::UnexpectedEndOfInput
        })
    }

    /// Consumes the header, once. Following calls return the same content.
    pub fn header(&mut self) -> Result<NavigationHeader, Error> {
        if let Some(header) = self.header {
            return Ok(header);
        }

        let mut header = NavigationHeader::default();
        loop {
            let line = self.expect_line()?;
            let label = line.get(LABEL_COLUMN..).unwrap_or("").trim();
            match label {
                "ION ALPHA" => {
                    for (i, alpha) in header.ionosphere.alpha.iter_mut().enumerate() {
                        *alpha = parse_float(column(&line, 2 + i * 12, 12))?;
                    }
                },
                "ION BETA" => {
                    for (i, beta) in header.ionosphere.beta.iter_mut().enumerate() {
                        *beta = parse_float(column(&line, 2 + i * 12, 12))?;
                    }
                },
                "LEAP SECONDS" => {
                    header.leap_seconds = parse_int(column(&line, 0, 6))?;
                },
                "END OF HEADER" => break,
                _ => {},
            }
        }

        debug!("navigation header: {:?}", header);
        self.header = Some(header);
        Ok(header)
    }

    /// Decodes the next record. Returns None at the end of the stream.
    pub fn next_record(&mut self) -> Result<Option<(SV, NavigationParameterSet)>, Error> {
        self.header()?;

        let epoch_line = loop {
            match self.next_line()? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
                None => return Ok(None),
            }
        };

        let prn = parse_int::<u8>(column(&epoch_line, 0, 2))?;
        let sv = SV::new(Constellation::GPS, prn);

        let year = full_year(parse_int::<i32>(column(&epoch_line, 2, 3))?);
        let month = parse_int::<u8>(column(&epoch_line, 5, 3))?;
        let day = parse_int::<u8>(column(&epoch_line, 8, 3))?;
        let hour = parse_int::<u8>(column(&epoch_line, 11, 3))?;
        let minute = parse_int::<u8>(column(&epoch_line, 14, 3))?;
        let seconds = parse_float(column(&epoch_line, 17, 5))?;

        let whole = seconds.trunc();
        let nanos = ((seconds - whole) * 1.0E9).round() as u32;

        let toc = Epoch::maybe_from_gregorian(
            year,
            month,
            day,
            hour,
            minute,
            whole as u8,
            nanos,
            TimeScale::GPST,
        )
        .map_err(|e| Error::InvalidEpoch(e.to_string()))?;
        let toc = GpsTime::from_epoch(toc);

        let mut values = Vec::with_capacity(Field::ALL.len());
        values.push(toc.seconds);
        for i in 0..3 {
            values.push(parse_float(column(
                &epoch_line,
                CLOCK_OFFSET + i * FIELD_WIDTH,
                FIELD_WIDTH,
            ))?);
        }

        for _ in 0..ORBIT_LINES {
            let line = self.expect_line()?;
            for i in 0..4 {
                values.push(parse_float(column(
                    &line,
                    ORBIT_OFFSET + i * FIELD_WIDTH,
                    FIELD_WIDTH,
                ))?);
            }
        }

        let mut set = NavigationParameterSet::default();
        for (field, value) in Field::ALL.iter().zip(values.iter()) {
            set.set(*field, *value);
        }
        set.clock_week = toc.week;

        debug!("{} - iode={} toc={}", sv, set.iode, toc);
        Ok(Some((sv, set)))
    }
}

impl<R: BufRead> Iterator for NavigationReader<R> {
    type Item = Result<(SV, NavigationParameterSet), Error>;
    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

impl EphemerisStore {
    /// Loads a RINEX v2 navigation stream: header content becomes auxiliary data,
    /// every record is ingested. Records rejected for capacity or unsupported
    /// satellites are skipped. On error, the data ingested so far remains valid.
    pub fn load_rinex<R: BufRead>(&mut self, reader: R) -> Result<StoreSummary, Error> {
        let mut reader = NavigationReader::new(reader);

        let header = reader.header()?;
        self.apply_header(header.ionosphere, header.leap_seconds);

        while let Some((sv, set)) = reader.next_record()? {
            match self.ingest(sv, set) {
                Ok(_) | Err(Error::CapacityExceeded(..)) => {},
                Err(e) => warn!("{} - record skipped: {}", sv, e),
            }
        }

        let summary = self.summary();
        if let Some(week) = summary.week {
            info!("week {}: {} satellites", week, summary.satellites);
        }
        if summary.rejected > 0 {
            warn!("{} records rejected", summary.rejected);
        }
        Ok(summary)
    }

    /// Loads a RINEX v2 navigation file, see [Self::load_rinex].
    pub fn load_rinex_file(&mut self, path: impl AsRef<Path>) -> Result<StoreSummary, Error> {
        let fd = File::open(path)?;
        self.load_rinex(BufReader::new(fd))
    }
}
