use log::{debug, error};
use nalgebra::Vector3;

use crate::{
    cfg::IterationOpts,
    clock::Clock,
    constants::Constants,
    ephemeris::{Field, NavigationParameterSet},
    error::Error,
    prelude::{Constellation, SV},
    time::GpsTime,
};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Outcome of a successful [EphemerisStore::ingest].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingestion {
    /// New issue, stored in transmission order
    Inserted,
    /// Same issue was already stored, but received later: it got replaced
    Replaced,
    /// Same issue was already stored: nothing changed
    Duplicate,
}

/// Broadcast ionosphere model coefficients (Klobuchar).
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Ionosphere {
    pub alpha: [f64; 4],
    pub beta: [f64; 4],
}

/// Ingestion report.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct StoreSummary {
    /// Current GPS week, once anything got ingested
    pub week: Option<u32>,
    /// Number of satellites with at least one parameter set
    pub satellites: usize,
    /// Number of stored parameter sets
    pub ingested: usize,
    /// Number of re-broadcasts (replaced or skipped)
    pub duplicates: usize,
    /// Number of sets rejected for lack of capacity
    pub rejected: usize,
}

/// Parameter sets of one satellite, in transmission order.
#[derive(Debug, Default, Clone)]
struct Buffer {
    sets: Vec<NavigationParameterSet>,
    selected: Option<usize>,
}

/// [EphemerisStore] holds the broadcast ephemerides of every GPS satellite,
/// for one receiver session. Ingestion reorders and replaces entries in
/// place: concurrent readers should either work on a clone or hold
/// the store behind a read/write lock and use [EphemerisStore::find].
#[derive(Debug, Clone)]
pub struct EphemerisStore {
    buffers: Vec<Buffer>,
    current_week: Option<u32>,
    expiry_hours: f64,
    initialized: bool,
    ionosphere: Ionosphere,
    leap_seconds: i32,
    ingested: usize,
    duplicates: usize,
    rejected: usize,
}

impl Default for EphemerisStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemerisStore {
    /// Builds a new empty [EphemerisStore].
    pub fn new() -> Self {
        Self {
            buffers: vec![Buffer::default(); Constants::MAX_PRN as usize],
            current_week: None,
            expiry_hours: Constants::EPHEMERIS_EXPIRE_HOURS,
            initialized: false,
            ionosphere: Ionosphere::default(),
            leap_seconds: 0,
            ingested: 0,
            duplicates: 0,
            rejected: 0,
        }
    }

    /// Copies Self with a custom freshness window [h].
    pub fn with_expiry_hours(&self, hours: f64) -> Self {
        let mut s = self.clone();
        s.expiry_hours = hours;
        s
    }

    /// Current GPS week: week of the latest ingested set.
    pub fn current_week(&self) -> Option<u32> {
        self.current_week
    }

    pub fn ionosphere(&self) -> Ionosphere {
        self.ionosphere
    }

    pub fn leap_seconds(&self) -> i32 {
        self.leap_seconds
    }

    pub fn summary(&self) -> StoreSummary {
        StoreSummary {
            week: self.current_week,
            satellites: self.buffers.iter().filter(|b| !b.sets.is_empty()).count(),
            ingested: self.ingested,
            duplicates: self.duplicates,
            rejected: self.rejected,
        }
    }

    /// Stored parameter sets of `sv`, in transmission order.
    pub fn sets(&self, sv: SV) -> Result<&[NavigationParameterSet], Error> {
        let index = Self::index(sv)?;
        Ok(&self.buffers[index].sets)
    }

    fn index(sv: SV) -> Result<usize, Error> {
        if sv.constellation != Constellation::GPS || sv.prn == 0 || sv.prn > Constants::MAX_PRN {
            Err(Error::UnsupportedSatellite(sv))
        } else {
            Ok((sv.prn - 1) as usize)
        }
    }

    /// Resets all content, on the first write of this session.
    fn initialize(&mut self) {
        if !self.initialized {
            for buffer in self.buffers.iter_mut() {
                buffer.sets.clear();
                buffer.selected = None;
            }
            self.current_week = None;
            self.ionosphere = Ionosphere::default();
            self.leap_seconds = 0;
            self.ingested = 0;
            self.duplicates = 0;
            self.rejected = 0;
            self.initialized = true;
        }
    }

    /// Stores auxiliary (file header) data.
    pub fn apply_header(&mut self, ionosphere: Ionosphere, leap_seconds: i32) {
        self.initialize();
        self.ionosphere = ionosphere;
        self.leap_seconds = leap_seconds;
    }

    /// Ingests a new parameter set for `sv`.
    /// A re-broadcast of an issue (same week, same IODC) is never stored twice:
    /// we only keep the one that was transmitted first.
    /// When the satellite already holds [Constants::MAX_EPHEMERIDES] sets, this
    /// set is dropped and [Error::CapacityExceeded] is returned.
    pub fn ingest(
        &mut self,
        sv: SV,
        mut set: NavigationParameterSet,
    ) -> Result<Ingestion, Error> {
        let index = Self::index(sv)?;
        self.initialize();

        set.align_weeks();
        let week = set.reference_week;
        self.current_week = Some(week);

        let buffer = &mut self.buffers[index];

        if let Some(pos) = buffer
            .sets
            .iter()
            .position(|s| s.reference_week == week && s.iodc == set.iodc)
        {
            self.duplicates += 1;
            if set.tot < buffer.sets[pos].tot {
                debug!(
                    "{} - iodc={} replaced (tot {:.3} -> {:.3})",
                    sv, set.iodc, buffer.sets[pos].tot, set.tot
                );
                buffer.sets.remove(pos);
                let new_pos = Self::insertion_point(&buffer.sets, &set);
                buffer.sets.insert(new_pos, set);

                // selection keeps pointing at the same issue
                buffer.selected = buffer.selected.map(|selected| {
                    if selected == pos {
                        new_pos
                    } else {
                        let selected = if selected > pos { selected - 1 } else { selected };
                        if new_pos <= selected {
                            selected + 1
                        } else {
                            selected
                        }
                    }
                });
                return Ok(Ingestion::Replaced);
            }
            debug!("{} - iodc={} duplicate", sv, set.iodc);
            return Ok(Ingestion::Duplicate);
        }

        let len = buffer.sets.len();
        if len >= Constants::MAX_EPHEMERIDES {
            error!("{} - iodc={} rejected: buffer full", sv, set.iodc);
            self.rejected += 1;
            return Err(Error::CapacityExceeded(sv, len));
        }

        let pos = Self::insertion_point(&buffer.sets, &set);
        debug!(
            "{} - iode={} iodc={} toc={} stored at #{}",
            sv,
            set.iode,
            set.iodc,
            GpsTime::new(week, set.toc),
            pos
        );
        buffer.sets.insert(pos, set);

        if let Some(selected) = buffer.selected {
            if pos <= selected {
                buffer.selected = Some(selected + 1);
            }
        }

        self.ingested += 1;
        Ok(Ingestion::Inserted)
    }

    /// First position whose transmission time is not earlier than `set`'s.
    fn insertion_point(sets: &[NavigationParameterSet], set: &NavigationParameterSet) -> usize {
        let week = set.reference_week;
        sets.iter()
            .position(|s| s.tot_since(week) >= set.tot)
            .unwrap_or(sets.len())
    }

    fn lookup(&self, index: usize, t: GpsTime, iode: Option<u32>) -> Option<usize> {
        let week = self.current_week?;
        let now = t.seconds_since(week);
        let expiry = self.expiry_hours * 3600.0;

        self.buffers[index]
            .sets
            .iter()
            .enumerate()
            .rev()
            .find(|(_, set)| {
                let toc = set.toc_since(week);
                if now < toc - expiry {
                    return false;
                }
                match iode {
                    Some(iode) => set.iode == iode,
                    None => toc < now + Constants::TIME_EPSILON_S,
                }
            })
            .map(|(pos, _)| pos)
    }

    /// Finds the parameter set of `sv` to use at `t`, without altering
    /// the current selection. With `iode`, only that exact issue is accepted.
    /// Otherwise, this is the latest set whose ToC is not after `t`.
    pub fn find(
        &self,
        sv: SV,
        t: GpsTime,
        iode: Option<u32>,
    ) -> Result<&NavigationParameterSet, Error> {
        let index = Self::index(sv)?;
        let pos = self.lookup(index, t, iode).ok_or(Error::NotFound(sv))?;
        Ok(&self.buffers[index].sets[pos])
    }

    /// Selects the parameter set of `sv` to use at `t`, see [Self::find].
    /// The selection is cleared when nothing qualifies.
    pub fn select(
        &mut self,
        sv: SV,
        t: GpsTime,
        iode: Option<u32>,
    ) -> Result<&NavigationParameterSet, Error> {
        let index = Self::index(sv)?;
        let found = self.lookup(index, t, iode);
        let buffer = &mut self.buffers[index];
        buffer.selected = found;
        match found {
            Some(pos) => Ok(&buffer.sets[pos]),
            None => {
                debug!("{} - no valid ephemeris @{}", sv, t);
                Err(Error::NotFound(sv))
            },
        }
    }

    /// Currently selected parameter set of `sv`.
    pub fn selected(&self, sv: SV) -> Result<&NavigationParameterSet, Error> {
        let index = Self::index(sv)?;
        let buffer = &self.buffers[index];
        buffer
            .selected
            .and_then(|pos| buffer.sets.get(pos))
            .ok_or(Error::MissingEphemeris(sv))
    }

    /// Value of `field` in the current selection of `sv`.
    pub fn get(&self, sv: SV, field: Field) -> Result<f64, Error> {
        Ok(self.selected(sv)?.get(field))
    }

    /// ECEF position [m] of `sv` at `t`, from its current selection.
    pub fn position(&self, sv: SV, t: GpsTime, opts: &IterationOpts) -> Result<Vector3<f64>, Error> {
        Ok(self.selected(sv)?.position_with(t, opts))
    }

    /// [Clock] state of `sv` at `t`, from its current selection.
    pub fn clock(&self, sv: SV, t: GpsTime) -> Result<Clock, Error> {
        Ok(Clock::new(sv, self.selected(sv)?, t))
    }
}
