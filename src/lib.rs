use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
pub mod chart;
pub mod error;
pub mod plot;

pub use error::{Error, Result};

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

pub const COL_ELAPSED: &str = "elapsed_ms";
pub const COL_DISTANCE: &str = "m_dist";

/// One validated point of the distance log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// time since the start of the measurement, in milliseconds
    pub elapsed_ms: f64,
    /// distance of the tag center, in meters
    pub distance_m: f64,
}

/// Why a csv row did not become a Sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// empty distance, the detector saw no tag in that frame
    NoDetection,
    /// the column is not in the header or the row is too short
    MissingField(&'static str),
    NotNumeric(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowOutcome {
    Valid(Sample),
    Skipped(SkipReason),
}

/// Counts the skipped rows by reason.
/// Only reported at debug level, skipped rows are otherwise silent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipTally {
    pub no_detection: usize,
    pub missing_field: usize,
    pub not_numeric: usize,
}

impl SkipTally {
    pub fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NoDetection => self.no_detection += 1,
            SkipReason::MissingField(_) => self.missing_field += 1,
            SkipReason::NotNumeric(_) => self.not_numeric += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.no_detection + self.missing_field + self.not_numeric
    }
}

/// Positions of the two consumed columns within the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub elapsed_ms: Option<usize>,
    pub m_dist: Option<usize>,
}

impl Columns {
    /// Looks the columns up by name; with repeated names the last one wins.
    pub fn from_headers(headers: &StringRecord) -> Columns {
        let find = |name: &str| {
            headers
                .iter()
                .enumerate()
                .filter(|(_, h)| h.trim() == name)
                .map(|(i, _)| i)
                .last()
        };
        Columns {
            elapsed_ms: find(COL_ELAPSED),
            m_dist: find(COL_DISTANCE),
        }
    }
}

/// Turns one csv row into a Sample, or the reason to drop it.
pub fn classify_record(record: &StringRecord, columns: &Columns) -> RowOutcome {
    let m_dist = match columns.m_dist.and_then(|i| record.get(i)) {
        Some(s) => s.trim(),
        None => return RowOutcome::Skipped(SkipReason::MissingField(COL_DISTANCE)),
    };
    if m_dist.is_empty() {
        return RowOutcome::Skipped(SkipReason::NoDetection);
    }
    let elapsed = match columns.elapsed_ms.and_then(|i| record.get(i)) {
        Some(s) => s.trim(),
        None => return RowOutcome::Skipped(SkipReason::MissingField(COL_ELAPSED)),
    };
    let elapsed_ms = match elapsed.parse::<f64>() {
        Ok(v) => v,
        Err(_) => return RowOutcome::Skipped(SkipReason::NotNumeric(COL_ELAPSED)),
    };
    let distance_m = match m_dist.parse::<f64>() {
        Ok(v) => v,
        Err(_) => return RowOutcome::Skipped(SkipReason::NotNumeric(COL_DISTANCE)),
    };
    RowOutcome::Valid(Sample {
        elapsed_ms,
        distance_m,
    })
}

/// The distance time series, kept in file order.
/// Both columns only grow together, through `push`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeDistance {
    elapsed_ms: Vec<f64>,
    distance_m: Vec<f64>,
}

impl TimeDistance {
    pub fn new(capacity: usize) -> TimeDistance {
        TimeDistance {
            elapsed_ms: Vec::with_capacity(capacity),
            distance_m: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.elapsed_ms.push(sample.elapsed_ms);
        self.distance_m.push(sample.distance_m);
    }

    pub fn len(&self) -> usize {
        self.elapsed_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elapsed_ms.is_empty()
    }

    pub fn elapsed_ms(&self) -> &[f64] {
        &self.elapsed_ms
    }

    pub fn distance_m(&self) -> &[f64] {
        &self.distance_m
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.elapsed_ms
            .iter()
            .zip(self.distance_m.iter())
            .map(|(&elapsed_ms, &distance_m)| Sample {
                elapsed_ms,
                distance_m,
            })
    }

    /// Init a TimeDistance from the detector csv.
    /// Rows without a detection or with unparsable fields are dropped silently,
    /// errors opening or decoding the file are returned.
    /// Does not check ordering or duplicates of elapsed_ms.
    pub fn from_csv<P: AsRef<Path>>(fin: P) -> Result<TimeDistance> {
        let fin = fin.as_ref();
        let file = File::open(fin).map_err(|source| Error::Io {
            path: fin.to_path_buf(),
            source,
        })?;
        let (timedistance, tally) =
            TimeDistance::from_reader(file).map_err(|source| Error::Csv {
                path: fin.to_path_buf(),
                source,
            })?;
        log::info!(
            "read {} samples from {}",
            timedistance.len(),
            fin.display()
        );
        log::debug!(
            "skipped {} rows: {} without detection, {} with missing fields, {} not numeric",
            tally.total(),
            tally.no_detection,
            tally.missing_field,
            tally.not_numeric
        );
        Ok(timedistance)
    }

    /// Same as `from_csv` on any reader; also returns the skipped rows by reason.
    pub fn from_reader<R: Read>(rdr: R) -> csv::Result<(TimeDistance, SkipTally)> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(rdr);
        let columns = Columns::from_headers(reader.headers()?);
        let mut timedistance = TimeDistance::new(1024);
        let mut tally = SkipTally::default();
        for record in reader.records() {
            match classify_record(&record?, &columns) {
                RowOutcome::Valid(sample) => timedistance.push(sample),
                RowOutcome::Skipped(reason) => tally.record(reason),
            }
        }
        Ok((timedistance, tally))
    }
}

impl std::iter::FromIterator<Sample> for TimeDistance {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> TimeDistance {
        let mut timedistance = TimeDistance::default();
        for sample in iter {
            timedistance.push(sample);
        }
        timedistance
    }
}

/// Min and max over the finite values, None if there are none.
pub fn min_and_max(s: &[f64]) -> Option<(f64, f64)> {
    let mut finite = s.iter().copied().filter(|v| v.is_finite());
    let first = finite.next()?;
    let (mut min, mut max) = (first, first);
    for v in finite {
        if v > max {
            max = v
        }
        if v < min {
            min = v
        }
    }
    Some((min, max))
}
