use chrono::{NaiveDateTime, NaiveTime, Timelike};
use itertools::Itertools;
use serde::Deserialize;
use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum TemperatureError {
    #[error("failed to open {1:?}")]
    Io(#[source] io::Error, PathBuf),
    #[error("failed to deserialize the CSV file")]
    Csv(#[from] csv::Error),
    #[error("column {column:?} is missing from {path:?}")]
    MissingColumn { column: String, path: PathBuf },
    #[error("timestamp {timestamp} is missing from the temperature log {path:?}")]
    MissingTimestamp { timestamp: Timestamp, path: PathBuf },
    #[error("timestamp {timestamp} is found {count} times in the temperature log {path:?}")]
    DuplicateTimestamp {
        timestamp: Timestamp,
        count: usize,
        path: PathBuf,
    },
    #[error("invalid temperature {value:?} in column {column:?}")]
    Value { value: String, column: String },
}
type Result<T> = std::result::Result<T, TemperatureError>;

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M",
];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

/// Time stamp as written by the temperature logger
///
/// Time stamps are matched and ordered on their text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);
impl Timestamp {
    pub fn new<S: Into<String>>(timestamp: S) -> Self {
        Self(timestamp.into().trim().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    /// Seconds since the epoch, or since midnight for time only stamps
    pub fn seconds(&self) -> Option<f64> {
        let text = self.0.as_str();
        if let Some(datetime) = DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        {
            let utc = datetime.and_utc();
            return Some(utc.timestamp() as f64 + utc.timestamp_subsec_nanos() as f64 * 1e-9);
        }
        TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
            .map(|time| time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 * 1e-9)
    }
}
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Timestamp::new(value)
    }
}

#[derive(Deserialize, Debug)]
struct ManifestRecord {
    suffix: String,
    time: Timestamp,
}

/// Map between measurement file suffixes and the time they were recorded
#[derive(Debug, Default)]
pub struct Manifest {
    path: PathBuf,
    // rows in file order
    rows: Vec<(String, Timestamp)>,
    times: HashMap<String, Timestamp>,
}
impl Manifest {
    /// Loads the manifest from a "temperature-by-file-end.csv" file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TemperatureError::Io(e, path.to_path_buf()))?;
        Self::from_reader(file, path)
    }
    pub fn from_reader<R: Read, P: AsRef<Path>>(reader: R, source: P) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut this = Self {
            path: source.as_ref().to_path_buf(),
            ..Default::default()
        };
        for result in rdr.deserialize() {
            let record: ManifestRecord = result?;
            let suffix = record.suffix.trim().to_string();
            let time = Timestamp::new(record.time.0);
            this.times.insert(suffix.clone(), time.clone());
            this.rows.push((suffix, time));
        }
        Ok(this)
    }
    /// Returns the time the measurement with the given suffix was recorded
    ///
    /// A suffix listed more than once resolves to its last entry
    pub fn time_of(&self, suffix: &str) -> Option<&Timestamp> {
        self.times.get(suffix)
    }
    /// Iterator over the manifest time stamps in file order
    pub fn timestamps(&self) -> impl Iterator<Item = &Timestamp> + '_ {
        self.rows.iter().map(|(_, time)| time)
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A temperature logger record reduced to the fluid and cell channels
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureLogEntry {
    pub timestamp: Timestamp,
    /// heat transfer fluid temperature [C]
    pub fluid: f64,
    /// PV cell temperature [C]
    pub cell: f64,
}

/// Temperature logger time series
#[derive(Debug, Default)]
pub struct TemperatureLog {
    path: PathBuf,
    entries: Vec<TemperatureLogEntry>,
}
impl TemperatureLog {
    /// Loads the logger export, the time stamps being in the 1st column
    pub fn from_path<P: AsRef<Path>>(path: P, fluid_channel: &str, cell_channel: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TemperatureError::Io(e, path.to_path_buf()))?;
        Self::from_reader(file, path, fluid_channel, cell_channel)
    }
    pub fn from_reader<R: Read, P: AsRef<Path>>(
        reader: R,
        source: P,
        fluid_channel: &str,
        cell_channel: &str,
    ) -> Result<Self> {
        let path = source.as_ref().to_path_buf();
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| TemperatureError::MissingColumn {
                    column: name.to_string(),
                    path: path.clone(),
                })
        };
        let (i_fluid, i_cell) = (column(fluid_channel)?, column(cell_channel)?);

        let mut entries = vec![];
        for result in rdr.records() {
            let record = result?;
            let timestamp = Timestamp::new(record.get(0).unwrap_or_default());
            entries.push(TemperatureLogEntry {
                timestamp,
                fluid: parse_value(record.get(i_fluid), fluid_channel)?,
                cell: parse_value(record.get(i_cell), cell_channel)?,
            });
        }
        log::debug!("{} records loaded from {:?}", entries.len(), path);
        Ok(Self { path, entries })
    }
    /// Picks the log entries at the manifest time stamps
    ///
    /// Every manifest time stamp must appear exactly once in the log
    pub fn restrict(&self, manifest: &Manifest) -> Result<Vec<TemperatureLogEntry>> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.timestamp.as_str(), i))
            .into_group_map();
        manifest
            .timestamps()
            .map(|timestamp| match index.get(timestamp.as_str()).map(|rows| rows.as_slice()) {
                Some([i]) => Ok(self.entries[*i].clone()),
                Some(rows) => Err(TemperatureError::DuplicateTimestamp {
                    timestamp: timestamp.clone(),
                    count: rows.len(),
                    path: self.path.clone(),
                }),
                None => Err(TemperatureError::MissingTimestamp {
                    timestamp: timestamp.clone(),
                    path: self.path.clone(),
                }),
            })
            .collect()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &TemperatureLogEntry> + '_ {
        self.entries.iter()
    }
}

fn parse_value(value: Option<&str>, column: &str) -> Result<f64> {
    match value.map(str::trim) {
        None | Some("") => Ok(f64::NAN),
        Some(value) => value.parse::<f64>().map_err(|_| TemperatureError::Value {
            value: value.to_string(),
            column: column.to_string(),
        }),
    }
}
