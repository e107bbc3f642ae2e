use regex::Regex;
use serde::Deserialize;
use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum MeasurementError {
    #[error("invalid measurement files pattern")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to list measurement files")]
    Glob(#[from] glob::GlobError),
    #[error("invalid suffix regex")]
    Regex(#[from] regex::Error),
    #[error("failed to open {1:?}")]
    Io(#[source] std::io::Error, PathBuf),
    #[error("failed to deserialize {1:?}")]
    Csv(#[source] csv::Error, PathBuf),
    #[error("no measurement in {0:?}")]
    Empty(PathBuf),
    #[error("no suffix in file name {0:?}")]
    Suffix(PathBuf),
}
type Result<T> = std::result::Result<T, MeasurementError>;

/// Suffix of the measurement taken before the light is turned on
pub const BASELINE_SUFFIX: &str = "(1)";

#[derive(Deserialize, Debug)]
struct Record {
    #[serde(rename = "Maximum Power (W)")]
    maximum_power: f64,
    #[serde(rename = "Voc (V)")]
    voc: f64,
    #[serde(rename = "Jsc (A.cm^-2)")]
    jsc: f64,
    #[serde(rename = "FF (%)")]
    fill_factor: f64,
}

/// PV cell characteristics from one I-V sweep
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub suffix: String,
    /// maximum power [W]
    pub maximum_power: f64,
    /// open-circuit voltage [V]
    pub voc: f64,
    /// short-circuit current density [A/cm^2]
    pub jsc: f64,
    /// fill factor [%]
    pub fill_factor: f64,
    pub path: PathBuf,
}
impl MeasurementRecord {
    /// Loads the 1st measurement of a metric file
    pub fn from_path<P: AsRef<Path>>(path: P, suffix: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| MeasurementError::Io(e, path.to_path_buf()))?;
        Self::from_reader(file, path, suffix)
    }
    pub fn from_reader<R: Read, P: AsRef<Path>>(reader: R, source: P, suffix: &str) -> Result<Self> {
        let path = source.as_ref().to_path_buf();
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let record: Record = match rdr.deserialize().next() {
            Some(result) => result.map_err(|e| MeasurementError::Csv(e, path.clone()))?,
            None => return Err(MeasurementError::Empty(path)),
        };
        Ok(Self {
            suffix: suffix.to_string(),
            maximum_power: record.maximum_power,
            voc: record.voc,
            jsc: record.jsc,
            fill_factor: record.fill_factor,
            path,
        })
    }
    pub fn is_baseline(&self) -> bool {
        self.suffix == BASELINE_SUFFIX
    }
}

/// PV cell characteristics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Characteristic {
    MaximumPower,
    Voc,
    Jsc,
    FillFactor,
}
impl Characteristic {
    pub const ALL: [Characteristic; 4] = [
        Characteristic::MaximumPower,
        Characteristic::Voc,
        Characteristic::Jsc,
        Characteristic::FillFactor,
    ];
    pub fn value(&self, record: &MeasurementRecord) -> f64 {
        use Characteristic::*;
        match self {
            MaximumPower => record.maximum_power,
            Voc => record.voc,
            Jsc => record.jsc,
            FillFactor => record.fill_factor,
        }
    }
    /// Column header in the measurement files
    pub fn label(&self) -> &'static str {
        use Characteristic::*;
        match self {
            MaximumPower => "Maximum Power (W)",
            Voc => "Voc (V)",
            Jsc => "Jsc (A.cm^-2)",
            FillFactor => "FF (%)",
        }
    }
    /// Chart file name
    pub fn name(&self) -> &'static str {
        use Characteristic::*;
        match self {
            MaximumPower => "maximum-power",
            Voc => "voc",
            Jsc => "jsc",
            FillFactor => "fill-factor",
        }
    }
}

/// Extracts measurement suffixes from file names
///
/// The suffix is whatever follows the last space of the file name, up to
/// the ".csv" extension, e.g. "5" for "IV sweep 5.csv".
pub struct SuffixParser(Regex);
impl SuffixParser {
    pub fn new() -> Result<Self> {
        Ok(Self(Regex::new(r"(?:^| )([^ ]*?)(?:\.csv.*)?$")?))
    }
    pub fn suffix<P: AsRef<Path>>(&self, path: P) -> Option<String> {
        let name = path.as_ref().file_name()?.to_str()?;
        self.0
            .captures(name)
            .and_then(|capts| capts.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Measurement file with its suffix
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementFile {
    pub path: PathBuf,
    pub suffix: String,
}
impl MeasurementFile {
    pub fn is_baseline(&self) -> bool {
        self.suffix == BASELINE_SUFFIX
    }
    pub fn load(&self) -> Result<MeasurementRecord> {
        MeasurementRecord::from_path(&self.path, &self.suffix)
    }
}

/// Lists the measurement files matching the glob pattern, sorted by path
pub fn discover<P: AsRef<Path>>(pattern: P) -> Result<Vec<MeasurementFile>> {
    let parser = SuffixParser::new()?;
    let mut paths = glob::glob(&pattern.as_ref().to_string_lossy())?
        .collect::<std::result::Result<Vec<PathBuf>, glob::GlobError>>()?;
    paths.sort();
    paths
        .into_iter()
        .filter(|path| path.is_file())
        .map(|path| match parser.suffix(&path) {
            Some(suffix) => Ok(MeasurementFile { path, suffix }),
            None => Err(MeasurementError::Suffix(path)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const METRIC: &str = "\
Maximum Power (W),Voc (V),Jsc (A.cm^-2),FF (%),Isc (A)
0.01, 0.6, 0.035, 72.5, 0.3
0.02, 0.7, 0.045, 73.5, 0.4
";

    #[test]
    fn suffixes() {
        let parser = SuffixParser::new().unwrap();
        assert_eq!(parser.suffix("data/metrics/IV sweep 5.csv").unwrap(), "5");
        assert_eq!(parser.suffix("data/metrics/IV sweep (1).csv").unwrap(), "(1)");
        assert_eq!(parser.suffix("my data/metrics/12.csv").unwrap(), "12");
        assert_eq!(parser.suffix("metrics/a b c").unwrap(), "c");
        assert!(parser.suffix("metrics/sweep .csv").is_none());
    }

    #[test]
    fn load_first_row() {
        let record = MeasurementRecord::from_reader(METRIC.as_bytes(), "m 5.csv", "5").unwrap();
        assert_eq!(record.maximum_power, 0.01);
        assert_eq!(record.voc, 0.6);
        assert_eq!(record.jsc, 0.035);
        assert_eq!(record.fill_factor, 72.5);
        assert_eq!(record.path, PathBuf::from("m 5.csv"));
        assert!(!record.is_baseline());
    }

    #[test]
    fn empty_metric() {
        let err = MeasurementRecord::from_reader(
            "Maximum Power (W),Voc (V),Jsc (A.cm^-2),FF (%)\n".as_bytes(),
            "m 5.csv",
            "5",
        )
        .unwrap_err();
        assert!(matches!(err, MeasurementError::Empty(_)));
    }

    #[test]
    fn discover_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["sweep 3.csv", "sweep (1).csv", "sweep 10.csv"] {
            fs::write(dir.path().join(name), METRIC).unwrap();
        }
        let files = discover(dir.path().join("*")).unwrap();
        let suffixes: Vec<_> = files.iter().map(|f| f.suffix.as_str()).collect();
        assert_eq!(suffixes, vec!["(1)", "10", "3"]);
        assert!(files[0].is_baseline());
        assert_eq!(files[2].load().unwrap().suffix, "3");
    }
}
