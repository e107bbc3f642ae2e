//! Join of the PV cell measurements with the temperature logger data

use itertools::Itertools;
use std::{collections::HashMap, path::PathBuf};

use crate::{
    measurement::{self, Characteristic, MeasurementError, MeasurementFile, MeasurementRecord},
    temperature::{Manifest, TemperatureError, TemperatureLog, TemperatureLogEntry, Timestamp},
    Config, Fluid, Mode,
};

#[derive(thiserror::Error, Debug)]
pub enum AlignError {
    #[error("temperature data error")]
    Temperature(#[from] TemperatureError),
    #[error("measurement data error")]
    Measurement(#[from] MeasurementError),
    #[error("suffix {suffix:?} of {path:?} is not in the manifest")]
    UnresolvableSuffix { suffix: String, path: PathBuf },
}
type Result<T> = std::result::Result<T, AlignError>;

/// A measurement with the temperatures at the time it was recorded
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRecord {
    pub timestamp: Timestamp,
    pub measurement: MeasurementRecord,
    pub temperature: TemperatureLogEntry,
}
impl AlignedRecord {
    /// PV cell temperature [C]
    pub fn cell_temperature(&self) -> f64 {
        self.temperature.cell
    }
    /// Heat transfer fluid temperature [C]
    pub fn fluid_temperature(&self) -> f64 {
        self.temperature.fluid
    }
}

/// Measurements and temperatures of a fluid, sorted by time stamps
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    pub fluid: Fluid,
    pub mode: Mode,
    pub records: Vec<AlignedRecord>,
    /// the temperatures at every time stamp of the manifest
    pub temperatures: Vec<TemperatureLogEntry>,
}

/// Loads and joins the measurements and temperatures of a fluid
pub fn align(config: &Config, fluid: Fluid, mode: Mode) -> Result<AlignedTable> {
    let manifest = Manifest::from_path(config.manifest_path(fluid, mode))?;
    let temperature_log = TemperatureLog::from_path(
        config.temperature_log_path(fluid, mode),
        &config.fluid_channel,
        &config.cell_channel,
    )?;
    let files = measurement::discover(config.metrics_pattern(fluid, mode))?;
    log::info!(
        "{} ({}): {} measurement files, {} manifest entries, {} temperature records",
        fluid,
        mode,
        files.len(),
        manifest.len(),
        temperature_log.len()
    );
    AlignedTable::new(fluid, mode, &manifest, &temperature_log, files)
}

impl AlignedTable {
    /// Joins the measurement files with the temperature log through the manifest
    pub fn new(
        fluid: Fluid,
        mode: Mode,
        manifest: &Manifest,
        temperature_log: &TemperatureLog,
        files: Vec<MeasurementFile>,
    ) -> Result<Self> {
        let mut temperatures = temperature_log.restrict(manifest)?;
        let at_time: HashMap<&Timestamp, &TemperatureLogEntry> =
            temperatures.iter().map(|t| (&t.timestamp, t)).collect();

        let mut records = vec![];
        for file in files {
            if file.is_baseline() {
                log::debug!("skipping pre-illumination measurement {:?}", file.path);
                continue;
            }
            let timestamp = manifest
                .time_of(&file.suffix)
                .ok_or_else(|| AlignError::UnresolvableSuffix {
                    suffix: file.suffix.clone(),
                    path: file.path.clone(),
                })?
                .clone();
            log::info!("{} was recorded at {}", file.suffix, timestamp);
            // `restrict` resolved every manifest time stamp
            let temperature = at_time[&timestamp].clone();
            records.push(AlignedRecord {
                timestamp,
                measurement: file.load()?,
                temperature,
            });
        }
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        temperatures.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(Self {
            fluid,
            mode,
            records,
            temperatures,
        })
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    /// Seconds elapsed since the first temperature record
    ///
    /// `None` if a time stamp cannot be read as a time
    pub fn elapsed(&self, timestamp: &Timestamp) -> Option<f64> {
        let t0 = self.temperatures.first()?.timestamp.seconds()?;
        Some(timestamp.seconds()? - t0)
    }
    /// Absolute difference between the fluid and the cell temperatures of the
    /// first temperature record
    ///
    /// 0 if there is no record or if either temperature is undefined
    pub fn temperature_offset(&self) -> f64 {
        self.temperatures
            .first()
            .map(|t| (t.fluid - t.cell).abs())
            .filter(|offset| offset.is_finite())
            .unwrap_or(0f64)
    }
    /// Iterator over the values of a characteristic
    pub fn characteristic(&self, characteristic: Characteristic) -> impl Iterator<Item = f64> + '_ {
        self.records
            .iter()
            .map(move |r| characteristic.value(&r.measurement))
    }
    /// Prints the statistics of the table
    pub fn summary(&self) {
        let stats = |x: &[f64]| {
            let n = x.len() as f64;
            let mean = x.iter().sum::<f64>() / n;
            let std = (x.iter().map(|x| x - mean).fold(0f64, |s, x| s + x * x) / n).sqrt();
            (mean, std)
        };
        let minmax = |x: &[f64]| x.iter().cloned().minmax().into_option().unwrap_or((f64::NAN, f64::NAN));

        println!("SUMMARY: {} ({})", self.fluid.to_pretty_string(), self.mode);
        println!(" - # of records: {}", self.len());
        if let (Some(first), Some(last)) = (self.records.first(), self.records.last()) {
            println!(" - time range: [{} - {}]", first.timestamp, last.timestamp);
        }
        if self.is_empty() {
            return;
        }
        println!(
            "    {:^24}: ({:^12}, {:^12})  ({:^12}, {:^12})",
            "", "MEAN", "STD", "MIN", "MAX"
        );
        let mut columns: Vec<(String, Vec<f64>)> = Characteristic::ALL
            .iter()
            .map(|c| (c.label().to_string(), self.characteristic(*c).collect()))
            .collect();
        columns.push((
            "Fluid temperature (C)".to_string(),
            self.records.iter().map(|r| r.fluid_temperature()).collect(),
        ));
        columns.push((
            "Cell temperature (C)".to_string(),
            self.records.iter().map(|r| r.cell_temperature()).collect(),
        ));
        for (key, value) in columns {
            println!(
                "  - {:24}: {:>12.3?}  {:>12.3?}",
                key,
                stats(&value),
                minmax(&value)
            );
        }
    }
    /// Converts the table into a [polars](https://docs.rs/polars) data frame
    #[cfg(feature = "polars")]
    pub fn to_dataframe(&self) -> polars::prelude::PolarsResult<polars::prelude::DataFrame> {
        use polars::prelude::*;
        let mut columns = vec![Column::new(
            "time".into(),
            self.records
                .iter()
                .map(|r| r.timestamp.as_str())
                .collect::<Vec<_>>(),
        )];
        for characteristic in Characteristic::ALL {
            columns.push(Column::new(
                characteristic.label().into(),
                self.characteristic(characteristic).collect::<Vec<f64>>(),
            ));
        }
        columns.push(Column::new(
            "fluid temperature".into(),
            self.records
                .iter()
                .map(|r| r.fluid_temperature())
                .collect::<Vec<f64>>(),
        ));
        columns.push(Column::new(
            "cell temperature".into(),
            self.records
                .iter()
                .map(|r| r.cell_temperature())
                .collect::<Vec<f64>>(),
        ));
        columns.push(Column::new(
            "path".into(),
            self.records
                .iter()
                .map(|r| r.measurement.path.to_string_lossy().into_owned())
                .collect::<Vec<String>>(),
        ));
        DataFrame::new(columns)
    }
}
