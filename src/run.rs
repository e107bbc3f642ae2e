//! Batch processing of all the fluids
//!
//! Mirrors the sequence of the experiment: heating runs of every fluid, the
//! cooling runs and finally the air reference run, followed by the spectral
//! power budget.

use strum::IntoEnumIterator;

use crate::{
    aligner::{self, AlignedTable},
    config::TransmittanceSource,
    power::{ElectricalPower, PowerCalculator, SolarSpectra, ThermalModel},
    spectral::SpectralIntensities,
    Config, Error, Fluid, Mode,
};

type Result<T> = std::result::Result<T, Error>;

/// Kind of chart rendered from an [AlignedTable]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chart {
    /// characteristics vs cell temperature
    CellTemperature,
    /// characteristics vs fluid temperature
    FluidTemperature,
    /// fluid and cell temperatures vs time
    Temperatures,
    /// characteristics vs time
    Time,
}

/// A fluid run and the charts to render from it
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub fluid: Fluid,
    pub mode: Mode,
    pub charts: Vec<Chart>,
}

/// Lists the runs to process
pub fn jobs(config: &Config) -> Vec<Job> {
    let mut jobs: Vec<_> = config
        .heating_fluids
        .iter()
        .map(|&fluid| Job {
            fluid,
            mode: Mode::Heating,
            charts: vec![Chart::CellTemperature, Chart::FluidTemperature, Chart::Temperatures],
        })
        .collect();
    jobs.extend(config.cooling_fluids.iter().map(|&fluid| Job {
        fluid,
        mode: Mode::Cooling,
        charts: match fluid {
            Fluid::Rhodamine2pc => vec![Chart::FluidTemperature],
            Fluid::Glycerol | Fluid::Air => vec![Chart::Time],
            _ => vec![],
        },
    }));
    jobs.push(Job {
        fluid: Fluid::Air,
        mode: Mode::Heating,
        charts: vec![Chart::Time],
    });
    jobs
}

/// Aligns the data of every run and hands each table to `render`
///
/// A failing run aborts the batch unless `config.keep_going` is set, in which
/// case the failure is logged and the batch fails once all runs are done.
pub fn characteristics<F>(config: &Config, mut render: F) -> Result<Vec<AlignedTable>>
where
    F: FnMut(&AlignedTable, &[Chart]) -> Result<()>,
{
    let jobs = jobs(config);
    let total = jobs.len();
    let mut tables = vec![];
    let mut failed = 0;
    for job in jobs {
        log::info!("Processing {} ({})", job.fluid, job.mode);
        let result = aligner::align(config, job.fluid, job.mode)
            .map_err(Error::from)
            .and_then(|table| render(&table, &job.charts).map(|_| table));
        match result {
            Ok(table) => tables.push(table),
            Err(e) if config.keep_going => {
                log::error!("{} ({}) failed: {}", job.fluid, job.mode, error_chain(&e));
                failed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    if failed > 0 {
        Err(Error::Batch { failed, total })
    } else {
        Ok(tables)
    }
}

/// Power budget of a fluid
#[derive(Debug, Clone)]
pub struct PowerReport {
    pub fluid: Fluid,
    pub electrical: ElectricalPower,
    /// `None` if the thermal model is not available
    pub thermal: Option<f64>,
}

/// Loads the spectral intensities measured through the fluids
pub fn spectral_intensities(config: &Config) -> Result<SpectralIntensities> {
    Ok(SpectralIntensities::from_path(config.intensities_path())?)
}

/// Electrical and thermal power delivered to the cell
///
/// With the air transmittance a single budget is computed, otherwise one
/// per fluid with a column in the spectral intensity table.
pub fn power<M: ThermalModel>(
    config: &Config,
    intensities: &SpectralIntensities,
    model: &M,
) -> Result<Vec<PowerReport>> {
    let spectra = SolarSpectra::from_config(config)?;
    let fluids: Vec<Fluid> = match config.spectral.transmittance {
        TransmittanceSource::Air => vec![Fluid::Air],
        TransmittanceSource::Fluid => Fluid::iter()
            .filter(|fluid| intensities.get(&fluid.column()).is_ok())
            .collect(),
    };
    let mut reports = vec![];
    for fluid in fluids {
        let calculator = PowerCalculator::from_config(config, &spectra, intensities, fluid)?;
        let electrical = calculator.electrical_power()?;
        let thermal = match calculator.thermal_power(model, &electrical) {
            Ok(thermal) => Some(thermal),
            Err(e) => {
                log::warn!("{}: thermal power not available: {}", fluid, e);
                None
            }
        };
        reports.push(PowerReport {
            fluid,
            electrical,
            thermal,
        });
    }
    Ok(reports)
}

/// Formats an error with all its sources
pub fn error_chain(e: &dyn std::error::Error) -> String {
    let mut msg = e.to_string();
    let mut current = e.source();
    while let Some(cause) = current {
        msg.push_str(&format!(": {}", cause));
        current = cause.source();
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aligner::AlignError, power::Unspecified, temperature::TemperatureError};
    use std::{fs, path::Path};

    const LOG: &str = "\
Time,Channel 3 Ave. (C),Channel 7 Ave. (C)
T0,20.0,21.0
T1,25.0,30.0
";

    fn write_run(root: &Path, fluid: Fluid, mode: Mode, manifest: &str) {
        let config = Config::default().data_path(root);
        let metrics = config.fluid_path(fluid, mode).join("metrics");
        fs::create_dir_all(&metrics).unwrap();
        fs::write(config.manifest_path(fluid, mode), manifest).unwrap();
        let log_path = config.temperature_log_path(fluid, mode);
        fs::create_dir_all(log_path.parent().unwrap()).unwrap();
        fs::write(log_path, LOG).unwrap();
        fs::write(
            metrics.join("IV 5.csv"),
            "Maximum Power (W),Voc (V),Jsc (A.cm^-2),FF (%)\n0.01,0.6,0.035,72.5\n",
        )
        .unwrap();
    }

    fn write_all_runs(root: &Path) {
        let config = Config::default();
        for job in jobs(&config) {
            write_run(root, job.fluid, job.mode, "suffix,time\n5,T1\n");
        }
    }

    #[test]
    fn job_list() {
        let jobs = jobs(&Config::default());
        assert_eq!(jobs.len(), 6);
        assert!(jobs[..4].iter().all(|j| j.mode == Mode::Heating && j.charts.len() == 3));
        assert_eq!(
            jobs[4],
            Job {
                fluid: Fluid::Rhodamine2pc,
                mode: Mode::Cooling,
                charts: vec![Chart::FluidTemperature]
            }
        );
        assert_eq!(jobs[5].fluid, Fluid::Air);
        assert_eq!(jobs[5].charts, vec![Chart::Time]);
    }

    #[test]
    fn all_runs() {
        let dir = tempfile::tempdir().unwrap();
        write_all_runs(dir.path());
        let config = Config::default().data_path(dir.path());
        let mut rendered = vec![];
        let tables = characteristics(&config, |table, charts| {
            rendered.push((table.fluid, table.mode, charts.to_vec()));
            Ok(())
        })
        .unwrap();
        assert_eq!(tables.len(), 6);
        assert!(tables.iter().all(|t| t.len() == 1));
        assert_eq!(rendered.len(), 6);
    }

    #[test]
    fn first_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        write_all_runs(dir.path());
        write_run(dir.path(), Fluid::Rhodamine1pc, Mode::Heating, "suffix,time\n5,T7\n");
        let config = Config::default().data_path(dir.path());
        let mut count = 0;
        let result = characteristics(&config, |_, _| {
            count += 1;
            Ok(())
        });
        assert!(matches!(
            result,
            Err(Error::Align(AlignError::Temperature(TemperatureError::MissingTimestamp { .. })))
        ));
        assert_eq!(count, 1);
    }

    #[test]
    fn keep_going_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        write_all_runs(dir.path());
        write_run(dir.path(), Fluid::Rhodamine1pc, Mode::Heating, "suffix,time\n5,T7\n");
        let config = Config::default().data_path(dir.path()).keep_going(true);
        let mut count = 0;
        let result = characteristics(&config, |_, _| {
            count += 1;
            Ok(())
        });
        assert!(matches!(result, Err(Error::Batch { failed: 1, total: 6 })));
        assert_eq!(count, 5);
    }

    fn write_spectra(root: &Path) {
        let folder = root.join("spectrometer-and-final");
        fs::create_dir_all(&folder).unwrap();
        let mut reference = String::from("AM1.5D Wavelength (nm),AM1.5D (W.m^-2.nm^-1)\n");
        let mut am15g = String::from("Wavelength (nm),Cumulative Photon Flux (m^-2.s^-1)\n");
        let mut intensities = String::from("Wavelength (nm),glycerol,water,air\n");
        for i in 0..=2000 {
            reference.push_str(&format!("{i},1.0\n"));
            am15g.push_str(&format!("{i},0.5\n"));
            intensities.push_str(&format!("{i},0.5,0.25,1.0\n"));
        }
        fs::write(folder.join("spectral_reference.csv"), reference).unwrap();
        fs::write(folder.join("am1.5g.csv"), am15g).unwrap();
        fs::write(folder.join("spectral_data.csv"), intensities).unwrap();
    }

    #[test]
    fn air_power_budget() {
        let dir = tempfile::tempdir().unwrap();
        write_spectra(dir.path());
        let config = Config::default().data_path(dir.path());
        let intensities = spectral_intensities(&config).unwrap();
        let reports = power(&config, &intensities, &Unspecified).unwrap();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.fluid, Fluid::Air);
        assert!((report.electrical.value() - 875.).abs() < 1e-8);
        assert_eq!(report.thermal, None);
    }

    #[test]
    fn fluid_power_budgets() {
        let dir = tempfile::tempdir().unwrap();
        write_spectra(dir.path());
        let config = Config::default()
            .data_path(dir.path())
            .transmittance(TransmittanceSource::Fluid);
        let intensities = spectral_intensities(&config).unwrap();
        let reports = power(&config, &intensities, &Unspecified).unwrap();
        let fluids: Vec<_> = reports.iter().map(|r| r.fluid).collect();
        assert_eq!(fluids, vec![Fluid::Glycerol, Fluid::Water, Fluid::Air]);
        assert!((reports[1].electrical.value() - 218.75).abs() < 1e-8);
    }

    #[test]
    fn chained_error_message() {
        let e = Error::from(AlignError::UnresolvableSuffix {
            suffix: "6".to_string(),
            path: "IV 6.csv".into(),
        });
        assert_eq!(
            error_chain(&e),
            r#"Error in the `aligner` module: suffix "6" of "IV 6.csv" is not in the manifest"#
        );
    }
}
