use std::path::{Path, PathBuf};

use crate::{Fluid, Mode};

/// Data file name mapping a measurement suffix to the time it was recorded
pub const MANIFEST_FILE: &str = "temperature-by-file-end.csv";
/// Photovoltaic cell area: 7cm x 15cm [m^2]
pub const CELL_AREA: f64 = 0.07 * 0.15;

/// Which column of the spectral intensity table is used as transmittance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransmittanceSource {
    /// The `air` baseline column, whatever the fluid
    #[default]
    Air,
    /// The column of the fluid under study
    Fluid,
}

/// How the spectral tables are put on a common wavelength index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Row `i` of every table is wavelength index `i`
    #[default]
    Positional,
    /// Every table is interpolated on a 1nm grid starting at 0nm
    Resampled,
}

/// Spectral data files and integration settings
#[derive(Debug, Clone)]
pub struct SpectralConfig {
    pub folder: String,
    pub reference_file: String,
    pub am15d_wavelength: String,
    pub am15d_irradiance: String,
    pub am15g_file: String,
    /// AM1.5G column sampled as the cell spectral responsivity
    pub am15g_responsivity: String,
    pub intensities_file: String,
    /// Integration band lower bound [nm]
    pub lower: f64,
    /// Integration band upper bound [nm], clipped to the AM1.5G table extent
    pub upper: f64,
    pub transmittance: TransmittanceSource,
    pub alignment: Alignment,
}
impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            folder: String::from("spectrometer-and-final"),
            reference_file: String::from("spectral_reference.csv"),
            am15d_wavelength: String::from("AM1.5D Wavelength (nm)"),
            am15d_irradiance: String::from("AM1.5D (W.m^-2.nm^-1)"),
            am15g_file: String::from("am1.5g.csv"),
            am15g_responsivity: String::from("Cumulative Photon Flux (m^-2.s^-1)"),
            intensities_file: String::from("spectral_data.csv"),
            lower: 250f64,
            upper: 2000f64,
            transmittance: TransmittanceSource::default(),
            alignment: Alignment::default(),
        }
    }
}

/// Data layout and run settings shared by every pipeline
#[derive(Debug, Clone)]
pub struct Config {
    data_path: PathBuf,
    output_path: PathBuf,
    pub cell_area: f64,
    pub heating_fluids: Vec<Fluid>,
    pub cooling_fluids: Vec<Fluid>,
    pub fluid_channel: String,
    pub cell_channel: String,
    pub keep_going: bool,
    pub spectral: SpectralConfig,
}
impl Default for Config {
    fn default() -> Self {
        use Fluid::*;
        Self {
            data_path: PathBuf::from("data"),
            output_path: PathBuf::from("plots"),
            cell_area: CELL_AREA,
            heating_fluids: vec![Glycerol, Rhodamine1pc, Rhodamine2pc, Water],
            cooling_fluids: vec![Rhodamine2pc],
            fluid_channel: String::from("Channel 7 Ave. (C)"),
            cell_channel: String::from("Channel 3 Ave. (C)"),
            keep_going: false,
            spectral: SpectralConfig::default(),
        }
    }
}
impl Config {
    pub fn data_path<P: AsRef<Path>>(self, data_path: P) -> Self {
        Self {
            data_path: data_path.as_ref().to_path_buf(),
            ..self
        }
    }
    pub fn output_path<P: AsRef<Path>>(self, output_path: P) -> Self {
        Self {
            output_path: output_path.as_ref().to_path_buf(),
            ..self
        }
    }
    pub fn keep_going(self, keep_going: bool) -> Self {
        Self { keep_going, ..self }
    }
    pub fn transmittance(mut self, source: TransmittanceSource) -> Self {
        self.spectral.transmittance = source;
        self
    }
    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.spectral.alignment = alignment;
        self
    }
    /// Root of the chart tree
    pub fn output(&self) -> &Path {
        &self.output_path
    }
    /// Folder with the data of a fluid for a given mode
    pub fn fluid_path(&self, fluid: Fluid, mode: Mode) -> PathBuf {
        self.data_path
            .join(mode.to_string())
            .join(fluid.to_string())
    }
    /// Path to the suffix to time manifest
    pub fn manifest_path(&self, fluid: Fluid, mode: Mode) -> PathBuf {
        self.fluid_path(fluid, mode).join(MANIFEST_FILE)
    }
    /// Path to the temperature logger export
    pub fn temperature_log_path(&self, fluid: Fluid, mode: Mode) -> PathBuf {
        self.data_path
            .join(mode.to_string())
            .join("_temperatures")
            .join(format!("{}.csv", fluid))
    }
    /// Glob pattern matching all the measurement files
    pub fn metrics_pattern(&self, fluid: Fluid, mode: Mode) -> PathBuf {
        self.fluid_path(fluid, mode).join("metrics").join("*")
    }
    fn spectral_path(&self, file: &str) -> PathBuf {
        self.data_path.join(&self.spectral.folder).join(file)
    }
    pub fn reference_path(&self) -> PathBuf {
        self.spectral_path(&self.spectral.reference_file)
    }
    pub fn am15g_path(&self) -> PathBuf {
        self.spectral_path(&self.spectral.am15g_file)
    }
    pub fn intensities_path(&self) -> PathBuf {
        self.spectral_path(&self.spectral.intensities_file)
    }
}
