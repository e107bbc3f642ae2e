//! Electrical and thermal power delivered to the PV cell
//!
//! The electrical power is the integral over the wavelength band of the
//! product of the AM1.5D irradiance, the cell spectral responsivity sampled
//! from the AM1.5G table and the transmittance of the heat transfer fluid.

use std::fmt;

use crate::{
    config::{Alignment, Config, TransmittanceSource},
    quadrature::{self, Options, Quadrature},
    spectral::{self, SpectralError, SpectralIntensities, SpectralTable},
    Fluid,
};

#[derive(thiserror::Error, Debug)]
pub enum PowerError {
    #[error("spectral data error")]
    Spectral(#[from] SpectralError),
    #[error("invalid integration band [{lower},{upper}] nm")]
    InvalidBand { lower: f64, upper: f64 },
    #[error("the thermal power model is not specified")]
    ThermalModelUnspecified,
}
type Result<T> = std::result::Result<T, PowerError>;

/// Reference solar spectra
#[derive(Debug, Clone)]
pub struct SolarSpectra {
    /// AM1.5D spectral irradiance
    pub am15d: SpectralTable,
    /// AM1.5G table, the cell spectral responsivity factor
    pub am15g: SpectralTable,
}
impl SolarSpectra {
    /// Loads the reference spectra from the files given in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let spectral = &config.spectral;
        let am15d = spectral::load_table(
            config.reference_path(),
            Some(&spectral.am15d_wavelength),
            &spectral.am15d_irradiance,
        )?;
        let am15g = spectral::load_table(config.am15g_path(), None, &spectral.am15g_responsivity)?;
        log::info!(
            "solar spectra: AM1.5D {} rows, AM1.5G {} rows",
            am15d.len(),
            am15g.len()
        );
        Ok(Self { am15d, am15g })
    }
}

/// Electrical power integral
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectricalPower {
    pub quadrature: Quadrature,
    /// integration band [nm]
    pub band: (f64, f64),
}
impl ElectricalPower {
    /// Electrical power [W]
    pub fn value(&self) -> f64 {
        self.quadrature.value
    }
    /// Estimated absolute error [W]
    pub fn abserr(&self) -> f64 {
        self.quadrature.abserr
    }
}
impl fmt::Display for ElectricalPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6e}W (+/-{:.3e}W) over [{}-{}]nm",
            self.value(),
            self.abserr(),
            self.band.0,
            self.band.1
        )
    }
}

/// Thermal power derived from the electrical power
pub trait ThermalModel {
    fn thermal_power(&self, electrical_power: &ElectricalPower) -> Result<f64>;
}
/// Placeholder model: no physical model is defined yet
#[derive(Debug, Default, Clone, Copy)]
pub struct Unspecified;
impl ThermalModel for Unspecified {
    fn thermal_power(&self, _electrical_power: &ElectricalPower) -> Result<f64> {
        Err(PowerError::ThermalModelUnspecified)
    }
}

/// Spectral integration of the power delivered to the cell
#[derive(Debug, Clone)]
pub struct PowerCalculator {
    irradiance: SpectralTable,
    responsivity: SpectralTable,
    transmittance: SpectralTable,
    lower: f64,
    upper: f64,
    options: Options,
}
impl PowerCalculator {
    /// Calculator over the default band [250,2000]nm
    pub fn new(irradiance: SpectralTable, responsivity: SpectralTable, transmittance: SpectralTable) -> Self {
        Self {
            irradiance,
            responsivity,
            transmittance,
            lower: 250f64,
            upper: 2000f64,
            options: Options::default(),
        }
    }
    /// Builds the calculator for a given fluid
    ///
    /// The transmittance column and the wavelength alignment are set by the
    /// spectral configuration.
    pub fn from_config(
        config: &Config,
        spectra: &SolarSpectra,
        intensities: &SpectralIntensities,
        fluid: Fluid,
    ) -> Result<Self> {
        let spectral = &config.spectral;
        let column = match spectral.transmittance {
            TransmittanceSource::Air => Fluid::Air.column(),
            TransmittanceSource::Fluid => fluid.column(),
        };
        log::debug!("{}: transmittance from the {:?} column", fluid, column);
        let transmittance = intensities.get(&column)?;
        let tables = [&spectra.am15d, &spectra.am15g, transmittance];
        let [irradiance, responsivity, transmittance] = match spectral.alignment {
            Alignment::Positional => tables.map(|t| t.clone()),
            Alignment::Resampled => {
                let upper = spectral.upper.max(0f64).ceil() as usize;
                tables.map(|t| t.resample(upper))
            }
        };
        Ok(Self::new(irradiance, responsivity, transmittance).band(spectral.lower, spectral.upper))
    }
    /// Sets the requested integration band [nm]
    pub fn band(self, lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            ..self
        }
    }
    pub fn options(self, options: Options) -> Self {
        Self { options, ..self }
    }
    /// Selects the integration band
    ///
    /// The upper bound is clipped to the last row of the AM1.5G table and
    /// both bounds are checked against the extent of every table.
    pub fn integration_band(&self) -> Result<(f64, f64)> {
        let last = self
            .responsivity
            .last_index()
            .ok_or(PowerError::InvalidBand {
                lower: self.lower,
                upper: self.upper,
            })?;
        let (lower, upper) = (self.lower, self.upper.min(last as f64));
        if !(lower >= 0f64 && lower <= upper) {
            return Err(PowerError::InvalidBand { lower, upper });
        }
        for table in [&self.irradiance, &self.responsivity, &self.transmittance] {
            table.at(lower)?;
            table.at(upper)?;
        }
        Ok((lower, upper))
    }
    /// Spectral power density at the given wavelength [nm]
    pub fn integrand(&self, wavelength: f64) -> Result<f64> {
        Ok(self.irradiance.at(wavelength)?
            * self.responsivity.at(wavelength)?
            * self.transmittance.at(wavelength)?)
    }
    /// Integrates the spectral power density over the integration band
    pub fn electrical_power(&self) -> Result<ElectricalPower> {
        let band = self.integration_band()?;
        let quadrature =
            quadrature::try_integrate(|w| self.integrand(w), band.0, band.1, self.options)?;
        if !quadrature.converged {
            log::warn!(
                "electrical power integral did not converge after {} subdivisions (error: {:e})",
                quadrature.intervals,
                quadrature.abserr
            );
        }
        Ok(ElectricalPower { quadrature, band })
    }
    /// Thermal power derived from the electrical power with the given model
    pub fn thermal_power<M: ThermalModel>(&self, model: &M, electrical_power: &ElectricalPower) -> Result<f64> {
        model.thermal_power(electrical_power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(n: usize) -> SpectralTable {
        SpectralTable::from_values("ones", vec![1f64; n])
    }
    fn constant(name: &str, value: f64, n: usize) -> SpectralTable {
        SpectralTable::from_values(name, vec![value; n])
    }

    #[test]
    fn unit_spectra() {
        let calculator = PowerCalculator::new(ones(2001), ones(2001), ones(2001));
        assert_eq!(calculator.integration_band().unwrap(), (250., 2000.));
        let power = calculator.electrical_power().unwrap();
        assert!((power.value() - 1750.).abs() < 1e-8, "{}", power);
        assert!(power.abserr() < 1e-6);
    }

    #[test]
    fn band_clipped_to_am15g_table() {
        let calculator = PowerCalculator::new(ones(3000), ones(1201), ones(2500));
        assert_eq!(calculator.integration_band().unwrap(), (250., 1200.));
        let power = calculator.electrical_power().unwrap();
        assert!((power.value() - 950.).abs() < 1e-8, "{}", power);
    }

    #[test]
    fn band_beyond_other_tables() {
        // AM1.5G longer than the AM1.5D table
        let calculator = PowerCalculator::new(ones(1500), ones(2001), ones(2001));
        assert!(matches!(
            calculator.integration_band(),
            Err(PowerError::Spectral(SpectralError::IndexOutOfRange { index: 2000, len: 1500, .. }))
        ));
    }

    #[test]
    fn band_out_of_tables() {
        let calculator = PowerCalculator::new(ones(2001), ones(200), ones(2001));
        assert!(matches!(
            calculator.integration_band(),
            Err(PowerError::InvalidBand { .. })
        ));
        let calculator = PowerCalculator::new(ones(2001), SpectralTable::from_values("empty", vec![]), ones(2001));
        assert!(calculator.electrical_power().is_err());
    }

    #[test]
    fn undefined_values_contribute_nothing() {
        let mut values = vec![1f64; 2001];
        values[1000..].iter_mut().for_each(|v| *v = f64::NAN);
        let irradiance = SpectralTable::from_values("am15d", values);
        let calculator = PowerCalculator::new(irradiance, ones(2001), ones(2001));
        assert_eq!(calculator.integrand(999.6).unwrap(), 0.);
        assert_eq!(calculator.integrand(999.4).unwrap(), 1.);
        let power = calculator.electrical_power().unwrap();
        assert!((power.value() - 749.5).abs() < 1e-3, "{}", power);
    }

    #[test]
    fn integrand_out_of_range() {
        let calculator = PowerCalculator::new(ones(2001), ones(2001), ones(2001));
        assert!(matches!(
            calculator.integrand(2000.6),
            Err(PowerError::Spectral(SpectralError::IndexOutOfRange { .. }))
        ));
    }

    #[test]
    fn product_of_factors() {
        let calculator = PowerCalculator::new(
            constant("am15d", 2., 2001),
            constant("am15g", 0.5, 2001),
            constant("t", 0.25, 2001),
        )
        .band(500., 1500.);
        let power = calculator.electrical_power().unwrap();
        assert!((power.value() - 250.).abs() < 1e-8, "{}", power);
    }

    #[test]
    fn thermal_power_is_unspecified() {
        let calculator = PowerCalculator::new(ones(2001), ones(2001), ones(2001));
        let power = calculator.electrical_power().unwrap();
        assert!(matches!(
            calculator.thermal_power(&Unspecified, &power),
            Err(PowerError::ThermalModelUnspecified)
        ));
    }

    fn intensities(n: usize) -> SpectralIntensities {
        let mut csv = String::from("Wavelength (nm),water,air\n");
        for i in 0..n {
            csv.push_str(&format!("{i},0.5,1.0\n"));
        }
        SpectralIntensities::from_reader(csv.as_bytes(), "spectral_data.csv").unwrap()
    }

    #[test]
    fn am15g_is_the_responsivity_factor() {
        let spectra = SolarSpectra {
            am15d: ones(2001),
            am15g: constant("am15g", 2., 1501),
        };
        let calculator =
            PowerCalculator::from_config(&Config::default(), &spectra, &intensities(2001), Fluid::Water).unwrap();
        assert_eq!(calculator.integration_band().unwrap(), (250., 1500.));
        let power = calculator.electrical_power().unwrap();
        assert!((power.value() - 2500.).abs() < 1e-8, "{}", power);
        assert_eq!(power.band, (250., 1500.));
    }

    #[test]
    fn fluid_transmittance_column() {
        let spectra = SolarSpectra {
            am15d: ones(3),
            am15g: ones(3),
        };
        let mut config = Config::default();
        config.spectral.lower = 0.;
        let air = PowerCalculator::from_config(&config, &spectra, &intensities(3), Fluid::Water).unwrap();
        assert!((air.electrical_power().unwrap().value() - 2.).abs() < 1e-8);
        let config = config.transmittance(TransmittanceSource::Fluid);
        let water = PowerCalculator::from_config(&config, &spectra, &intensities(3), Fluid::Water).unwrap();
        assert!((water.electrical_power().unwrap().value() - 1.).abs() < 1e-8);
    }

    #[test]
    fn resampled_alignment() {
        // transmittance sampled every 2nm from 0nm
        let transmittance = SpectralTable::new(
            "air",
            (0..=1000).map(|i| 2. * i as f64).collect(),
            vec![0.5; 1001],
        );
        let positional = PowerCalculator::new(ones(2001), ones(2001), transmittance.clone());
        assert!(positional.integration_band().is_err());
        let resampled = PowerCalculator::new(
            ones(2001).resample(2000),
            ones(2001).resample(2000),
            transmittance.resample(2000),
        );
        let power = resampled.electrical_power().unwrap();
        assert!((power.value() - 875.).abs() < 1e-8, "{}", power);
        // a single row table only covers 0nm once resampled
        let spectra = SolarSpectra {
            am15d: ones(2001),
            am15g: ones(2001),
        };
        let intensities = SpectralIntensities::from_reader(
            "Wavelength (nm),air\n0,1.0\n".as_bytes(),
            "spectral_data.csv",
        )
        .unwrap();
        let config = Config::default().alignment(Alignment::Resampled);
        let calculator = PowerCalculator::from_config(&config, &spectra, &intensities, Fluid::Air).unwrap();
        assert_eq!(calculator.electrical_power().unwrap().value(), 0.);
    }
}
