//! # Photovoltaic cells with heat transfer fluids
//!
//! Analysis of the performance of a photovoltaic cell cooled or heated by a
//! heat transfer fluid circulating in front of it:
//!  - the cell characteristics (maximum power, Voc, Jsc, fill factor) of each
//!    I-V sweep are joined with the fluid and cell temperatures recorded at the
//!    time of the sweep ([aligner]),
//!  - the electrical power delivered to the cell is integrated over the
//!    AM1.5D spectrum filtered by the fluid transmittance ([power]).
//!
//! The expected data layout is
//! ```text
//! data/
//! ├── heating/
//! │   ├── _temperatures/<fluid>.csv
//! │   └── <fluid>/
//! │       ├── temperature-by-file-end.csv
//! │       └── metrics/<name> <suffix>.csv
//! ├── cooling/
//! │   └── ...
//! └── spectrometer-and-final/
//!     ├── spectral_reference.csv
//!     ├── am1.5g.csv
//!     └── spectral_data.csv
//! ```
//!
//! ```no_run
//! use pv_fluids::{align, Config, Fluid, Mode};
//!
//! let table = align(&Config::default(), Fluid::Water, Mode::Heating)?;
//! table.summary();
//! # Ok::<(), pv_fluids::AlignError>(())
//! ```

pub mod aligner;
pub mod config;
mod error;
pub mod fluid;
pub mod measurement;
#[cfg(feature = "plot")]
pub mod plot;
pub mod power;
pub mod quadrature;
pub mod run;
pub mod spectral;
pub mod temperature;

pub use aligner::{align, AlignError, AlignedRecord, AlignedTable};
pub use config::{Alignment, Config, TransmittanceSource};
pub use error::Error;
pub use fluid::{Fluid, FluidError, Mode};
pub use measurement::{Characteristic, MeasurementRecord};
pub use power::{ElectricalPower, PowerCalculator, SolarSpectra, ThermalModel};
pub use spectral::{SpectralIntensities, SpectralTable};
pub use temperature::Timestamp;
