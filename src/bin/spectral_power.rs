use pv_fluids::{power::Unspecified, run, Alignment, Config, TransmittanceSource};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "spectral-power",
    about = "Electrical power delivered to the PV cell through a heat transfer fluid"
)]
struct Opt {
    /// Path to the data repository
    #[structopt(long, default_value = "data")]
    data: String,
    /// Use the fluid transmittance instead of the air transmittance
    #[structopt(long)]
    fluid_transmittance: bool,
    /// Interpolate the spectral tables on a common wavelength grid
    #[structopt(long)]
    resample: bool,
    /// Integration band lower bound [nm]
    #[structopt(long)]
    lower: Option<f64>,
    /// Integration band upper bound [nm]
    #[structopt(long)]
    upper: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let mut config = Config::default().data_path(&opt.data);
    if opt.fluid_transmittance {
        config = config.transmittance(TransmittanceSource::Fluid);
    }
    if opt.resample {
        config = config.alignment(Alignment::Resampled);
    }
    if let Some(lower) = opt.lower {
        config.spectral.lower = lower;
    }
    if let Some(upper) = opt.upper {
        config.spectral.upper = upper;
    }

    let intensities = run::spectral_intensities(&config)?;
    println!(
        "{:<14} {:>24} {:>12} {:>16}",
        "FLUID", "ELECTRICAL POWER", "ABS. ERR.", "THERMAL POWER"
    );
    for report in run::power(&config, &intensities, &Unspecified)? {
        println!(
            "{:<14} {:>24.6} {:>12.3e} {:>16}",
            report.fluid.to_pretty_string(),
            report.electrical.value(),
            report.electrical.abserr(),
            report
                .thermal
                .map_or_else(|| "not available".to_string(), |x| format!("{:.6}", x))
        );
    }
    Ok(())
}
