use pv_fluids::{
    plot::ChartWriter, power::Unspecified, run, Alignment, Config, TransmittanceSource,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "pv-fluids",
    about = "PV cell characteristics and spectral power with heat transfer fluids"
)]
struct Opt {
    /// Path to the data repository
    #[structopt(long, default_value = "data")]
    data: String,
    /// Path to the charts repository
    #[structopt(short, long, default_value = "plots")]
    output: String,
    /// Carry on with the other fluids if one fails
    #[structopt(short, long)]
    keep_going: bool,
    /// Use the fluid transmittance instead of the air transmittance
    #[structopt(long)]
    fluid_transmittance: bool,
    /// Interpolate the spectral tables on a common wavelength grid
    #[structopt(long)]
    resample: bool,
    /// Only print the summaries and the power budget
    #[structopt(long)]
    skip_charts: bool,
    /// Plot the fluid temperatures without the initial fluid/cell offset
    #[structopt(long)]
    raw_fluid_temperature: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let mut config = Config::default()
        .data_path(&opt.data)
        .output_path(&opt.output)
        .keep_going(opt.keep_going);
    if opt.fluid_transmittance {
        config = config.transmittance(TransmittanceSource::Fluid);
    }
    if opt.resample {
        config = config.alignment(Alignment::Resampled);
    }

    let writer = if opt.skip_charts {
        None
    } else {
        Some(ChartWriter::init(config.output())?.shift_fluid(!opt.raw_fluid_temperature))
    };

    let tables = run::characteristics(&config, |table, charts| {
        table.summary();
        if let Some(writer) = writer.as_ref() {
            for &chart in charts {
                for path in writer.render(chart, table, config.cell_area)? {
                    log::info!("{:?} written", path);
                }
            }
        }
        Ok(())
    })?;
    println!("{} fluid runs processed", tables.len());

    let intensities = run::spectral_intensities(&config)?;
    if let Some(writer) = writer.as_ref() {
        if let Some(path) = writer.transmittance(&intensities)? {
            log::info!("{:?} written", path);
        }
    }

    for report in run::power(&config, &intensities, &Unspecified)? {
        println!("{}:", report.fluid.to_pretty_string());
        println!(" - electrical power: {}", report.electrical);
        match report.thermal {
            Some(thermal) => println!(" - thermal power: {:.3}", thermal),
            None => println!(" - thermal power: not available"),
        }
    }

    Ok(())
}
