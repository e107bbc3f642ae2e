//! Charts of the PV cell characteristics and of the fluids transmittance

use itertools::Itertools;
use plotters::{drawing::DrawingAreaErrorKind, prelude::*};
use std::{
    fs,
    ops::Range,
    path::{Path, PathBuf},
};

use crate::{
    aligner::{AlignedRecord, AlignedTable},
    measurement::Characteristic,
    run::Chart,
    spectral::{SpectralError, SpectralIntensities},
    temperature::Timestamp,
};

#[derive(thiserror::Error, Debug)]
pub enum PlotError {
    #[error("failed to create chart folder {1:?}")]
    Io(#[source] std::io::Error, PathBuf),
    #[error("failed to draw chart: {0}")]
    Drawing(String),
    #[error("spectral data error")]
    Spectral(#[from] SpectralError),
}
impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for PlotError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        PlotError::Drawing(e.to_string())
    }
}
type Result<T> = std::result::Result<T, PlotError>;

struct Series {
    label: String,
    points: Vec<(f64, f64)>,
    line: bool,
}
impl Series {
    fn scatter<S: Into<String>>(label: S, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            points,
            line: false,
        }
    }
    fn line<S: Into<String>>(label: S, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            points,
            line: true,
        }
    }
    fn finite(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points
            .iter()
            .cloned()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
    }
}

fn padded_range<I: Iterator<Item = f64>>(values: I) -> Option<Range<f64>> {
    let (min, max) = values.minmax().into_option()?;
    let pad = if max > min {
        (max - min) * 5e-2
    } else if min != 0f64 {
        min.abs() * 5e-2
    } else {
        1f64
    };
    Some(min - pad..max + pad)
}

/// Characteristic value as plotted
///
/// The short-circuit current density is plotted as the current Isc = Jsc x cell area.
fn plotted(characteristic: Characteristic, record: &AlignedRecord, cell_area: f64) -> f64 {
    match characteristic {
        Characteristic::Jsc => record.measurement.jsc * cell_area,
        _ => characteristic.value(&record.measurement),
    }
}
fn plotted_label(characteristic: Characteristic) -> &'static str {
    match characteristic {
        Characteristic::Jsc => "Isc (A)",
        _ => characteristic.label(),
    }
}
fn plotted_name(characteristic: Characteristic) -> &'static str {
    match characteristic {
        Characteristic::Jsc => "isc",
        _ => characteristic.name(),
    }
}

/// Time axis in minutes since the first temperature record,
/// or the sample rank if the time stamps are not dates
fn time_axis<'a, I>(table: &AlignedTable, timestamps: I) -> (Vec<f64>, &'static str)
where
    I: Iterator<Item = &'a Timestamp> + Clone,
{
    match timestamps
        .clone()
        .map(|t| table.elapsed(t).map(|s| s / 60f64))
        .collect::<Option<Vec<f64>>>()
    {
        Some(minutes) => (minutes, "Time (min)"),
        None => (timestamps.enumerate().map(|(i, _)| i as f64).collect(), "Sample"),
    }
}

/// Chart renderer
///
/// [ChartWriter::init] must be called once, before any chart is rendered.
/// The charts are written as SVG files in `<root>/<category>/<fluid>/`.
///
/// By default the fluid temperatures are shifted by
/// [AlignedTable::temperature_offset] so that the fluid and cell traces start
/// from the same value.
pub struct ChartWriter {
    root: PathBuf,
    size: (u32, u32),
    shift_fluid: bool,
}
impl ChartWriter {
    /// Prepares the chart output folder
    pub fn init<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| PlotError::Io(e, root.clone()))?;
        log::info!("charts are written to {:?}", root);
        Ok(Self {
            root,
            size: (768, 512),
            shift_fluid: true,
        })
    }
    pub fn size(self, width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            ..self
        }
    }
    /// Shifts, or not, the fluid temperatures by the initial fluid/cell offset
    pub fn shift_fluid(self, shift_fluid: bool) -> Self {
        Self {
            shift_fluid,
            ..self
        }
    }
    pub fn root(&self) -> &Path {
        &self.root
    }
    fn fluid_offset(&self, table: &AlignedTable) -> f64 {
        if self.shift_fluid {
            table.temperature_offset()
        } else {
            0f64
        }
    }
    fn chart_path(&self, category: &str, fluid: &str, name: &str) -> Result<PathBuf> {
        let folder = self.root.join(category).join(fluid);
        fs::create_dir_all(&folder).map_err(|e| PlotError::Io(e, folder.clone()))?;
        Ok(folder.join(name).with_extension("svg"))
    }
    /// Draws the series, returns `false` if there is nothing to draw
    fn draw(&self, path: &Path, x_desc: &str, y_desc: &str, series: &[Series]) -> Result<bool> {
        let (Some(x_range), Some(y_range)) = (
            padded_range(series.iter().flat_map(|s| s.finite()).map(|(x, _)| x)),
            padded_range(series.iter().flat_map(|s| s.finite()).map(|(_, y)| y)),
        ) else {
            log::warn!("no data to plot in {:?}", path);
            return Ok(false);
        };

        let plot = SVGBackend::new(path, self.size).into_drawing_area();
        plot.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&plot)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .margin(10)
            .build_cartesian_2d(x_range, y_range)?;
        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc(y_desc)
            .draw()?;

        let mut colors = colorous::TABLEAU10.iter().cycle();
        for (s, color) in series.iter().zip(&mut colors) {
            let rgb = RGBColor(color.r, color.g, color.b);
            if s.line {
                chart
                    .draw_series(LineSeries::new(s.finite(), &rgb))?
                    .label(&s.label)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &rgb));
            } else {
                chart
                    .draw_series(s.finite().map(|(x, y)| Circle::new((x, y), 4, rgb.filled())))?
                    .label(&s.label)
                    .legend(move |(x, y)| Circle::new((x, y), 4, rgb.filled()));
            }
        }
        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
        plot.present()?;
        log::debug!("{:?} written", path);
        Ok(true)
    }
    fn characteristics_vs<F>(
        &self,
        table: &AlignedTable,
        cell_area: f64,
        category: &str,
        suffix: Option<String>,
        x_desc: &str,
        x: F,
    ) -> Result<Vec<PathBuf>>
    where
        F: Fn(&AlignedRecord) -> f64,
    {
        let mut paths = vec![];
        for characteristic in Characteristic::ALL {
            let name = match &suffix {
                Some(suffix) => format!("{}-{}", plotted_name(characteristic), suffix),
                None => plotted_name(characteristic).to_string(),
            };
            let path = self.chart_path(category, &table.fluid.to_string(), &name)?;
            let points = table
                .records
                .iter()
                .map(|r| (x(r), plotted(characteristic, r, cell_area)))
                .collect();
            let series = [Series::scatter(table.fluid.to_pretty_string(), points)];
            if self.draw(&path, x_desc, plotted_label(characteristic), &series)? {
                paths.push(path);
            }
        }
        Ok(paths)
    }
    /// Plots each characteristic against the cell temperature
    pub fn characteristics_vs_cell_temperature(
        &self,
        table: &AlignedTable,
        cell_area: f64,
    ) -> Result<Vec<PathBuf>> {
        self.characteristics_vs(
            table,
            cell_area,
            "cell-temperature",
            None,
            "Cell temperature (C)",
            |r| r.cell_temperature(),
        )
    }
    /// Plots each characteristic against the fluid temperature
    ///
    /// The fluid temperatures are lowered by the initial fluid/cell offset.
    pub fn characteristics_vs_fluid_temperature(
        &self,
        table: &AlignedTable,
        cell_area: f64,
    ) -> Result<Vec<PathBuf>> {
        let offset = self.fluid_offset(table);
        self.characteristics_vs(
            table,
            cell_area,
            "fluid-temperature",
            Some(table.mode.to_string()),
            "Fluid temperature (C)",
            |r| r.fluid_temperature() - offset,
        )
    }
    /// Plots each characteristic against time
    pub fn characteristics_vs_time(&self, table: &AlignedTable, cell_area: f64) -> Result<Vec<PathBuf>> {
        let (time, x_desc) = time_axis(table, table.records.iter().map(|r| &r.timestamp));
        let times: std::collections::HashMap<&Timestamp, f64> = table
            .records
            .iter()
            .map(|r| &r.timestamp)
            .zip(time)
            .collect();
        self.characteristics_vs(
            table,
            cell_area,
            "time",
            Some(table.mode.to_string()),
            x_desc,
            |r| times.get(&r.timestamp).cloned().unwrap_or(f64::NAN),
        )
    }
    /// Plots the fluid and the cell temperatures against time
    ///
    /// The fluid temperatures are raised by the initial fluid/cell offset.
    pub fn fluid_and_cell_temperature_vs_time(&self, table: &AlignedTable) -> Result<Option<PathBuf>> {
        let (time, x_desc) = time_axis(table, table.temperatures.iter().map(|t| &t.timestamp));
        let offset = self.fluid_offset(table);
        let fluid = time
            .iter()
            .zip(table.temperatures.iter())
            .map(|(&t, e)| (t, e.fluid + offset))
            .collect();
        let cell = time
            .iter()
            .zip(table.temperatures.iter())
            .map(|(&t, e)| (t, e.cell))
            .collect();
        let series = [
            Series::line(format!("{} temperature", table.fluid.to_pretty_string()), fluid),
            Series::line("Cell temperature", cell),
        ];
        let path = self.chart_path(
            "temperatures",
            &table.fluid.to_string(),
            &format!("temperatures-{}", table.mode),
        )?;
        Ok(self
            .draw(&path, x_desc, "Temperature (C)", &series)?
            .then_some(path))
    }
    /// Renders a chart of the table
    pub fn render(&self, chart: Chart, table: &AlignedTable, cell_area: f64) -> Result<Vec<PathBuf>> {
        match chart {
            Chart::CellTemperature => self.characteristics_vs_cell_temperature(table, cell_area),
            Chart::FluidTemperature => self.characteristics_vs_fluid_temperature(table, cell_area),
            Chart::Time => self.characteristics_vs_time(table, cell_area),
            Chart::Temperatures => Ok(self
                .fluid_and_cell_temperature_vs_time(table)?
                .into_iter()
                .collect()),
        }
    }
    /// Plots the transmittance of every fluid, relative to air
    pub fn transmittance(&self, intensities: &SpectralIntensities) -> Result<Option<PathBuf>> {
        let mut series = vec![];
        for table in intensities.iter() {
            let transmittance = intensities.transmittance(&table.name)?;
            series.push(Series::line(table.name.clone(), transmittance.points().collect()));
        }
        let path = self.chart_path("transmittance", "all", "transmittance")?;
        Ok(self
            .draw(&path, "Wavelength (nm)", "Transmittance", &series)?
            .then_some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        measurement::MeasurementRecord,
        temperature::TemperatureLogEntry,
        Fluid, Mode,
    };

    fn table(n: usize) -> AlignedTable {
        let temperatures: Vec<_> = (0..n)
            .map(|i| TemperatureLogEntry {
                timestamp: Timestamp::new(format!("2023-03-01 10:{:02}:00", i)),
                fluid: 20. + i as f64,
                cell: 25. + 2. * i as f64,
            })
            .collect();
        let records = temperatures
            .iter()
            .map(|t| AlignedRecord {
                timestamp: t.timestamp.clone(),
                measurement: MeasurementRecord {
                    suffix: t.timestamp.to_string(),
                    maximum_power: 0.01 - 1e-4 * t.fluid,
                    voc: 0.6,
                    jsc: 0.035,
                    fill_factor: 72.5,
                    path: PathBuf::from("m.csv"),
                },
                temperature: t.clone(),
            })
            .collect();
        AlignedTable {
            fluid: Fluid::Water,
            mode: Mode::Heating,
            records,
            temperatures,
        }
    }

    #[test]
    fn range_padding() {
        assert_eq!(padded_range([0., 10.].into_iter()), Some(-0.5..10.5));
        assert_eq!(padded_range([0.].into_iter()), Some(-1.0..1.0));
        assert_eq!(padded_range(std::iter::empty()), None);
    }

    #[test]
    fn characteristic_charts() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ChartWriter::init(dir.path().join("plots")).unwrap();
        let table = table(5);
        let paths = writer.characteristics_vs_cell_temperature(&table, 0.0105).unwrap();
        assert_eq!(paths.len(), 4);
        assert!(paths
            .iter()
            .all(|p| p.starts_with(dir.path().join("plots").join("cell-temperature").join("water"))));
        assert!(paths.iter().all(|p| fs::metadata(p).unwrap().len() > 0));
        let paths = writer.characteristics_vs_fluid_temperature(&table, 0.0105).unwrap();
        assert!(paths[0].ends_with("fluid-temperature/water/maximum-power-heating.svg"));
        assert!(paths[2].ends_with("fluid-temperature/water/isc-heating.svg"));
        let paths = writer.characteristics_vs_time(&table, 0.0105).unwrap();
        assert_eq!(paths.len(), 4);
        let path = writer.fluid_and_cell_temperature_vs_time(&table).unwrap().unwrap();
        assert!(path.ends_with("temperatures/water/temperatures-heating.svg"));
    }

    #[test]
    fn plotted_values() {
        let table = table(2);
        let record = &table.records[1];
        assert_eq!(plotted(Characteristic::MaximumPower, record, 0.0105), record.measurement.maximum_power);
        assert!((plotted(Characteristic::Jsc, record, 0.0105) - 0.035 * 0.0105).abs() < 1e-15);
        assert_eq!(plotted(Characteristic::Voc, record, 0.0105), 0.6);
        assert_eq!(plotted(Characteristic::FillFactor, record, 0.0105), 72.5);
        assert_eq!(plotted_label(Characteristic::Jsc), "Isc (A)");
        assert_eq!(plotted_label(Characteristic::MaximumPower), "Maximum Power (W)");
    }

    #[test]
    fn fluid_shift() {
        let dir = tempfile::tempdir().unwrap();
        let table = table(3);
        let writer = ChartWriter::init(dir.path()).unwrap();
        // 1st record: fluid at 20C, cell at 25C
        assert_eq!(writer.fluid_offset(&table), 5.);
        let writer = writer.shift_fluid(false);
        assert_eq!(writer.fluid_offset(&table), 0.);
    }

    #[test]
    fn empty_table_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ChartWriter::init(dir.path()).unwrap();
        let table = table(0);
        assert!(writer.characteristics_vs_cell_temperature(&table, 0.0105).unwrap().is_empty());
        assert!(writer.fluid_and_cell_temperature_vs_time(&table).unwrap().is_none());
    }

    #[test]
    fn transmittance_chart() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ChartWriter::init(dir.path()).unwrap();
        let intensities = SpectralIntensities::from_reader(
            "Wavelength (nm),water,air\n300,0.5,1.0\n301,0.6,1.0\n302,,0.9\n".as_bytes(),
            "spectral_data.csv",
        )
        .unwrap();
        let path = writer.transmittance(&intensities).unwrap().unwrap();
        assert!(path.ends_with("transmittance/all/transmittance.svg"));
        assert!(fs::metadata(path).unwrap().len() > 0);
    }
}
