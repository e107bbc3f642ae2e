use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum SpectralError {
    #[error("failed to open {1:?}")]
    Io(#[source] std::io::Error, PathBuf),
    #[error("failed to deserialize the CSV file")]
    Csv(#[from] csv::Error),
    #[error("column {column:?} is missing from {path:?}")]
    MissingColumn { column: String, path: PathBuf },
    #[error("invalid number {value:?} in column {column:?} of {path:?}")]
    Value {
        value: String,
        column: String,
        path: PathBuf,
    },
    #[error("wavelength index {index} is out of the range [0,{len}) of the {table} table")]
    IndexOutOfRange {
        table: String,
        index: i64,
        len: usize,
    },
}
type Result<T> = std::result::Result<T, SpectralError>;

/// Spectral data sampled at given wavelengths
///
/// The table is indexed by position: the value at row `i` is the value at
/// wavelength index `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralTable {
    pub name: String,
    /// wavelengths [nm]
    pub wavelengths: Vec<f64>,
    pub values: Vec<f64>,
}
impl SpectralTable {
    pub fn new<S: Into<String>>(name: S, wavelengths: Vec<f64>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            wavelengths,
            values,
        }
    }
    /// Table with the values sampled every nanometer from 0nm
    pub fn from_values<S: Into<String>>(name: S, values: Vec<f64>) -> Self {
        let wavelengths = (0..values.len()).map(|i| i as f64).collect();
        Self::new(name, wavelengths, values)
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    /// Index of the last row
    pub fn last_index(&self) -> Option<usize> {
        self.len().checked_sub(1)
    }
    /// Returns the value at the row nearest to `wavelength`
    ///
    /// Undefined (NaN) values are returned as 0.
    pub fn at(&self, wavelength: f64) -> Result<f64> {
        let index = wavelength.round();
        if !(index >= 0f64 && index < self.len() as f64) {
            return Err(SpectralError::IndexOutOfRange {
                table: self.name.clone(),
                index: index as i64,
                len: self.len(),
            });
        }
        let value = self.values[index as usize];
        Ok(if value.is_nan() { 0f64 } else { value })
    }
    /// Linear interpolation of the table on a 1nm grid from 0 to `upper` nm
    ///
    /// The value at row `i` of the new table is the value at `i` nm, wavelengths
    /// outside the table range are set to NaN.
    pub fn resample(&self, upper: usize) -> Self {
        let mut samples: Vec<(f64, f64)> = self
            .wavelengths
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .filter(|(w, _)| !w.is_nan())
            .collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        let values = (0..=upper)
            .map(|i| interpolate(&samples, i as f64))
            .collect();
        Self::new(
            self.name.clone(),
            (0..=upper).map(|i| i as f64).collect(),
            values,
        )
    }
    /// Iterator over the (wavelength,value) pairs with a defined value
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.wavelengths
            .iter()
            .zip(self.values.iter())
            .filter(|(w, v)| !(w.is_nan() || v.is_nan()))
            .map(|(&w, &v)| (w, v))
    }
}

fn interpolate(samples: &[(f64, f64)], x: f64) -> f64 {
    let k = samples.partition_point(|(w, _)| *w < x);
    match (k.checked_sub(1).map(|i| samples[i]), samples.get(k)) {
        (_, Some(&(w1, v1))) if w1 == x => v1,
        (Some((w0, v0)), Some(&(w1, v1))) => v0 + (v1 - v0) * (x - w0) / (w1 - w0),
        _ => f64::NAN,
    }
}

/// Loads tables from the columns of a CSV file
///
/// The wavelengths are read from the column `wavelength`, or from the 1st
/// column if `None`. Empty cells are NaN and trailing rows without any data
/// are dropped from each table.
pub fn read_columns<R: Read, P: AsRef<Path>>(
    reader: R,
    source: P,
    wavelength: Option<&str>,
    columns: &[&str],
) -> Result<Vec<SpectralTable>> {
    let path = source.as_ref();
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| SpectralError::MissingColumn {
                column: name.to_string(),
                path: path.to_path_buf(),
            })
    };
    let i_wavelength = match wavelength {
        Some(name) => position(name)?,
        None => 0,
    };
    let i_columns = columns
        .iter()
        .map(|name| position(name))
        .collect::<Result<Vec<usize>>>()?;
    let wavelength_name = headers.get(i_wavelength).unwrap_or_default().to_string();

    let mut tables: Vec<_> = columns
        .iter()
        .map(|name| SpectralTable::new(*name, vec![], vec![]))
        .collect();
    for result in rdr.records() {
        let record = result?;
        let w = parse_cell(record.get(i_wavelength), &wavelength_name, path)?;
        for (table, &i) in tables.iter_mut().zip(i_columns.iter()) {
            table.wavelengths.push(w);
            table
                .values
                .push(parse_cell(record.get(i), &table.name, path)?);
        }
    }
    for table in tables.iter_mut() {
        while let (Some(w), Some(v)) = (table.wavelengths.last(), table.values.last()) {
            if w.is_nan() && v.is_nan() {
                table.wavelengths.pop();
                table.values.pop();
            } else {
                break;
            }
        }
    }
    Ok(tables)
}

fn parse_cell(cell: Option<&str>, column: &str, path: &Path) -> Result<f64> {
    match cell.map(str::trim) {
        None | Some("") => Ok(f64::NAN),
        Some(value) => value.parse::<f64>().map_err(|_| SpectralError::Value {
            value: value.to_string(),
            column: column.to_string(),
            path: path.to_path_buf(),
        }),
    }
}

fn open<P: AsRef<Path>>(path: P) -> Result<File> {
    File::open(path.as_ref()).map_err(|e| SpectralError::Io(e, path.as_ref().to_path_buf()))
}

/// Loads a single table from a CSV file
pub fn load_table<P: AsRef<Path>>(path: P, wavelength: Option<&str>, column: &str) -> Result<SpectralTable> {
    let tables = read_columns(open(&path)?, &path, wavelength, &[column])?;
    tables
        .into_iter()
        .next()
        .ok_or_else(|| SpectralError::MissingColumn {
            column: column.to_string(),
            path: path.as_ref().to_path_buf(),
        })
}

/// Spectral intensities measured through each fluid
///
/// The wavelengths are in the 1st column followed by one column per fluid.
#[derive(Debug, Clone)]
pub struct SpectralIntensities {
    path: PathBuf,
    tables: Vec<SpectralTable>,
}
impl SpectralIntensities {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(open(&path)?, path)
    }
    pub fn from_reader<R: Read, P: AsRef<Path>>(reader: R, source: P) -> Result<Self> {
        let mut reader = reader;
        let mut contents = String::new();
        reader
            .read_to_string(&mut contents)
            .map_err(|e| SpectralError::Io(e, source.as_ref().to_path_buf()))?;
        let headers: Vec<String> = csv::Reader::from_reader(contents.as_bytes())
            .headers()?
            .iter()
            .skip(1)
            .map(|h| h.trim().to_string())
            .collect();
        let columns: Vec<&str> = headers.iter().map(|h| h.as_str()).collect();
        let tables = read_columns(contents.as_bytes(), &source, None, &columns)?;
        log::debug!(
            "spectral intensities {:?} loaded from {:?}",
            columns,
            source.as_ref()
        );
        Ok(Self {
            path: source.as_ref().to_path_buf(),
            tables,
        })
    }
    /// Returns the table of the given column
    pub fn get(&self, column: &str) -> Result<&SpectralTable> {
        self.tables
            .iter()
            .find(|t| t.name == column)
            .ok_or_else(|| SpectralError::MissingColumn {
                column: column.to_string(),
                path: self.path.clone(),
            })
    }
    pub fn iter(&self) -> impl Iterator<Item = &SpectralTable> + '_ {
        self.tables.iter()
    }
    /// Transmittance of the given column: its intensity divided by the `air` intensity
    pub fn transmittance(&self, column: &str) -> Result<SpectralTable> {
        let air = self.get(&crate::Fluid::Air.column())?;
        let table = self.get(column)?;
        let (wavelengths, values) = table
            .wavelengths
            .iter()
            .zip(&table.values)
            .zip(&air.values)
            .map(|((&wavelength, &value), &air)| (wavelength, value / air))
            .unzip();
        Ok(SpectralTable::new(column, wavelengths, values))
    }
}
