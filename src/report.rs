use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use csv::Writer;
use log::info;
use serde::Serialize;

use crate::error::SirnError;
use crate::time_series::{CityId, Dataset, TimeStep};

/// How a dataset is written, chosen from the output file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// The nested `{city: {time: [S, I, R, N]}}` document.
    Json,
    /// One row per city and time step.
    Csv,
}

impl OutputFormat {
    /// # Errors
    ///
    /// Returns [`SirnError::ReportError`] for extensions other than `json` and `csv`.
    pub fn from_path(path: &Path) -> Result<Self, SirnError> {
        match path.extension().and_then(OsStr::to_str) {
            Some("json") => Ok(OutputFormat::Json),
            Some("csv") => Ok(OutputFormat::Csv),
            _ => Err(SirnError::ReportError(format!(
                "output file {} must end in .json or .csv",
                path.display()
            ))),
        }
    }
}

#[derive(Serialize)]
struct CsvRow {
    city: CityId,
    time: TimeStep,
    susceptible: f64,
    infected: f64,
    recovered: f64,
    population: f64,
}

// Creates the file and all parent directories if they do not exist.
fn create_output_file(path: &Path) -> Result<File, SirnError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}

/// Writes `dataset` to `path` in the format implied by its extension.
///
/// # Errors
///
/// Returns an error if the extension is not supported or the file cannot be written.
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<(), SirnError> {
    let format = OutputFormat::from_path(path)?;
    let file = create_output_file(path)?;
    match format {
        OutputFormat::Json => {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, dataset)?;
            writer.flush()?;
        }
        OutputFormat::Csv => {
            let mut writer = Writer::from_writer(file);
            for (city, series) in dataset.cities() {
                for snapshot in series.snapshots() {
                    let state = snapshot.state;
                    writer.serialize(CsvRow {
                        city,
                        time: snapshot.time,
                        susceptible: state.susceptible,
                        infected: state.infected,
                        recovered: state.recovered,
                        population: state.population,
                    })?;
                }
            }
            writer.flush()?;
        }
    }
    info!("wrote {} cities to {}", dataset.len(), path.display());
    Ok(())
}

/// Reads a dataset stored in the JSON format.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not hold a valid dataset.
pub fn load_dataset(path: &Path) -> Result<Dataset, SirnError> {
    let reader = BufReader::new(File::open(path)?);
    let dataset: Dataset = serde_json::from_reader(reader)?;
    info!("loaded {} cities from {}", dataset.len(), path.display());
    Ok(dataset)
}

/// Prints the first `max_steps` time steps of the first `max_cities` cities.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_preview(
    dataset: &Dataset,
    max_cities: usize,
    max_steps: usize,
    out: &mut dyn Write,
) -> Result<(), SirnError> {
    for (city, series) in dataset.cities().take(max_cities) {
        writeln!(out, "City {city}:")?;
        for snapshot in series.snapshots().iter().take(max_steps) {
            let state = snapshot.state;
            writeln!(
                out,
                "  Time {}: S={:.2}, I={:.2}, R={:.2}, N={:.2}",
                snapshot.time, state.susceptible, state.infected, state.recovered, state.population
            )?;
        }
        if series.len() > max_steps {
            writeln!(
                out,
                "  ... and {} more time steps",
                series.len() - max_steps
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}
