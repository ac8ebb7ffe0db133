//! CSV export for multi-year energy production.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::energy::EnergyQueries;

/// Column header for the monthly energy export.
const HEADER: [&str; 3] = ["year", "month", "energy_kwh"];

/// Exports every month of every year to a CSV file at `path`.
///
/// # Errors
///
/// Returns an `io::Error` if the file cannot be written or an energy query
/// fails.
pub fn export_energy_csv(energy: &EnergyQueries<'_>, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_energy_csv(energy, buf)
}

/// Writes `year,month,energy_kwh` rows, year-major, to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing or an energy query fails.
pub fn write_energy_csv(energy: &EnergyQueries<'_>, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER)?;

    for year in 1..=energy.years() {
        let months = energy
            .months_of_year(year)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        for (m, kwh) in months.iter().enumerate() {
            wtr.write_record(&[year.to_string(), (m + 1).to_string(), format!("{kwh:.4}")])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
