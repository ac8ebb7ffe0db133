//! CEC spec-sheet libraries (SAM `CEC Modules.csv` / `CEC Inverters.csv`).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use super::catalog::ComponentCategory;
use crate::error::{Error, Result, UpstreamResource};

/// One parsed spec-sheet library. The first column holds the device name.
#[derive(Debug, Clone)]
pub struct SpecSheet {
    kind: ComponentCategory,
    columns: HashMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

impl SpecSheet {
    /// Parses a library from CSV text with a header row.
    ///
    /// # Errors
    ///
    /// `MalformedRecord` if the CSV cannot be parsed.
    pub fn from_reader(kind: ComponentCategory, reader: impl Read) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| Error::MalformedRecord(format!("{kind} spec sheet header: {e}")))?
            .clone();
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        let rows = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::MalformedRecord(format!("{kind} spec sheet: {e}")))?;
        Ok(Self {
            kind,
            columns,
            rows,
        })
    }

    /// Reads a library CSV from disk.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be opened; `MalformedRecord` for bad CSV.
    pub fn from_path(kind: ComponentCategory, path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(kind, file)
    }

    /// Loads from a local path or an http(s) URL.
    ///
    /// # Errors
    ///
    /// `UpstreamNotFound` or `UpstreamError` when a download fails, plus the
    /// errors of [`Self::from_path`].
    pub fn load(kind: ComponentCategory, location: &str, agent: &ureq::Agent) -> Result<Self> {
        let sheet = if location.starts_with("http://") || location.starts_with("https://") {
            debug!(url = location, "downloading spec sheet");
            match agent.get(location).call() {
                Ok(response) => Self::from_reader(kind, response.into_reader())?,
                Err(ureq::Error::Status(404, _)) => {
                    return Err(Error::UpstreamNotFound {
                        resource: UpstreamResource::SpecSheet,
                        message: location.to_string(),
                    });
                }
                Err(e) => {
                    return Err(Error::UpstreamError(format!(
                        "spec sheet download failed: {e}"
                    )));
                }
            }
        } else {
            Self::from_path(kind, Path::new(location))?
        };
        info!(%kind, rows = sheet.rows.len(), "spec sheet loaded");
        Ok(sheet)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finds the single row matching a component name.
    ///
    /// # Errors
    ///
    /// `ComponentNotFound` when zero or several rows match.
    pub fn find(&self, name: &str) -> Result<SpecRow<'_>> {
        let mut matches = self
            .rows
            .iter()
            .filter(|row| row_matches(row.get(0).unwrap_or(""), name));
        match (matches.next(), matches.next()) {
            (Some(record), None) => Ok(SpecRow {
                sheet: self,
                record,
            }),
            _ => Err(Error::component_not_found(
                format!("{} spec sheet entry", self.kind),
                name,
            )),
        }
    }
}

/// Name matching with the aliases for devices whose library name differs.
fn row_matches(row_name: &str, name: &str) -> bool {
    match name {
        "Q.TRON BLK M-G2+ 425" => {
            row_name.starts_with("Hanwha")
                && row_name.contains("Q.TRON BLK M-G2")
                && row_name.ends_with("425")
        }
        "Powerwall 3 (integrated inverter)" => {
            row_name.starts_with("Tesla Inc")
                && row_name.contains("1538000-xx-y")
                && row_name.ends_with("[240V]")
        }
        _ => row_name.contains(name),
    }
}

/// A matched spec-sheet row.
#[derive(Debug, Clone, Copy)]
pub struct SpecRow<'a> {
    sheet: &'a SpecSheet,
    record: &'a csv::StringRecord,
}

impl SpecRow<'_> {
    pub fn name(&self) -> &str {
        self.record.get(0).unwrap_or("")
    }

    /// Numeric value of a named column.
    pub fn number(&self, column: &str) -> Result<f64> {
        let raw = self
            .sheet
            .columns
            .get(column)
            .and_then(|&i| self.record.get(i))
            .ok_or_else(|| {
                Error::MalformedRecord(format!("'{}' has no column '{column}'", self.name()))
            })?;
        raw.trim().parse::<f64>().map_err(|_| {
            Error::MalformedRecord(format!(
                "'{}' column '{column}' is not numeric: '{raw}'",
                self.name()
            ))
        })
    }
}

/// Module and inverter libraries used for one run.
#[derive(Debug, Clone)]
pub struct SpecSheets {
    pub modules: SpecSheet,
    pub inverters: SpecSheet,
}

impl SpecSheets {
    /// Loads both libraries once; they are reused across runs.
    ///
    /// # Arguments
    ///
    /// * `modules` - Path or URL of the CEC module library
    /// * `inverters` - Path or URL of the CEC inverter library
    /// * `agent` - HTTP agent used for remote locations
    ///
    /// # Errors
    ///
    /// Any failure of [`SpecSheet::load`].
    pub fn load(modules: &str, inverters: &str, agent: &ureq::Agent) -> Result<Self> {
        Ok(Self {
            modules: SpecSheet::load(ComponentCategory::Modules, modules, agent)?,
            inverters: SpecSheet::load(ComponentCategory::Inverters, inverters, agent)?,
        })
    }
}
