//! Weather-resource collaborator: resolves a location to a local TMY file.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result, UpstreamResource};

pub trait WeatherResource {
    /// Local path of the hourly weather file for a point. Idempotent.
    fn fetch(&self, lon: f64, lat: f64) -> Result<PathBuf>;
}

/// Cache file name for a point's 60-minute PSM3 TMY data.
pub fn cache_file_name(lon: f64, lat: f64) -> String {
    format!("nsrdb_{lat}_{lon}_psm3-tmy_60_tmy.csv")
}

/// Streams `reader` into `dest` through a temporary file in `dir`.
///
/// `dest` only appears once the copy completes; on any failure the
/// temporary file is removed and `dest` is untouched.
///
/// # Errors
///
/// Any I/O failure while creating, writing or renaming the file.
pub fn write_atomically(dir: &Path, dest: &Path, mut reader: impl Read) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut partial = NamedTempFile::new_in(dir)?;
    io::copy(&mut reader, partial.as_file_mut())?;
    partial.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// NREL NSRDB PSM3 TMY downloader with a file cache.
pub struct NsrdbFetcher {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    email: String,
    cache_dir: PathBuf,
}

impl NsrdbFetcher {
    pub fn new(agent: ureq::Agent, base_url: &str, api_key: &str, email: &str, cache_dir: &Path) -> Self {
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            email: email.to_string(),
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    pub fn cache_path(&self, lon: f64, lat: f64) -> PathBuf {
        self.cache_dir.join(cache_file_name(lon, lat))
    }

    fn download(&self, lon: f64, lat: f64, dest: &Path) -> Result<()> {
        let url = format!("{}/psm3-tmy-download.csv", self.base_url);
        debug!(url, lon, lat, "downloading weather resource");
        let response = self
            .agent
            .get(&url)
            .query("api_key", &self.api_key)
            .query("email", &self.email)
            .query("wkt", &format!("POINT({lon} {lat})"))
            .query("names", "tmy")
            .query("interval", "60")
            .query("leap_day", "false")
            .query("utc", "false")
            .query("mailing_list", "false")
            .call();

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => {
                return Err(Error::UpstreamNotFound {
                    resource: UpstreamResource::Weather,
                    message: format!("no TMY data for POINT({lon} {lat})"),
                });
            }
            Err(ureq::Error::Status(status, _)) => {
                return Err(Error::UpstreamError(format!(
                    "weather download failed: status code {status}"
                )));
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(Error::UpstreamError(format!("weather download failed: {t}")));
            }
        };

        write_atomically(&self.cache_dir, dest, response.into_reader())?;
        Ok(())
    }
}

impl WeatherResource for NsrdbFetcher {
    fn fetch(&self, lon: f64, lat: f64) -> Result<PathBuf> {
        let path = self.cache_path(lon, lat);
        if path.is_file() {
            debug!(path = %path.display(), "weather resource cached");
        } else {
            self.download(lon, lat, &path)?;
            info!(path = %path.display(), "weather resource downloaded");
        }
        Ok(path)
    }
}
