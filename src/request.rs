//! Simulation request and its input validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::error::{Error, Result};
use crate::sim::RunTarget;

/// Analysis horizons accepted by the service, in years.
pub const ALLOWED_YEARS: [usize; 7] = [1, 5, 10, 20, 25, 30, 35];

/// Granularity of the production series returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputResolution {
    Year,
    Month,
    Hour,
}

impl FromStr for OutputResolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "year" => Ok(Self::Year),
            "month" => Ok(Self::Month),
            "hour" => Ok(Self::Hour),
            other => Err(format!(
                "unknown output resolution \"{other}\" (expected year, month or hour)"
            )),
        }
    }
}

impl fmt::Display for OutputResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Hour => "hour",
        };
        f.write_str(s)
    }
}

/// One simulation request as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SimulationRequest {
    pub design_vendor: String,
    pub design_id: String,
    pub tenant_id: String,
    pub simulation_mode: String,
    pub analysis_years: usize,
    pub output_resolution: String,
    #[serde(default)]
    pub annual_degradation: Option<Vec<f64>>,
}

impl SimulationRequest {
    /// A PV-mode Aurora request with no degradation override.
    pub fn new(
        tenant_id: &str,
        design_id: &str,
        analysis_years: usize,
        resolution: OutputResolution,
    ) -> Self {
        Self {
            design_vendor: "AURORA".to_string(),
            design_id: design_id.to_string(),
            tenant_id: tenant_id.to_string(),
            simulation_mode: "MODE_PV".to_string(),
            analysis_years,
            output_resolution: resolution.to_string(),
            annual_degradation: None,
        }
    }

    /// Validates every field and returns a list of errors.
    ///
    /// Returns an empty vector if the request is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if !self.design_vendor.eq_ignore_ascii_case("aurora") {
            errors.push(ConfigError::new(
                "designVendor",
                format!("unsupported design vendor \"{}\"", self.design_vendor),
            ));
        }
        if uuid::Uuid::parse_str(&self.design_id).is_err() {
            errors.push(ConfigError::new("designId", "must be a UUID"));
        }
        if uuid::Uuid::parse_str(&self.tenant_id).is_err() {
            errors.push(ConfigError::new("tenantId", "must be a UUID"));
        }
        if !self.simulation_mode.eq_ignore_ascii_case("mode_pv") {
            errors.push(ConfigError::new(
                "simulationMode",
                format!("unsupported simulation mode \"{}\"", self.simulation_mode),
            ));
        }
        if !ALLOWED_YEARS.contains(&self.analysis_years) {
            errors.push(ConfigError::new(
                "analysisYears",
                format!("must be one of {ALLOWED_YEARS:?}"),
            ));
        }

        match self.output_resolution.parse::<OutputResolution>() {
            Ok(OutputResolution::Hour) if self.analysis_years != 1 => {
                errors.push(ConfigError::new(
                    "outputResolution",
                    "hour resolution is only available for a 1-year analysis",
                ));
            }
            Ok(_) => {}
            Err(message) => errors.push(ConfigError::new("outputResolution", message)),
        }

        if let Some(fractions) = &self.annual_degradation {
            if fractions.len() != self.analysis_years {
                errors.push(ConfigError::new(
                    "annualDegradation",
                    format!(
                        "has {} entries but the analysis period is {} years",
                        fractions.len(),
                        self.analysis_years
                    ),
                ));
            }
            if fractions.iter().any(|f| !f.is_finite() || *f < 0.0) {
                errors.push(ConfigError::new(
                    "annualDegradation",
                    "entries must be finite and >= 0",
                ));
            }
        }

        errors
    }

    /// Parsed resolution, once validated.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for an unknown resolution.
    pub fn resolution(&self) -> Result<OutputResolution> {
        self.output_resolution
            .parse()
            .map_err(Error::InvalidRequest)
    }

    /// Validates the request and borrows it as an orchestrator target.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` listing every failed field.
    pub fn to_target(&self) -> Result<RunTarget<'_>> {
        let errors = self.validate();
        if !errors.is_empty() {
            let joined = errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::InvalidRequest(joined));
        }
        Ok(RunTarget {
            tenant_id: &self.tenant_id,
            design_id: &self.design_id,
            years: self.analysis_years,
            annual_degradation: self.annual_degradation.as_deref(),
        })
    }
}
