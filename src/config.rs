//! TOML-based application configuration and credential resolution.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::lifetime::DegradationMode;

/// Top-level application configuration parsed from TOML.
///
/// All sections have defaults matching the production deployment. Load
/// from TOML with [`AppConfig::from_toml_file`] or start from
/// [`AppConfig::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Design-source API endpoint and credentials.
    #[serde(default)]
    pub design_source: DesignSourceConfig,
    /// Component catalog API endpoint and credentials.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Weather resource download settings.
    #[serde(default)]
    pub weather: WeatherConfig,
    /// CEC spec-sheet locations.
    #[serde(default)]
    pub spec_sheets: SpecSheetConfig,
    /// Fixed modelling assumptions.
    #[serde(default)]
    pub assumptions: AssumptionsConfig,
    /// Lifetime degradation mode.
    #[serde(default)]
    pub lifetime: LifetimeConfig,
    /// Which resource categories are assembled.
    #[serde(default)]
    pub run: RunOptions,
}

/// Design-source API endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DesignSourceConfig {
    /// Base URL, without the `/tenants/...` suffix.
    pub base_url: String,
    /// Environment variable holding the bearer token.
    pub token_env: String,
}

impl Default for DesignSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.aurorasolar.com".to_string(),
            token_env: "DESIGN_SOURCE_TOKEN".to_string(),
        }
    }
}

/// Component catalog API endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Base URL; components live under `{base_url}/{category}/{id}`.
    pub base_url: String,
    /// Environment variable holding the bearer token.
    pub token_env: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/simulation/resi/v1".to_string(),
            token_env: "CATALOG_TOKEN".to_string(),
        }
    }
}

/// NSRDB weather download settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    /// NSRDB API base URL.
    pub base_url: String,
    /// Environment variable holding the NREL API key.
    pub api_key_env: String,
    /// Contact email sent with every NSRDB request.
    pub email: String,
    /// Directory used as the file-backed weather cache.
    pub cache_dir: PathBuf,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://developer.nrel.gov/api/nsrdb/v2/solar".to_string(),
            api_key_env: "NREL_API_KEY".to_string(),
            email: String::new(),
            cache_dir: PathBuf::from("data/weather"),
        }
    }
}

/// CEC spec-sheet locations (local path or http(s) URL).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecSheetConfig {
    /// CEC module library CSV.
    pub modules: String,
    /// CEC inverter library CSV.
    pub inverters: String,
}

impl Default for SpecSheetConfig {
    fn default() -> Self {
        Self {
            modules: "https://raw.githubusercontent.com/NREL/SAM/master/deploy/libraries/CEC%20Modules.csv"
                .to_string(),
            inverters:
                "https://raw.githubusercontent.com/NREL/SAM/patch/deploy/libraries/CEC%20Inverters.csv"
                    .to_string(),
        }
    }
}

/// Fixed modelling assumptions fed to the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssumptionsConfig {
    /// Ground albedo used for all twelve months (0.0–1.0).
    pub albedo: f64,
    /// Yearly degradation fraction used when nothing more specific exists.
    pub default_annual_degradation: f64,
    /// PPA price ($/kWh).
    pub ppa_price: f64,
    /// PPA escalation (%/year).
    pub ppa_escalation: f64,
}

impl Default for AssumptionsConfig {
    fn default() -> Self {
        Self {
            albedo: 0.2,
            default_annual_degradation: 0.0055,
            ppa_price: 0.15,
            ppa_escalation: 1.0,
        }
    }
}

/// Lifetime degradation mode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifetimeConfig {
    /// Let the engine re-simulate every year with DC degradation inputs.
    pub use_dc_degradation: bool,
    /// Compound AC degradation on the running factor.
    pub compounding: bool,
}

impl LifetimeConfig {
    pub fn mode(&self) -> DegradationMode {
        if self.use_dc_degradation {
            DegradationMode::Dc
        } else {
            DegradationMode::Ac {
                compounding: self.compounding,
            }
        }
    }
}

/// Resource categories the orchestrator assembles.
///
/// Fixed for the lifetime of an orchestrator; disabling a category leaves
/// its assignment status unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunOptions {
    pub include_modules: bool,
    pub include_inverters: bool,
    pub include_batteries: bool,
    pub include_system_design: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            include_modules: true,
            include_inverters: true,
            include_batteries: true,
            include_system_design: true,
        }
    }
}

/// Secrets resolved once at startup from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub design_source_token: String,
    pub catalog_token: String,
    pub nrel_api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"assumptions.albedo"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        for (field, url) in [
            ("design_source.base_url", &self.design_source.base_url),
            ("catalog.base_url", &self.catalog.base_url),
            ("weather.base_url", &self.weather.base_url),
        ] {
            if !is_http_url(url) {
                errors.push(ConfigError::new(field, "must be an http(s) URL"));
            }
        }

        for (field, name) in [
            ("design_source.token_env", &self.design_source.token_env),
            ("catalog.token_env", &self.catalog.token_env),
            ("weather.api_key_env", &self.weather.api_key_env),
        ] {
            if name.trim().is_empty() {
                errors.push(ConfigError::new(field, "must name an environment variable"));
            }
        }

        if self.spec_sheets.modules.trim().is_empty() {
            errors.push(ConfigError::new("spec_sheets.modules", "must not be empty"));
        }
        if self.spec_sheets.inverters.trim().is_empty() {
            errors.push(ConfigError::new("spec_sheets.inverters", "must not be empty"));
        }

        let a = &self.assumptions;
        if !(0.0..=1.0).contains(&a.albedo) {
            errors.push(ConfigError::new("assumptions.albedo", "must be in [0.0, 1.0]"));
        }
        if !(0.0..1.0).contains(&a.default_annual_degradation) {
            errors.push(ConfigError::new(
                "assumptions.default_annual_degradation",
                "must be in [0.0, 1.0)",
            ));
        }
        if a.ppa_price < 0.0 {
            errors.push(ConfigError::new("assumptions.ppa_price", "must be >= 0"));
        }

        let run = &self.run;
        if run.include_system_design && !run.include_modules {
            errors.push(ConfigError::new(
                "run.include_system_design",
                "requires run.include_modules (system capacity needs the module rating)",
            ));
        }

        errors
    }

    /// Reads every configured secret from the process environment.
    ///
    /// # Errors
    ///
    /// Returns one `ConfigError` per missing variable.
    pub fn credentials(&self) -> Result<Credentials, Vec<ConfigError>> {
        self.credentials_with(|name| std::env::var(name).ok())
    }

    /// Resolves secrets through an arbitrary lookup.
    pub fn credentials_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, Vec<ConfigError>> {
        let mut errors = Vec::new();
        let mut read = |field: &str, var: &str| match lookup(var) {
            Some(value) if !value.is_empty() => value,
            _ => {
                errors.push(ConfigError::new(
                    field,
                    format!("environment variable {var} is not set"),
                ));
                String::new()
            }
        };

        let design_source_token = read("design_source.token_env", &self.design_source.token_env);
        let catalog_token = read("catalog.token_env", &self.catalog.token_env);
        let nrel_api_key = read("weather.api_key_env", &self.weather.api_key_env);

        if errors.is_empty() {
            Ok(Credentials {
                design_source_token,
                catalog_token,
                nrel_api_key,
            })
        } else {
            Err(errors)
        }
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
