//! Wire shapes returned by the design-source API.
//!
//! These mirror the upstream JSON loosely: unknown fields are ignored since
//! the service adds fields freely, and only what assembly needs is modelled.

use serde::Deserialize;

/// Component category of a bill-of-materials entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Modules,
    Inverters,
    Microinverters,
    Batteries,
    DcOptimizers,
    #[serde(other)]
    Other,
}

/// One bill-of-materials line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BomEntry {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub component_type: ComponentType,
}

impl BomEntry {
    /// Placeholder used when a design carries no battery.
    pub fn empty_battery() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            quantity: 0,
            component_type: ComponentType::Batteries,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleGroup {
    pub count: u32,
    pub orientation: Orientation,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Count {
    pub count: u32,
}

/// Annual and monthly percentages for one shading metric.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ShadingMetric {
    pub annual: Option<f64>,
    pub monthly: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Shading {
    pub solar_access: Option<ShadingMetric>,
    pub total_solar_resource_fraction: Option<ShadingMetric>,
}

/// One physical sub-array of the design.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Array {
    /// Tilt in degrees.
    pub pitch: f64,
    pub azimuth: f64,
    pub module: ModuleGroup,
    /// String count; only present for string-inverter designs.
    pub strings: Option<Count>,
    pub shading: Option<Shading>,
}

impl Array {
    pub fn monthly_solar_access(&self) -> Option<&[f64]> {
        self.shading
            .as_ref()?
            .solar_access
            .as_ref()?
            .monthly
            .as_deref()
    }

    pub fn annual_solar_access(&self) -> Option<f64> {
        self.shading.as_ref()?.solar_access.as_ref()?.annual
    }

    pub fn annual_tsrf(&self) -> Option<f64> {
        self.shading
            .as_ref()?
            .total_solar_resource_fraction
            .as_ref()?
            .annual
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageInverter {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub rated_power: Option<f64>,
    pub manufacturer: Option<String>,
}

impl StorageInverter {
    /// Device assumed when a design pairs a battery with no storage inverter.
    pub fn fallback() -> Self {
        Self {
            id: "fb249b44-ac5c-4da5-9a86-cb0ac8fb8bf5".to_string(),
            name: "Q.VOLT H7.6SX".to_string(),
            rated_power: Some(7608.0),
            manufacturer: Some("Qcells".to_string()),
        }
    }
}

/// The design source's own production estimate.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EnergyProductionSummary {
    pub annual: f64,
    #[serde(default)]
    pub monthly: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DesignSummary {
    pub project_id: String,
    pub bill_of_materials: Vec<BomEntry>,
    pub arrays: Option<Vec<Array>>,
    pub string_inverters: Option<Vec<serde_json::Value>>,
    pub storage_inverters: Option<Vec<StorageInverter>>,
    pub energy_production: Option<EnergyProductionSummary>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectSummary {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsumptionProfile {
    pub hourly_energy: Vec<f64>,
    pub utility: Option<String>,
    pub utility_rate_version_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DesignEnvelope {
    pub design: DesignSummary,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectEnvelope {
    pub project: ProjectSummary,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConsumptionEnvelope {
    pub consumption_profile: ConsumptionProfile,
}
