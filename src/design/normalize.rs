//! Reduces raw design-source responses to the facts assembly depends on.

use tracing::{debug, warn};

use super::types::{
    Array, BomEntry, ComponentType, ConsumptionProfile, DesignSummary, EnergyProductionSummary,
    ProjectSummary, StorageInverter,
};
use crate::error::{Error, Result};

/// Inverter topology of the design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InverterTopology {
    /// One or more string inverters.
    Inverters,
    /// Module-level microinverters.
    Microinverters,
}

impl InverterTopology {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inverters => "inverters",
            Self::Microinverters => "microinverters",
        }
    }
}

/// Power electronics that decide shading tolerance and mismatch losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Electronics {
    StringInverters,
    Microinverters,
    DcOptimizers,
}

impl Electronics {
    /// Module-level power electronics track each module independently.
    pub fn is_module_level(self) -> bool {
        matches!(self, Self::Microinverters | Self::DcOptimizers)
    }
}

/// A design with its project and consumption data, validated for assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDesign {
    pub design_id: String,
    pub project_id: String,
    pub project: ProjectSummary,
    pub consumption: ConsumptionProfile,
    pub module: BomEntry,
    /// Entry supplying inverter parameters (microinverter when both exist).
    pub inverter: BomEntry,
    pub microinverter: Option<BomEntry>,
    pub battery: BomEntry,
    pub dc_optimizer: Option<BomEntry>,
    pub topology: InverterTopology,
    pub string_inverter_count: u32,
    pub electronics: Option<Electronics>,
    pub arrays: Vec<Array>,
    pub storage_inverter: Option<StorageInverter>,
    pub energy_production: Option<EnergyProductionSummary>,
}

impl NormalizedDesign {
    /// Validates and flattens the three upstream documents.
    ///
    /// # Errors
    ///
    /// `DesignIncomplete` when modules or inverters are missing, or when a
    /// string-inverter design lists no string inverters.
    pub fn from_parts(
        design_id: &str,
        summary: DesignSummary,
        project: ProjectSummary,
        consumption: ConsumptionProfile,
    ) -> Result<Self> {
        let mut module = None;
        let mut inverter = None;
        let mut microinverter = None;
        let mut battery = None;
        let mut dc_optimizer = None;

        for entry in &summary.bill_of_materials {
            match entry.component_type {
                ComponentType::Modules => module = Some(entry.clone()),
                ComponentType::Inverters => inverter = Some(entry.clone()),
                ComponentType::Microinverters => {
                    inverter = Some(entry.clone());
                    microinverter = Some(entry.clone());
                }
                ComponentType::Batteries => battery = Some(entry.clone()),
                ComponentType::DcOptimizers => dc_optimizer = Some(entry.clone()),
                ComponentType::Other => {}
            }
        }

        // A string inverter next to microinverters is the storage inverter;
        // the microinverter carries the PV inverter parameters.
        if let Some(micro) = &microinverter {
            inverter = Some(micro.clone());
        }

        let module = module.ok_or_else(|| {
            Error::DesignIncomplete("design does not specify modules".to_string())
        })?;
        let inverter = inverter.ok_or_else(|| {
            Error::DesignIncomplete("design does not specify inverters or microinverters".to_string())
        })?;
        let battery = battery.unwrap_or_else(BomEntry::empty_battery);

        let topology = if inverter.component_type == ComponentType::Microinverters {
            InverterTopology::Microinverters
        } else {
            InverterTopology::Inverters
        };

        let string_inverter_count = match topology {
            InverterTopology::Inverters => {
                let count = summary.string_inverters.as_ref().map_or(0, Vec::len);
                if count == 0 {
                    return Err(Error::DesignIncomplete(format!(
                        "design '{design_id}' lists no string inverters; \
                         inverter_count must be positive"
                    )));
                }
                u32::try_from(count).map_err(|_| {
                    Error::DesignIncomplete(format!("design '{design_id}' lists {count} string inverters"))
                })?
            }
            InverterTopology::Microinverters => 0,
        };

        let electronics = summary
            .bill_of_materials
            .iter()
            .find_map(|entry| match entry.component_type {
                ComponentType::Inverters => Some(Electronics::StringInverters),
                ComponentType::Microinverters => Some(Electronics::Microinverters),
                ComponentType::DcOptimizers => Some(Electronics::DcOptimizers),
                _ => None,
            });

        let arrays = match summary.arrays {
            Some(arrays) => arrays,
            None => {
                warn!(design_id, "no 'arrays' key found in design summary");
                Vec::new()
            }
        };

        let storage_inverter = summary.storage_inverters.and_then(|mut list| list.pop());

        debug!(
            design_id,
            topology = topology.as_str(),
            string_inverter_count,
            arrays = arrays.len(),
            "normalized design"
        );

        Ok(Self {
            design_id: design_id.to_string(),
            project_id: summary.project_id,
            project,
            consumption,
            module,
            inverter,
            microinverter,
            battery,
            dc_optimizer,
            topology,
            string_inverter_count,
            electronics,
            arrays,
            storage_inverter,
            energy_production: summary.energy_production,
        })
    }

    pub fn num_arrays(&self) -> usize {
        self.arrays.len()
    }

    /// String-inverter count when non-zero, otherwise the BOM inverter quantity.
    pub fn inverter_count(&self) -> u32 {
        if self.string_inverter_count == 0 {
            self.inverter.quantity
        } else {
            self.string_inverter_count
        }
    }

    pub fn dc_optimizer_quantity(&self) -> u32 {
        self.dc_optimizer.as_ref().map_or(0, |e| e.quantity)
    }

    /// Point handed to the weather fetcher, as `(longitude, latitude)`.
    pub fn lon_lat(&self) -> (f64, f64) {
        (self.project.longitude, self.project.latitude)
    }

    /// Electronics used for shading and loss rules; string inverters when the
    /// BOM names none.
    pub fn electronics_or_default(&self) -> Electronics {
        self.electronics.unwrap_or(Electronics::StringInverters)
    }
}
