//! Simulation engine collaborator.
//!
//! The physical PV/battery model is opaque: it accepts parameter groups and
//! produces named outputs. [`ReplayEngine`] stands in for it by recording
//! assignments and returning outputs loaded from JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::params::ParameterSet;
use crate::error::{Error, Result};

/// Named scalar outputs reported next to the production series.
pub const NAMED_OUTPUTS: [&str; 33] = [
    "kwh_per_kw",
    "annual_ac_battery_loss_percent",
    "annual_ac_inv_clip_loss_percent",
    "annual_ac_inv_eff_loss_percent",
    "annual_ac_inv_pnt_loss_percent",
    "annual_ac_inv_pso_loss_percent",
    "annual_ac_lifetime_loss_percent",
    "annual_ac_perf_adj_loss_percent",
    "annual_ac_wiring_loss_percent",
    "annual_dc_battery_loss_percent",
    "annual_dc_diodes_loss_percent",
    "annual_dc_lifetime_loss_percent",
    "annual_dc_inv_tdc_loss_percent",
    "annual_dc_mismatch_loss_percent",
    "annual_dc_module_loss_percent",
    "annual_dc_mppt_clip_loss_percent",
    "annual_dc_nameplate_loss_percent",
    "annual_dc_optimizer_loss_percent",
    "annual_dc_perf_adj_loss_percent",
    "annual_dc_snow_loss_percent",
    "annual_dc_tracking_loss_percent",
    "annual_dc_wiring_loss_percent",
    "annual_distribution_clipping_loss_percent",
    "annual_poa_cover_loss_percent",
    "annual_poa_shading_loss_percent",
    "annual_poa_soiling_loss_percent",
    "annual_subhourly_clipping_loss_percent",
    "annual_total_loss_percent",
    "annual_transmission_loss_percent",
    "annual_xfmr_loss_percent",
    "annual_ac_gross",
    "annual_dc_gross",
    "annual_poa_eff",
];

/// Raw diagnostic text from a failed engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFault(pub String);

impl fmt::Display for EngineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The engine's contract: one `assign` per resource category, then
/// `execute` once.
pub trait SimulationEngine {
    fn assign(&mut self, params: &ParameterSet) -> std::result::Result<(), EngineFault>;
    fn execute(&mut self) -> std::result::Result<EngineOutputs, EngineFault>;
}

/// Outputs available after a successful execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineOutputs {
    /// Year-1 AC energy, kWh.
    pub annual_energy: f64,
    /// Year-1 monthly AC energy, kWh.
    pub monthly_energy: Vec<f64>,
    /// Per-timestep AC power over the whole simulated horizon, kW.
    #[serde(rename = "gen", default)]
    pub hourly_gen: Vec<f64>,
    #[serde(default)]
    pub named: BTreeMap<String, f64>,
}

impl EngineOutputs {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            Error::MalformedRecord(format!("engine outputs {}: {e}", path.display()))
        })
    }

    pub fn named(&self, key: &str) -> Option<f64> {
        self.named.get(key).copied()
    }
}

/// First two non-blank lines of an engine diagnostic, whitespace-collapsed
/// and joined by a space.
pub fn first_informative_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Engine double that records assignments and replays canned outputs.
#[derive(Debug, Clone, Default)]
pub struct ReplayEngine {
    outputs: Option<EngineOutputs>,
    execute_failure: Option<String>,
    reject_group: Option<(String, String)>,
    assignments: Vec<ParameterSet>,
    executions: usize,
}

impl ReplayEngine {
    /// Engine that returns `outputs` on execute.
    pub fn new(outputs: EngineOutputs) -> Self {
        Self {
            outputs: Some(outputs),
            ..Self::default()
        }
    }

    /// Engine that only records; execute fails.
    pub fn recording() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        Ok(Self::new(EngineOutputs::from_json_file(path)?))
    }

    /// Execute fails with `diagnostic`.
    pub fn failing(diagnostic: &str) -> Self {
        Self {
            execute_failure: Some(diagnostic.to_string()),
            ..Self::default()
        }
    }

    /// Assign fails for any set containing `group`.
    pub fn rejecting(mut self, group: &str, message: &str) -> Self {
        self.reject_group = Some((group.to_string(), message.to_string()));
        self
    }

    pub fn assignments(&self) -> &[ParameterSet] {
        &self.assignments
    }

    pub fn executions(&self) -> usize {
        self.executions
    }

    /// Every assigned group merged in assignment order.
    pub fn merged(&self) -> ParameterSet {
        let mut merged = ParameterSet::new();
        for set in &self.assignments {
            merged.merge(set);
        }
        merged
    }
}

impl SimulationEngine for ReplayEngine {
    fn assign(&mut self, params: &ParameterSet) -> std::result::Result<(), EngineFault> {
        if let Some((group, message)) = &self.reject_group {
            if params.group(group).is_some() {
                return Err(EngineFault(message.clone()));
            }
        }
        self.assignments.push(params.clone());
        Ok(())
    }

    fn execute(&mut self) -> std::result::Result<EngineOutputs, EngineFault> {
        self.executions += 1;
        if let Some(diagnostic) = &self.execute_failure {
            return Err(EngineFault(diagnostic.clone()));
        }
        self.outputs
            .clone()
            .ok_or_else(|| EngineFault("no outputs loaded for replay".to_string()))
    }
}
