//! Aggregated component and production report for one executed design.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::request::OutputResolution;
use crate::sim::energy::{EnergyQueries, HOURS_PER_YEAR};
use crate::sim::engine::{EngineOutputs, NAMED_OUTPUTS};
use crate::sim::{AssemblyPlan, StatusBoard};

/// Two-letter state and five-digit zip from a US street address.
///
/// Scans for the first `XX 12345` occurrence (uppercase letters, any
/// whitespace run, five digits).
pub fn parse_state_zip(address: &str) -> Option<(String, String)> {
    let bytes = address.as_bytes();
    for start in 0..bytes.len() {
        let Some(state) = bytes.get(start..start + 2) else {
            break;
        };
        if !state.iter().all(u8::is_ascii_uppercase) {
            continue;
        }
        let mut i = start + 2;
        while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        if i == start + 2 {
            continue;
        }
        let Some(zip) = bytes.get(i..i + 5) else {
            continue;
        };
        if zip.iter().all(u8::is_ascii_digit) {
            return Some((
                String::from_utf8_lossy(state).into_owned(),
                String::from_utf8_lossy(zip).into_owned(),
            ));
        }
    }
    None
}

/// `annual_dc_gross` -> `annualDcGross`.
pub fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Flat per-design summary of components, geometry, production and losses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedComponentParams {
    pub tenant_id: String,
    pub design_id: String,
    pub state: String,
    pub zipcode: String,
    pub module_name: String,
    pub module_count: u32,
    pub inverter_name: String,
    pub inverter_count: Option<u32>,
    pub microinverter_name: String,
    pub microinverter_count: Option<u32>,
    pub dc_optimizer_name: Option<String>,
    pub dc_optimizer_count: Option<u32>,
    pub battery_name: Option<String>,
    pub battery_count: Option<u32>,
    pub battery_ac_or_dc_coupled: Option<String>,
    pub batt_power_charge_max_kwac: Option<f64>,
    pub batt_power_discharge_max_kwac: Option<f64>,
    pub batt_computed_bank_capacity: Option<f64>,
    /// Watts at STC.
    pub system_capacity: f64,
    pub number_of_arrays: usize,
    /// Year-1 engine production, kWh.
    pub simulated_annual_production: f64,
    pub aurora_annual_production: Option<f64>,
    /// Monthly production, per-array geometry and named engine outputs,
    /// keyed by their report names.
    #[serde(flatten)]
    pub detail: BTreeMap<String, f64>,
}

impl AggregatedComponentParams {
    /// Builds the report from an executed run.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when the engine outputs do not cover year 1.
    pub fn build(
        tenant_id: &str,
        plan: &AssemblyPlan,
        energy: &EnergyQueries<'_>,
        outputs: &EngineOutputs,
    ) -> Result<Self> {
        let design = &plan.design;
        let (state, zipcode) = parse_state_zip(&design.project.address).unwrap_or_default();
        let mut detail = BTreeMap::new();

        let year_one = energy.months_of_year(1)?;
        for (m, kwh) in year_one.iter().enumerate() {
            detail.insert(format!("simulatedMonth{}Production", m + 1), *kwh);
        }

        if let Some(production) = &design.energy_production {
            for (m, kwh) in production.monthly.iter().take(12).enumerate() {
                detail.insert(format!("auroraMonth{}Production", m + 1), *kwh);
            }
        }

        for (i, array) in design.arrays.iter().enumerate() {
            let n = i + 1;
            let (azimuth, tilt) = plan
                .topology
                .as_ref()
                .and_then(|t| t.subarrays.iter().find(|s| s.index == i))
                .map_or((array.azimuth, array.pitch), |s| (s.azimuth, s.tilt));
            detail.insert(format!("array{n}Azimuth"), azimuth);
            detail.insert(format!("array{n}Tilt"), tilt);
            if let Some(access) = array.annual_solar_access() {
                detail.insert(format!("array{n}AnnualSolarAccess"), access);
            }
            if let Some(tsrf) = array.annual_tsrf() {
                detail.insert(format!("array{n}AnnualTsrf"), tsrf);
            }
        }

        for key in NAMED_OUTPUTS {
            if let Some(value) = outputs.named(key) {
                detail.insert(snake_to_camel(key), value);
            }
        }

        let (inverter_name, inverter_count, microinverter_name, microinverter_count) =
            match &design.microinverter {
                Some(micro) => (String::new(), None, micro.name.clone(), Some(micro.quantity)),
                None => (
                    design.inverter.name.clone(),
                    Some(design.inverter_count()),
                    String::new(),
                    None,
                ),
            };

        let battery = plan.battery.as_ref().filter(|b| b.is_enabled());
        let record = battery.and_then(|b| b.record());

        Ok(Self {
            tenant_id: tenant_id.to_string(),
            design_id: design.design_id.clone(),
            state,
            zipcode,
            module_name: design.module.name.clone(),
            module_count: design.module.quantity,
            inverter_name,
            inverter_count,
            microinverter_name,
            microinverter_count,
            dc_optimizer_name: design.dc_optimizer.as_ref().map(|e| e.name.clone()),
            dc_optimizer_count: design.dc_optimizer.as_ref().map(|e| e.quantity),
            battery_name: battery.map(|_| design.battery.name.clone()),
            battery_count: battery.map(|_| design.battery.quantity),
            battery_ac_or_dc_coupled: battery.and_then(|b| b.coupling()).map(|c| c.to_string()),
            batt_power_charge_max_kwac: record.map(|r| r.batt_power_charge_max_kwac),
            batt_power_discharge_max_kwac: record.map(|r| r.batt_power_discharge_max_kwac),
            batt_computed_bank_capacity: record.map(|r| r.batt_computed_bank_capacity),
            system_capacity: plan.system_capacity,
            number_of_arrays: design.num_arrays(),
            simulated_annual_production: year_one.iter().sum(),
            aurora_annual_production: design.energy_production.as_ref().map(|p| p.annual),
            detail,
        })
    }
}

/// Degraded production at the requested resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyProduction {
    pub resolution: OutputResolution,
    /// One value per analysis year, kWh.
    pub annual: Vec<f64>,
    /// Twelve values per year, year-major.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly: Option<Vec<f64>>,
    /// Year-1 hourly AC output, kW.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly: Option<Vec<f64>>,
}

impl EnergyProduction {
    /// # Errors
    ///
    /// `OutOfRange` when the engine outputs do not cover the horizon.
    pub fn build(
        resolution: OutputResolution,
        energy: &EnergyQueries<'_>,
        outputs: &EngineOutputs,
    ) -> Result<Self> {
        let annual = energy.all_years()?;
        let monthly = match resolution {
            OutputResolution::Year => None,
            OutputResolution::Month | OutputResolution::Hour => Some(energy.all_months()?),
        };
        let hourly = match resolution {
            OutputResolution::Hour => Some(
                outputs
                    .hourly_gen
                    .iter()
                    .take(HOURS_PER_YEAR)
                    .copied()
                    .collect(),
            ),
            _ => None,
        };
        Ok(Self {
            resolution,
            annual,
            monthly,
            hourly,
        })
    }
}

/// Everything returned for one successful simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub components: AggregatedComponentParams,
    pub production: EnergyProduction,
    /// Category name to assignment flag (-1 unset, 1 assigned).
    pub assignment_status: BTreeMap<String, i8>,
}

impl SimulationReport {
    pub fn new(
        components: AggregatedComponentParams,
        production: EnergyProduction,
        statuses: &StatusBoard,
    ) -> Self {
        let assignment_status = statuses
            .iter()
            .map(|(category, status)| (category.to_string(), status.code()))
            .collect();
        Self {
            components,
            production,
            assignment_status,
        }
    }
}
