//! Battery resolution: coupling inference, storage-inverter pairing and
//! quantity scaling of bank-level parameters.

use std::fmt;

use serde::Deserialize;
use tracing::{debug, warn};

use super::catalog::{ComponentCatalog, ComponentCategory, fetch_record};
use crate::design::InverterTopology;
use crate::design::types::StorageInverter;
use crate::error::{Error, Result};
use crate::sim::params::ParamGroup;

/// Battery models sold only as AC-coupled systems.
const AC_ONLY_BATTERY: &str = "ENCHARGE-10-1P-NA";
/// PV inverter with an integrated battery inverter.
const AC_ONLY_INVERTER: &str = "Powerwall 3 (integrated inverter)";
const QSAVE_BATTERIES: [&str; 3] = ["Q.SAVE D15.0SX", "Q.SAVE D10.0SX", "Q.SAVE D20.0SX"];
const QVOLT_INVERTERS: [&str; 2] = ["Q.VOLT H3.8SX", "Q.VOLT H7.6SX"];
/// Batteries catalogued without a storage-inverter segment.
const STANDALONE_BATTERIES: [&str; 2] = ["Powerwall 3", AC_ONLY_BATTERY];

/// Whether the battery sits on the AC or the DC side of the PV inverter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coupling {
    Ac,
    Dc,
}

impl Coupling {
    /// Value of the engine's `batt_ac_or_dc` flag.
    pub fn engine_flag(self) -> f64 {
        match self {
            Self::Ac => 1.0,
            Self::Dc => 0.0,
        }
    }
}

impl fmt::Display for Coupling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ac => "AC",
            Self::Dc => "DC",
        })
    }
}

/// Everything the resolver needs to know about the battery's surroundings.
#[derive(Debug, Clone, Copy)]
pub struct BatteryContext<'a> {
    pub name: &'a str,
    pub quantity: u32,
    pub inverter_name: &'a str,
    pub topology: InverterTopology,
    pub storage_inverter: Option<&'a StorageInverter>,
    pub has_dc_optimizers: bool,
    pub num_arrays: usize,
}

/// Infers coupling. Checked in order: microinverter topology, DC optimizers,
/// AC-only battery, AC-only inverter, more than one array.
pub fn infer_coupling(ctx: &BatteryContext<'_>) -> Coupling {
    if ctx.topology == InverterTopology::Microinverters
        || ctx.has_dc_optimizers
        || ctx.name == AC_ONLY_BATTERY
        || ctx.inverter_name == AC_ONLY_INVERTER
        || ctx.num_arrays > 1
    {
        Coupling::Ac
    } else {
        Coupling::Dc
    }
}

/// Q.SAVE batteries only pair with Q.VOLT storage inverters.
pub fn check_pairing(battery: &str, storage_inverter: &StorageInverter) -> Result<()> {
    if QSAVE_BATTERIES.contains(&battery) && !QVOLT_INVERTERS.contains(&storage_inverter.name.as_str())
    {
        return Err(Error::IncompatiblePairing(format!(
            "storage inverter for {battery} must be one of {}, got '{}'",
            QVOLT_INVERTERS.join(", "),
            storage_inverter.name
        )));
    }
    Ok(())
}

/// Catalog key: `{AC|DC}_{storage inverter}_{battery}` for recognized
/// storage inverters, otherwise `{AC|DC}_{battery}`.
pub fn composite_id(coupling: Coupling, battery: &str, storage_inverter: &StorageInverter) -> String {
    let storage = storage_inverter.name.as_str();
    if QVOLT_INVERTERS.contains(&storage) && !STANDALONE_BATTERIES.contains(&battery) {
        format!("{coupling}_{storage}_{battery}")
    } else {
        format!("{coupling}_{battery}")
    }
}

/// Full battery record as stored in the catalog (per unit).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(non_snake_case)]
pub struct BatteryRecord {
    pub en_batt: f64,
    pub batt_ac_dc_efficiency: f64,
    pub batt_dc_ac_efficiency: f64,
    pub batt_dc_dc_efficiency: f64,
    pub batt_ac_or_dc: f64,
    pub batt_computed_bank_capacity: f64,
    pub batt_power_charge_max_kwdc: f64,
    pub batt_power_charge_max_kwac: f64,
    pub batt_power_discharge_max_kwdc: f64,
    pub batt_power_discharge_max_kwac: f64,
    pub batt_meter_position: f64,
    pub batt_computed_series: f64,
    pub batt_computed_strings: f64,
    pub batt_surface_area: f64,
    pub batt_mass: f64,
    pub batt_current_charge_max: f64,
    pub batt_current_discharge_max: f64,
    pub batt_replacement_capacity: f64,
    pub batt_replacement_option: f64,
    pub batt_inverter_efficiency_cutoff: f64,
    pub batt_current_choice: f64,
    pub batt_chem: f64,
    pub batt_lifetime_matrix: Vec<Vec<f64>>,
    pub batt_calendar_choice: Vec<f64>,
    pub batt_calendar_q0: Vec<f64>,
    pub batt_calendar_a: Vec<f64>,
    pub batt_calendar_b: f64,
    pub batt_calendar_c: f64,
    pub batt_voltage_matrix: Vec<Vec<f64>>,
    pub batt_Vfull: f64,
    pub batt_Vexp: Vec<f64>,
    pub batt_Vnom_default: Vec<f64>,
    pub batt_Vnom: Vec<f64>,
    pub batt_Vcut: f64,
    pub batt_Qfull_flow: f64,
    pub batt_Qfull: f64,
    pub batt_Qnom: f64,
    pub batt_Qexp: f64,
    pub batt_C_rate: f64,
    pub batt_life_model: f64,
    pub batt_initial_SOC: f64,
    pub batt_maximum_SOC: f64,
    pub batt_minimum_SOC: Vec<f64>,
    pub batt_minimum_outage_SOC: Vec<f64>,
    pub batt_minimum_modetime: f64,
    pub batt_resistance: f64,
    pub batt_h_to_ambient: Vec<f64>,
    pub batt_Cp: f64,
    pub batt_room_temperature_celsius: Vec<f64>,
    pub cap_vs_temp: Vec<Vec<f64>>,
    pub batt_calendar_lifetime_matrix: Vec<Vec<f64>>,
    pub batt_voltage_choice: f64,
}

impl BatteryRecord {
    /// Multiplies the bank-level parameters by the unit count.
    pub fn scale_by_quantity(&mut self, quantity: u32) {
        let q = f64::from(quantity);
        for value in [
            &mut self.batt_computed_bank_capacity,
            &mut self.batt_power_charge_max_kwdc,
            &mut self.batt_power_charge_max_kwac,
            &mut self.batt_power_discharge_max_kwdc,
            &mut self.batt_power_discharge_max_kwac,
            &mut self.batt_computed_strings,
            &mut self.batt_surface_area,
            &mut self.batt_mass,
            &mut self.batt_current_charge_max,
            &mut self.batt_current_discharge_max,
        ] {
            *value *= q;
        }
    }
}

/// Dispatch settings attached to every enabled battery.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchDefaults {
    /// 5 = self-consumption.
    pub dispatch_choice: f64,
    pub btm_can_discharge_to_grid: f64,
    pub can_gridcharge: f64,
    pub charge_only_system_exceeds_load: f64,
    pub discharge_only_load_exceeds_system: f64,
    /// 0 = engine cost model, 1 = `cycle_cost` input.
    pub cycle_cost_choice: f64,
    pub cycle_cost: Vec<f64>,
}

impl Default for DispatchDefaults {
    fn default() -> Self {
        Self {
            dispatch_choice: 5.0,
            btm_can_discharge_to_grid: 1.0,
            can_gridcharge: 1.0,
            charge_only_system_exceeds_load: 0.0,
            discharge_only_load_exceeds_system: 0.0,
            cycle_cost_choice: 0.0,
            cycle_cost: vec![0.1],
        }
    }
}

/// A battery ready for assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedBattery {
    /// No battery in the design (`en_batt = 0`).
    Disabled,
    Enabled {
        name: String,
        quantity: u32,
        catalog_id: String,
        coupling: Coupling,
        record: Box<BatteryRecord>,
        dispatch: DispatchDefaults,
    },
}

/// Resolves the battery, if any, for a design.
///
/// # Errors
///
/// `IncompatiblePairing` for a Q.SAVE battery without a Q.VOLT storage
/// inverter, `ComponentNotFound` when the composite id is not catalogued.
pub fn resolve_battery(catalog: &impl ComponentCatalog, ctx: &BatteryContext<'_>) -> Result<ResolvedBattery> {
    let fallback = StorageInverter::fallback();
    let storage = ctx.storage_inverter.unwrap_or(&fallback);
    check_pairing(ctx.name, storage)?;

    if ctx.name.is_empty() {
        return Ok(ResolvedBattery::Disabled);
    }

    let coupling = infer_coupling(ctx);
    let catalog_id = composite_id(coupling, ctx.name, storage);
    debug!(catalog_id, %coupling, "resolving battery");

    let mut record: BatteryRecord = fetch_record(catalog, ComponentCategory::Batteries, &catalog_id)?;
    record.scale_by_quantity(ctx.quantity);

    if record.batt_ac_or_dc != coupling.engine_flag() {
        warn!(
            catalog_id,
            record_flag = record.batt_ac_or_dc,
            %coupling,
            "catalog coupling flag disagrees with inferred coupling; using inferred"
        );
        record.batt_ac_or_dc = coupling.engine_flag();
    }

    Ok(ResolvedBattery::Enabled {
        name: ctx.name.to_string(),
        quantity: ctx.quantity,
        catalog_id,
        coupling,
        record: Box::new(record),
        dispatch: DispatchDefaults::default(),
    })
}

impl ResolvedBattery {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    pub fn coupling(&self) -> Option<Coupling> {
        match self {
            Self::Enabled { coupling, .. } => Some(*coupling),
            Self::Disabled => None,
        }
    }

    pub fn record(&self) -> Option<&BatteryRecord> {
        match self {
            Self::Enabled { record, .. } => Some(record),
            Self::Disabled => None,
        }
    }

    /// `BatterySystem` group; only `en_batt` when disabled.
    pub fn system_params(&self) -> ParamGroup {
        let mut g = ParamGroup::new();
        let Self::Enabled { record: r, .. } = self else {
            g.insert("en_batt", 0.0);
            return g;
        };
        g.insert("en_batt", 1.0);
        g.insert("batt_ac_dc_efficiency", r.batt_ac_dc_efficiency);
        g.insert("batt_dc_ac_efficiency", r.batt_dc_ac_efficiency);
        g.insert("batt_dc_dc_efficiency", r.batt_dc_dc_efficiency);
        g.insert("batt_ac_or_dc", r.batt_ac_or_dc);
        g.insert("batt_computed_bank_capacity", r.batt_computed_bank_capacity);
        g.insert("batt_power_charge_max_kwdc", r.batt_power_charge_max_kwdc);
        g.insert("batt_power_charge_max_kwac", r.batt_power_charge_max_kwac);
        g.insert("batt_power_discharge_max_kwdc", r.batt_power_discharge_max_kwdc);
        g.insert("batt_power_discharge_max_kwac", r.batt_power_discharge_max_kwac);
        g.insert("batt_meter_position", r.batt_meter_position);
        g.insert("batt_computed_series", r.batt_computed_series);
        g.insert("batt_computed_strings", r.batt_computed_strings);
        g.insert("batt_surface_area", r.batt_surface_area);
        g.insert("batt_mass", r.batt_mass);
        g.insert("batt_current_charge_max", r.batt_current_charge_max);
        g.insert("batt_current_discharge_max", r.batt_current_discharge_max);
        g.insert("batt_replacement_capacity", r.batt_replacement_capacity);
        g.insert("batt_replacement_option", r.batt_replacement_option);
        g.insert("batt_inverter_efficiency_cutoff", r.batt_inverter_efficiency_cutoff);
        g.insert("batt_current_choice", r.batt_current_choice);
        g
    }

    /// `BatteryCell` group; `None` when disabled.
    pub fn cell_params(&self) -> Option<ParamGroup> {
        let r = self.record()?;
        let mut g = ParamGroup::new();
        g.insert("batt_chem", r.batt_chem);
        g.insert("batt_lifetime_matrix", r.batt_lifetime_matrix.clone());
        g.insert("batt_calendar_choice", r.batt_calendar_choice.clone());
        g.insert("batt_calendar_q0", r.batt_calendar_q0.clone());
        g.insert("batt_calendar_a", r.batt_calendar_a.clone());
        g.insert("batt_calendar_b", r.batt_calendar_b);
        g.insert("batt_calendar_c", r.batt_calendar_c);
        g.insert("batt_voltage_matrix", r.batt_voltage_matrix.clone());
        g.insert("batt_Vfull", r.batt_Vfull);
        g.insert("batt_Vexp", r.batt_Vexp.clone());
        g.insert("batt_Vnom_default", r.batt_Vnom_default.clone());
        g.insert("batt_Vnom", r.batt_Vnom.clone());
        g.insert("batt_Vcut", r.batt_Vcut);
        g.insert("batt_Qfull_flow", r.batt_Qfull_flow);
        g.insert("batt_Qfull", r.batt_Qfull);
        g.insert("batt_Qnom", r.batt_Qnom);
        g.insert("batt_Qexp", r.batt_Qexp);
        g.insert("batt_C_rate", r.batt_C_rate);
        g.insert("batt_life_model", r.batt_life_model);
        g.insert("batt_initial_SOC", r.batt_initial_SOC);
        g.insert("batt_maximum_SOC", r.batt_maximum_SOC);
        g.insert("batt_minimum_SOC", r.batt_minimum_SOC.clone());
        g.insert("batt_minimum_outage_SOC", r.batt_minimum_outage_SOC.clone());
        g.insert("batt_minimum_modetime", r.batt_minimum_modetime);
        g.insert("batt_resistance", r.batt_resistance);
        g.insert("batt_h_to_ambient", r.batt_h_to_ambient.clone());
        g.insert("batt_Cp", r.batt_Cp);
        g.insert("batt_room_temperature_celsius", r.batt_room_temperature_celsius.clone());
        g.insert("cap_vs_temp", r.cap_vs_temp.clone());
        g.insert("batt_calendar_lifetime_matrix", r.batt_calendar_lifetime_matrix.clone());
        g.insert("batt_voltage_choice", r.batt_voltage_choice);
        Some(g)
    }

    /// `BatteryDispatch` group; `None` when disabled.
    pub fn dispatch_params(&self) -> Option<ParamGroup> {
        let Self::Enabled { dispatch: d, .. } = self else {
            return None;
        };
        let mut g = ParamGroup::new();
        g.insert("batt_dispatch_choice", d.dispatch_choice);
        g.insert("batt_dispatch_auto_btm_can_discharge_to_grid", d.btm_can_discharge_to_grid);
        g.insert("batt_dispatch_auto_can_gridcharge", d.can_gridcharge);
        g.insert(
            "batt_dispatch_charge_only_system_exceeds_load",
            d.charge_only_system_exceeds_load,
        );
        g.insert(
            "batt_dispatch_discharge_only_load_exceeds_system",
            d.discharge_only_load_exceeds_system,
        );
        g.insert("batt_cycle_cost_choice", d.cycle_cost_choice);
        g.insert("batt_cycle_cost", d.cycle_cost.clone());
        Some(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::catalog::StaticCatalog;

    fn battery_record(ac_or_dc: f64) -> serde_json::Value {
        serde_json::json!({
            "en_batt": 1, "batt_ac_dc_efficiency": 96, "batt_dc_ac_efficiency": 96,
            "batt_dc_dc_efficiency": 99, "batt_ac_or_dc": ac_or_dc,
            "batt_computed_bank_capacity": 10.0, "batt_power_charge_max_kwdc": 5.0,
            "batt_power_charge_max_kwac": 5.2, "batt_power_discharge_max_kwdc": 5.0,
            "batt_power_discharge_max_kwac": 4.8, "batt_meter_position": 0,
            "batt_computed_series": 139, "batt_computed_strings": 1,
            "batt_surface_area": 2.0, "batt_mass": 100.0, "batt_current_charge_max": 10.0,
            "batt_current_discharge_max": 10.0, "batt_replacement_capacity": 50,
            "batt_replacement_option": 0, "batt_inverter_efficiency_cutoff": 90,
            "batt_current_choice": 1, "batt_chem": 1,
            "batt_lifetime_matrix": [[20, 0, 100], [20, 5000, 80]],
            "batt_calendar_choice": [1], "batt_calendar_q0": [1.02],
            "batt_calendar_a": [0.00266], "batt_calendar_b": -7280, "batt_calendar_c": 930,
            "batt_voltage_matrix": [[0, 0]], "batt_Vfull": 4.2, "batt_Vexp": [4.05],
            "batt_Vnom_default": [3.6], "batt_Vnom": [3.4], "batt_Vcut": 2.7,
            "batt_Qfull_flow": 0, "batt_Qfull": 3.2, "batt_Qnom": 3, "batt_Qexp": 2.6,
            "batt_C_rate": 0.2, "batt_life_model": 0, "batt_initial_SOC": 50,
            "batt_maximum_SOC": 95, "batt_minimum_SOC": [15], "batt_minimum_outage_SOC": [10],
            "batt_minimum_modetime": 10, "batt_resistance": 0.001, "batt_h_to_ambient": [5],
            "batt_Cp": 1500, "batt_room_temperature_celsius": [25],
            "cap_vs_temp": [[-10, 60], [0, 80], [25, 100]],
            "batt_calendar_lifetime_matrix": [[0, 100], [3650, 80]],
            "batt_voltage_choice": 0
        })
    }

    fn ctx<'a>(name: &'a str, storage: Option<&'a StorageInverter>) -> BatteryContext<'a> {
        BatteryContext {
            name,
            quantity: 2,
            inverter_name: "Q.VOLT H7.6SX",
            topology: InverterTopology::Inverters,
            storage_inverter: storage,
            has_dc_optimizers: false,
            num_arrays: 1,
        }
    }

    fn storage(name: &str) -> StorageInverter {
        StorageInverter {
            name: name.to_string(),
            ..StorageInverter::fallback()
        }
    }

    #[test]
    fn string_inverter_single_array_is_dc() {
        assert_eq!(infer_coupling(&ctx("Q.SAVE D10.0SX", None)), Coupling::Dc);
    }

    #[test]
    fn each_ac_trigger_forces_ac() {
        let base = ctx("Q.SAVE D10.0SX", None);
        let cases = [
            BatteryContext { topology: InverterTopology::Microinverters, ..base },
            BatteryContext { has_dc_optimizers: true, ..base },
            BatteryContext { name: AC_ONLY_BATTERY, ..base },
            BatteryContext { inverter_name: AC_ONLY_INVERTER, ..base },
            BatteryContext { num_arrays: 2, ..base },
        ];
        for c in cases {
            assert_eq!(infer_coupling(&c), Coupling::Ac, "{c:?}");
        }
    }

    #[test]
    fn qsave_requires_qvolt() {
        for battery in QSAVE_BATTERIES {
            assert!(check_pairing(battery, &storage("Q.VOLT H3.8SX")).is_ok());
            assert!(check_pairing(battery, &storage("Q.VOLT H7.6SX")).is_ok());
            let err = check_pairing(battery, &storage("SolarEdge Home Hub")).err();
            assert!(matches!(err, Some(Error::IncompatiblePairing(_))));
        }
        assert!(check_pairing("ENCHARGE-10-1P-NA", &storage("SolarEdge Home Hub")).is_ok());
    }

    #[test]
    fn composite_id_includes_recognized_storage_inverter() {
        let qvolt = storage("Q.VOLT H7.6SX");
        assert_eq!(
            composite_id(Coupling::Dc, "Q.SAVE D10.0SX", &qvolt),
            "DC_Q.VOLT H7.6SX_Q.SAVE D10.0SX"
        );
        assert_eq!(composite_id(Coupling::Ac, "Powerwall 3", &qvolt), "AC_Powerwall 3");
        assert_eq!(
            composite_id(Coupling::Ac, "ENCHARGE-10-1P-NA", &qvolt),
            "AC_ENCHARGE-10-1P-NA"
        );
        assert_eq!(
            composite_id(Coupling::Ac, "Home Battery", &storage("Other Hub")),
            "AC_Home Battery"
        );
    }

    #[test]
    fn empty_name_disables_battery() {
        let catalog = StaticCatalog::new();
        let b = resolve_battery(&catalog, &BatteryContext { quantity: 0, ..ctx("", None) })
            .expect("empty battery resolves");
        assert_eq!(b, ResolvedBattery::Disabled);
        let system = b.system_params();
        assert_eq!(system.len(), 1);
        assert_eq!(system.get("en_batt").and_then(|v| v.as_f64()), Some(0.0));
        assert!(b.cell_params().is_none());
        assert!(b.dispatch_params().is_none());
    }

    #[test]
    fn quantity_scales_only_bank_parameters() {
        let catalog = StaticCatalog::new().with(
            ComponentCategory::Batteries,
            "DC_Q.VOLT H7.6SX_Q.SAVE D10.0SX",
            battery_record(0.0),
        );
        let b = resolve_battery(&catalog, &ctx("Q.SAVE D10.0SX", None)).expect("Q.SAVE resolves");
        let r = b.record().expect("battery enabled");
        assert_eq!(r.batt_computed_bank_capacity, 20.0);
        assert_eq!(r.batt_power_charge_max_kwac, 10.4);
        assert_eq!(r.batt_computed_strings, 2.0);
        assert_eq!(r.batt_mass, 200.0);
        assert_eq!(r.batt_computed_series, 139.0);
        assert_eq!(r.batt_Vfull, 4.2);
    }

    #[test]
    fn coupling_flag_follows_inference() {
        let catalog = StaticCatalog::new().with(
            ComponentCategory::Batteries,
            "AC_Q.VOLT H7.6SX_Q.SAVE D10.0SX",
            battery_record(0.0),
        );
        let c = BatteryContext { num_arrays: 3, ..ctx("Q.SAVE D10.0SX", None) };
        let b = resolve_battery(&catalog, &c).expect("AC battery resolves");
        assert_eq!(b.coupling(), Some(Coupling::Ac));
        assert_eq!(
            b.system_params().get("batt_ac_or_dc").and_then(|v| v.as_f64()),
            Some(1.0)
        );
    }

    #[test]
    fn enabled_battery_carries_dispatch_defaults() {
        let catalog = StaticCatalog::new().with(
            ComponentCategory::Batteries,
            "DC_Q.VOLT H7.6SX_Q.SAVE D10.0SX",
            battery_record(0.0),
        );
        let b = resolve_battery(&catalog, &ctx("Q.SAVE D10.0SX", None)).expect("Q.SAVE resolves");
        let dispatch = b.dispatch_params().expect("enabled battery dispatches");
        assert_eq!(
            dispatch.get("batt_dispatch_choice").and_then(|v| v.as_f64()),
            Some(5.0)
        );
        assert_eq!(
            dispatch.get("batt_cycle_cost_choice").and_then(|v| v.as_f64()),
            Some(0.0)
        );
        assert_eq!(b.cell_params().map(|g| g.len()), Some(31));
    }

    #[test]
    fn uncatalogued_battery_is_not_found() {
        let catalog = StaticCatalog::new();
        let err = resolve_battery(&catalog, &ctx("Q.SAVE D10.0SX", None)).err();
        assert!(matches!(
            err,
            Some(Error::ComponentNotFound { ref id, .. }) if id == "DC_Q.VOLT H7.6SX_Q.SAVE D10.0SX"
        ));
    }
}
