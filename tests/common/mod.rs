//! Shared fakes and fixtures for integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use pvsim_assembly::components::{
    ComponentCatalog, ComponentCategory, SpecSheet, SpecSheets, StaticCatalog,
};
use pvsim_assembly::design::DesignSource;
use pvsim_assembly::design::types::{ConsumptionProfile, DesignSummary, ProjectSummary};
use pvsim_assembly::error::{Error, Result};
use pvsim_assembly::sim::energy::HOURS_PER_YEAR;
use pvsim_assembly::sim::{EngineOutputs, RunTarget, Sources};
use pvsim_assembly::weather::WeatherResource;
use tracing_subscriber::fmt::MakeWriter;

pub const TENANT_ID: &str = "8c1f2a55-0b7e-4d3c-9a61-2f4e5d6c7b8a";
pub const DESIGN_ID: &str = "1b2c3d4e-5f60-4718-92a3-b4c5d6e7f809";
pub const MODULE: &str = "Q.PEAK DUO BLK ML-G10+ 400";
pub const INVERTER: &str = "Q.VOLT H7.6SX";
pub const MICROINVERTER: &str = "IQ8M";
pub const BATTERY: &str = "Q.SAVE D10.0SX";

const MODULES_CSV: &str = "\
Name,Bifacial,STC,A_c,N_s,I_sc_ref,V_oc_ref,I_mp_ref,V_mp_ref,alpha_sc,beta_oc,T_NOCT,a_ref,I_L_ref,I_o_ref,R_s,R_sh_ref,Adjust,gamma_r
Hanwha Q CELLS Q.PEAK DUO BLK ML-G10+ 400,0,400,1.88,132,11.14,45.3,10.77,37.13,0.0045,-0.122,45,1.8,11.15,1.1e-11,0.2,300,8.1,-0.35
";

const INVERTERS_CSV: &str = "\
Name,Vac,Pso,Paco,Pdco,Vdco,C0,C1,C2,C3,Pnt,Vdcmax,Mppt_low,Mppt_high
Qcells : Q.VOLT H7.6SX [240V],240,15,7600,7800,380,-1e-6,2e-5,1e-3,-2e-4,2.3,480,100,480
Enphase Energy Inc : IQ8M-72-2-US [240V],240,0.1,330,335,36,-3e-5,1e-4,2e-3,-5e-2,0.1,60,27,45
";

pub fn spec_sheets() -> SpecSheets {
    let modules = SpecSheet::from_reader(ComponentCategory::Modules, MODULES_CSV.as_bytes())
        .expect("module sheet parses");
    let inverters = SpecSheet::from_reader(ComponentCategory::Inverters, INVERTERS_CSV.as_bytes())
        .expect("inverter sheet parses");
    SpecSheets { modules, inverters }
}

pub fn battery_record(ac_or_dc: f64) -> serde_json::Value {
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

/// Catalog holding the fixture module, both inverters and the Q.SAVE
/// battery in both couplings.
pub fn catalog() -> StaticCatalog {
    StaticCatalog::new()
        .with(
            ComponentCategory::Modules,
            MODULE,
            serde_json::json!({
                "mod_length": 1.879,
                "mod_width": 1.045,
                "cec_bifacial_transmission_factor": 0,
                "cec_bifaciality": 0,
                "cec_bifacial_ground_clearance_height": 0,
                "cec_standoff": 6,
                "cec_height": 0,
                "cec_transient_thermal_model_unit_mass": 11.09
            }),
        )
        .with(
            ComponentCategory::Inverters,
            INVERTER,
            serde_json::json!({
                "inv_tdc_cec_db": "[[1300.0, 50.0, -0.02]]",
                "inv_snl_eff_cec": 97.5
            }),
        )
        .with(
            ComponentCategory::Inverters,
            MICROINVERTER,
            serde_json::json!({
                "inv_tdc_cec_db": [[60.0, 52.8, -0.021]],
                "inv_snl_eff_cec": 97.0
            }),
        )
        .with(
            ComponentCategory::Batteries,
            &format!("DC_{INVERTER}_{BATTERY}"),
            battery_record(0.0),
        )
        .with(
            ComponentCategory::Batteries,
            &format!("AC_{INVERTER}_{BATTERY}"),
            battery_record(1.0),
        )
}

/// Catalog wrapper counting every lookup.
pub struct CountingCatalog {
    inner: StaticCatalog,
    calls: Cell<usize>,
}

impl CountingCatalog {
    pub fn new(inner: StaticCatalog) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ComponentCatalog for CountingCatalog {
    fn get_component(
        &self,
        category: ComponentCategory,
        id: &str,
    ) -> Result<Option<serde_json::Value>> {
        self.calls.set(self.calls.get() + 1);
        self.inner.get_component(category, id)
    }
}

/// Weather fetcher that hands back a fixed path.
pub struct FakeWeather {
    path: PathBuf,
    calls: Cell<usize>,
}

impl FakeWeather {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("/data/weather/nsrdb_40.0_-105.0_psm3-tmy_60_tmy.csv"),
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl WeatherResource for FakeWeather {
    fn fetch(&self, _lon: f64, _lat: f64) -> Result<std::path::PathBuf> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.path.clone())
    }
}

/// Design source serving one design from JSON documents.
pub struct FakeDesignSource {
    pub design: serde_json::Value,
    pub project: serde_json::Value,
    pub consumption: serde_json::Value,
}

fn decode<T: serde::de::DeserializeOwned>(value: &serde_json::Value) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|e| Error::UpstreamError(e.to_string()))
}

impl DesignSource for FakeDesignSource {
    fn design_summary(&self, _tenant_id: &str, _design_id: &str) -> Result<DesignSummary> {
        decode(&self.design)
    }

    fn project_summary(&self, _tenant_id: &str, _project_id: &str) -> Result<ProjectSummary> {
        decode(&self.project)
    }

    fn consumption_profile(
        &self,
        _tenant_id: &str,
        _project_id: &str,
    ) -> Result<ConsumptionProfile> {
        decode(&self.consumption)
    }
}

/// String-inverter array: `modules` modules in `strings` strings.
pub fn array(modules: u32, strings: u32, azimuth: f64) -> serde_json::Value {
    serde_json::json!({
        "pitch": 20.0,
        "azimuth": azimuth,
        "module": {"count": modules, "orientation": "portrait"},
        "strings": {"count": strings},
        "shading": {
            "solar_access": {"annual": 95.0, "monthly": vec![95.0; 12]},
            "total_solar_resource_fraction": {"annual": 88.0}
        }
    })
}

/// Single string inverter with the Q.SAVE battery and the given arrays.
pub fn string_design(arrays: Vec<serde_json::Value>, battery: bool) -> FakeDesignSource {
    let modules: u64 = arrays
        .iter()
        .filter_map(|a| a["module"]["count"].as_u64())
        .sum();
    let mut bom = vec![
        serde_json::json!({"name": MODULE, "quantity": modules, "component_type": "modules"}),
        serde_json::json!({"name": INVERTER, "quantity": 1, "component_type": "inverters"}),
    ];
    if battery {
        bom.push(serde_json::json!({"name": BATTERY, "quantity": 1, "component_type": "batteries"}));
    }
    FakeDesignSource {
        design: serde_json::json!({
            "project_id": "p-1",
            "bill_of_materials": bom,
            "arrays": arrays,
            "string_inverters": [{"id": "si-1"}],
            "storage_inverters": [{"name": INVERTER, "rated_power": 7600.0}],
            "energy_production": {"annual": 9000.0, "monthly": vec![750.0; 12]}
        }),
        project: project(),
        consumption: consumption(),
    }
}

/// Microinverter design without a battery.
pub fn micro_design(arrays: Vec<serde_json::Value>) -> FakeDesignSource {
    let modules: u64 = arrays
        .iter()
        .filter_map(|a| a["module"]["count"].as_u64())
        .sum();
    FakeDesignSource {
        design: serde_json::json!({
            "project_id": "p-2",
            "bill_of_materials": [
                {"name": MODULE, "quantity": modules, "component_type": "modules"},
                {"name": MICROINVERTER, "quantity": modules, "component_type": "microinverters"}
            ],
            "arrays": arrays
        }),
        project: project(),
        consumption: consumption(),
    }
}

pub fn project() -> serde_json::Value {
    serde_json::json!({
        "address": "1600 Pearl St, Boulder, CO 80302, USA",
        "latitude": 40.0,
        "longitude": -105.0
    })
}

pub fn consumption() -> serde_json::Value {
    serde_json::json!({"hourly_energy": vec![0.5; HOURS_PER_YEAR]})
}

/// Year-1 outputs: 100 kWh every month, flat hourly series.
pub fn outputs() -> EngineOutputs {
    let mut outputs = EngineOutputs {
        annual_energy: 1200.0,
        monthly_energy: vec![100.0; 12],
        hourly_gen: vec![1200.0 / HOURS_PER_YEAR as f64; HOURS_PER_YEAR],
        ..EngineOutputs::default()
    };
    outputs.named.insert("kwh_per_kw".to_string(), 1500.0);
    outputs
        .named
        .insert("annual_dc_nameplate_loss_percent".to_string(), 1.5);
    outputs
}

pub fn sources<'a, D, C, W>(
    design_source: &'a D,
    catalog: &'a C,
    sheets: &'a SpecSheets,
    weather: &'a W,
) -> Sources<'a, D, C, W> {
    Sources {
        design_source,
        catalog,
        sheets,
        weather,
    }
}

pub fn target(years: usize) -> RunTarget<'static> {
    RunTarget {
        tenant_id: TENANT_ID,
        design_id: DESIGN_ID,
        years,
        annual_degradation: None,
    }
}

/// Log sink shared between a test and a scoped `fmt` subscriber.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Runs `f` with a WARN-level subscriber writing into this capture.
    pub fn warnings<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer lock")).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
