//! PV inverter resolution.

use serde::Deserialize;

use super::catalog::{ComponentCatalog, ComponentCategory, fetch_record};
use super::spec_sheet::{SpecRow, SpecSheet};
use crate::design::InverterTopology;
use crate::error::{Error, Result};
use crate::sim::params::{ParamGroup, ParameterSet};

/// Temperature derate table; stored either as a matrix or as its text form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DerateTable {
    Matrix(Vec<Vec<f64>>),
    Text(String),
}

impl DerateTable {
    pub fn to_matrix(&self) -> Result<Vec<Vec<f64>>> {
        match self {
            Self::Matrix(m) => Ok(m.clone()),
            Self::Text(s) => serde_json::from_str(s)
                .map_err(|e| Error::MalformedRecord(format!("inv_tdc_cec_db '{s}': {e}"))),
        }
    }
}

/// Inverter fields stored in the component catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InverterRecord {
    pub inv_tdc_cec_db: DerateTable,
    pub inv_snl_eff_cec: f64,
}

/// Sandia inverter coefficients from the CEC inverter library.
#[derive(Debug, Clone, PartialEq)]
pub struct InverterSpec {
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub paco: f64,
    pub pdco: f64,
    pub pnt: f64,
    pub pso: f64,
    pub vdcmax: f64,
    pub vdco: f64,
    pub mppt_low: f64,
    pub mppt_high: f64,
}

impl InverterSpec {
    /// Reads the Sandia inverter coefficients from a library row.
    ///
    /// # Errors
    ///
    /// `MalformedRecord` when a column is missing or non-numeric.
    pub fn from_row(row: &SpecRow<'_>) -> Result<Self> {
        Ok(Self {
            c0: row.number("C0")?,
            c1: row.number("C1")?,
            c2: row.number("C2")?,
            c3: row.number("C3")?,
            paco: row.number("Paco")?,
            pdco: row.number("Pdco")?,
            pnt: row.number("Pnt")?,
            pso: row.number("Pso")?,
            vdcmax: row.number("Vdcmax")?,
            vdco: row.number("Vdco")?,
            mppt_low: row.number("Mppt_low")?,
            mppt_high: row.number("Mppt_high")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInverter {
    pub name: String,
    pub string_inverter_count: u32,
    pub spec: InverterSpec,
    pub derate: Vec<Vec<f64>>,
    pub eff_cec: f64,
}

/// Minimum MPPT voltage for devices whose library value is wrong.
fn mppt_low_override(name: &str) -> Option<f64> {
    match name {
        "Q.VOLT H7.6SX" => Some(90.0),
        "Powerwall 3 (integrated inverter)" => Some(60.0),
        _ => None,
    }
}

/// Resolves an inverter from the catalog and the inverter spec sheet.
///
/// # Arguments
///
/// * `catalog` - Source of the derate table and CEC efficiency
/// * `sheet` - CEC inverter library
/// * `name` - Inverter or microinverter name from the design
/// * `string_inverter_count` - String inverters in the design, 0 for
///   microinverter systems
///
/// # Errors
///
/// `ComponentNotFound` when either source lacks the device;
/// `MalformedRecord` for an unparseable derate table or library value.
pub fn resolve_inverter(
    catalog: &impl ComponentCatalog,
    sheet: &SpecSheet,
    name: &str,
    string_inverter_count: u32,
) -> Result<ResolvedInverter> {
    let record: InverterRecord = fetch_record(catalog, ComponentCategory::Inverters, name)?;
    let mut spec = InverterSpec::from_row(&sheet.find(name)?)?;
    if let Some(low) = mppt_low_override(name) {
        spec.mppt_low = low;
    }
    Ok(ResolvedInverter {
        name: name.to_string(),
        string_inverter_count,
        spec,
        derate: record.inv_tdc_cec_db.to_matrix()?,
        eff_cec: record.inv_snl_eff_cec,
    })
}

impl ResolvedInverter {
    /// MPPT inputs: one per array on a single string inverter, else one.
    pub fn num_mppt(&self, topology: InverterTopology, num_arrays: usize) -> usize {
        if topology == InverterTopology::Inverters && self.string_inverter_count <= 1 {
            num_arrays
        } else {
            1
        }
    }

    /// `Inverter` and `InverterCECDatabase` groups for the engine.
    pub fn to_params(&self, topology: InverterTopology, num_arrays: usize) -> ParameterSet {
        let s = &self.spec;

        let mut inverter = ParamGroup::new();
        inverter.insert("inv_snl_paco", s.paco);
        inverter.insert("mppt_low_inverter", s.mppt_low);
        inverter.insert("mppt_hi_inverter", s.mppt_high);
        // 0 = CEC database
        inverter.insert("inverter_model", 0.0);
        inverter.insert("inv_snl_eff_cec", self.eff_cec);
        inverter.insert("inv_num_mppt", self.num_mppt(topology, num_arrays) as f64);

        let mut cec = ParamGroup::new();
        cec.insert("inv_snl_c0", s.c0);
        cec.insert("inv_snl_c1", s.c1);
        cec.insert("inv_snl_c2", s.c2);
        cec.insert("inv_snl_c3", s.c3);
        cec.insert("inv_snl_paco", s.paco);
        cec.insert("inv_snl_pdco", s.pdco);
        cec.insert("inv_snl_pnt", s.pnt);
        cec.insert("inv_snl_pso", s.pso);
        cec.insert("inv_snl_vdcmax", s.vdcmax);
        cec.insert("inv_snl_vdco", s.vdco);
        cec.insert("inv_tdc_cec_db", self.derate.clone());

        let mut set = ParameterSet::new();
        set.insert_group("Inverter", inverter);
        set.insert_group("InverterCECDatabase", cec);
        set
    }
}
