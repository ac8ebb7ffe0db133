//! PV module resolution.

use serde::Deserialize;

use super::catalog::{ComponentCatalog, ComponentCategory, fetch_record};
use super::spec_sheet::{SpecRow, SpecSheet};
use crate::error::Result;
use crate::sim::params::{ParamGroup, ParameterSet};

/// Mechanical and lifecycle fields stored in the component catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleRecord {
    pub mod_length: f64,
    pub mod_width: f64,
    pub cec_bifacial_transmission_factor: f64,
    pub cec_bifaciality: f64,
    pub cec_bifacial_ground_clearance_height: f64,
    pub cec_standoff: f64,
    pub cec_height: f64,
    pub cec_transient_thermal_model_unit_mass: f64,
    /// Yearly degradation in percent.
    #[serde(default)]
    pub annual_degradation: Vec<f64>,
}

/// CEC single-diode parameters from the module library.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSpec {
    pub a_ref: f64,
    pub adjust: f64,
    pub alpha_sc: f64,
    pub area: f64,
    pub beta_oc: f64,
    pub gamma_r: f64,
    pub i_l_ref: f64,
    pub i_mp_ref: f64,
    pub i_o_ref: f64,
    pub i_sc_ref: f64,
    pub is_bifacial: f64,
    pub n_s: f64,
    pub r_s: f64,
    pub r_sh_ref: f64,
    pub t_noct: f64,
    pub v_mp_ref: f64,
    pub v_oc_ref: f64,
    /// Rated power at STC, watts.
    pub stc: f64,
}

impl ModuleSpec {
    /// Reads the CEC single-diode parameters from a library row.
    ///
    /// # Errors
    ///
    /// `MalformedRecord` when a column is missing or non-numeric.
    pub fn from_row(row: &SpecRow<'_>) -> Result<Self> {
        Ok(Self {
            a_ref: row.number("a_ref")?,
            adjust: row.number("Adjust")?,
            alpha_sc: row.number("alpha_sc")?,
            area: row.number("A_c")?,
            beta_oc: row.number("beta_oc")?,
            gamma_r: row.number("gamma_r")?,
            i_l_ref: row.number("I_L_ref")?,
            i_mp_ref: row.number("I_mp_ref")?,
            i_o_ref: row.number("I_o_ref")?,
            i_sc_ref: row.number("I_sc_ref")?,
            is_bifacial: row.number("Bifacial")?.trunc(),
            n_s: row.number("N_s")?,
            r_s: row.number("R_s")?,
            r_sh_ref: row.number("R_sh_ref")?,
            t_noct: row.number("T_NOCT")?,
            v_mp_ref: row.number("V_mp_ref")?,
            v_oc_ref: row.number("V_oc_ref")?,
            stc: row.number("STC")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModule {
    pub name: String,
    pub quantity: u32,
    pub spec: ModuleSpec,
    pub record: ModuleRecord,
}

/// Library-name alias: the "400W" suffix is listed without the unit.
pub fn canonical_module_name(name: &str) -> String {
    if name.contains("Q.PEAK DUO BLK ML-G10+ 400W") {
        name.replace('W', "")
    } else {
        name.to_string()
    }
}

/// Resolves a module from the catalog and the module spec sheet.
///
/// # Arguments
///
/// * `catalog` - Source of the module's mechanical and thermal record
/// * `sheet` - CEC module library
/// * `name` - Module name as listed in the design's bill of materials
/// * `quantity` - Modules in the design
///
/// # Errors
///
/// `ComponentNotFound` when the catalog has no record or the library has
/// no single matching row; `MalformedRecord` for unreadable values.
pub fn resolve_module(
    catalog: &impl ComponentCatalog,
    sheet: &SpecSheet,
    name: &str,
    quantity: u32,
) -> Result<ResolvedModule> {
    let name = canonical_module_name(name);
    let record: ModuleRecord = fetch_record(catalog, ComponentCategory::Modules, &name)?;
    let spec = ModuleSpec::from_row(&sheet.find(&name)?)?;
    Ok(ResolvedModule {
        name,
        quantity,
        spec,
        record,
    })
}

impl ResolvedModule {
    pub fn rated_power_w(&self) -> f64 {
        self.spec.stc
    }

    /// Rated power times module count, watts.
    pub fn system_capacity(&self) -> f64 {
        self.rated_power_w() * f64::from(self.quantity)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.record.mod_length / self.record.mod_width
    }

    /// Catalog degradation as fractions, when it covers `years`.
    pub fn degradation_fractions(&self, years: usize) -> Option<Vec<f64>> {
        (self.record.annual_degradation.len() >= years && years > 0).then(|| {
            self.record.annual_degradation[..years]
                .iter()
                .map(|pct| pct / 100.0)
                .collect()
        })
    }

    /// Engine groups for the module category.
    pub fn to_params(&self) -> ParameterSet {
        let s = &self.spec;
        let r = &self.record;

        let mut layout = ParamGroup::new();
        layout.insert("module_aspect_ratio", self.aspect_ratio());

        let mut cec = ParamGroup::new();
        cec.insert("cec_temp_corr_mode", 0.0);
        cec.insert("cec_a_ref", s.a_ref);
        cec.insert("cec_adjust", s.adjust);
        cec.insert("cec_alpha_sc", s.alpha_sc);
        cec.insert("cec_area", s.area);
        cec.insert("cec_beta_oc", s.beta_oc);
        cec.insert("cec_gamma_r", s.gamma_r);
        cec.insert("cec_i_l_ref", s.i_l_ref);
        cec.insert("cec_i_mp_ref", s.i_mp_ref);
        cec.insert("cec_i_o_ref", s.i_o_ref);
        cec.insert("cec_i_sc_ref", s.i_sc_ref);
        cec.insert("cec_is_bifacial", s.is_bifacial);
        cec.insert("cec_n_s", s.n_s);
        cec.insert("cec_r_s", s.r_s);
        cec.insert("cec_r_sh_ref", s.r_sh_ref);
        cec.insert("cec_t_noct", s.t_noct);
        cec.insert("cec_v_mp_ref", s.v_mp_ref);
        cec.insert("cec_v_oc_ref", s.v_oc_ref);
        cec.insert("cec_bifacial_transmission_factor", r.cec_bifacial_transmission_factor);
        cec.insert("cec_bifaciality", r.cec_bifaciality);
        cec.insert(
            "cec_bifacial_ground_clearance_height",
            r.cec_bifacial_ground_clearance_height,
        );
        cec.insert("cec_standoff", r.cec_standoff);
        cec.insert("cec_height", r.cec_height);
        cec.insert(
            "cec_transient_thermal_model_unit_mass",
            r.cec_transient_thermal_model_unit_mass,
        );
        cec.insert("cec_module_length", r.mod_length);
        cec.insert("cec_module_width", r.mod_width);

        let mut module = ParamGroup::new();
        // 1 = CEC performance model with module database
        module.insert("module_model", 1.0);

        let mut set = ParameterSet::new();
        set.insert_group("Layout", layout);
        set.insert_group("CECPerformanceModelWithModuleDatabase", cec);
        set.insert_group("Module", module);
        set
    }
}
