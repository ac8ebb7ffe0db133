//! Month-by-hour beam shading losses derived from solar access.

use crate::design::Electronics;
use crate::design::types::Array;
use crate::error::{Error, Result};
use crate::sim::params::ParamGroup;

use super::subarray::slot_number;

pub const MONTHS: usize = 12;
pub const HOURS: usize = 24;

/// Scale applied to shading loss: module-level electronics lose a third
/// of what a string inverter loses.
pub fn reduction_factor(electronics: Electronics) -> f64 {
    if electronics.is_module_level() {
        1.0 / 3.0
    } else {
        1.0
    }
}

/// 12x24 loss matrix; every hour of month `m` carries `100 - access[m]`.
pub fn shading_matrix(monthly_access: &[f64], factor: f64) -> Vec<Vec<f64>> {
    monthly_access
        .iter()
        .take(MONTHS)
        .map(|access| vec![(100.0 - access) * factor; HOURS])
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubarrayShading {
    pub index: usize,
    pub matrix: Vec<Vec<f64>>,
}

impl SubarrayShading {
    /// Builds the slot's loss matrix from monthly solar access.
    ///
    /// # Arguments
    ///
    /// * `index` - 0-based slot index
    /// * `array` - Array carrying the monthly solar-access values
    /// * `electronics` - Module-level electronics cut the loss to a third
    ///
    /// # Errors
    ///
    /// `ShadingDataMissing` when the array has no twelve monthly
    /// solar-access values.
    pub fn from_array(index: usize, array: &Array, electronics: Electronics) -> Result<Self> {
        let monthly = array
            .monthly_solar_access()
            .filter(|m| m.len() >= MONTHS)
            .ok_or(Error::ShadingDataMissing { subarray: index + 1 })?;
        Ok(Self {
            index,
            matrix: shading_matrix(monthly, reduction_factor(electronics)),
        })
    }

    pub fn write_params(&self, group: &mut ParamGroup) {
        let n = slot_number(self.index);
        // 0 = no self-shading model
        group.insert(format!("subarray{n}_shade_mode"), 0.0);
        group.insert(format!("subarray{n}_shading_en_mxh"), 1.0);
        group.insert(format!("subarray{n}_shading_mxh"), self.matrix.clone());
    }
}
