//! Fixed loss assumptions, system-wide and per sub-array (percent).

use crate::design::Electronics;
use crate::sim::params::ParamGroup;

use super::subarray::slot_number;

#[derive(Debug, Clone, PartialEq)]
pub struct SystemLosses {
    pub acwiring: f64,
    pub dcoptimizer: f64,
    pub transmission: f64,
}

impl Default for SystemLosses {
    fn default() -> Self {
        Self {
            acwiring: 3.0,
            dcoptimizer: 0.0,
            transmission: 0.0,
        }
    }
}

impl SystemLosses {
    pub fn write_params(&self, group: &mut ParamGroup) {
        group.insert("acwiring_loss", self.acwiring);
        group.insert("dcoptimizer_loss", self.dcoptimizer);
        group.insert("transmission_loss", self.transmission);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubarrayLosses {
    pub index: usize,
    pub soiling: [f64; 12],
    pub rear_soiling: f64,
    pub mismatch: f64,
    pub diodeconn: f64,
    pub dcwiring: f64,
    pub nameplate: f64,
    pub electrical_mismatch: f64,
    pub rack_shading: f64,
    pub tracking: f64,
}

impl SubarrayLosses {
    /// Default losses for the slot at `index`; module-level electronics
    /// drop the string mismatch loss.
    pub fn new(index: usize, electronics: Electronics) -> Self {
        Self {
            index,
            soiling: [2.0; 12],
            rear_soiling: 0.0,
            // module-level MPPT removes string mismatch
            mismatch: if electronics.is_module_level() { 0.0 } else { 2.0 },
            diodeconn: 0.5,
            dcwiring: 2.0,
            nameplate: 1.5,
            electrical_mismatch: 0.0,
            rack_shading: 0.0,
            tracking: 0.0,
        }
    }

    pub fn write_params(&self, group: &mut ParamGroup) {
        let n = slot_number(self.index);
        group.insert(format!("subarray{n}_soiling"), self.soiling.to_vec());
        group.insert(format!("subarray{n}_rear_soiling_loss"), self.rear_soiling);
        group.insert(format!("subarray{n}_mismatch_loss"), self.mismatch);
        group.insert(format!("subarray{n}_diodeconn_loss"), self.diodeconn);
        group.insert(format!("subarray{n}_dcwiring_loss"), self.dcwiring);
        group.insert(format!("subarray{n}_nameplate_loss"), self.nameplate);
        group.insert(format!("subarray{n}_electrical_mismatch"), self.electrical_mismatch);
        group.insert(format!("subarray{n}_rack_shading"), self.rack_shading);
        group.insert(format!("subarray{n}_tracking_loss"), self.tracking);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_depends_on_electronics() {
        assert_eq!(SubarrayLosses::new(0, Electronics::StringInverters).mismatch, 2.0);
        assert_eq!(SubarrayLosses::new(0, Electronics::Microinverters).mismatch, 0.0);
        assert_eq!(SubarrayLosses::new(0, Electronics::DcOptimizers).mismatch, 0.0);
    }

    #[test]
    fn nameplate_is_separate_from_dc_wiring() {
        let mut g = ParamGroup::new();
        SubarrayLosses::new(1, Electronics::StringInverters).write_params(&mut g);
        assert_eq!(g.get("subarray2_nameplate_loss").and_then(|v| v.as_f64()), Some(1.5));
        assert_eq!(g.get("subarray2_dcwiring_loss").and_then(|v| v.as_f64()), Some(2.0));
        assert_eq!(g.get("subarray2_soiling").and_then(|v| v.as_array()).map(<[f64]>::len), Some(12));
        assert_eq!(g.len(), 9);
    }

    #[test]
    fn system_losses_defaults() {
        let mut g = ParamGroup::new();
        SystemLosses::default().write_params(&mut g);
        assert_eq!(g.get("acwiring_loss").and_then(|v| v.as_f64()), Some(3.0));
        assert_eq!(g.len(), 3);
    }
}
