//! Module layout per sub-array.

use crate::design::types::{Array, Orientation};
use crate::sim::params::ParamGroup;

use super::subarray::slot_number;

/// One-row layout: the modules run along the axis orthogonal to their
/// long side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubarrayLayout {
    pub index: usize,
    pub orientation: Orientation,
    pub nmodx: u32,
    pub nmody: u32,
}

impl SubarrayLayout {
    /// Lays every module of the array out in a single row along its
    /// orientation.
    pub fn from_array(index: usize, array: &Array) -> Self {
        let count = array.module.count;
        let (nmodx, nmody) = match array.module.orientation {
            Orientation::Landscape => (count, 1),
            Orientation::Portrait => (1, count),
        };
        Self {
            index,
            orientation: array.module.orientation,
            nmodx,
            nmody,
        }
    }

    pub fn write_params(&self, group: &mut ParamGroup) {
        let n = slot_number(self.index);
        // 0 = portrait, 1 = landscape
        group.insert(
            format!("subarray{n}_mod_orient"),
            self.orientation == Orientation::Landscape,
        );
        group.insert(format!("subarray{n}_nmodx"), self.nmodx);
        group.insert(format!("subarray{n}_nmody"), self.nmody);
    }
}
