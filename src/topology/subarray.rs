//! Electrical assignment of one sub-array: MPPT input, stringing, orientation.

use tracing::warn;

use crate::design::InverterTopology;
use crate::design::types::Array;
use crate::error::{Error, Result};
use crate::sim::params::ParamGroup;

/// Largest azimuth the engine accepts, degrees.
pub const MAX_AZIMUTH: f64 = 359.9;

/// Design-wide facts every sub-array assignment depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WiringContext {
    pub topology: InverterTopology,
    pub string_inverter_count: u32,
    pub num_arrays: usize,
}

/// MPPT input for the sub-array at `index` (0-based).
///
/// The engine cannot route several MPPT inputs across several string
/// inverters, so multi-inverter designs need one inverter per array.
pub fn mppt_input(index: usize, ctx: &WiringContext) -> Result<u32> {
    if index == 0 {
        return Ok(1);
    }
    match ctx.topology {
        InverterTopology::Inverters if ctx.string_inverter_count > 1 => {
            if ctx.string_inverter_count as usize != ctx.num_arrays {
                return Err(Error::UnsupportedTopology(format!(
                    "multiple MPPT inputs with multiple inverters: {} string inverters for {} arrays",
                    ctx.string_inverter_count, ctx.num_arrays
                )));
            }
            Ok(1)
        }
        InverterTopology::Inverters => Ok(slot_number(index)),
        InverterTopology::Microinverters => Ok(1),
    }
}

/// 1-based slot number used in engine keys.
pub fn slot_number(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

/// Caps azimuth at [`MAX_AZIMUTH`], logging a warning when it corrects.
pub fn clamp_azimuth(index: usize, azimuth: f64) -> f64 {
    if azimuth > MAX_AZIMUTH {
        warn!(
            subarray = index + 1,
            azimuth,
            max = MAX_AZIMUTH,
            "correcting azimuth above engine maximum"
        );
        MAX_AZIMUTH
    } else {
        azimuth
    }
}

/// An enabled sub-array's electrical assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct SubarrayAssignment {
    pub index: usize,
    pub mppt_input: u32,
    pub nstrings: u32,
    pub modules_per_string: u32,
    pub tilt: f64,
    pub azimuth: f64,
}

impl SubarrayAssignment {
    /// Assigns an enabled array.
    ///
    /// # Arguments
    ///
    /// * `index` - 0-based slot index
    /// * `array` - The design array occupying the slot
    /// * `ctx` - Inverter topology and counts shared by all slots
    ///
    /// # Errors
    ///
    /// `UnsupportedTopology` for an unroutable multi-inverter design,
    /// `DesignIncomplete` when a string-inverter array has no string count,
    /// `UnevenStringing` when modules do not divide evenly into strings.
    pub fn assign(index: usize, array: &Array, ctx: &WiringContext) -> Result<Self> {
        let mppt_input = mppt_input(index, ctx)?;
        let modules = array.module.count;

        let (nstrings, modules_per_string) = match ctx.topology {
            InverterTopology::Inverters => {
                let strings = array.strings.as_ref().map(|s| s.count).ok_or_else(|| {
                    Error::DesignIncomplete(format!(
                        "sub-array {} has no 'strings' count",
                        index + 1
                    ))
                })?;
                if strings == 0 || modules % strings != 0 {
                    return Err(Error::UnevenStringing {
                        subarray: index + 1,
                        strings,
                        modules,
                    });
                }
                (strings, modules / strings)
            }
            InverterTopology::Microinverters => (modules, 1),
        };

        Ok(Self {
            index,
            mppt_input,
            nstrings,
            modules_per_string,
            tilt: array.pitch,
            azimuth: clamp_azimuth(index, array.azimuth),
        })
    }

    pub fn write_params(&self, group: &mut ParamGroup) {
        let n = slot_number(self.index);
        if self.index > 0 {
            group.insert(format!("subarray{n}_enable"), 1.0);
        }
        group.insert(format!("subarray{n}_mppt_input"), self.mppt_input);
        group.insert(format!("subarray{n}_nstrings"), self.nstrings);
        group.insert(format!("subarray{n}_modules_per_string"), self.modules_per_string);
        group.insert(format!("subarray{n}_tilt"), self.tilt);
        group.insert(format!("subarray{n}_slope_tilt"), 0.0);
        group.insert(format!("subarray{n}_azimuth"), self.azimuth);
        group.insert(format!("subarray{n}_slope_azm"), 0.0);
        // 0 = fixed mount
        group.insert(format!("subarray{n}_track_mode"), 0.0);
    }
}
