//! Topology assembler.
//!
//! Maps each of the design's arrays onto one of the engine's four sub-array
//! slots and derives the `SystemDesign`, `Layout`, `Shading` and `Losses`
//! groups. Validation happens here, before anything reaches the engine.

pub mod layout;
pub mod losses;
pub mod shading;
pub mod subarray;

pub use layout::SubarrayLayout;
pub use losses::{SubarrayLosses, SystemLosses};
pub use shading::SubarrayShading;
pub use subarray::{SubarrayAssignment, WiringContext};

use tracing::debug;

use crate::design::NormalizedDesign;
use crate::error::{Error, Result};
use crate::sim::params::ParamGroup;

/// Sub-array slots the engine provides.
pub const MAX_ARRAYS: usize = 4;

/// Rejects designs the engine's sub-array slots cannot hold.
///
/// Runs right after the design fetch, before any weather or catalog call.
///
/// # Errors
///
/// `UnsupportedTopology` when the design has more arrays than slots.
pub fn check_array_count(num_arrays: usize) -> Result<()> {
    if num_arrays > MAX_ARRAYS {
        return Err(Error::UnsupportedTopology(format!(
            "design has {num_arrays} arrays; at most {MAX_ARRAYS} are supported"
        )));
    }
    Ok(())
}

/// Lifecycle of one engine sub-array slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// No array in this slot; `subarrayN_enable = 0`.
    Disabled,
    #[default]
    EnabledPending,
    EnabledAssigned,
}

/// Assembled topology for a design.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub inverter_count: u32,
    /// Watts at STC.
    pub system_capacity: f64,
    pub slots: [SlotState; MAX_ARRAYS],
    pub subarrays: Vec<SubarrayAssignment>,
    pub layouts: Vec<SubarrayLayout>,
    pub shading: Vec<SubarrayShading>,
    pub losses: Vec<SubarrayLosses>,
    pub system_losses: SystemLosses,
}

impl Topology {
    /// Assembles every slot.
    ///
    /// # Arguments
    ///
    /// * `design` - Normalized design; its arrays fill slots in order
    /// * `system_capacity` - Resolved module's rated power times its
    ///   quantity, watts
    ///
    /// # Errors
    ///
    /// `UnsupportedTopology`, `UnevenStringing`, `ShadingDataMissing` or
    /// `DesignIncomplete` from the per-array derivations.
    pub fn assemble(design: &NormalizedDesign, system_capacity: f64) -> Result<Self> {
        let num_arrays = design.num_arrays();
        check_array_count(num_arrays)?;

        let ctx = WiringContext {
            topology: design.topology,
            string_inverter_count: design.string_inverter_count,
            num_arrays,
        };
        let electronics = design.electronics_or_default();

        let mut slots = [SlotState::Disabled; MAX_ARRAYS];
        for slot in slots.iter_mut().take(num_arrays) {
            *slot = SlotState::EnabledPending;
        }

        let mut subarrays = Vec::with_capacity(num_arrays);
        let mut layouts = Vec::with_capacity(num_arrays);
        let mut shading = Vec::with_capacity(num_arrays);
        let mut losses = Vec::with_capacity(num_arrays);

        for (index, array) in design.arrays.iter().enumerate() {
            subarrays.push(SubarrayAssignment::assign(index, array, &ctx)?);
            layouts.push(SubarrayLayout::from_array(index, array));
            shading.push(SubarrayShading::from_array(index, array, electronics)?);
            losses.push(SubarrayLosses::new(index, electronics));
            slots[index] = SlotState::EnabledAssigned;
        }

        // Disabled slots still go through MPPT routing validation.
        for index in num_arrays..MAX_ARRAYS {
            subarray::mppt_input(index, &ctx)?;
        }

        debug!(
            design_id = %design.design_id,
            enabled = num_arrays,
            ?electronics,
            "topology assembled"
        );

        Ok(Self {
            inverter_count: design.inverter_count(),
            system_capacity,
            slots,
            subarrays,
            layouts,
            shading,
            losses,
            system_losses: SystemLosses::default(),
        })
    }

    /// Slots holding an assigned array.
    pub fn enabled_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| **s == SlotState::EnabledAssigned)
            .count()
    }

    /// `SystemDesign` group.
    pub fn system_design_params(&self) -> ParamGroup {
        let mut group = ParamGroup::new();
        group.insert("inverter_count", self.inverter_count);
        group.insert("system_capacity", self.system_capacity);
        for subarray in &self.subarrays {
            subarray.write_params(&mut group);
        }
        for (index, state) in self.slots.iter().enumerate().skip(1) {
            if *state == SlotState::Disabled {
                group.insert(
                    format!("subarray{}_enable", subarray::slot_number(index)),
                    0.0,
                );
            }
        }
        group
    }

    /// `Layout` group, without the module aspect ratio.
    pub fn layout_params(&self) -> ParamGroup {
        let mut group = ParamGroup::new();
        for layout in &self.layouts {
            layout.write_params(&mut group);
        }
        group
    }

    /// `Shading` group: one month-by-hour loss matrix per array.
    pub fn shading_params(&self) -> ParamGroup {
        let mut group = ParamGroup::new();
        for shading in &self.shading {
            shading.write_params(&mut group);
        }
        group
    }

    /// `Losses` group: system-wide losses, then per-array losses.
    pub fn losses_params(&self) -> ParamGroup {
        let mut group = ParamGroup::new();
        self.system_losses.write_params(&mut group);
        for losses in &self.losses {
            losses.write_params(&mut group);
        }
        group
    }
}
