//! Component resolver: turns bill-of-materials names into typed records.

pub mod battery;
pub mod catalog;
pub mod inverter;
pub mod module;
pub mod spec_sheet;

pub use battery::{BatteryContext, Coupling, ResolvedBattery};
pub use catalog::{ComponentCatalog, ComponentCategory, HttpCatalog, StaticCatalog};
pub use inverter::ResolvedInverter;
pub use module::ResolvedModule;
pub use spec_sheet::{SpecSheet, SpecSheets};

use tracing::info;

use crate::design::NormalizedDesign;
use crate::error::Result;

/// Resolves a design's components against one catalog and one pair of
/// spec sheets. Constructed per run.
pub struct ComponentResolver<'a, C> {
    catalog: &'a C,
    sheets: &'a SpecSheets,
}

impl<'a, C: ComponentCatalog> ComponentResolver<'a, C> {
    /// Creates a resolver.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Catalog holding one parameter record per component
    /// * `sheets` - CEC module and inverter libraries
    pub fn new(catalog: &'a C, sheets: &'a SpecSheets) -> Self {
        Self { catalog, sheets }
    }

    /// Resolves the design's module: catalog record plus CEC library row.
    ///
    /// # Errors
    ///
    /// `ComponentNotFound` when the module is in neither source, or the
    /// library match is ambiguous; `MalformedRecord` for a bad record.
    pub fn module(&self, design: &NormalizedDesign) -> Result<ResolvedModule> {
        let module = module::resolve_module(
            self.catalog,
            &self.sheets.modules,
            &design.module.name,
            design.module.quantity,
        )?;
        info!(module = %module.name, quantity = module.quantity, "module resolved");
        Ok(module)
    }

    /// Resolves the design's string inverter or microinverter.
    ///
    /// The string inverter count decides how many MPPT inputs the engine
    /// sees.
    ///
    /// # Errors
    ///
    /// `ComponentNotFound` or `MalformedRecord`, as for [`Self::module`].
    pub fn inverter(&self, design: &NormalizedDesign) -> Result<ResolvedInverter> {
        let inverter = inverter::resolve_inverter(
            self.catalog,
            &self.sheets.inverters,
            &design.inverter.name,
            design.string_inverter_count,
        )?;
        info!(inverter = %inverter.name, "inverter resolved");
        Ok(inverter)
    }

    /// Resolves the design's battery, inferring its coupling from the
    /// inverter topology, storage inverter and array count.
    ///
    /// A design without a battery resolves to [`ResolvedBattery::Disabled`].
    ///
    /// # Errors
    ///
    /// `IncompatiblePairing` for a Q.SAVE battery without a Q.VOLT storage
    /// inverter; `ComponentNotFound` when the composite catalog id is unknown.
    pub fn battery(&self, design: &NormalizedDesign) -> Result<ResolvedBattery> {
        let ctx = BatteryContext {
            name: &design.battery.name,
            quantity: design.battery.quantity,
            inverter_name: &design.inverter.name,
            topology: design.topology,
            storage_inverter: design.storage_inverter.as_ref(),
            has_dc_optimizers: design.dc_optimizer_quantity() > 0,
            num_arrays: design.num_arrays(),
        };
        let battery = battery::resolve_battery(self.catalog, &ctx)?;
        info!(
            battery = %design.battery.name,
            enabled = battery.is_enabled(),
            "battery resolved"
        );
        Ok(battery)
    }
}
