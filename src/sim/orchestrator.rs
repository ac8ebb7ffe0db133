//! Assembly orchestrator.
//!
//! A run is split in two phases. [`Orchestrator::prepare`] fetches the
//! design, resolves components, assembles the topology and the degradation
//! schedule and builds every parameter group; all validation failures
//! surface here, before the engine sees anything. [`Orchestrator::assemble`]
//! then assigns the groups in category order and [`Orchestrator::execute`]
//! runs the engine.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::energy::EnergyQueries;
use super::engine::{EngineOutputs, SimulationEngine, first_informative_lines};
use super::params::{ParamGroup, ParameterSet};
use super::status::{Category, StatusBoard};
use crate::components::{
    ComponentCatalog, ComponentResolver, ResolvedBattery, ResolvedInverter, ResolvedModule,
    SpecSheets,
};
use crate::config::{AppConfig, AssumptionsConfig, RunOptions};
use crate::design::{DesignSource, NormalizedDesign, load_design};
use crate::error::{Error, Result};
use crate::lifetime::{DegradationMode, Lifetime};
use crate::topology::{Topology, check_array_count};
use crate::weather::WeatherResource;

/// Run-wide settings, fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub options: RunOptions,
    pub assumptions: AssumptionsConfig,
    pub degradation: DegradationMode,
}

impl Settings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            options: config.run,
            assumptions: config.assumptions.clone(),
            degradation: config.lifetime.mode(),
        }
    }
}

/// External collaborators consulted while preparing a run.
pub struct Sources<'a, D, C, W> {
    pub design_source: &'a D,
    pub catalog: &'a C,
    pub sheets: &'a SpecSheets,
    pub weather: &'a W,
}

/// What to simulate.
#[derive(Debug, Clone, Copy)]
pub struct RunTarget<'a> {
    pub tenant_id: &'a str,
    pub design_id: &'a str,
    pub years: usize,
    /// Per-year fractions overriding every other degradation source.
    pub annual_degradation: Option<&'a [f64]>,
}

/// Degradation fractions for the horizon: explicit request values, else the
/// module's catalog values when they cover the horizon, else the default.
pub fn degradation_fractions(
    years: usize,
    requested: Option<&[f64]>,
    module: Option<&ResolvedModule>,
    default_fraction: f64,
) -> Vec<f64> {
    if let Some(fractions) = requested {
        return fractions.to_vec();
    }
    module
        .and_then(|m| m.degradation_fractions(years))
        .unwrap_or_else(|| Lifetime::uniform_fractions(years, default_fraction))
}

/// Everything resolved for one design, with its engine groups in
/// assignment order.
#[derive(Debug, Clone)]
pub struct AssemblyPlan {
    pub design: NormalizedDesign,
    pub weather_file: PathBuf,
    pub module: Option<ResolvedModule>,
    pub inverter: Option<ResolvedInverter>,
    pub battery: Option<ResolvedBattery>,
    pub topology: Option<Topology>,
    pub lifetime: Lifetime,
    /// Watts at STC; zero when modules are excluded.
    pub system_capacity: f64,
    steps: Vec<(Category, ParameterSet)>,
}

impl AssemblyPlan {
    pub fn steps(&self) -> &[(Category, ParameterSet)] {
        &self.steps
    }

    pub fn step(&self, category: Category) -> Option<&ParameterSet> {
        self.steps
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, set)| set)
    }

    /// All groups merged, as the engine sees them after assembly.
    pub fn parameters(&self) -> ParameterSet {
        let mut merged = ParameterSet::new();
        for (_, set) in &self.steps {
            merged.merge(set);
        }
        merged
    }
}

fn solar_resource_params(weather_file: &std::path::Path, albedo: f64) -> ParameterSet {
    let mut group = ParamGroup::new();
    group.insert("solar_resource_file", weather_file.display().to_string());
    group.insert("albedo", vec![albedo; 12]);
    ParameterSet::single("SolarResource", group)
}

fn load_params(design: &NormalizedDesign) -> ParameterSet {
    let mut group = ParamGroup::new();
    group.insert("load", design.consumption.hourly_energy.clone());
    ParameterSet::single("Load", group)
}

fn price_signal_params(assumptions: &AssumptionsConfig) -> ParameterSet {
    let mut group = ParamGroup::new();
    group.insert("ppa_price_input", vec![assumptions.ppa_price]);
    // 0 = diurnal
    group.insert("ppa_multiplier_model", 0.0);
    group.insert("ppa_escalation", assumptions.ppa_escalation);
    group.insert("dispatch_tod_factors", vec![1.0; 9]);
    group.insert("dispatch_sched_weekday", vec![vec![1.0; 24]; 12]);
    group.insert("dispatch_sched_weekend", vec![vec![1.0; 24]; 12]);
    ParameterSet::single("PriceSignal", group)
}

/// Drives one engine through assembly and execution.
pub struct Orchestrator<E: SimulationEngine> {
    engine: E,
    settings: Settings,
    statuses: StatusBoard,
    plan: Option<AssemblyPlan>,
    outputs: Option<EngineOutputs>,
}

impl<E: SimulationEngine> Orchestrator<E> {
    pub fn new(engine: E, settings: Settings) -> Self {
        Self {
            engine,
            settings,
            statuses: StatusBoard::new(),
            plan: None,
            outputs: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fetches, resolves and validates everything for `target`.
    ///
    /// Starts a new run: statuses, plan and outputs of any previous run are
    /// discarded first. The array count is checked before any catalog lookup.
    ///
    /// # Errors
    ///
    /// Any upstream, catalog, topology or degradation failure.
    pub fn prepare<D, C, W>(
        &mut self,
        sources: &Sources<'_, D, C, W>,
        target: &RunTarget<'_>,
    ) -> Result<AssemblyPlan>
    where
        D: DesignSource,
        C: ComponentCatalog,
        W: WeatherResource,
    {
        self.reset();
        let options = self.settings.options;
        let assumptions = &self.settings.assumptions;

        let design = load_design(sources.design_source, target.tenant_id, target.design_id)?;
        check_array_count(design.num_arrays())?;

        let (lon, lat) = design.lon_lat();
        let weather_file = sources.weather.fetch(lon, lat)?;

        let resolver = ComponentResolver::new(sources.catalog, sources.sheets);
        let module = if options.include_modules {
            Some(resolver.module(&design)?)
        } else {
            None
        };
        let inverter = if options.include_inverters {
            Some(resolver.inverter(&design)?)
        } else {
            None
        };
        let battery = if options.include_batteries {
            Some(resolver.battery(&design)?)
        } else {
            None
        };

        let system_capacity = module.as_ref().map_or(0.0, ResolvedModule::system_capacity);
        let topology = if options.include_system_design {
            Some(Topology::assemble(&design, system_capacity)?)
        } else {
            None
        };

        let fractions = degradation_fractions(
            target.years,
            target.annual_degradation,
            module.as_ref(),
            assumptions.default_annual_degradation,
        );
        let lifetime = Lifetime::new(target.years, &fractions, self.settings.degradation)?;

        let mut steps = Vec::with_capacity(Category::ALL.len());
        steps.push((
            Category::SolarResource,
            solar_resource_params(&weather_file, assumptions.albedo),
        ));
        if let Some(module) = &module {
            steps.push((Category::Modules, module.to_params()));
        }
        if let Some(inverter) = &inverter {
            steps.push((
                Category::Inverters,
                inverter.to_params(design.topology, design.num_arrays()),
            ));
        }
        if let Some(topology) = &topology {
            steps.push((
                Category::SystemDesign,
                ParameterSet::single("SystemDesign", topology.system_design_params()),
            ));
            steps.push((
                Category::Layout,
                ParameterSet::single("Layout", topology.layout_params()),
            ));
            steps.push((
                Category::Shading,
                ParameterSet::single("Shading", topology.shading_params()),
            ));
            steps.push((
                Category::Losses,
                ParameterSet::single("Losses", topology.losses_params()),
            ));
        }
        if let Some(battery) = &battery {
            steps.push((
                Category::BatterySystem,
                ParameterSet::single("BatterySystem", battery.system_params()),
            ));
            // A disabled battery still completes these steps, with no groups.
            steps.push((
                Category::BatteryCell,
                battery
                    .cell_params()
                    .map(|g| ParameterSet::single("BatteryCell", g))
                    .unwrap_or_default(),
            ));
            steps.push((
                Category::BatteryDispatch,
                battery
                    .dispatch_params()
                    .map(|g| ParameterSet::single("BatteryDispatch", g))
                    .unwrap_or_default(),
            ));
        }
        steps.push((
            Category::Lifetime,
            ParameterSet::single("Lifetime", lifetime.to_params()),
        ));
        steps.push((Category::Load, load_params(&design)));
        steps.push((Category::PriceSignal, price_signal_params(assumptions)));

        debug!(steps = steps.len(), system_capacity, "assembly plan built");

        Ok(AssemblyPlan {
            design,
            weather_file,
            module,
            inverter,
            battery,
            topology,
            lifetime,
            system_capacity,
            steps,
        })
    }

    /// Assigns every planned group in category order.
    ///
    /// A category's status becomes assigned only after its own assignment
    /// succeeds; on failure later categories stay unset.
    ///
    /// # Errors
    ///
    /// `EngineRejectedParameters` naming the category the engine refused.
    pub fn assemble(&mut self, plan: AssemblyPlan) -> Result<()> {
        self.reset();
        for (category, params) in plan.steps() {
            self.engine
                .assign(params)
                .map_err(|fault| Error::EngineRejectedParameters {
                    category: category.to_string(),
                    message: first_informative_lines(&fault.0),
                })?;
            self.statuses.mark_assigned(*category);
            debug!(%category, "assigned");
        }
        info!(
            design_id = %plan.design.design_id,
            assigned = self.statuses.assigned_count(),
            "assembly complete"
        );
        self.plan = Some(plan);
        Ok(())
    }

    /// Executes the engine once.
    ///
    /// # Errors
    ///
    /// `EngineExecutionFailed` carrying the first two informative lines of
    /// the engine's diagnostic; `InvalidRequest` when nothing was assembled.
    pub fn execute(&mut self) -> Result<&EngineOutputs> {
        if self.plan.is_none() {
            return Err(Error::InvalidRequest(
                "execute called before assembly".to_string(),
            ));
        }
        let outputs = self.engine.execute().map_err(|fault| {
            let message = first_informative_lines(&fault.0);
            warn!(%message, "engine execution failed");
            Error::EngineExecutionFailed(message)
        })?;
        info!(annual_energy = outputs.annual_energy, "engine executed");
        Ok(self.outputs.insert(outputs))
    }

    /// Prepares, assembles and executes in one call.
    pub fn run<D, C, W>(
        &mut self,
        sources: &Sources<'_, D, C, W>,
        target: &RunTarget<'_>,
    ) -> Result<&EngineOutputs>
    where
        D: DesignSource,
        C: ComponentCatalog,
        W: WeatherResource,
    {
        let plan = self.prepare(sources, target)?;
        self.assemble(plan)?;
        self.execute()
    }

    fn reset(&mut self) {
        self.statuses = StatusBoard::new();
        self.plan = None;
        self.outputs = None;
    }

    pub fn statuses(&self) -> &StatusBoard {
        &self.statuses
    }

    pub fn plan(&self) -> Option<&AssemblyPlan> {
        self.plan.as_ref()
    }

    /// Rated module power times quantity, once assembled.
    pub fn system_capacity(&self) -> Option<f64> {
        self.plan.as_ref().map(|p| p.system_capacity)
    }

    pub fn outputs(&self) -> Option<&EngineOutputs> {
        self.outputs.as_ref()
    }

    /// Energy queries over the executed run.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` before a successful execution.
    pub fn energy(&self) -> Result<EnergyQueries<'_>> {
        match (&self.outputs, &self.plan) {
            (Some(outputs), Some(plan)) => Ok(EnergyQueries::new(outputs, &plan.lifetime)),
            _ => Err(Error::InvalidRequest(
                "energy queried before a successful execution".to_string(),
            )),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }
}
