//! Single entry point: request in, report out.

use std::time::Duration;

use tracing::info;

use crate::components::{ComponentCatalog, HttpCatalog, SpecSheets};
use crate::config::{AppConfig, Credentials};
use crate::design::{AuroraClient, DesignSource};
use crate::error::{Error, Result};
use crate::report::{AggregatedComponentParams, EnergyProduction, SimulationReport};
use crate::request::SimulationRequest;
use crate::sim::{Orchestrator, SimulationEngine, Sources};
use crate::weather::{NsrdbFetcher, WeatherResource};

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Live collaborators built from configuration and startup credentials.
pub struct HttpCollaborators {
    pub design_source: AuroraClient,
    pub catalog: HttpCatalog,
    pub sheets: SpecSheets,
    pub weather: NsrdbFetcher,
}

impl HttpCollaborators {
    /// Builds the HTTP clients and loads both spec sheets.
    ///
    /// # Errors
    ///
    /// Any failure loading a spec sheet.
    pub fn connect(config: &AppConfig, credentials: &Credentials) -> Result<Self> {
        let agent = ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build();

        let sheets = SpecSheets::load(
            &config.spec_sheets.modules,
            &config.spec_sheets.inverters,
            &agent,
        )?;
        info!(
            modules = sheets.modules.len(),
            inverters = sheets.inverters.len(),
            "spec sheets loaded"
        );

        Ok(Self {
            design_source: AuroraClient::new(
                agent.clone(),
                &config.design_source.base_url,
                &credentials.design_source_token,
            ),
            catalog: HttpCatalog::new(
                agent.clone(),
                &config.catalog.base_url,
                &credentials.catalog_token,
            ),
            sheets,
            weather: NsrdbFetcher::new(
                agent,
                &config.weather.base_url,
                &credentials.nrel_api_key,
                &config.weather.email,
                &config.weather.cache_dir,
            ),
        })
    }

    pub fn sources(&self) -> Sources<'_, AuroraClient, HttpCatalog, NsrdbFetcher> {
        Sources {
            design_source: &self.design_source,
            catalog: &self.catalog,
            sheets: &self.sheets,
            weather: &self.weather,
        }
    }
}

/// Validates `request`, assembles and executes it, and builds the report.
///
/// # Errors
///
/// `InvalidRequest` before any upstream call when the request fails
/// validation; otherwise any failure from preparation, assembly or
/// execution.
pub fn run_simulation<E, D, C, W>(
    orchestrator: &mut Orchestrator<E>,
    sources: &Sources<'_, D, C, W>,
    request: &SimulationRequest,
) -> Result<SimulationReport>
where
    E: SimulationEngine,
    D: DesignSource,
    C: ComponentCatalog,
    W: WeatherResource,
{
    let target = request.to_target()?;
    let resolution = request.resolution()?;
    info!(
        tenant_id = %request.tenant_id,
        design_id = %request.design_id,
        years = request.analysis_years,
        %resolution,
        "simulation requested"
    );

    let plan = orchestrator.prepare(sources, &target)?;
    orchestrator.assemble(plan)?;
    orchestrator.execute()?;

    let (Some(plan), Some(outputs)) = (orchestrator.plan(), orchestrator.outputs()) else {
        return Err(Error::InvalidRequest(
            "orchestrator holds no executed plan".to_string(),
        ));
    };
    let energy = orchestrator.energy()?;
    let components = AggregatedComponentParams::build(&request.tenant_id, plan, &energy, outputs)?;
    let production = EnergyProduction::build(resolution, &energy, outputs)?;

    Ok(SimulationReport::new(
        components,
        production,
        orchestrator.statuses(),
    ))
}
