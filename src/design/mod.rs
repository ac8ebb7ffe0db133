//! Design-source client: fetches a design with its project and consumption
//! profile and normalizes them for assembly.

pub mod client;
pub mod normalize;
pub mod types;

pub use client::{AuroraClient, DesignSource};
pub use normalize::{Electronics, InverterTopology, NormalizedDesign};

use tracing::info;

use crate::error::Result;

/// Fetches the design, its owning project and the consumption profile.
///
/// # Errors
///
/// Propagates upstream failures and `DesignIncomplete` from normalization.
pub fn load_design(
    source: &impl DesignSource,
    tenant_id: &str,
    design_id: &str,
) -> Result<NormalizedDesign> {
    let summary = source.design_summary(tenant_id, design_id)?;
    let project = source.project_summary(tenant_id, &summary.project_id)?;
    let consumption = source.consumption_profile(tenant_id, &summary.project_id)?;
    let design = NormalizedDesign::from_parts(design_id, summary, project, consumption)?;
    info!(
        design_id,
        project_id = %design.project_id,
        arrays = design.num_arrays(),
        "design fetched"
    );
    Ok(design)
}
