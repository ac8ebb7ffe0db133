//! Read-only client for the design-source API.

use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{
    ConsumptionEnvelope, ConsumptionProfile, DesignEnvelope, DesignSummary, ProjectEnvelope,
    ProjectSummary,
};
use crate::error::{Error, Result, UpstreamResource};

/// Source of design, project and consumption documents.
pub trait DesignSource {
    fn design_summary(&self, tenant_id: &str, design_id: &str) -> Result<DesignSummary>;

    fn project_summary(&self, tenant_id: &str, project_id: &str) -> Result<ProjectSummary>;

    fn consumption_profile(&self, tenant_id: &str, project_id: &str) -> Result<ConsumptionProfile>;
}

/// Blocking HTTP client authenticated with a bearer token.
pub struct AuroraClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl AuroraClient {
    pub fn new(agent: ureq::Agent, base_url: &str, token: &str) -> Self {
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn tenant_url(&self, tenant_id: &str) -> String {
        format!("{}/tenants/{tenant_id}", self.base_url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, resource: UpstreamResource) -> Result<T> {
        debug!(url, "design-source request");
        let response = self
            .agent
            .get(url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Content-Type", "application/json")
            .call();

        match response {
            Ok(response) => response
                .into_json::<T>()
                .map_err(|e| Error::UpstreamError(format!("invalid {resource} response: {e}"))),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(classify_failure(status, &body, resource))
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(Error::UpstreamError(format!("request failed: {transport}")))
            }
        }
    }
}

impl DesignSource for AuroraClient {
    fn design_summary(&self, tenant_id: &str, design_id: &str) -> Result<DesignSummary> {
        let url = format!("{}/designs/{design_id}/summary", self.tenant_url(tenant_id));
        let envelope: DesignEnvelope = self.get_json(&url, UpstreamResource::Design)?;
        Ok(envelope.design)
    }

    fn project_summary(&self, tenant_id: &str, project_id: &str) -> Result<ProjectSummary> {
        let url = format!("{}/projects/{project_id}", self.tenant_url(tenant_id));
        let envelope: ProjectEnvelope = self.get_json(&url, UpstreamResource::Project)?;
        Ok(envelope.project)
    }

    fn consumption_profile(&self, tenant_id: &str, project_id: &str) -> Result<ConsumptionProfile> {
        let url = format!(
            "{}/projects/{project_id}/consumption_profile",
            self.tenant_url(tenant_id)
        );
        let envelope: ConsumptionEnvelope =
            self.get_json(&url, UpstreamResource::ConsumptionProfile)?;
        Ok(envelope.consumption_profile)
    }
}

/// Maps a non-200 response to the error taxonomy.
///
/// A 404 is `UpstreamNotFound`; a message mentioning "Consumption" marks the
/// consumption profile as the missing resource whatever endpoint was hit.
pub fn classify_failure(status: u16, body: &str, resource: UpstreamResource) -> Error {
    if status == 404 {
        let message = extract_message(body).unwrap_or_else(|| body.trim().to_string());
        let resource = if message.contains("Consumption") {
            UpstreamResource::ConsumptionProfile
        } else {
            resource
        };
        return Error::UpstreamNotFound { resource, message };
    }
    Error::UpstreamError(format!("design-source API error: {status} | {}", body.trim()))
}

/// Pulls the first `"message"` string out of an error body.
pub fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    find_message(&value)
}

fn find_message(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(message)) = map.get("message") {
                return Some(message.clone());
            }
            map.values().find_map(find_message)
        }
        serde_json::Value::Array(items) => items.iter().find_map(find_message),
        _ => None,
    }
}
