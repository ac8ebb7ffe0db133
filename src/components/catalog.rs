//! Component catalog collaborator.
//!
//! The catalog stores one flat parameter record per component, keyed by a
//! catalog identifier. Records are deserialized into typed structs at this
//! boundary; unknown or missing fields are rejected.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentCategory {
    Modules,
    Inverters,
    Batteries,
}

impl ComponentCategory {
    pub fn path(self) -> &'static str {
        match self {
            Self::Modules => "modules",
            Self::Inverters => "inverters",
            Self::Batteries => "batteries",
        }
    }

    /// Envelope key wrapping the record in a catalog response.
    pub fn response_key(self) -> &'static str {
        match self {
            Self::Modules => "ModuleComponentResponse",
            Self::Inverters => "InverterComponentResponse",
            Self::Batteries => "BatteryComponentResponse",
        }
    }
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Read-only access to catalog records.
pub trait ComponentCatalog {
    /// Returns the raw record, or `None` when the catalog has no such id.
    fn get_component(&self, category: ComponentCategory, id: &str) -> Result<Option<serde_json::Value>>;
}

/// Fetches a record and deserializes it into `T`.
///
/// # Errors
///
/// `ComponentNotFound` if the catalog has no record, `MalformedRecord` if
/// the record does not match `T`.
pub fn fetch_record<T: DeserializeOwned>(
    catalog: &impl ComponentCatalog,
    category: ComponentCategory,
    id: &str,
) -> Result<T> {
    debug!(%category, id, "catalog lookup");
    let raw = catalog
        .get_component(category, id)?
        .ok_or_else(|| Error::component_not_found(category, id))?;
    serde_json::from_value(raw)
        .map_err(|e| Error::MalformedRecord(format!("{category} '{id}': {e}")))
}

/// Catalog served over HTTP at `{base_url}/{category}/{id}`.
pub struct HttpCatalog {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl HttpCatalog {
    /// Catalog client sending bearer-token GETs to `base_url`.
    pub fn new(agent: ureq::Agent, base_url: &str, token: &str) -> Self {
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }
}

impl ComponentCatalog for HttpCatalog {
    fn get_component(&self, category: ComponentCategory, id: &str) -> Result<Option<serde_json::Value>> {
        let url = format!("{}/{}/{id}", self.base_url, category.path());
        let response = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .call();

        let body: serde_json::Value = match response {
            Ok(response) => response
                .into_json()
                .map_err(|e| Error::UpstreamError(format!("invalid catalog response: {e}")))?,
            Err(ureq::Error::Status(404, _)) => return Ok(None),
            Err(ureq::Error::Status(status, _)) => {
                return Err(Error::UpstreamError(format!(
                    "failed to get {category} '{id}' from catalog: status code {status}"
                )));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(Error::UpstreamError(format!("catalog request failed: {transport}")));
            }
        };

        unwrap_envelope(body, category).map(Some)
    }
}

/// Extracts `content.<ResponseKey>` and drops the catalog's own `id`.
///
/// # Errors
///
/// `UpstreamError` when a successful response lacks the record; only a 404
/// means the component does not exist.
fn unwrap_envelope(
    mut body: serde_json::Value,
    category: ComponentCategory,
) -> Result<serde_json::Value> {
    let key = category.response_key();
    let mut record = body
        .get_mut("content")
        .and_then(|content| content.get_mut(key))
        .map(serde_json::Value::take)
        .filter(|record| !record.is_null())
        .ok_or_else(|| Error::UpstreamError(format!("catalog response missing content.{key}")))?;
    if let Some(map) = record.as_object_mut() {
        map.remove("id");
    }
    Ok(record)
}

/// Catalog held in memory, keyed by category and id.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    records: HashMap<(ComponentCategory, String), serde_json::Value>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: ComponentCategory, id: &str, record: serde_json::Value) {
        self.records.insert((category, id.to_string()), record);
    }

    pub fn with(mut self, category: ComponentCategory, id: &str, record: serde_json::Value) -> Self {
        self.insert(category, id, record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ComponentCatalog for StaticCatalog {
    fn get_component(&self, category: ComponentCategory, id: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.records.get(&(category, id.to_string())).cloned())
    }
}
