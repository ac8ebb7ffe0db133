//! Error taxonomy shared by every assembly stage.

use std::fmt;

/// Which upstream resource a 404 referred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamResource {
    Design,
    Project,
    ConsumptionProfile,
    Weather,
    SpecSheet,
}

impl fmt::Display for UpstreamResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Design => "design",
            Self::Project => "project",
            Self::ConsumptionProfile => "consumption profile",
            Self::Weather => "weather resource",
            Self::SpecSheet => "spec sheet",
        };
        f.write_str(name)
    }
}

/// Errors raised while fetching, resolving, assembling or executing a design.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("upstream {resource} not found: {message}")]
    UpstreamNotFound {
        resource: UpstreamResource,
        message: String,
    },

    #[error("upstream error: {0}")]
    UpstreamError(String),

    #[error("design incomplete: {0}")]
    DesignIncomplete(String),

    #[error("{category} '{id}' not found")]
    ComponentNotFound { category: String, id: String },

    #[error("incompatible pairing: {0}")]
    IncompatiblePairing(String),

    #[error("unsupported topology: {0}")]
    UnsupportedTopology(String),

    #[error(
        "sub-array {subarray} number of modules per string is not even: \
         {strings} strings, {modules} modules"
    )]
    UnevenStringing {
        subarray: usize,
        strings: u32,
        modules: u32,
    },

    #[error("shading not found in sub-array {subarray}")]
    ShadingDataMissing { subarray: usize },

    #[error("system has completely degraded in year {year}; check the yearly degradation factors")]
    FullyDegraded { year: usize },

    #[error("degradation sequence has {actual} entries but the analysis period is {expected} years")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("engine execution failed: {0}")]
    EngineExecutionFailed(String),

    #[error("engine rejected {category} parameters: {message}")]
    EngineRejectedParameters { category: String, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    OutOfRange(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures caused by the request or design data (4xx-like),
    /// false for upstream or engine faults (5xx-like).
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            Self::UpstreamNotFound { .. }
                | Self::DesignIncomplete(_)
                | Self::ComponentNotFound { .. }
                | Self::IncompatiblePairing(_)
                | Self::UnsupportedTopology(_)
                | Self::UnevenStringing { .. }
                | Self::ShadingDataMissing { .. }
                | Self::FullyDegraded { .. }
                | Self::LengthMismatch { .. }
                | Self::InvalidRequest(_)
                | Self::OutOfRange(_)
        )
    }

    pub(crate) fn component_not_found(category: impl fmt::Display, id: impl Into<String>) -> Self {
        Self::ComponentNotFound {
            category: category.to_string(),
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_and_catalog_errors_are_bad_input() {
        assert!(Error::UnsupportedTopology("x".into()).is_bad_input());
        assert!(Error::component_not_found("modules", "X-1").is_bad_input());
        assert!(Error::LengthMismatch { expected: 5, actual: 4 }.is_bad_input());
    }

    #[test]
    fn engine_and_upstream_errors_are_internal() {
        assert!(!Error::EngineExecutionFailed("boom".into()).is_bad_input());
        assert!(!Error::UpstreamError("503".into()).is_bad_input());
    }

    #[test]
    fn uneven_stringing_message_names_counts() {
        let e = Error::UnevenStringing {
            subarray: 1,
            strings: 3,
            modules: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("3 strings"));
        assert!(msg.contains("10 modules"));
    }
}
