//! Orchestrator and configuration errors.
//!
//! Backend failures are reported through events, not through these types.
//! A `SessionError` means the request was refused before anything happened
//! and no event will follow.

use super::request::OperationKind;

/// Reasons an orchestrator operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no session backend available")]
    BackendUnavailable,
    #[error("a {0} request is already pending")]
    RequestPending(OperationKind),
    #[error("public connections must be positive")]
    InvalidConnections,
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}
