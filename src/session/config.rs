//! Orchestrator configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Well-known session name used when none is configured.
pub const DEFAULT_SESSION_NAME: &str = "GameSession";

/// Default search limit for find requests.
pub const DEFAULT_MAX_SEARCH_RESULTS: u32 = 10_000;

/// What `CreateSessionComplete` reports when the backend completes a create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateSuccessReporting {
    /// Forward the backend's success flag
    #[default]
    Forward,
    /// Always report success once the backend completes
    AlwaysTrue,
}

/// Which backend request `StartSession` issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartBehavior {
    /// Start the existing session
    #[default]
    Start,
    /// Destroy the session instead of starting it
    Destroy,
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub session_name: String,
    pub default_max_search_results: u32,
    pub advertise: bool,
    pub uses_presence: bool,
    pub allow_join_via_presence: bool,
    pub allow_join_in_progress: bool,
    pub use_lobbies_if_available: bool,
    pub build_unique_id: u32,
    pub create_success: CreateSuccessReporting,
    pub start_behavior: StartBehavior,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            session_name: DEFAULT_SESSION_NAME.to_string(),
            default_max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            advertise: true,
            uses_presence: true,
            allow_join_via_presence: true,
            allow_join_in_progress: true,
            use_lobbies_if_available: true,
            build_unique_id: 1,
            create_success: CreateSuccessReporting::default(),
            start_behavior: StartBehavior::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!("Loading orchestrator config from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_name.trim().is_empty() {
            return Err(ConfigError::Invalid("session_name must not be empty"));
        }
        if self.default_max_search_results == 0 {
            return Err(ConfigError::Invalid(
                "default_max_search_results must be positive",
            ));
        }
        Ok(())
    }
}
