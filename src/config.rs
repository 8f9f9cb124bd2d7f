//! Executor configuration.
//!
//! A `serde`-deserializable struct, parsed either directly or from an
//! environment variable carrying JSON, with a `validate()` step run after
//! parsing either way.

use serde::{Deserialize, Serialize};
use std::env;

const CONFIG_ENV_VAR: &str = "SCATTER_EXECUTOR_CONFIG";

/// Process-wide knobs for one [`crate::executor::ScatterExecutor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterExecutorConfig {
    /// Base name for the timings metric family. The derived error-count
    /// family is `{timings_metric_name}ErrorCount`, or empty if this is
    /// empty.
    pub timings_metric_name: String,
}

impl ScatterExecutorConfig {
    /// Read `SCATTER_EXECUTOR_CONFIG` from the environment, parse it as
    /// JSON, and validate the result.
    pub fn from_env() -> Result<Self, String> {
        let raw = env::var(CONFIG_ENV_VAR)
            .map_err(|_| format!("{CONFIG_ENV_VAR} environment variable is not set"))?;
        Self::from_json(&raw)
    }

    /// Parse a `ScatterExecutorConfig` from a raw JSON string and validate
    /// it.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: ScatterExecutorConfig = serde_json::from_str(json)
            .map_err(|e| format!("failed to parse {CONFIG_ENV_VAR} JSON: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the parsed configuration. An empty `timings_metric_name`
    /// is a legal, explicit opt-out of the error-count family — only
    /// whitespace-only non-empty values are rejected.
    pub fn validate(&self) -> Result<(), String> {
        if !self.timings_metric_name.is_empty() && self.timings_metric_name.trim().is_empty() {
            return Err("timings_metric_name must be empty or non-blank".to_string());
        }
        Ok(())
    }
}

impl Default for ScatterExecutorConfig {
    fn default() -> Self {
        Self {
            timings_metric_name: "ScatterStats".to_string(),
        }
    }
}
