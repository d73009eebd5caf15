//! Discovery of the models worth pre-warming.
//!
//! Two sources contribute: a comma-separated override (usually
//! `OLLAMA_WARM_MODELS`) and the agent registry file maintained by the desktop
//! control panel, a JSON array of agent objects that may carry a `model` field.

use crate::config::RelayConfig;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ModelDiscovery {
    env_override: Option<String>,
    registry_path: PathBuf,
    default_model: String,
}

impl ModelDiscovery {
    pub fn new(registry_path: impl AsRef<Path>, default_model: impl Into<String>) -> Self {
        Self {
            env_override: None,
            registry_path: registry_path.as_ref().to_path_buf(),
            default_model: default_model.into(),
        }
    }

    /// Set the comma-separated override list.
    pub fn with_override(mut self, models: Option<String>) -> Self {
        self.env_override = models;
        self
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(&config.agents_path, config.defaults.model.clone())
            .with_override(config.warm_models.clone())
    }

    /// Collect the warm set. Never empty: falls back to the default model.
    pub fn discover(&self) -> BTreeSet<String> {
        let mut models = BTreeSet::new();

        if let Some(raw) = &self.env_override {
            models.extend(parse_override(raw));
        }

        match std::fs::read_to_string(&self.registry_path) {
            Ok(contents) => match registry_models(&contents) {
                Ok(found) => models.extend(found),
                Err(e) => warn!(
                    path = %self.registry_path.display(),
                    error = %e,
                    "Failed to parse agent registry for warm-up"
                ),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.registry_path.display(), "No agent registry found");
            }
            Err(e) => warn!(
                path = %self.registry_path.display(),
                error = %e,
                "Failed to read agent registry for warm-up"
            ),
        }

        if models.is_empty() {
            models.insert(self.default_model.clone());
        }
        models
    }
}

fn parse_override(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// Model names from a registry document. Anything other than an array of
/// objects with a non-empty string `model` contributes nothing.
fn registry_models(contents: &str) -> Result<Vec<String>, serde_json::Error> {
    let doc: Value = serde_json::from_str(contents)?;
    let Value::Array(agents) = doc else {
        return Ok(Vec::new());
    };

    Ok(agents
        .iter()
        .filter_map(|agent| agent.as_object()?.get("model")?.as_str())
        .filter(|model| !model.is_empty())
        .map(str::to_string)
        .collect())
}
