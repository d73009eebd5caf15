//! Relay configuration: runtime address, generation defaults and file locations.
//!
//! Settings are resolved once at startup from an optional JSON config file and
//! the process environment. Resolution never fails: a missing or unreadable
//! config file, or a malformed value, falls back to the built-in default.
//!
//! | Setting | Source (first match wins) | Default |
//! |---------|---------------------------|---------|
//! | runtime port | `ollama_port` in config file, `OLLAMA_PORT` | `11434` |
//! | runtime host | `OLLAMA_HOST` | `http://127.0.0.1` |
//! | default model | `OLLAMA_DEFAULT_MODEL` | `llama3` |
//! | default keep-alive | `OLLAMA_KEEP_ALIVE` | `5m` |
//! | default `num_predict` | `OLLAMA_DEFAULT_NUM_PREDICT` | `512` |
//! | warm-up override | `OLLAMA_WARM_MODELS` | none |
//! | agent registry | `OLLAMA_RELAY_AGENTS` | `agents.json` |
//! | static assets | `OLLAMA_RELAY_STATIC_DIR` | `static` |
//! | listen port | `PORT` | `8000` |

use crate::{Error, ErrorContext, Result};
use serde::Deserialize;
use serde_json::Value;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

pub const DEFAULT_MODEL: &str = "llama3";
pub const DEFAULT_KEEP_ALIVE: &str = "5m";
pub const DEFAULT_NUM_PREDICT: u32 = 512;
pub const DEFAULT_RUNTIME_HOST: &str = "http://127.0.0.1";
pub const DEFAULT_RUNTIME_PORT: u16 = 11434;
pub const DEFAULT_LISTEN_PORT: u16 = 8000;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_AGENTS_PATH: &str = "agents.json";
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Environment variable names understood by the relay.
pub mod env_keys {
    pub const CONFIG_PATH: &str = "OLLAMA_RELAY_CONFIG";
    pub const AGENTS_PATH: &str = "OLLAMA_RELAY_AGENTS";
    pub const STATIC_DIR: &str = "OLLAMA_RELAY_STATIC_DIR";
    pub const RUNTIME_HOST: &str = "OLLAMA_HOST";
    pub const RUNTIME_PORT: &str = "OLLAMA_PORT";
    pub const DEFAULT_MODEL: &str = "OLLAMA_DEFAULT_MODEL";
    pub const DEFAULT_NUM_PREDICT: &str = "OLLAMA_DEFAULT_NUM_PREDICT";
    pub const KEEP_ALIVE: &str = "OLLAMA_KEEP_ALIVE";
    pub const WARM_MODELS: &str = "OLLAMA_WARM_MODELS";
    pub const LISTEN_PORT: &str = "PORT";
}

/// Generation parameters applied when the caller leaves them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationDefaults {
    pub model: String,
    pub keep_alive: String,
    /// Always positive.
    pub num_predict: u32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            keep_alive: DEFAULT_KEEP_ALIVE.to_string(),
            num_predict: DEFAULT_NUM_PREDICT,
        }
    }
}

/// The subset of the shared config file the relay cares about.
///
/// The file is also written by the desktop control panel, so unknown keys are
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// String or integer in practice.
    #[serde(default)]
    pub ollama_port: Option<Value>,
}

impl FileConfig {
    /// Read the config file, returning an empty config if it is missing or invalid.
    pub fn read(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config file; using defaults");
                Self::default()
            }
        }
    }

    pub fn from_json_str(contents: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(contents).and_then(|value| match value {
            Value::Object(_) => serde_json::from_value::<FileConfig>(value),
            _ => Ok(Self::default()),
        });
        match parsed {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, "Failed to parse config file; using defaults");
                Self::default()
            }
        }
    }

    fn runtime_port(&self) -> Option<u16> {
        let raw = match self.ollama_port.as_ref()? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        parse_port(&raw, "ollama_port")
    }
}

/// Fully resolved relay settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub runtime_host: String,
    pub runtime_port: u16,
    pub defaults: GenerationDefaults,
    /// Comma-separated list of models to pre-warm, if set.
    pub warm_models: Option<String>,
    pub agents_path: PathBuf,
    pub static_dir: PathBuf,
    pub listen_port: u16,
}

impl RelayConfig {
    /// Resolve configuration from the process environment and the config file it names.
    pub fn load() -> Self {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Resolve configuration using `env` as the environment lookup.
    pub fn load_with<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup(&env, env_keys::CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let file = FileConfig::read(&path);
        Self::resolve(&file, env)
    }

    /// Combine an already-read config file with an environment lookup.
    pub fn resolve<F>(file: &FileConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let runtime_port = file
            .runtime_port()
            .or_else(|| {
                lookup(&env, env_keys::RUNTIME_PORT)
                    .and_then(|raw| parse_port(&raw, env_keys::RUNTIME_PORT))
            })
            .unwrap_or(DEFAULT_RUNTIME_PORT);

        let num_predict = lookup(&env, env_keys::DEFAULT_NUM_PREDICT)
            .and_then(|raw| match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    warn!(
                        value = %raw,
                        "{} must be a positive integer; using {}",
                        env_keys::DEFAULT_NUM_PREDICT,
                        DEFAULT_NUM_PREDICT
                    );
                    None
                }
            })
            .unwrap_or(DEFAULT_NUM_PREDICT);

        let listen_port = lookup(&env, env_keys::LISTEN_PORT)
            .and_then(|raw| parse_port(&raw, env_keys::LISTEN_PORT))
            .unwrap_or(DEFAULT_LISTEN_PORT);

        Self {
            runtime_host: lookup(&env, env_keys::RUNTIME_HOST)
                .unwrap_or_else(|| DEFAULT_RUNTIME_HOST.to_string()),
            runtime_port,
            defaults: GenerationDefaults {
                model: lookup(&env, env_keys::DEFAULT_MODEL)
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                keep_alive: lookup(&env, env_keys::KEEP_ALIVE)
                    .unwrap_or_else(|| DEFAULT_KEEP_ALIVE.to_string()),
                num_predict,
            },
            warm_models: lookup(&env, env_keys::WARM_MODELS),
            agents_path: lookup(&env, env_keys::AGENTS_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AGENTS_PATH)),
            static_dir: lookup(&env, env_keys::STATIC_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
            listen_port,
        }
    }

    pub fn runtime_address(&self) -> (&str, u16) {
        (&self.runtime_host, self.runtime_port)
    }

    pub fn defaults(&self) -> &GenerationDefaults {
        &self.defaults
    }

    /// The runtime's generate endpoint, `{host}:{port}/api/generate`.
    pub fn generate_url(&self) -> Result<Url> {
        let host = self.runtime_host.trim().trim_end_matches('/');
        let base = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        };

        let context = || {
            ErrorContext::new()
                .with_field_path(env_keys::RUNTIME_HOST)
                .with_details(self.runtime_host.clone())
                .with_source("config")
        };

        let mut url = Url::parse(&base).map_err(|e| {
            Error::configuration_with_context(format!("invalid runtime host: {}", e), context())
        })?;
        url.set_port(Some(self.runtime_port)).map_err(|_| {
            Error::configuration_with_context("runtime host cannot carry a port", context())
        })?;
        url.set_path("/api/generate");
        Ok(url)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.listen_port))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::resolve(&FileConfig::default(), |_| None)
    }
}

// Empty values count as unset.
fn lookup<F>(env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_port(raw: &str, key: &str) -> Option<u16> {
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Some(port),
        _ => {
            warn!(key = key, value = %raw, "Ignoring invalid port");
            None
        }
    }
}
