//! Configuration for the lwbridge binary.
//!
//! A TOML file layered under `LWBRIDGE_*` environment variables, plus an
//! optional JSON file for the default resource registry. The result is
//! translated into the runtime types of `lwbridge_core` (`BridgeConfig`,
//! `TypeTable`, `DefaultRegistry`), which never touch disk themselves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use lwbridge_core::{BridgeConfig, DEFAULT_OBSERVATION_DELAY, DefaultRegistry, TypeConfig, TypeTable};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to read resource registry {}: {source}", path.display())]
    Registry {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Device-side (LwM2M) behaviour.
    #[serde(default)]
    pub lwm2m: Lwm2mSection,

    /// Broker-side (NGSI) behaviour.
    #[serde(default)]
    pub ngsi: NgsiSection,

    /// Per device type attribute lists and resource mappings.
    #[serde(default)]
    pub types: HashMap<String, TypeConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Lwm2mSection {
    /// Delay between registration and observation setup, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delayed_observation_timeout: u64,

    /// Cap on concurrent observation setups per device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_setups: Option<usize>,

    /// JSON file replacing the built-in resource registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oma_registry: Option<PathBuf>,
}

impl Default for Lwm2mSection {
    fn default() -> Self {
        Self {
            delayed_observation_timeout: default_delay_ms(),
            max_concurrent_setups: None,
            oma_registry: None,
        }
    }
}

fn default_delay_ms() -> u64 {
    u64::try_from(DEFAULT_OBSERVATION_DELAY.as_millis()).unwrap_or(50)
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NgsiSection {
    /// Talk NGSI v2: attribute names are URI-encoded.
    #[serde(default)]
    pub v2: bool,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "lwbridge", "lwbridge").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("lwbridge");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment, then validate it.
///
/// A missing file is not an error; defaults and environment still apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LWBRIDGE_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Validation and translation ──────────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lwm2m.max_concurrent_setups == Some(0) {
            return Err(ConfigError::Validation {
                field: "lwm2m.max_concurrent_setups".into(),
                reason: "must be at least 1 when set".into(),
            });
        }

        for (name, ty) in &self.types {
            if name.is_empty() {
                return Err(ConfigError::Validation {
                    field: "types".into(),
                    reason: "device type names must not be empty".into(),
                });
            }
            if let Some(attr) = ty.attributes.iter().find(|a| a.name.is_empty()) {
                return Err(ConfigError::Validation {
                    field: format!("types.{name}.attributes"),
                    reason: format!("attribute of type '{}' has an empty name", attr.attr_type),
                });
            }
        }
        Ok(())
    }

    /// Scheduling and naming settings for the core.
    pub fn to_bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            delayed_observation_timeout: Duration::from_millis(self.lwm2m.delayed_observation_timeout),
            decode_attribute_names: self.ngsi.v2,
            max_concurrent_setups: self.lwm2m.max_concurrent_setups,
        }
    }

    /// The per-type mapping table.
    pub fn type_table(&self) -> TypeTable {
        TypeTable::from(self.types.clone())
    }

    /// The registry named by `lwm2m.oma_registry`, or the built-in one.
    pub fn default_registry(&self) -> Result<DefaultRegistry, ConfigError> {
        let Some(path) = &self.lwm2m.oma_registry else {
            return Ok(DefaultRegistry::oma());
        };
        let json = std::fs::read_to_string(path)?;
        let registry = DefaultRegistry::from_json(&json).map_err(|source| ConfigError::Registry {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), entries = registry.len(), "loaded resource registry");
        Ok(registry)
    }
}
