//! GlobalOpts-aware wrappers over `lwbridge_config`.
//!
//! Core never sees these types -- it receives a pre-built `BridgeConfig`,
//! `TypeTable` and `DefaultRegistry`.

use std::path::PathBuf;
use std::sync::Arc;

use lwbridge_core::{BridgeConfig, DefaultRegistry, TypeTable};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use lwbridge_config::{Config, save_config};

/// Everything the core needs, loaded once per invocation.
pub struct BridgeSetup {
    pub bridge: BridgeConfig,
    pub types: Arc<TypeTable>,
    pub registry: Arc<DefaultRegistry>,
}

/// The config file this invocation reads: `--config` / `LWBRIDGE_CONFIG`,
/// else the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(lwbridge_config::config_path)
}

/// Load and validate the config for this invocation.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_path(global);
    Ok(lwbridge_config::load_config_from(&path)?)
}

/// Load the config and translate it into the core's runtime types.
pub fn load_setup(global: &GlobalOpts) -> Result<BridgeSetup, CliError> {
    let cfg = load(global)?;
    let registry = cfg.default_registry()?;
    tracing::debug!(
        types = cfg.types.len(),
        registry = registry.len(),
        "bridge configuration loaded"
    );
    Ok(BridgeSetup {
        bridge: cfg.to_bridge_config(),
        types: Arc::new(cfg.type_table()),
        registry: Arc::new(registry),
    })
}
