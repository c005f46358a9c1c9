//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use lwbridge_config::ConfigError;
use lwbridge_core::{CoreError, UnresolvedReason};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const UNRESOLVED: i32 = 4;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Mapping ──────────────────────────────────────────────────────

    #[error("No resource mapping for attribute '{attribute}'")]
    #[diagnostic(
        code(lwbridge::unresolved),
        help(
            "{hint}\n\
             Known registry names: lwbridge config registry"
        )
    )]
    Unresolved { attribute: String, hint: String },

    #[error("Attribute name '{name}' cannot be decoded: {reason}")]
    #[diagnostic(
        code(lwbridge::attribute_name),
        help("NGSI v2 attribute names must be valid percent-encoded UTF-8.")
    )]
    InvalidAttributeName { name: String, reason: String },

    #[error("Bridge error: {message}")]
    #[diagnostic(code(lwbridge::bridge))]
    Bridge { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(lwbridge::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(lwbridge::config),
        help("Run: lwbridge config path  to see which file is in use")
    )]
    Config(#[from] ConfigError),

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(lwbridge::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid device description: {0}")]
    #[diagnostic(
        code(lwbridge::json),
        help("Expected a JSON object with at least `name`, `internalId` and `type`.")
    )]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unresolved { .. } | Self::InvalidAttributeName { .. } => exit_code::UNRESOLVED,
            Self::Config(_) | Self::ConfigExists { .. } => exit_code::CONFIG,
            Self::Validation { .. } | Self::Json(_) => exit_code::USAGE,
            Self::Bridge { .. } | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnresolvedAttributeMapping { attribute, reason } => {
                let hint = match reason {
                    UnresolvedReason::TypeMappingMissing { device_type } => format!(
                        "Type '{device_type}' is configured but does not map it.\n\
                         Add it under [types.{device_type}.lwm2m_resource_mapping]."
                    ),
                    UnresolvedReason::NoMapping => {
                        "Map it on the device (internal_mapping) or in the config file.".into()
                    }
                };
                CliError::Unresolved { attribute, hint }
            }

            CoreError::InvalidAttributeName { name, reason } => {
                CliError::InvalidAttributeName { name, reason }
            }

            other => CliError::Bridge {
                message: other.to_string(),
            },
        }
    }
}
