// ── Core error types ──
//
// Only mapping and naming errors ever reach the caller of a build.
// Everything downstream of scheduling is logged where it happens; the
// variants below exist so those log lines carry a uniform shape.

use std::fmt;

use thiserror::Error;

use crate::model::ResourceAddress;
use crate::service::{ObservationError, SinkError};

/// Why an attribute could not be mapped to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The device type is configured but has no entry for the attribute.
    TypeMappingMissing { device_type: String },
    /// No tier knows the attribute at all.
    NoMapping,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMappingMissing { device_type } => {
                write!(f, "type '{device_type}' has no resource mapping for it")
            }
            Self::NoMapping => f.write_str("no device, type or registry mapping"),
        }
    }
}

/// A single observation that could not be established.
#[derive(Debug, Clone, Error)]
#[error("could not observe '{attribute}' at {address}: {source}")]
pub struct ObservationSetupFailure {
    pub attribute: String,
    pub address: ResourceAddress,
    #[source]
    pub source: ObservationError,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Mapping errors ───────────────────────────────────────────────
    #[error("Couldn't find any way to map the active attribute '{attribute}': {reason}")]
    UnresolvedAttributeMapping {
        attribute: String,
        reason: UnresolvedReason,
    },

    #[error("Invalid attribute name '{name}': {reason}")]
    InvalidAttributeName { name: String, reason: String },

    // ── Downstream errors (logged, never returned from a build) ─────
    #[error(transparent)]
    ObservationSetup(#[from] ObservationSetupFailure),

    #[error("Context update of '{attribute}' for {device} failed: {source}")]
    UpdateSink {
        device: String,
        attribute: String,
        #[source]
        source: SinkError,
    },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The attribute this error concerns, if any.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::UnresolvedAttributeMapping { attribute, .. }
            | Self::UpdateSink { attribute, .. } => Some(attribute),
            Self::InvalidAttributeName { name, .. } => Some(name),
            Self::ObservationSetup(failure) => Some(&failure.attribute),
            Self::Internal(_) => None,
        }
    }
}
