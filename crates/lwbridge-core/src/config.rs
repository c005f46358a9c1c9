// ── Runtime bridge configuration ──
//
// These types describe *how* the bridge maps and schedules. They are
// built once by the binary (see `lwbridge-config`) and handed in; the
// core never reads files or environment variables itself.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{Attribute, ResourceAddress};

/// Grace period between registration and observation setup.
pub const DEFAULT_OBSERVATION_DELAY: Duration = Duration::from_millis(50);

/// Scheduling and naming behaviour of a [`Bridge`](crate::Bridge).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Wait this long after registration before observing anything.
    pub delayed_observation_timeout: Duration,
    /// URI-decode active attribute names before resolving them (NGSI v2).
    pub decode_attribute_names: bool,
    /// Upper bound on observation setups in flight per batch. `None` = all at once.
    pub max_concurrent_setups: Option<usize>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            delayed_observation_timeout: DEFAULT_OBSERVATION_DELAY,
            decode_attribute_names: false,
            max_concurrent_setups: None,
        }
    }
}

/// Shared configuration for every device of one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeConfig {
    /// Attributes observed when a device has no explicit active list.
    #[serde(default)]
    pub attributes: Vec<Attribute>,

    /// Attribute → resource mapping for this type (second mapping tier).
    #[serde(default, alias = "lwm2mResourceMapping")]
    pub lwm2m_resource_mapping: HashMap<String, ResourceAddress>,
}

impl TypeConfig {
    pub fn with_attribute(mut self, attribute: Attribute, address: ResourceAddress) -> Self {
        self.lwm2m_resource_mapping
            .insert(attribute.name.clone(), address);
        self.attributes.push(attribute);
        self
    }
}

/// Device type → [`TypeConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTable {
    types: HashMap<String, TypeConfig>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, device_type: impl Into<String>, config: TypeConfig) -> Self {
        self.types.insert(device_type.into(), config);
        self
    }

    pub fn get(&self, device_type: &str) -> Option<&TypeConfig> {
        self.types.get(device_type)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeConfig)> {
        self.types.iter().map(|(name, config)| (name.as_str(), config))
    }
}

impl From<HashMap<String, TypeConfig>> for TypeTable {
    fn from(types: HashMap<String, TypeConfig>) -> Self {
        Self { types }
    }
}
