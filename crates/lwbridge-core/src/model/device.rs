// ── Device domain types ──

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::address::ResourceAddress;

/// A logical attribute understood by the context broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attr_type: attr_type.into(),
        }
    }
}

/// A registered device, as owned by the device registry.
///
/// The bridge only reads devices; it receives them behind an `Arc` so
/// every pending observation can hold a reference without copying.
///
/// The provisioned mapping is accepted either flat (`lwm2mResourceMapping`)
/// or nested under `internalAttributes`, which is how the device registry
/// stores it. Flat entries win when both name the same attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DeviceRecord")]
pub struct Device {
    /// External (entity) name used towards the context broker.
    pub name: String,

    /// Protocol-level endpoint id used towards the device.
    #[serde(alias = "internalId")]
    pub internal_id: String,

    /// Device type, keys into the shared type table.
    #[serde(rename = "type")]
    pub device_type: String,

    /// Explicitly provisioned active attributes. Empty means "use the type's".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active: Vec<Attribute>,

    /// Provisioned attribute → resource mapping, highest precedence.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub internal_mapping: HashMap<String, ResourceAddress>,
}

// ── Wire shape ──

#[derive(Deserialize)]
struct DeviceRecord {
    name: String,
    #[serde(alias = "internalId")]
    internal_id: String,
    #[serde(rename = "type")]
    device_type: String,
    #[serde(default)]
    active: Vec<Attribute>,
    #[serde(default, alias = "lwm2mResourceMapping")]
    internal_mapping: HashMap<String, ResourceAddress>,
    #[serde(default, rename = "internalAttributes")]
    internal_attributes: InternalAttributes,
}

#[derive(Default, Deserialize)]
struct InternalAttributes {
    #[serde(default, rename = "lwm2mResourceMapping")]
    lwm2m_resource_mapping: HashMap<String, ResourceAddress>,
}

impl From<DeviceRecord> for Device {
    fn from(record: DeviceRecord) -> Self {
        let mut internal_mapping = record.internal_attributes.lwm2m_resource_mapping;
        internal_mapping.extend(record.internal_mapping);
        Self {
            name: record.name,
            internal_id: record.internal_id,
            device_type: record.device_type,
            active: record.active,
            internal_mapping,
        }
    }
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        internal_id: impl Into<String>,
        device_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            internal_id: internal_id.into(),
            device_type: device_type.into(),
            active: Vec::new(),
            internal_mapping: HashMap::new(),
        }
    }

    pub fn with_active(mut self, attribute: Attribute) -> Self {
        self.active.push(attribute);
        self
    }

    pub fn with_mapping(mut self, attribute: impl Into<String>, address: ResourceAddress) -> Self {
        self.internal_mapping.insert(attribute.into(), address);
        self
    }
}
