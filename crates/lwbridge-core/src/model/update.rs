// ── Context update payloads ──

use std::sync::Arc;

use serde::Serialize;

use super::device::{Attribute, Device};

/// One attribute value pushed to the context broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeValue {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: String,
    pub value: String,
}

/// A request to the attribute-update sink.
#[derive(Debug, Clone, Serialize)]
pub struct AttributeUpdate {
    /// Entity name (the device's external name).
    pub entity_name: String,
    /// Entity type (the device type).
    pub entity_type: String,
    /// API version marker passed through to the sink; always empty here.
    pub api_version: String,
    pub attributes: Vec<AttributeValue>,
    #[serde(skip)]
    pub device: Arc<Device>,
}

impl AttributeUpdate {
    /// Wrap a single observed value as an update for `device`.
    pub fn single(device: &Arc<Device>, attribute: &Attribute, value: String) -> Self {
        Self {
            entity_name: device.name.clone(),
            entity_type: device.device_type.clone(),
            api_version: String::new(),
            attributes: vec![AttributeValue {
                name: attribute.name.clone(),
                attr_type: attribute.attr_type.clone(),
                value,
            }],
            device: Arc::clone(device),
        }
    }
}
