// ── Global default registry ──
//
// Lowest-precedence mapping tier: well-known attribute names mapped to
// standard OMA object resources. Read-only once built.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::ResourceAddress;

/// A registry entry. The instance is usually left out and means 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    #[serde(alias = "objectType")]
    pub object_type: u16,
    #[serde(default, alias = "objectInstance", skip_serializing_if = "Option::is_none")]
    pub object_instance: Option<u16>,
    #[serde(alias = "objectResource")]
    pub object_resource: u16,
}

impl RegistryEntry {
    pub const fn new(object_type: u16, object_resource: u16) -> Self {
        Self {
            object_type,
            object_instance: None,
            object_resource,
        }
    }

    /// The concrete address, with a missing instance read as 0.
    pub fn address(&self) -> ResourceAddress {
        ResourceAddress::new(
            self.object_type,
            self.object_instance.unwrap_or(0),
            self.object_resource,
        )
    }
}

/// Attribute name → default resource, consulted only when neither the
/// device nor its type maps the attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefaultRegistry {
    entries: HashMap<String, RegistryEntry>,
}

/// Resource names of the OMA Device (3), Connectivity Monitoring (4)
/// and Location (6) objects.
const OMA_RESOURCES: &[(&str, u16, u16)] = &[
    ("Manufacturer", 3, 0),
    ("Model Number", 3, 1),
    ("Serial Number", 3, 2),
    ("Firmware Version", 3, 3),
    ("Reboot", 3, 4),
    ("Factory Reset", 3, 5),
    ("Available Power Sources", 3, 6),
    ("Power Source Voltage", 3, 7),
    ("Power Source Current", 3, 8),
    ("Battery Level", 3, 9),
    ("Memory Free", 3, 10),
    ("Error Code", 3, 11),
    ("Reset Error Code", 3, 12),
    ("Current Time", 3, 13),
    ("UTC Offset", 3, 14),
    ("Timezone", 3, 15),
    ("Supported Binding and Modes", 3, 16),
    ("Device Type", 3, 17),
    ("Hardware Version", 3, 18),
    ("Software Version", 3, 19),
    ("Battery Status", 3, 20),
    ("Memory Total", 3, 21),
    ("Network Bearer", 4, 0),
    ("Available Network Bearer", 4, 1),
    ("Radio Signal Strength", 4, 2),
    ("Link Quality", 4, 3),
    ("IP Addresses", 4, 4),
    ("Router IP Addresses", 4, 5),
    ("Link Utilization", 4, 6),
    ("APN", 4, 7),
    ("Cell ID", 4, 8),
    ("SMNC", 4, 9),
    ("SMCC", 4, 10),
    ("Latitude", 6, 0),
    ("Longitude", 6, 1),
    ("Altitude", 6, 2),
    ("Uncertainty", 6, 3),
    ("Velocity", 6, 4),
    ("Timestamp", 6, 5),
];

impl DefaultRegistry {
    /// An empty registry: tier 3 never resolves anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in OMA inverse registry.
    pub fn oma() -> Self {
        OMA_RESOURCES
            .iter()
            .map(|&(name, object, resource)| (name.to_owned(), RegistryEntry::new(object, resource)))
            .collect()
    }

    /// Parse a registry from JSON of the form
    /// `{"Battery Level": {"objectType": 3, "objectResource": 9}}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: RegistryEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl FromIterator<(String, RegistryEntry)> for DefaultRegistry {
    fn from_iter<I: IntoIterator<Item = (String, RegistryEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
