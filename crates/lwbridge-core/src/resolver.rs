// ── Resource-mapping resolution ──
//
// Three tiers, fixed order, exactly one of them answers:
//   1. the device's own provisioned mapping
//   2. the mapping of its device type
//   3. the global default registry
//
// A configured type is authoritative for its devices: if it does not
// map an attribute, resolution fails instead of falling back to the
// registry.

use std::sync::Arc;

use tracing::trace;

use crate::config::TypeTable;
use crate::error::{CoreError, UnresolvedReason};
use crate::model::{Device, MappingTier, ResourceAddress};
use crate::registry::DefaultRegistry;

/// A resolved attribute and the tier that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub address: ResourceAddress,
    pub tier: MappingTier,
}

/// Maps logical attribute names to device resources.
///
/// Cheap to clone; the type table and registry are shared read-only.
#[derive(Debug, Clone)]
pub struct Resolver {
    types: Arc<TypeTable>,
    registry: Arc<DefaultRegistry>,
}

impl Resolver {
    pub fn new(types: Arc<TypeTable>, registry: Arc<DefaultRegistry>) -> Self {
        Self { types, registry }
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Resolve `name` for `device`.
    ///
    /// `name` must already be in its decoded form; the resolver compares
    /// keys byte for byte.
    pub fn resolve(&self, device: &Device, name: &str) -> Result<Resolution, CoreError> {
        if let Some(address) = device.internal_mapping.get(name) {
            return Ok(self.found(device, name, *address, MappingTier::Device));
        }

        if let Some(type_config) = self.types.get(&device.device_type) {
            let address = type_config
                .lwm2m_resource_mapping
                .get(name)
                .ok_or_else(|| CoreError::UnresolvedAttributeMapping {
                    attribute: name.to_owned(),
                    reason: UnresolvedReason::TypeMappingMissing {
                        device_type: device.device_type.clone(),
                    },
                })?;
            return Ok(self.found(device, name, *address, MappingTier::DeviceType));
        }

        if let Some(entry) = self.registry.get(name) {
            return Ok(self.found(device, name, entry.address(), MappingTier::Registry));
        }

        Err(CoreError::UnresolvedAttributeMapping {
            attribute: name.to_owned(),
            reason: UnresolvedReason::NoMapping,
        })
    }

    #[allow(clippy::unused_self)]
    fn found(
        &self,
        device: &Device,
        name: &str,
        address: ResourceAddress,
        tier: MappingTier,
    ) -> Resolution {
        trace!(
            device = %device.name,
            attribute = name,
            %address,
            %tier,
            "resolved attribute mapping"
        );
        Resolution { address, tier }
    }
}
