// ── Domain model ──
//
// Devices and their logical attributes on one side, resource addresses
// on the other. Everything the resolver and scheduler pass around.

pub mod address;
pub mod device;
pub mod update;

pub use address::{AdvertisedObjects, MappingTier, ParseAddressError, ResourceAddress};
pub use device::{Attribute, Device};
pub use update::{AttributeUpdate, AttributeValue};
