// ── Observation-list building ──
//
// Given a registration payload and a device, decide which resources to
// observe: every active attribute is resolved, and kept only if the
// device advertised the object instance it lives in.

use std::borrow::Cow;
use std::string::FromUtf8Error;
use std::sync::Arc;

use tracing::debug;

use crate::error::CoreError;
use crate::model::{AdvertisedObjects, Attribute, Device, MappingTier, ResourceAddress};
use crate::resolver::Resolver;

/// One observation to establish. Consumed once by the scheduler.
#[derive(Debug, Clone)]
pub struct ObservationTask {
    pub device: Arc<Device>,
    pub address: ResourceAddress,
    /// The attribute as configured; this is what gets reported upstream.
    pub attribute: Attribute,
    pub tier: MappingTier,
}

/// Builds observation work lists.
#[derive(Debug, Clone)]
pub struct Planner {
    resolver: Resolver,
    decode_names: bool,
}

impl Planner {
    pub fn new(resolver: Resolver, decode_names: bool) -> Self {
        Self {
            resolver,
            decode_names,
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// The attributes to observe for `device`: its explicit active list,
    /// else its type's attribute list, else nothing.
    pub fn active_attributes<'a>(&'a self, device: &'a Device) -> &'a [Attribute] {
        if !device.active.is_empty() {
            return &device.active;
        }
        self.resolver
            .types()
            .get(&device.device_type)
            .map_or(&[][..], |config| config.attributes.as_slice())
    }

    /// The name to resolve for a configured attribute name.
    ///
    /// Escapes of URI delimiters (`%2F`, `%23`, ...) stay encoded.
    pub fn lookup_name<'n>(&self, name: &'n str) -> Result<Cow<'n, str>, CoreError> {
        if !self.decode_names {
            return Ok(Cow::Borrowed(name));
        }
        decode_uri(name).map_err(|e| CoreError::InvalidAttributeName {
            name: name.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Build the work list for `device` from its registration `payload`.
    ///
    /// Fails on the first attribute that cannot be resolved; no partial
    /// list is returned. Attributes whose object instance the device did
    /// not advertise are left out silently. Output order follows the
    /// active attribute list.
    pub fn build(
        &self,
        payload: &str,
        device: &Arc<Device>,
    ) -> Result<Vec<ObservationTask>, CoreError> {
        let advertised = AdvertisedObjects::parse(payload);
        let active = self.active_attributes(device);
        debug!(
            device = %device.name,
            advertised = advertised.len(),
            active = active.len(),
            "building observation list"
        );

        let mut tasks = Vec::with_capacity(active.len());
        for attribute in active {
            let name = self.lookup_name(&attribute.name)?;
            let resolution = self.resolver.resolve(device, &name)?;

            if !advertised.contains(&resolution.address) {
                debug!(
                    device = %device.name,
                    attribute = %attribute.name,
                    object = %resolution.address.object_path(),
                    "object not advertised by device, skipping"
                );
                continue;
            }

            tasks.push(ObservationTask {
                device: Arc::clone(device),
                address: resolution.address,
                attribute: attribute.clone(),
                tier: resolution.tier,
            });
        }

        Ok(tasks)
    }
}

/// Bytes whose percent-escapes survive decoding.
const URI_RESERVED: &[u8] = b";/?:@&=+$,#";

/// Percent-decode `name`, leaving escapes of reserved characters intact.
fn decode_uri(name: &str) -> Result<Cow<'_, str>, FromUtf8Error> {
    let bytes = name.as_bytes();
    let mut decoded = String::new();
    let mut run_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let reserved = bytes[i] == b'%'
            && name
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .is_some_and(|b| URI_RESERVED.contains(&b));
        if reserved {
            decoded.push_str(&urlencoding::decode(&name[run_start..i])?);
            decoded.push_str(&name[i..i + 3]);
            i += 3;
            run_start = i;
        } else {
            i += 1;
        }
    }

    if run_start == 0 {
        return urlencoding::decode(name);
    }
    decoded.push_str(&urlencoding::decode(&name[run_start..])?);
    Ok(Cow::Owned(decoded))
}
