// ── Resource addressing ──
//
// ResourceAddress identifies one observable resource on a device.
// AdvertisedObjects is the set of object instances a device announced
// in its registration payload.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── ResourceAddress ─────────────────────────────────────────────────

/// A single observable unit on a device: `/{object}/{instance}/{resource}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceAddress {
    #[serde(alias = "objectType")]
    pub object_type: u16,
    #[serde(alias = "objectInstance")]
    pub object_instance: u16,
    #[serde(alias = "objectResource")]
    pub object_resource: u16,
}

impl ResourceAddress {
    pub const fn new(object_type: u16, object_instance: u16, object_resource: u16) -> Self {
        Self {
            object_type,
            object_instance,
            object_resource,
        }
    }

    /// The object instance path this resource lives under (`/3/0`).
    ///
    /// This is the granularity at which devices advertise support.
    pub fn object_path(&self) -> String {
        format!("/{}/{}", self.object_type, self.object_instance)
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{}/{}/{}",
            self.object_type, self.object_instance, self.object_resource
        )
    }
}

/// Error returned when a string is not a `/{o}/{i}/{r}` path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid resource path '{0}': expected /<object>/<instance>/<resource>")]
pub struct ParseAddressError(String);

impl FromStr for ResourceAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAddressError(s.to_owned());
        let mut segments = s.strip_prefix('/').ok_or_else(err)?.split('/');

        let mut next = || -> Result<u16, ParseAddressError> {
            segments.next().and_then(|seg| seg.parse().ok()).ok_or_else(err)
        };
        let address = Self::new(next()?, next()?, next()?);

        if segments.next().is_some() {
            return Err(err());
        }
        Ok(address)
    }
}

// ── MappingTier ─────────────────────────────────────────────────────

/// Which mapping source produced a resolved address.
///
/// Variants are declared in lookup order: the device's own table is
/// consulted first, the global registry last.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MappingTier {
    /// Per-device internal mapping set at provisioning time.
    Device,
    /// Mapping shared by every device of the same type.
    DeviceType,
    /// Global default registry keyed only by attribute name.
    Registry,
}

// ── AdvertisedObjects ───────────────────────────────────────────────

/// Object instances a device advertised at registration.
///
/// Parsed from the registration payload. Both bare paths separated by
/// whitespace (`/3/0 /4/0`) and CoRE link format (`</3/0>,</4/0>;ver=1.1`)
/// are accepted. Tokens that do not name an object instance (the root
/// `</>` link, object-only links such as `</1>`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisedObjects {
    paths: BTreeSet<String>,
}

impl AdvertisedObjects {
    pub fn parse(payload: &str) -> Self {
        let paths = payload
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter_map(parse_object_link)
            .collect();
        Self { paths }
    }

    /// Whether the object instance holding `address` was advertised.
    pub fn contains(&self, address: &ResourceAddress) -> bool {
        self.paths.contains(&address.object_path())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

/// Normalize one payload token to `/{object}/{instance}`.
fn parse_object_link(token: &str) -> Option<String> {
    // Link attributes (`;ver=1.0`, `;rt="oma.lwm2m"`) follow the target.
    let target = token.split(';').next()?.trim();
    let target = target
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(target);

    let mut segments = target.strip_prefix('/')?.split('/');
    let object: u16 = segments.next()?.parse().ok()?;
    let instance: u16 = segments.next()?.parse().ok()?;
    if segments.next().is_some() {
        return None;
    }
    Some(format!("/{object}/{instance}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn address_display_and_object_path() {
        let addr = ResourceAddress::new(3, 0, 9);
        assert_eq!(addr.to_string(), "/3/0/9");
        assert_eq!(addr.object_path(), "/3/0");
    }

    #[test]
    fn address_from_str() {
        let addr: ResourceAddress = "/7392/1/2".parse().unwrap();
        assert_eq!(addr, ResourceAddress::new(7392, 1, 2));
    }

    #[test]
    fn address_from_str_rejects_short_and_long_paths() {
        assert!("/3/0".parse::<ResourceAddress>().is_err());
        assert!("/3/0/1/2".parse::<ResourceAddress>().is_err());
        assert!("3/0/1".parse::<ResourceAddress>().is_err());
        assert!("/3/x/1".parse::<ResourceAddress>().is_err());
    }

    #[test]
    fn address_accepts_camel_case_fields() {
        let addr: ResourceAddress = serde_json::from_str(
            r#"{"objectType": 6, "objectInstance": 0, "objectResource": 1}"#,
        )
        .unwrap();
        assert_eq!(addr, ResourceAddress::new(6, 0, 1));
    }

    #[test]
    fn mapping_tier_round_trips_through_strum() {
        assert_eq!(MappingTier::DeviceType.to_string(), "device-type");
        assert_eq!("registry".parse::<MappingTier>().unwrap(), MappingTier::Registry);
    }

    #[test]
    fn parses_whitespace_separated_paths() {
        let objects = AdvertisedObjects::parse("/3/0\n/4/0 /6/0");
        let paths: Vec<&str> = objects.iter().collect();
        assert_eq!(paths, vec!["/3/0", "/4/0", "/6/0"]);
    }

    #[test]
    fn parses_link_format_payload() {
        let objects =
            AdvertisedObjects::parse(r#"</>;rt="oma.lwm2m",</1/0>,</3/0>;ver=1.1,</3303/2>,</5>"#);
        let paths: Vec<&str> = objects.iter().collect();
        assert_eq!(paths, vec!["/1/0", "/3/0", "/3303/2"]);
    }

    #[test]
    fn duplicate_paths_collapse() {
        let objects = AdvertisedObjects::parse("/3/0 /3/0,</3/0>");
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn empty_payload_advertises_nothing() {
        assert!(AdvertisedObjects::parse("").is_empty());
        assert!(AdvertisedObjects::parse("  \n ").is_empty());
    }

    #[test]
    fn contains_matches_on_object_instance() {
        let objects = AdvertisedObjects::parse("/3/0");
        assert!(objects.contains(&ResourceAddress::new(3, 0, 9)));
        assert!(!objects.contains(&ResourceAddress::new(3, 1, 9)));
        assert!(!objects.contains(&ResourceAddress::new(4, 0, 2)));
    }
}
