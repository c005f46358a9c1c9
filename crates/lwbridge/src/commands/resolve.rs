//! Resolve command handler.

use serde::Serialize;
use tabled::Tabled;

use lwbridge_core::{MappingTier, Planner, Resolver};

use crate::cli::{GlobalOpts, ResolveArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct ResolvedAttribute {
    attribute: String,
    address: String,
    tier: MappingTier,
}

#[derive(Tabled)]
struct ResolvedRow {
    #[tabled(rename = "Attribute")]
    attribute: String,
    #[tabled(rename = "Resource")]
    address: String,
    #[tabled(rename = "Source")]
    tier: String,
}

impl From<&ResolvedAttribute> for ResolvedRow {
    fn from(r: &ResolvedAttribute) -> Self {
        Self {
            attribute: r.attribute.clone(),
            address: r.address.clone(),
            tier: r.tier.to_string(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ResolveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let setup = config::load_setup(global)?;
    let device = util::read_device(&args.device)?;
    let planner = Planner::new(
        Resolver::new(setup.types, setup.registry),
        setup.bridge.decode_attribute_names,
    );

    let mut resolved = Vec::with_capacity(args.attributes.len());
    for attribute in args.attributes {
        if attribute.is_empty() {
            return Err(CliError::Validation {
                field: "attribute".into(),
                reason: "attribute names must not be empty".into(),
            });
        }
        let name = planner.lookup_name(&attribute)?;
        let resolution = planner.resolver().resolve(&device, &name)?;
        resolved.push(ResolvedAttribute {
            attribute,
            address: resolution.address.to_string(),
            tier: resolution.tier,
        });
    }

    let out = output::list(
        &global.output,
        &resolved,
        |r| ResolvedRow::from(r),
        |r| r.address.clone(),
    );
    output::emit(&out, global.quiet);
    Ok(())
}
