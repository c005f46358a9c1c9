//! Config subcommand handlers.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Registry row ────────────────────────────────────────────────────

#[derive(Serialize)]
struct RegistryEntryView {
    name: String,
    address: String,
}

#[derive(Tabled)]
struct RegistryRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Resource")]
    address: String,
}

impl From<&RegistryEntryView> for RegistryRow {
    fn from(e: &RegistryEntryView) -> Self {
        Self {
            name: e.name.clone(),
            address: e.address.clone(),
        }
    }
}

fn summary(cfg: &Config) -> String {
    let mut lines = vec![
        format!("Observation delay:  {}ms", cfg.lwm2m.delayed_observation_timeout),
        format!(
            "Max setups:         {}",
            cfg.lwm2m
                .max_concurrent_setups
                .map_or_else(|| "unbounded".into(), |n| n.to_string())
        ),
        format!(
            "Registry:           {}",
            cfg.lwm2m
                .oma_registry
                .as_ref()
                .map_or_else(|| "built-in".into(), |p| p.display().to_string())
        ),
        format!("NGSI v2:            {}", cfg.ngsi.v2),
    ];

    let mut types: Vec<_> = cfg.types.iter().collect();
    types.sort_by_key(|(name, _)| name.as_str());
    for (name, ty) in types {
        lines.push(format!(
            "Type {name}: {} attribute(s), {} mapping(s)",
            ty.attributes.len(),
            ty.lwm2m_resource_mapping.len()
        ));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { force } => {
            let path = config::config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            config::save_config(&Config::default(), &path)?;
            if !global.quiet {
                eprintln!("Config written to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let out = output::detail(&global.output, &cfg, summary, |_| {
                config::config_path(global).display().to_string()
            });
            output::emit(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::emit(
                &config::config_path(global).display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Registry => {
            let setup = config::load_setup(global)?;
            let entries: Vec<RegistryEntryView> = setup
                .registry
                .names()
                .into_iter()
                .filter_map(|name| {
                    setup.registry.get(name).map(|entry| RegistryEntryView {
                        name: name.to_owned(),
                        address: entry.address().to_string(),
                    })
                })
                .collect();
            let out = output::list(&global.output, &entries, |e| RegistryRow::from(e), |e| {
                e.name.clone()
            });
            output::emit(&out, global.quiet);
            Ok(())
        }
    }
}
