//! Plan command handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use lwbridge_core::{
    AttributeSink, AttributeUpdate, BatchOutcome, Bridge, MappingTier, ObservationError,
    ObservationService, ObservationTask, RelayHandle, ResourceAddress, SinkError,
};

use crate::cli::{GlobalOpts, PlanArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct PlannedObservation {
    attribute: String,
    #[serde(rename = "type")]
    attr_type: String,
    address: String,
    tier: MappingTier,
}

impl From<&ObservationTask> for PlannedObservation {
    fn from(t: &ObservationTask) -> Self {
        Self {
            attribute: t.attribute.name.clone(),
            attr_type: t.attribute.attr_type.clone(),
            address: t.address.to_string(),
            tier: t.tier,
        }
    }
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Attribute")]
    attribute: String,
    #[tabled(rename = "Type")]
    attr_type: String,
    #[tabled(rename = "Resource")]
    address: String,
    #[tabled(rename = "Source")]
    tier: String,
}

impl From<&PlannedObservation> for PlanRow {
    fn from(p: &PlannedObservation) -> Self {
        Self {
            attribute: p.attribute.clone(),
            attr_type: p.attr_type.clone(),
            address: p.address.clone(),
            tier: p.tier.to_string(),
        }
    }
}

// ── Dry-run collaborators ───────────────────────────────────────────

/// Accepts every observation without contacting a device.
struct DryRunServer;

#[async_trait]
impl ObservationService for DryRunServer {
    async fn observe(
        &self,
        device_id: &str,
        address: ResourceAddress,
        handler: RelayHandle,
    ) -> Result<Option<String>, ObservationError> {
        info!(device = device_id, %address, attribute = %handler.attribute().name, "dry-run observe");
        Ok(None)
    }
}

/// Discards updates; a dry-run server never reports values.
struct DiscardSink;

#[async_trait]
impl AttributeSink for DiscardSink {
    async fn update(&self, update: AttributeUpdate) -> Result<(), SinkError> {
        info!(entity = %update.entity_name, "dry-run update discarded");
        Ok(())
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: PlanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let setup = config::load_setup(global)?;
    let device = util::read_device(&args.device)?;
    let payload = util::read_payload(&args.payload)?;

    let bridge = Bridge::new(
        setup.bridge,
        setup.types,
        setup.registry,
        Arc::new(DryRunServer),
        Arc::new(DiscardSink),
    );

    let tasks = bridge.plan(&payload, &device)?;
    let planned: Vec<PlannedObservation> = tasks.iter().map(PlannedObservation::from).collect();
    let out = output::list(&global.output, &planned, |p| PlanRow::from(p), |p| {
        p.address.clone()
    });
    output::emit(&out, global.quiet);

    if args.simulate {
        let delay = bridge.config().delayed_observation_timeout;
        let batch = bridge.observe_active_attributes(&payload, device)?;
        let outcome = batch.outcome().await?;
        if !global.quiet {
            eprintln!("{}", describe(&outcome, delay.as_millis()));
        }
    }
    Ok(())
}

fn describe(outcome: &BatchOutcome, delay_ms: u128) -> String {
    match outcome {
        BatchOutcome::Completed {
            established,
            failures,
        } => format!(
            "Simulated after {delay_ms}ms: {established} observation(s) established, {} failed",
            failures.len()
        ),
        BatchOutcome::Cancelled { pending } => {
            format!("Simulated: batch of {pending} dropped before the delay elapsed")
        }
    }
}
