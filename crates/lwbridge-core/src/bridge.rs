// ── Bridge facade ──
//
// Wires the resolver, planner, scheduler and relay together around the
// two external collaborators. This is what the registration flow calls.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{BridgeConfig, TypeTable};
use crate::error::CoreError;
use crate::model::Device;
use crate::planner::{ObservationTask, Planner};
use crate::registry::DefaultRegistry;
use crate::relay::UpdateRelay;
use crate::resolver::Resolver;
use crate::scheduler::{ScheduledBatch, Scheduler};
use crate::service::{AttributeSink, ObservationService};

/// The main entry point for the registration flow.
///
/// Cheaply cloneable via `Arc<BridgeInner>`.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: BridgeConfig,
    planner: Planner,
    scheduler: Scheduler,
}

impl Bridge {
    /// Create a bridge over already-connected collaborators.
    ///
    /// `types` and `registry` are read-only from here on.
    pub fn new(
        config: BridgeConfig,
        types: Arc<TypeTable>,
        registry: Arc<DefaultRegistry>,
        observer: Arc<dyn ObservationService>,
        sink: Arc<dyn AttributeSink>,
    ) -> Self {
        let resolver = Resolver::new(types, registry);
        let planner = Planner::new(resolver, config.decode_attribute_names);
        let scheduler = Scheduler::new(
            observer,
            UpdateRelay::new(sink),
            config.max_concurrent_setups,
        );

        Self {
            inner: Arc::new(BridgeInner {
                config,
                planner,
                scheduler,
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Build the observation list for a freshly registered device without
    /// scheduling anything.
    pub fn plan(&self, payload: &str, device: &Arc<Device>) -> Result<Vec<ObservationTask>, CoreError> {
        self.inner.planner.build(payload, device)
    }

    /// Observe the active attributes of a freshly registered device.
    ///
    /// Mapping errors are returned immediately and nothing is scheduled.
    /// Otherwise the observations are started in the background after the
    /// configured delay and this returns at once; setup failures only show
    /// up in the log (or in the returned batch's outcome).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn observe_active_attributes(
        &self,
        payload: &str,
        device: Arc<Device>,
    ) -> Result<ScheduledBatch, CoreError> {
        let tasks = self.plan(payload, &device)?;
        info!(
            device = %device.name,
            observations = tasks.len(),
            "scheduling active attribute observation"
        );
        Ok(self.inner.scheduler.schedule(
            &device.internal_id,
            tasks,
            self.inner.config.delayed_observation_timeout,
        ))
    }

    /// The device left before its observations started: drop them.
    ///
    /// Returns `true` if a pending batch was dropped.
    pub fn device_removed(&self, device: &Device) -> bool {
        let dropped = self.inner.scheduler.cancel(&device.internal_id);
        debug!(device = %device.name, dropped, "device removed");
        dropped
    }

    /// Devices with observations still waiting on the delay.
    pub fn pending_batches(&self) -> usize {
        self.inner.scheduler.pending()
    }
}
