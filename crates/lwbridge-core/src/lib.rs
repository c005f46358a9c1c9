//! Attribute mapping and observation orchestration for an LwM2M → NGSI bridge.
//!
//! When a device registers, the bridge decides which of its resources to
//! observe and sets those observations up in the background:
//!
//! - **[`Resolver`]**: maps a logical attribute name to a device resource
//!   through three tiers: the device's own mapping, its type's mapping, and
//!   the global [`DefaultRegistry`].
//!
//! - **[`Planner`]**: turns the registration payload and the device's
//!   active attributes into a list of [`ObservationTask`]s, keeping only
//!   resources the device advertised.
//!
//! - **[`Scheduler`]**: runs a task list after a grace period, all setups
//!   concurrently, collecting failures instead of aborting.
//!
//! - **[`UpdateRelay`]**: turns every observed value into a single-attribute
//!   update on the [`AttributeSink`].
//!
//! - **[`Bridge`]**: the facade tying these together for the registration
//!   flow.
//!
//! The LwM2M server and the context broker client are external; they plug in
//! through the [`ObservationService`] and [`AttributeSink`] traits.

pub mod bridge;
pub mod config;
pub mod error;
pub mod model;
pub mod planner;
pub mod registry;
pub mod relay;
pub mod resolver;
pub mod scheduler;
pub mod service;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::Bridge;
pub use config::{BridgeConfig, DEFAULT_OBSERVATION_DELAY, TypeConfig, TypeTable};
pub use error::{CoreError, ObservationSetupFailure, UnresolvedReason};
pub use planner::{ObservationTask, Planner};
pub use registry::{DefaultRegistry, RegistryEntry};
pub use relay::{RelayHandle, UpdateRelay};
pub use resolver::{Resolution, Resolver};
pub use scheduler::{BatchOutcome, ScheduledBatch, Scheduler};
pub use service::{AttributeSink, ObservationError, ObservationService, SinkError};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AdvertisedObjects, Attribute, AttributeUpdate, AttributeValue, Device, MappingTier,
    ResourceAddress,
};
