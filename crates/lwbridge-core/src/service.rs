// ── External collaborators ──
//
// The bridge drives two already-connected services it does not own:
// the LwM2M server that observes device resources, and the context
// broker client that receives attribute updates.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{AttributeUpdate, ResourceAddress};
use crate::relay::RelayHandle;

/// Failure reported by the observation service for one setup request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservationError {
    #[error("device {device_id} is not registered")]
    UnknownDevice { device_id: String },

    #[error("device rejected observe request ({code})")]
    Rejected { code: String },

    #[error("observe request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Failure reported by the attribute-update sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("context broker rejected update: {0}")]
    Rejected(String),

    #[error("context broker unavailable: {0}")]
    Unavailable(String),
}

/// Device-side resource observation.
#[async_trait]
pub trait ObservationService: Send + Sync {
    /// Start observing `address` on device `device_id`.
    ///
    /// `handler` must be invoked for every subsequent report. Resolves
    /// once setup completes, yielding the current value if the device
    /// returned one with the observe response.
    async fn observe(
        &self,
        device_id: &str,
        address: ResourceAddress,
        handler: RelayHandle,
    ) -> Result<Option<String>, ObservationError>;
}

/// Context-side attribute updates.
#[async_trait]
pub trait AttributeSink: Send + Sync {
    async fn update(&self, update: AttributeUpdate) -> Result<(), SinkError>;
}
