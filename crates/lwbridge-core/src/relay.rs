// ── Update relay ──
//
// Turns one observed resource value into one context update. Sink
// failures are logged and dropped: the observation service calling us
// has nothing useful to do with them.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::CoreError;
use crate::model::{Attribute, AttributeUpdate, Device};
use crate::service::AttributeSink;

/// Forwards observed values to the attribute-update sink.
#[derive(Clone)]
pub struct UpdateRelay {
    sink: Arc<dyn AttributeSink>,
}

impl UpdateRelay {
    pub fn new(sink: Arc<dyn AttributeSink>) -> Self {
        Self { sink }
    }

    /// Push `value` for `attribute` of `device`. Never fails.
    pub async fn relay(&self, device: &Arc<Device>, attribute: &Attribute, value: String) {
        debug!(
            device = %device.internal_id,
            attribute = %attribute.name,
            "handling data from device"
        );

        let update = AttributeUpdate::single(device, attribute, value);
        match self.sink.update(update).await {
            Ok(()) => debug!(device = %device.name, attribute = %attribute.name, "data handled"),
            Err(source) => {
                let err = CoreError::UpdateSink {
                    device: device.name.clone(),
                    attribute: attribute.name.clone(),
                    source,
                };
                error!(error = %err, "context broker update failed");
            }
        }
    }

    /// Bind this relay to one device attribute, producing the callback
    /// handed to the observation service.
    pub fn bind(&self, device: Arc<Device>, attribute: Attribute) -> RelayHandle {
        RelayHandle {
            relay: self.clone(),
            device,
            attribute,
        }
    }
}

impl fmt::Debug for UpdateRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateRelay").finish_non_exhaustive()
    }
}

/// An [`UpdateRelay`] bound to a device and attribute.
///
/// The observation service calls [`relay`](Self::relay) on every
/// report for the resource it was created for.
#[derive(Clone)]
pub struct RelayHandle {
    relay: UpdateRelay,
    device: Arc<Device>,
    attribute: Attribute,
}

impl RelayHandle {
    pub async fn relay(&self, value: impl Into<String>) {
        self.relay
            .relay(&self.device, &self.attribute, value.into())
            .await;
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }
}

impl fmt::Debug for RelayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayHandle")
            .field("device", &self.device.internal_id)
            .field("attribute", &self.attribute.name)
            .finish_non_exhaustive()
    }
}
