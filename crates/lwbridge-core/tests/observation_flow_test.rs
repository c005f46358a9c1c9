#![allow(clippy::unwrap_used)]
// End-to-end tests for the registration → observation → update flow,
// with in-memory stand-ins for the LwM2M server and the context broker.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use lwbridge_core::{
    Attribute, AttributeSink, AttributeUpdate, BatchOutcome, Bridge, BridgeConfig, CoreError,
    DefaultRegistry, Device, ObservationError, ObservationService, RelayHandle, ResourceAddress,
    SinkError, TypeConfig, TypeTable, UnresolvedReason,
};

// ── Fakes ───────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeServer {
    initial: HashMap<ResourceAddress, String>,
    failing: HashSet<ResourceAddress>,
    calls: Mutex<Vec<(String, ResourceAddress)>>,
    handlers: Mutex<Vec<RelayHandle>>,
}

impl FakeServer {
    fn with_initial(mut self, address: ResourceAddress, value: &str) -> Self {
        self.initial.insert(address, value.into());
        self
    }

    fn failing_on(mut self, address: ResourceAddress) -> Self {
        self.failing.insert(address);
        self
    }

    fn calls(&self) -> Vec<(String, ResourceAddress)> {
        self.calls.lock().unwrap().clone()
    }

    fn handler_for(&self, attribute: &str) -> RelayHandle {
        self.handlers
            .lock()
            .unwrap()
            .iter()
            .find(|h| h.attribute().name == attribute)
            .cloned()
            .unwrap()
    }
}

#[async_trait]
impl ObservationService for FakeServer {
    async fn observe(
        &self,
        device_id: &str,
        address: ResourceAddress,
        handler: RelayHandle,
    ) -> Result<Option<String>, ObservationError> {
        self.calls.lock().unwrap().push((device_id.into(), address));
        if self.failing.contains(&address) {
            return Err(ObservationError::Rejected {
                code: "4.05".into(),
            });
        }
        self.handlers.lock().unwrap().push(handler);
        Ok(self.initial.get(&address).cloned())
    }
}

#[derive(Default)]
struct FakeBroker {
    updates: Mutex<Vec<AttributeUpdate>>,
}

impl FakeBroker {
    fn values(&self) -> Vec<(String, String)> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .flat_map(|u| u.attributes.iter())
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect()
    }
}

#[async_trait]
impl AttributeSink for FakeBroker {
    async fn update(&self, update: AttributeUpdate) -> Result<(), SinkError> {
        self.updates.lock().unwrap().push(update);
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

const BATTERY: ResourceAddress = ResourceAddress::new(7392, 0, 1);
const POSITION: ResourceAddress = ResourceAddress::new(7392, 0, 2);
const MANUFACTURER: ResourceAddress = ResourceAddress::new(3, 0, 0);

fn types() -> TypeTable {
    TypeTable::new().with_type(
        "Robot",
        TypeConfig::default()
            .with_attribute(Attribute::new("Battery", "number"), BATTERY)
            .with_attribute(Attribute::new("Position", "string"), POSITION),
    )
}

fn bridge(server: &Arc<FakeServer>, broker: &Arc<FakeBroker>) -> Bridge {
    Bridge::new(
        BridgeConfig::default(),
        Arc::new(types()),
        Arc::new(DefaultRegistry::oma()),
        server.clone(),
        broker.clone(),
    )
}

fn robot() -> Arc<Device> {
    Arc::new(Device::new("Robot:r2d2", "r2d2", "Robot"))
}

// ── Scheduling ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn returns_before_the_delay_elapses() {
    let server = Arc::new(FakeServer::default());
    let broker = Arc::new(FakeBroker::default());
    let bridge = bridge(&server, &broker);

    let batch = bridge
        .observe_active_attributes("</7392/0>", robot())
        .unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch.device_id(), "r2d2");
    tokio::task::yield_now().await;
    assert!(!batch.is_finished());
    assert!(server.calls().is_empty());
    assert_eq!(bridge.pending_batches(), 1);

    let outcome = batch.outcome().await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.established(), 2);
    assert_eq!(
        server.calls(),
        vec![("r2d2".to_owned(), BATTERY), ("r2d2".to_owned(), POSITION)]
    );
    assert_eq!(bridge.pending_batches(), 0);
}

#[tokio::test(start_paused = true)]
async fn honours_configured_delay() {
    let server = Arc::new(FakeServer::default());
    let broker = Arc::new(FakeBroker::default());
    let config = BridgeConfig {
        delayed_observation_timeout: Duration::from_secs(2),
        ..BridgeConfig::default()
    };
    let bridge = Bridge::new(
        config,
        Arc::new(types()),
        Arc::new(DefaultRegistry::empty()),
        server.clone(),
        broker.clone(),
    );

    let start = tokio::time::Instant::now();
    let batch = bridge.observe_active_attributes("/7392/0", robot()).unwrap();
    batch.outcome().await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn one_failed_setup_does_not_stop_siblings() {
    let server = Arc::new(FakeServer::default().failing_on(BATTERY));
    let broker = Arc::new(FakeBroker::default());

    let outcome = bridge(&server, &broker)
        .observe_active_attributes("/7392/0", robot())
        .unwrap()
        .outcome()
        .await
        .unwrap();

    assert_eq!(server.calls().len(), 2);
    match outcome {
        BatchOutcome::Completed {
            established,
            failures,
        } => {
            assert_eq!(established, 1);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].attribute, "Battery");
            assert_eq!(failures[0].address, BATTERY);
        }
        BatchOutcome::Cancelled { .. } => panic!("batch should have run"),
    }
}

#[tokio::test(start_paused = true)]
async fn removing_device_before_delay_drops_batch() {
    let server = Arc::new(FakeServer::default());
    let broker = Arc::new(FakeBroker::default());
    let bridge = bridge(&server, &broker);
    let device = robot();

    let batch = bridge
        .observe_active_attributes("/7392/0", device.clone())
        .unwrap();
    assert!(bridge.device_removed(&device));

    let outcome = batch.outcome().await.unwrap();
    assert!(matches!(outcome, BatchOutcome::Cancelled { pending: 2 }));
    assert!(server.calls().is_empty());
    assert_eq!(bridge.pending_batches(), 0);
}

#[tokio::test(start_paused = true)]
async fn removing_device_after_fan_out_is_a_no_op() {
    let server = Arc::new(FakeServer::default());
    let broker = Arc::new(FakeBroker::default());
    let bridge = bridge(&server, &broker);
    let device = robot();

    bridge
        .observe_active_attributes("/7392/0", device.clone())
        .unwrap()
        .outcome()
        .await
        .unwrap();

    assert!(!bridge.device_removed(&device));
    assert_eq!(server.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn reregistering_without_objects_drops_pending_batch() {
    let server = Arc::new(FakeServer::default());
    let broker = Arc::new(FakeBroker::default());
    let bridge = bridge(&server, &broker);

    let first = bridge
        .observe_active_attributes("/7392/0", robot())
        .unwrap();
    // The device comes back advertising nothing we observe.
    let second = bridge.observe_active_attributes("/1/0", robot()).unwrap();
    assert!(second.is_empty());

    assert!(first.outcome().await.unwrap().is_cancelled());
    second.outcome().await.unwrap();
    assert!(server.calls().is_empty());
    assert_eq!(bridge.pending_batches(), 0);
}

// ── Mapping failures ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn unresolved_attribute_schedules_nothing() {
    let server = Arc::new(FakeServer::default());
    let broker = Arc::new(FakeBroker::default());
    let bridge = bridge(&server, &broker);
    let device = Arc::new(
        Device::new("Robot:c3po", "c3po", "Robot").with_active(Attribute::new("Manufacturer", "string")),
    );

    let err = bridge
        .observe_active_attributes("/3/0 /7392/0", device)
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::UnresolvedAttributeMapping {
            reason: UnresolvedReason::TypeMappingMissing { .. },
            ..
        }
    ));
    assert_eq!(bridge.pending_batches(), 0);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(server.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn device_mapping_takes_precedence_over_type() {
    let server = Arc::new(FakeServer::default());
    let broker = Arc::new(FakeBroker::default());
    let override_address = ResourceAddress::new(3, 0, 9);
    let device = Arc::new(
        Device::new("Robot:bb8", "bb8", "Robot")
            .with_active(Attribute::new("Battery", "number"))
            .with_mapping("Battery", override_address),
    );

    bridge(&server, &broker)
        .observe_active_attributes("/3/0 /7392/0", device)
        .unwrap()
        .outcome()
        .await
        .unwrap();

    assert_eq!(server.calls(), vec![("bb8".to_owned(), override_address)]);
}

#[tokio::test(start_paused = true)]
async fn registry_fallback_for_unconfigured_type() {
    let server = Arc::new(FakeServer::default());
    let broker = Arc::new(FakeBroker::default());
    let device = Arc::new(
        Device::new("Sensor:1", "s1", "Sensor")
            .with_active(Attribute::new("Manufacturer", "string"))
            .with_active(Attribute::new("Latitude", "number")),
    );

    let outcome = bridge(&server, &broker)
        .observe_active_attributes("</3/0>", device)
        .unwrap()
        .outcome()
        .await
        .unwrap();

    // Location (6) is not advertised, so only the Device object is observed.
    assert_eq!(outcome.established(), 1);
    assert_eq!(server.calls(), vec![("s1".to_owned(), MANUFACTURER)]);
}

// ── Relaying ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn initial_value_relayed_once_then_reports_follow() {
    let server = Arc::new(FakeServer::default().with_initial(BATTERY, "87"));
    let broker = Arc::new(FakeBroker::default());

    bridge(&server, &broker)
        .observe_active_attributes("/7392/0", robot())
        .unwrap()
        .outcome()
        .await
        .unwrap();

    assert_eq!(broker.values(), vec![("Battery".to_owned(), "87".to_owned())]);

    server.handler_for("Position").relay("10,20").await;
    server.handler_for("Battery").relay("86").await;

    assert_eq!(
        broker.values(),
        vec![
            ("Battery".to_owned(), "87".to_owned()),
            ("Position".to_owned(), "10,20".to_owned()),
            ("Battery".to_owned(), "86".to_owned()),
        ]
    );

    let updates = broker.updates.lock().unwrap();
    assert!(updates.iter().all(|u| u.attributes.len() == 1));
    assert!(updates.iter().all(|u| u.entity_name == "Robot:r2d2"));
    assert!(updates.iter().all(|u| u.entity_type == "Robot"));
}
