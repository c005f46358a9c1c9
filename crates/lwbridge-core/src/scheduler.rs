// ── Observation scheduling ──
//
// A batch waits out the post-registration grace period, then starts
// every observation at once. One failed setup never stops its
// siblings; the batch result is logged once at the end.
//
// A batch still waiting on its delay can be cancelled per device (the
// device went away). After fan-out there is no cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::StreamExt;
use futures_util::future::join_all;
use futures_util::stream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{CoreError, ObservationSetupFailure};
use crate::planner::ObservationTask;
use crate::relay::UpdateRelay;
use crate::service::ObservationService;

// ── BatchOutcome ─────────────────────────────────────────────────

/// How a scheduled batch ended.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// Every setup was attempted.
    Completed {
        established: usize,
        failures: Vec<ObservationSetupFailure>,
    },
    /// The device was removed before the delay elapsed; nothing was attempted.
    Cancelled { pending: usize },
}

impl BatchOutcome {
    /// All attempted setups succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { failures, .. } if failures.is_empty())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn established(&self) -> usize {
        match self {
            Self::Completed { established, .. } => *established,
            Self::Cancelled { .. } => 0,
        }
    }

    pub fn failures(&self) -> &[ObservationSetupFailure] {
        match self {
            Self::Completed { failures, .. } => failures,
            Self::Cancelled { .. } => &[],
        }
    }
}

// ── ScheduledBatch ───────────────────────────────────────────────

/// Handle to a batch running in the background.
///
/// Dropping it detaches the batch; it still runs to completion.
#[derive(Debug)]
pub struct ScheduledBatch {
    device_id: String,
    tasks: usize,
    handle: JoinHandle<BatchOutcome>,
}

impl ScheduledBatch {
    /// Internal id of the device this batch observes.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Number of observations in the batch.
    pub fn len(&self) -> usize {
        self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks == 0
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the batch and return its outcome.
    pub async fn outcome(self) -> Result<BatchOutcome, CoreError> {
        self.handle
            .await
            .map_err(|e| CoreError::Internal(format!("observation batch task failed: {e}")))
    }
}

// ── Scheduler ────────────────────────────────────────────────────

/// Runs observation work lists against the observation service.
///
/// Cheaply cloneable via `Arc<SchedulerInner>`.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    observer: Arc<dyn ObservationService>,
    relay: UpdateRelay,
    max_concurrent: Option<usize>,
    /// Device internal id → (batch id, token) of its batch awaiting the delay.
    pending: DashMap<String, (u64, CancellationToken)>,
    next_batch: AtomicU64,
}

impl Scheduler {
    pub fn new(
        observer: Arc<dyn ObservationService>,
        relay: UpdateRelay,
        max_concurrent: Option<usize>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                observer,
                relay,
                max_concurrent,
                pending: DashMap::new(),
                next_batch: AtomicU64::new(0),
            }),
        }
    }

    /// Run `tasks` for `device_id` after `delay`, returning immediately.
    ///
    /// Must be called from within a Tokio runtime. A batch scheduled for
    /// a device that still has one waiting replaces it, even when the new
    /// batch is empty.
    pub fn schedule(
        &self,
        device_id: &str,
        tasks: Vec<ObservationTask>,
        delay: Duration,
    ) -> ScheduledBatch {
        let device_id = device_id.to_owned();
        let batch_id = self.inner.next_batch.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        if let Some((_, (_, previous))) = self.inner.pending.remove(&device_id) {
            debug!(device = %device_id, "replacing pending observation batch");
            previous.cancel();
        }
        self.inner
            .pending
            .insert(device_id.clone(), (batch_id, cancel.clone()));

        debug!(
            device = %device_id,
            tasks = tasks.len(),
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling observation batch"
        );

        let count = tasks.len();
        let inner = Arc::clone(&self.inner);
        let id = device_id.clone();
        let handle = tokio::spawn(async move { inner.run(id, batch_id, tasks, delay, cancel).await });

        ScheduledBatch {
            device_id,
            tasks: count,
            handle,
        }
    }

    /// Drop the batch waiting for `device_id`, if any.
    ///
    /// Returns `true` if a pending batch was cancelled. Batches that have
    /// already started their setups are not affected.
    pub fn cancel(&self, device_id: &str) -> bool {
        match self.inner.pending.remove(device_id) {
            Some((_, (_, token))) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of devices with a batch still waiting on its delay.
    pub fn pending(&self) -> usize {
        self.inner.pending.len()
    }
}

impl SchedulerInner {
    async fn run(
        &self,
        device_id: String,
        batch_id: u64,
        tasks: Vec<ObservationTask>,
        delay: Duration,
        cancel: CancellationToken,
    ) -> BatchOutcome {
        let device = device_id.as_str();

        let cancelled = tokio::select! {
            biased;
            () = cancel.cancelled() => true,
            () = tokio::time::sleep(delay) => false,
        };

        self.pending
            .remove_if(device, |_, (pending_id, _)| *pending_id == batch_id);
        // A cancel can land between the timer firing and the entry being released.
        if cancelled || cancel.is_cancelled() {
            info!(
                device,
                pending = tasks.len(),
                "device removed before observation delay elapsed, dropping batch"
            );
            return BatchOutcome::Cancelled {
                pending: tasks.len(),
            };
        }

        let results: Vec<Result<(), ObservationSetupFailure>> = match self.max_concurrent {
            Some(limit) => {
                stream::iter(tasks.into_iter().map(|task| self.establish(task)))
                    .buffer_unordered(limit.max(1))
                    .collect()
                    .await
            }
            None => join_all(tasks.into_iter().map(|task| self.establish(task))).await,
        };

        let mut established = 0;
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(()) => established += 1,
                Err(failure) => failures.push(failure),
            }
        }

        if failures.is_empty() {
            info!(device, established, "observers created successfully");
        } else {
            let summary = failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            error!(
                device,
                established,
                failed = failures.len(),
                errors = %summary,
                "could not complete the observer creation process"
            );
        }

        BatchOutcome::Completed {
            established,
            failures,
        }
    }

    /// Set up one observation, relaying its initial value if one came back.
    async fn establish(&self, task: ObservationTask) -> Result<(), ObservationSetupFailure> {
        let ObservationTask {
            device,
            address,
            attribute,
            ..
        } = task;
        let handler = self.relay.bind(Arc::clone(&device), attribute.clone());

        match self
            .observer
            .observe(&device.internal_id, address, handler.clone())
            .await
        {
            Ok(initial) => {
                debug!(device = %device.internal_id, attribute = %attribute.name, %address, "observation established");
                if let Some(value) = initial {
                    handler.relay(value).await;
                }
                Ok(())
            }
            Err(source) => {
                warn!(
                    device = %device.internal_id,
                    attribute = %attribute.name,
                    %address,
                    error = %source,
                    "observation setup failed"
                );
                Err(ObservationSetupFailure {
                    attribute: attribute.name,
                    address,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::model::{Attribute, AttributeUpdate, Device, MappingTier, ResourceAddress};
    use crate::relay::RelayHandle;
    use crate::service::{AttributeSink, ObservationError, SinkError};

    #[derive(Default)]
    struct Observer {
        calls: Mutex<Vec<ResourceAddress>>,
    }

    #[async_trait]
    impl ObservationService for Observer {
        async fn observe(
            &self,
            _device_id: &str,
            address: ResourceAddress,
            _handler: RelayHandle,
        ) -> Result<Option<String>, ObservationError> {
            self.calls.lock().unwrap().push(address);
            if address.object_resource == 99 {
                Err(ObservationError::Rejected { code: "4.04".into() })
            } else {
                Ok(None)
            }
        }
    }

    /// Takes a second per setup and records how many overlap.
    #[derive(Default)]
    struct SlowObserver {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ObservationService for SlowObserver {
        async fn observe(
            &self,
            _device_id: &str,
            _address: ResourceAddress,
            _handler: RelayHandle,
        ) -> Result<Option<String>, ObservationError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    struct NullSink;

    #[async_trait]
    impl AttributeSink for NullSink {
        async fn update(&self, _update: AttributeUpdate) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn task(device: &Arc<Device>, resource: u16) -> ObservationTask {
        ObservationTask {
            device: Arc::clone(device),
            address: ResourceAddress::new(3, 0, resource),
            attribute: Attribute::new(format!("attr{resource}"), "string"),
            tier: MappingTier::Registry,
        }
    }

    fn scheduler(observer: Arc<dyn ObservationService>, limit: Option<usize>) -> Scheduler {
        Scheduler::new(observer, UpdateRelay::new(Arc::new(NullSink)), limit)
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_fan_out_attempts_every_task() {
        let observer = Arc::new(Observer::default());
        let device = Arc::new(Device::new("d", "1", "T"));
        let tasks = (0..5).map(|r| task(&device, r)).collect();

        let outcome = scheduler(observer.clone(), Some(2))
            .schedule("1", tasks, Duration::from_millis(50))
            .outcome()
            .await
            .unwrap();

        assert_eq!(outcome.established(), 5);
        assert_eq!(observer.calls.lock().unwrap().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_batch_replaces_pending_one() {
        let observer = Arc::new(Observer::default());
        let device = Arc::new(Device::new("d", "1", "T"));
        let scheduler = scheduler(observer.clone(), None);

        let first = scheduler.schedule("1", vec![task(&device, 1)], Duration::from_millis(50));
        let second = scheduler.schedule("1", vec![task(&device, 2)], Duration::from_millis(50));
        assert_eq!(scheduler.pending(), 1);

        assert!(first.outcome().await.unwrap().is_cancelled());
        assert!(second.outcome().await.unwrap().is_success());
        assert_eq!(
            *observer.calls.lock().unwrap(),
            vec![ResourceAddress::new(3, 0, 2)]
        );
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_reregistration_cancels_pending_batch() {
        let observer = Arc::new(Observer::default());
        let device = Arc::new(Device::new("d", "1", "T"));
        let scheduler = scheduler(observer.clone(), None);

        let first = scheduler.schedule("1", vec![task(&device, 1)], Duration::from_millis(50));
        let second = scheduler.schedule("1", Vec::new(), Duration::from_millis(50));

        assert!(first.outcome().await.unwrap().is_cancelled());
        assert_eq!(second.outcome().await.unwrap().established(), 0);
        assert!(observer.calls.lock().unwrap().is_empty());
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_setups_run_concurrently() {
        let observer = Arc::new(SlowObserver::default());
        let device = Arc::new(Device::new("d", "1", "T"));
        let tasks = (0..5).map(|r| task(&device, r)).collect();

        let started = Instant::now();
        let outcome = scheduler(observer.clone(), None)
            .schedule("1", tasks, Duration::ZERO)
            .outcome()
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(outcome.established(), 5);
        assert_eq!(observer.peak.load(Ordering::SeqCst), 5);
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_limit_bounds_setups_in_flight() {
        let observer = Arc::new(SlowObserver::default());
        let device = Arc::new(Device::new("d", "1", "T"));
        let tasks = (0..5).map(|r| task(&device, r)).collect();

        let started = Instant::now();
        let outcome = scheduler(observer.clone(), Some(2))
            .schedule("1", tasks, Duration::ZERO)
            .outcome()
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(outcome.established(), 5);
        assert_eq!(observer.peak.load(Ordering::SeqCst), 2);
        // Three waves of at most two.
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_batch_completes_with_nothing_established() {
        let observer = Arc::new(Observer::default());
        let batch = scheduler(observer, None).schedule("1", Vec::new(), Duration::from_millis(50));

        assert!(batch.is_empty());
        assert_eq!(batch.device_id(), "1");
        let outcome = batch.outcome().await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.established(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_collected_not_fatal() {
        let observer = Arc::new(Observer::default());
        let device = Arc::new(Device::new("d", "1", "T"));
        let tasks = vec![task(&device, 1), task(&device, 99), task(&device, 2)];

        let outcome = scheduler(observer.clone(), None)
            .schedule("1", tasks, Duration::ZERO)
            .outcome()
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.established(), 2);
        assert_eq!(outcome.failures().len(), 1);
        assert_eq!(outcome.failures()[0].attribute, "attr99");
        assert_eq!(observer.calls.lock().unwrap().len(), 3);
    }
}
