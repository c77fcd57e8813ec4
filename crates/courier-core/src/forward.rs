//! Forward Orchestrator: the delivery decision and retry-state core.
//!
//! One `Forwarder` serves three entry points:
//! - `forward` — one synchronous attempt, outside the retry cycle;
//! - `forward_async` — hand the delivery to the durable queue;
//! - `on_redeliver` — the queue's webhook calling back with the payload.
//!
//! The orchestrator decides, classifies and records. It never schedules a
//! retry timer: whether and when a failed attempt is redelivered belongs
//! to the queue behind the `TaskQueue` port.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{
    AttemptStats, Classifier, DeliveryRecord, DeliveryRequest, DeliveryResponse,
};
use crate::ports::{
    HttpSender, LastDelivery, QueueError, QueueTask, SendError, TaskQueue, Warehouse,
};

/// Fixed path the queue POSTs redeliveries to.
pub const WEBHOOK_PATH: &str = "/_ah/tasks/forward";

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("send failed: {0}")]
    Send(#[from] SendError),

    #[error("could not serialize delivery for the queue: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("could not enqueue delivery: {0}")]
    Enqueue(#[from] QueueError),
}

/// What a synchronous attempt means for the delivery.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Permanent outcome (by classification policy): the delivery is done,
    /// even though it concluded synchronously. Relay this verbatim.
    Concluded(DeliveryResponse),

    /// Transient outcome: this attempt does not conclude the delivery;
    /// the caller should fall back to asynchronous scheduling.
    Retryable(DeliveryResponse),
}

/// What one redelivery attempt reports back to the queue's webhook
/// machinery. The status is all the queue reads; a non-2xx value triggers
/// its own backoff policy.
#[derive(Debug)]
pub enum RedeliveryOutcome {
    /// The payload did not parse as a delivery. No send was performed.
    MalformedPayload,

    /// Response obtained, no error status: the delivery is done.
    Delivered(DeliveryResponse),

    /// Response obtained but with an error status; relayed to the queue
    /// as-is so its retry policy can take over.
    RemoteError(DeliveryResponse),

    /// No response could be obtained at all.
    SendFailed(SendError),
}

impl RedeliveryOutcome {
    pub fn webhook_status(&self) -> u16 {
        match self {
            RedeliveryOutcome::MalformedPayload => 400,
            RedeliveryOutcome::Delivered(_) => 200,
            RedeliveryOutcome::RemoteError(response) => response.status,
            RedeliveryOutcome::SendFailed(_) => 500,
        }
    }
}

/// The core state machine, composed entirely of ports.
///
/// Holds no mutable state of its own: every invocation is independent, and
/// all cross-attempt coordination (attempt counts, dedup, scheduling) is
/// delegated to the queue.
pub struct Forwarder {
    sender: Arc<dyn HttpSender>,
    queue: Arc<dyn TaskQueue>,
    warehouse: Arc<dyn Warehouse>,
    last_delivery: Arc<dyn LastDelivery>,
    classifier: Classifier,
}

impl Forwarder {
    pub fn new(
        sender: Arc<dyn HttpSender>,
        queue: Arc<dyn TaskQueue>,
        warehouse: Arc<dyn Warehouse>,
        last_delivery: Arc<dyn LastDelivery>,
    ) -> Self {
        Self {
            sender,
            queue,
            warehouse,
            last_delivery,
            classifier: Classifier::default(),
        }
    }

    /// Override the permanent/transient boundary policy.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Synchronous path: exactly one send, never an enqueue.
    ///
    /// The outcome record is written whatever happens, with zero stats —
    /// this call sits outside the retry cycle, so it is always "attempt
    /// zero" and always recorded as completed.
    pub async fn forward(
        &self,
        request: &DeliveryRequest,
    ) -> Result<SyncOutcome, ForwardError> {
        let sent = self.sender.send(request).await;
        let stats = AttemptStats::outside_retry_cycle();
        self.put_record(request, &sent, stats).await;

        match sent {
            Err(error) => {
                warn!(delivery = %request, %error, "synchronous forward failed");
                Err(ForwardError::Send(error))
            }
            Ok(response) if self.classifier.is_permanent(&response) => {
                debug!(delivery = %request, status = response.status, "synchronous forward concluded");
                Ok(SyncOutcome::Concluded(response))
            }
            Ok(response) => {
                debug!(delivery = %request, status = response.status, "synchronous forward retryable");
                Ok(SyncOutcome::Retryable(response))
            }
        }
    }

    /// Asynchronous submission: serialize and hand off to the queue,
    /// keyed by the delivery id so resubmission cannot double-schedule.
    pub async fn forward_async(&self, request: &DeliveryRequest) -> Result<(), ForwardError> {
        let payload = serde_json::to_vec(request).map_err(ForwardError::Serialize)?;

        self.queue
            .enqueue(QueueTask {
                id: request.id.clone(),
                webhook_path: WEBHOOK_PATH.to_string(),
                payload,
            })
            .await?;

        info!(delivery = %request, "enqueued for delivery");
        Ok(())
    }

    /// Redelivery entry point, invoked by the queue's webhook callback.
    pub async fn on_redeliver(&self, payload: &[u8]) -> RedeliveryOutcome {
        let request: DeliveryRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "could not parse redelivered task payload");
                return RedeliveryOutcome::MalformedPayload;
            }
        };

        let stats = self.queue.attempt_stats(&request.id).await;
        let sent = self.sender.send(&request).await;
        self.put_record(&request, &sent, stats).await;

        match sent {
            Err(error) => {
                warn!(delivery = %request, %error, "redelivery attempt failed");
                if stats.is_last_attempt() {
                    self.last_delivery
                        .on_last_delivery(&request, None, Some(&error))
                        .await;
                }
                RedeliveryOutcome::SendFailed(error)
            }
            Ok(response) if response.is_error() => {
                warn!(delivery = %request, status = response.status, "redelivery attempt rejected by remote");
                if stats.is_last_attempt() {
                    self.last_delivery
                        .on_last_delivery(&request, Some(&response), None)
                        .await;
                }
                RedeliveryOutcome::RemoteError(response)
            }
            Ok(response) => {
                info!(delivery = %request, status = response.status, "delivered");
                // Success always concludes the delivery: the queue stops
                // redelivering on a 2xx webhook status.
                self.last_delivery
                    .on_last_delivery(&request, Some(&response), None)
                    .await;
                RedeliveryOutcome::Delivered(response)
            }
        }
    }

    /// Best-effort audit write: respond first-class, record second-class.
    async fn put_record(
        &self,
        request: &DeliveryRequest,
        sent: &Result<DeliveryResponse, SendError>,
        stats: AttemptStats,
    ) {
        let record = DeliveryRecord::new(
            request.clone(),
            sent.as_ref().ok().cloned(),
            sent.as_ref().err().map(|e| e.to_string()),
            stats,
        );
        if let Err(error) = self.warehouse.record(record).await {
            warn!(delivery = %request, %error, "could not store attempt outcome");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::domain::{DeliveryId, Headers};
    use crate::impls::InMemoryWarehouse;
    use crate::ports::WarehouseError;

    struct StubSender {
        result: Result<DeliveryResponse, SendError>,
        calls: AtomicUsize,
    }

    impl StubSender {
        fn responding(status: u16, body: &str) -> Self {
            Self {
                result: Ok(DeliveryResponse {
                    status,
                    headers: Headers::new(),
                    body: body.as_bytes().to_vec(),
                }),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                result: Err(SendError::new(message)),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpSender for StubSender {
        async fn send(&self, _request: &DeliveryRequest) -> Result<DeliveryResponse, SendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    #[derive(Default)]
    struct RecordingQueue {
        tasks: Mutex<Vec<QueueTask>>,
        stats: Option<AttemptStats>,
        fail_enqueue: bool,
    }

    impl RecordingQueue {
        fn with_stats(stats: AttemptStats) -> Self {
            Self {
                stats: Some(stats),
                ..Self::default()
            }
        }

        fn enqueued(&self) -> Vec<QueueTask> {
            self.tasks.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskQueue for RecordingQueue {
        async fn enqueue(&self, task: QueueTask) -> Result<(), QueueError> {
            if self.fail_enqueue {
                return Err(QueueError::OperationFailed("queue down".into()));
            }
            self.tasks.lock().unwrap().push(task);
            Ok(())
        }

        async fn attempt_stats(&self, _id: &DeliveryId) -> AttemptStats {
            self.stats.unwrap_or_default()
        }
    }

    struct FailingWarehouse;

    #[async_trait]
    impl Warehouse for FailingWarehouse {
        async fn record(&self, _record: DeliveryRecord) -> Result<(), WarehouseError> {
            Err(WarehouseError::WriteFailed("disk full".into()))
        }
    }

    #[derive(Default)]
    struct RecordingHook {
        invocations: Mutex<Vec<(Option<u16>, Option<String>)>>,
    }

    impl RecordingHook {
        fn invocations(&self) -> Vec<(Option<u16>, Option<String>)> {
            self.invocations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LastDelivery for RecordingHook {
        async fn on_last_delivery(
            &self,
            _request: &DeliveryRequest,
            response: Option<&DeliveryResponse>,
            error: Option<&SendError>,
        ) {
            self.invocations
                .lock()
                .unwrap()
                .push((response.map(|r| r.status), error.map(|e| e.to_string())));
        }
    }

    fn request() -> DeliveryRequest {
        let mut headers = Headers::new();
        headers.append("Content-Type", "text/plain");
        DeliveryRequest::new(
            DeliveryId::from("delivery-1"),
            "POST",
            "https://remote.example.com/hook",
            headers,
            b"hello".to_vec(),
        )
    }

    struct Fixture {
        sender: Arc<StubSender>,
        queue: Arc<RecordingQueue>,
        warehouse: Arc<InMemoryWarehouse>,
        hook: Arc<RecordingHook>,
        forwarder: Forwarder,
    }

    fn fixture(sender: StubSender, queue: RecordingQueue) -> Fixture {
        let sender = Arc::new(sender);
        let queue = Arc::new(queue);
        let warehouse = Arc::new(InMemoryWarehouse::default());
        let hook = Arc::new(RecordingHook::default());
        let forwarder = Forwarder::new(
            sender.clone(),
            queue.clone(),
            warehouse.clone(),
            hook.clone(),
        );
        Fixture {
            sender,
            queue,
            warehouse,
            hook,
            forwarder,
        }
    }

    #[tokio::test]
    async fn sync_success_concludes_without_enqueue() {
        let f = fixture(StubSender::responding(200, "ok"), RecordingQueue::default());

        let outcome = f.forwarder.forward(&request()).await.unwrap();

        match outcome {
            SyncOutcome::Concluded(response) => {
                assert_eq!(response.status, 200);
                assert_eq!(response.body, b"ok");
            }
            other => panic!("expected Concluded, got {other:?}"),
        }
        assert!(f.queue.enqueued().is_empty());

        let records = f.warehouse.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stats, AttemptStats::outside_retry_cycle());
        assert!(records[0].completed);
        assert!(records[0].error.is_none());
    }

    #[tokio::test]
    async fn sync_permanent_client_error_concludes() {
        let f = fixture(StubSender::responding(404, "nope"), RecordingQueue::default());

        match f.forwarder.forward(&request()).await.unwrap() {
            SyncOutcome::Concluded(response) => assert_eq!(response.status, 404),
            other => panic!("expected Concluded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sync_transient_failure_requests_async_fallback() {
        let f = fixture(StubSender::responding(503, ""), RecordingQueue::default());

        match f.forwarder.forward(&request()).await.unwrap() {
            SyncOutcome::Retryable(response) => assert_eq!(response.status, 503),
            other => panic!("expected Retryable, got {other:?}"),
        }
        // Falling back is the caller's decision, not this path's.
        assert!(f.queue.enqueued().is_empty());
    }

    #[tokio::test]
    async fn sync_send_error_is_recorded_and_surfaced() {
        let f = fixture(
            StubSender::failing("connection refused"),
            RecordingQueue::default(),
        );

        let error = f.forwarder.forward(&request()).await.unwrap_err();
        assert!(matches!(error, ForwardError::Send(_)));
        assert!(error.to_string().contains("connection refused"));

        let records = f.warehouse.snapshot();
        assert_eq!(records.len(), 1);
        assert!(records[0].response.is_none());
        assert_eq!(records[0].error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn forward_async_enqueues_the_serialized_delivery_once() {
        let f = fixture(StubSender::responding(200, ""), RecordingQueue::default());
        let request = request();

        f.forwarder.forward_async(&request).await.unwrap();

        let tasks = f.queue.enqueued();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, request.id);
        assert_eq!(tasks[0].webhook_path, WEBHOOK_PATH);

        let roundtripped: DeliveryRequest = serde_json::from_slice(&tasks[0].payload).unwrap();
        assert_eq!(roundtripped, request);

        // No send happens on the async submission path.
        assert_eq!(f.sender.calls(), 0);
    }

    #[tokio::test]
    async fn forward_async_reports_queue_failure() {
        let queue = RecordingQueue {
            fail_enqueue: true,
            ..RecordingQueue::default()
        };
        let f = fixture(StubSender::responding(200, ""), queue);

        let error = f.forwarder.forward_async(&request()).await.unwrap_err();
        assert!(matches!(error, ForwardError::Enqueue(_)));
    }

    #[tokio::test]
    async fn redeliver_success_fires_the_hook_and_reports_200() {
        let f = fixture(
            StubSender::responding(200, "done"),
            RecordingQueue::with_stats(AttemptStats::new(1, 5)),
        );
        let payload = serde_json::to_vec(&request()).unwrap();

        let outcome = f.forwarder.on_redeliver(&payload).await;
        assert_eq!(outcome.webhook_status(), 200);

        let invocations = f.hook.invocations();
        assert_eq!(invocations, vec![(Some(200), None)]);

        let records = f.warehouse.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stats, AttemptStats::new(1, 5));
        assert!(!records[0].completed);
    }

    #[tokio::test]
    async fn redeliver_mid_cycle_failure_skips_the_hook() {
        let f = fixture(
            StubSender::responding(500, ""),
            RecordingQueue::with_stats(AttemptStats::new(2, 5)),
        );
        let payload = serde_json::to_vec(&request()).unwrap();

        let outcome = f.forwarder.on_redeliver(&payload).await;
        assert_eq!(outcome.webhook_status(), 500);

        assert!(f.hook.invocations().is_empty());
        let records = f.warehouse.snapshot();
        assert!(!records[0].completed);
    }

    #[tokio::test]
    async fn redeliver_last_attempt_remote_error_fires_the_hook() {
        let f = fixture(
            StubSender::responding(500, "still broken"),
            RecordingQueue::with_stats(AttemptStats::new(5, 5)),
        );
        let payload = serde_json::to_vec(&request()).unwrap();

        let outcome = f.forwarder.on_redeliver(&payload).await;
        assert_eq!(outcome.webhook_status(), 500);

        // Hook sees the response, not an error.
        assert_eq!(f.hook.invocations(), vec![(Some(500), None)]);

        let records = f.warehouse.snapshot();
        assert_eq!(records.len(), 1);
        assert!(records[0].completed);
    }

    #[tokio::test]
    async fn redeliver_last_attempt_send_error_fires_the_hook_with_the_error() {
        let f = fixture(
            StubSender::failing("connection reset"),
            RecordingQueue::with_stats(AttemptStats::new(3, 3)),
        );
        let payload = serde_json::to_vec(&request()).unwrap();

        let outcome = f.forwarder.on_redeliver(&payload).await;
        assert_eq!(outcome.webhook_status(), 500);

        let invocations = f.hook.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].0, None);
        assert!(invocations[0].1.as_deref().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn redeliver_remote_status_is_relayed_to_the_queue() {
        let f = fixture(
            StubSender::responding(404, ""),
            RecordingQueue::with_stats(AttemptStats::new(1, 5)),
        );
        let payload = serde_json::to_vec(&request()).unwrap();

        let outcome = f.forwarder.on_redeliver(&payload).await;
        assert_eq!(outcome.webhook_status(), 404);
    }

    #[tokio::test]
    async fn redeliver_malformed_payload_never_reaches_the_sender() {
        let f = fixture(StubSender::responding(200, ""), RecordingQueue::default());

        let outcome = f.forwarder.on_redeliver(b"{ not json").await;
        assert_eq!(outcome.webhook_status(), 400);

        assert_eq!(f.sender.calls(), 0);
        assert!(f.hook.invocations().is_empty());
        assert!(f.warehouse.snapshot().is_empty());
    }

    #[tokio::test]
    async fn warehouse_failure_never_blocks_the_outcome() {
        let sender = Arc::new(StubSender::responding(200, "ok"));
        let queue = Arc::new(RecordingQueue::default());
        let hook = Arc::new(RecordingHook::default());
        let forwarder = Forwarder::new(
            sender,
            queue,
            Arc::new(FailingWarehouse),
            hook,
        );

        let outcome = forwarder.forward(&request()).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Concluded(_)));
    }

    #[tokio::test]
    async fn a_lenient_classifier_concludes_on_5xx() {
        let f = fixture(StubSender::responding(503, ""), RecordingQueue::default());
        let forwarder = Forwarder::new(
            f.sender.clone(),
            f.queue.clone(),
            f.warehouse.clone(),
            f.hook.clone(),
        )
        .with_classifier(Classifier::with_boundary(600));

        match forwarder.forward(&request()).await.unwrap() {
            SyncOutcome::Concluded(response) => assert_eq!(response.status, 503),
            other => panic!("expected Concluded, got {other:?}"),
        }
    }
}
