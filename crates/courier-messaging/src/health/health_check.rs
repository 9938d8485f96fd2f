//! Single-flight messaging health check.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use courier_cache::{Expiration, TtlStore};
use futures::FutureExt;
use jiff::Timestamp;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{HealthCheckContext, HealthCheckOptions, ProbeTarget};
use crate::message::OutboundMessage;
use crate::{
    Broker, Error, HealthReport, HealthStatus, MessagingClient, Result, TRACING_TARGET_HEALTH,
};

const HEALTHY_DESCRIPTION: &str = "All messaging checks passed";
const UNHEALTHY_DESCRIPTION: &str = "One or more messaging checks failed";
const UNEXPECTED_FAILURE_DESCRIPTION: &str = "Messaging health check failed unexpectedly";

const CACHE_KEY_PREFIX: &str = "_messaging_health_";
const SUCCESS_MARKER: &str = "success";
const REDACTED_ERROR: &str = "Failed";
const MAX_JITTER_MILLIS: u64 = 5_000;

// Probe message properties
const MESSAGE_TYPE_PROPERTY: &str = "MessageType";
const MESSAGE_KIND_PROPERTY: &str = "MessageKind";
const TIMESTAMP_PROPERTY: &str = "HealthCheckTimestamp";
const PROBE_ID_PREFIX: &str = "healthcheck_";

/// Health check over the queues, topics and subscriptions of one client.
///
/// Concurrent callers share a single probe execution: the first caller to
/// find the cache empty takes the recomputation lock, runs every probe and
/// stores the result, and callers waiting on the lock then read that result.
/// Healthy results are cached for the configured timeout and unhealthy ones
/// for half of it (at least 35 seconds), each plus up to 5 seconds of jitter.
pub struct MessagingHealthCheck<B: Broker> {
    client: MessagingClient<B>,
    store: Arc<dyn TtlStore<HealthReport>>,
    targets: Vec<ProbeTarget>,
    cache_key: String,
    caching_disabled: bool,
    success_ttl: Duration,
    failure_ttl: Duration,
    is_production: bool,
    recompute: Mutex<()>,
}

impl<B: Broker> std::fmt::Debug for MessagingHealthCheck<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingHealthCheck")
            .field("client", &self.client.name())
            .field("cache_key", &self.cache_key)
            .field("targets", &self.targets.len())
            .field("caching_disabled", &self.caching_disabled)
            .field("success_ttl", &self.success_ttl)
            .field("failure_ttl", &self.failure_ttl)
            .field("is_production", &self.is_production)
            .finish_non_exhaustive()
    }
}

impl<B: Broker> MessagingHealthCheck<B> {
    /// Creates a health check for `client`, caching results in `store`.
    ///
    /// The cache key is derived from the client name, so one store can back
    /// the health checks of several clients.
    pub fn new(
        client: MessagingClient<B>,
        store: Arc<dyn TtlStore<HealthReport>>,
        options: &HealthCheckOptions,
    ) -> Self {
        Self {
            cache_key: format!("{CACHE_KEY_PREFIX}{}", client.name()),
            targets: options.targets(),
            caching_disabled: options.is_caching_disabled(),
            success_ttl: options.success_ttl(),
            failure_ttl: options.failure_ttl(),
            is_production: false,
            recompute: Mutex::new(()),
            client,
            store,
        }
    }

    /// Redacts per-target error details to `"Failed"` when `is_production` is set.
    pub fn with_production(mut self, is_production: bool) -> Self {
        self.is_production = is_production;
        self
    }

    /// Returns the key results are cached under.
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Returns the probe targets, in execution order.
    pub fn targets(&self) -> &[ProbeTarget] {
        &self.targets
    }

    /// Drops the cached result so the next check recomputes it.
    pub async fn invalidate(&self) -> bool {
        self.store.remove(&self.cache_key).await.is_some()
    }

    /// Returns the current health report, probing only if no fresh report is cached.
    ///
    /// Probe failures never surface as errors; they produce an unhealthy
    /// report. Only cancellation or an elapsed deadline from `context` is
    /// returned as an error, and either releases the recomputation lock.
    #[tracing::instrument(skip_all, target = TRACING_TARGET_HEALTH, fields(client = %self.client.name()))]
    pub async fn check_health(&self, context: &HealthCheckContext) -> Result<HealthReport> {
        if self.caching_disabled {
            return context.run(self.execute()).await;
        }

        if let Some(report) = self.store.get(&self.cache_key).await {
            tracing::trace!(target: TRACING_TARGET_HEALTH, "Serving cached health report");
            return Ok(report);
        }

        let _recompute = context.run(self.recompute.lock()).await?;

        if let Some(report) = self.store.get(&self.cache_key).await {
            tracing::trace!(
                target: TRACING_TARGET_HEALTH,
                "Serving health report computed while waiting"
            );
            return Ok(report);
        }

        let report = context.run(self.execute()).await?;
        let ttl = self.ttl_for(report.status).saturating_add(jitter());
        let report = report.expiring_after(ttl);

        tracing::debug!(
            target: TRACING_TARGET_HEALTH,
            status = ?report.status,
            ttl_ms = ttl.as_millis() as u64,
            "Computed health report"
        );

        Ok(self
            .store
            .set(&self.cache_key, report, Expiration::Fixed(ttl))
            .await)
    }

    fn ttl_for(&self, status: HealthStatus) -> Duration {
        match status {
            HealthStatus::Healthy => self.success_ttl,
            HealthStatus::Unhealthy => self.failure_ttl,
        }
    }

    /// Runs every probe, converting a panic into an unhealthy report that
    /// keeps the diagnostics gathered so far.
    async fn execute(&self) -> HealthReport {
        let mut batch = ProbeBatch::new(self.is_production);
        let outcome = AssertUnwindSafe(self.run_probes(&mut batch))
            .catch_unwind()
            .await;

        match outcome {
            Ok(()) => batch.into_report(),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(
                    target: TRACING_TARGET_HEALTH,
                    panic = %message,
                    "Health probes panicked"
                );
                batch.into_failed_report(Error::internal_error().with_message(message))
            }
        }
    }

    async fn run_probes(&self, batch: &mut ProbeBatch) {
        for target in &self.targets {
            match target {
                ProbeTarget::Queue {
                    name,
                    validate_send,
                    validate_receive,
                    ttl,
                    message_body,
                } => {
                    if *validate_send {
                        let message = probe_message(message_body, *ttl);
                        let outcome = self.send_to_queue(name, message).await;
                        batch.record(target, "send", outcome);
                    }
                    if *validate_receive {
                        let outcome = self.peek_queue(name).await;
                        batch.record(target, "receive", outcome);
                    }
                }
                ProbeTarget::Topic {
                    name,
                    validate_send,
                    ttl,
                    message_body,
                } => {
                    if *validate_send {
                        let message = probe_message(message_body, *ttl);
                        let outcome = self.send_to_topic(name, message).await;
                        batch.record(target, "send", outcome);
                    }
                }
                ProbeTarget::Subscription {
                    topic,
                    subscription,
                    validate_receive,
                } => {
                    if *validate_receive {
                        let outcome = self.peek_subscription(topic, subscription).await;
                        batch.record(target, "receive", outcome);
                    }
                }
            }
        }
    }

    async fn send_to_queue(&self, queue: &str, message: OutboundMessage) -> Result<()> {
        let sender = self.client.use_queue_sender(queue).await?;
        sender.publish_message(message).await
    }

    async fn peek_queue(&self, queue: &str) -> Result<()> {
        let receiver = self.client.use_queue_receiver(queue).await?;
        receiver.peek_message().await.map(drop)
    }

    async fn send_to_topic(&self, topic: &str, message: OutboundMessage) -> Result<()> {
        let sender = self.client.use_topic(topic).await?;
        sender.broadcast_message(message).await
    }

    async fn peek_subscription(&self, topic: &str, subscription: &str) -> Result<()> {
        let receiver = self.client.use_subscription(topic, subscription).await?;
        receiver.peek_message().await.map(drop)
    }
}

/// Diagnostics and errors gathered by one probe execution.
struct ProbeBatch {
    redact: bool,
    data: HashMap<String, Value>,
    errors: Vec<Arc<Error>>,
}

impl ProbeBatch {
    fn new(redact: bool) -> Self {
        Self {
            redact,
            data: HashMap::new(),
            errors: Vec::new(),
        }
    }

    fn record(&mut self, target: &ProbeTarget, check: &str, outcome: Result<()>) {
        match outcome {
            Ok(()) => {
                self.data
                    .insert(target.check_key(check), Value::from(SUCCESS_MARKER));
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_HEALTH,
                    category = target.category().as_ref(),
                    probe = %target.diagnostic_prefix(),
                    check,
                    error = %error,
                    "Health probe failed"
                );

                let detail = if self.redact {
                    REDACTED_ERROR.to_string()
                } else {
                    error.detail()
                };
                self.data.insert(target.error_key(), Value::from(detail));
                self.errors.push(Arc::new(error));
            }
        }
    }

    fn into_report(self) -> HealthReport {
        let report = if self.errors.is_empty() {
            HealthReport::healthy(HEALTHY_DESCRIPTION)
        } else {
            HealthReport::unhealthy(UNHEALTHY_DESCRIPTION)
        };

        report
            .with_error(self.errors.into_iter().next())
            .with_data(self.data)
    }

    fn into_failed_report(self, error: Error) -> HealthReport {
        HealthReport::unhealthy(UNEXPECTED_FAILURE_DESCRIPTION)
            .with_error(Some(Arc::new(error)))
            .with_data(self.data)
    }
}

fn probe_message(body: &str, ttl: Duration) -> OutboundMessage {
    let body_type = std::any::type_name::<String>();
    OutboundMessage::new(body)
        .with_id(format!("{PROBE_ID_PREFIX}{}", Uuid::new_v4()))
        .with_time_to_live(ttl)
        .with_property(MESSAGE_TYPE_PROPERTY, body_type)
        .with_property(MESSAGE_KIND_PROPERTY, body_type)
        .with_property(TIMESTAMP_PROPERTY, Timestamp::now().to_string())
}

fn jitter() -> Duration {
    Duration::from_millis(rand::random_range(0..MAX_JITTER_MILLIS))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "health probe panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use courier_cache::MemoryStore;
    use jiff::SignedDuration;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::health::{QueueProbeOptions, SubscriptionProbeOptions, TopicProbeOptions};
    use crate::message::EntityPath;
    use crate::mock::{MockBroker, MockOperation};
    use crate::{ErrorKind, MessagingConfig};

    fn health_check(
        broker: &MockBroker,
        options: &HealthCheckOptions,
    ) -> MessagingHealthCheck<MockBroker> {
        let client = MessagingClient::new(
            broker.clone(),
            MessagingConfig::new().with_client_name("orders-service"),
        )
        .unwrap();
        MessagingHealthCheck::new(client, Arc::new(MemoryStore::new()), options)
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn queue_options(queues: &[&str]) -> HealthCheckOptions {
        queues.iter().fold(HealthCheckOptions::new(), |options, queue| {
            options.with_queue(QueueProbeOptions::new(*queue))
        })
    }

    #[tokio::test]
    async fn test_all_checks_pass() {
        let broker = MockBroker::new();
        broker.add_subscription("events", "audit");
        let options = queue_options(&["orders"])
            .with_topic(TopicProbeOptions::new("events"))
            .with_subscription(SubscriptionProbeOptions::new("events", "audit"));
        let check = health_check(&broker, &options);

        let report = check.check_health(&HealthCheckContext::new()).await.unwrap();

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.description, HEALTHY_DESCRIPTION);
        assert!(report.primary_error.is_none());
        assert_eq!(report.data["queue_orders_send"], "success");
        assert_eq!(report.data["queue_orders_receive"], "success");
        assert_eq!(report.data["topic_events_send"], "success");
        assert_eq!(report.data["subscription_events_audit_receive"], "success");
        assert_eq!(report.data.len(), 4);
    }

    #[tokio::test]
    async fn test_probe_message_shape() {
        let broker = MockBroker::new();
        let options = HealthCheckOptions::new().with_queue(
            QueueProbeOptions::new("orders")
                .with_validate_receive(false)
                .with_check_message_content("ping"),
        );
        let check = health_check(&broker, &options);
        check.check_health(&HealthCheckContext::new()).await.unwrap();

        let messages = broker.messages(&EntityPath::queue("orders"));
        assert_eq!(messages.len(), 1);

        let message = &messages[0];
        assert_eq!(message.content, "ping");
        assert!(
            message
                .message_id
                .as_deref()
                .is_some_and(|id| id.starts_with("healthcheck_"))
        );
        assert!(message.properties.contains_key(MESSAGE_TYPE_PROPERTY));
        assert!(message.properties.contains_key(MESSAGE_KIND_PROPERTY));

        let timestamp = message.properties[TIMESTAMP_PROPERTY].as_str().unwrap();
        assert!(timestamp.parse::<Timestamp>().is_ok());
        assert_eq!(broker.receivers_created(), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        init_tracing();
        let broker = MockBroker::new();
        broker.fail(MockOperation::Send, "first", "queue disabled");
        let check = health_check(&broker, &queue_options(&["first", "second"]));

        let report = check.check_health(&HealthCheckContext::new()).await.unwrap();

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.description, UNHEALTHY_DESCRIPTION);
        assert_eq!(report.data["queue_first_error"], "queue disabled");
        // The queue's receive check still runs after its send check failed.
        assert_eq!(report.data["queue_first_receive"], "success");
        assert_eq!(report.data["queue_second_send"], "success");
        assert_eq!(report.data["queue_second_receive"], "success");

        let primary = report.primary_error.unwrap();
        assert_eq!(primary.kind(), ErrorKind::Broker);
        assert_eq!(primary.detail(), "queue disabled");
    }

    #[tokio::test]
    async fn test_production_redacts_errors() {
        let broker = MockBroker::new();
        broker.fail(MockOperation::Send, "events", "topic disabled");
        let options = HealthCheckOptions::new().with_topic(TopicProbeOptions::new("events"));

        let check = health_check(&broker, &options).with_production(true);
        let report = check.check_health(&HealthCheckContext::new()).await.unwrap();
        assert_eq!(report.data["topic_events_error"], "Failed");

        let check = health_check(&broker, &options);
        let report = check.check_health(&HealthCheckContext::new()).await.unwrap();
        assert_eq!(report.data["topic_events_error"], "topic disabled");
    }

    #[tokio::test]
    async fn test_resource_creation_failure_is_recorded() {
        let broker = MockBroker::new();
        broker.fail(
            MockOperation::CreateReceiver,
            "events/subscriptions/audit",
            "subscription not found",
        );
        let options = queue_options(&["orders"])
            .with_subscription(SubscriptionProbeOptions::new("events", "audit"));
        let check = health_check(&broker, &options);

        let report = check.check_health(&HealthCheckContext::new()).await.unwrap();

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(
            report.data["subscription_events_audit_error"],
            "subscription not found"
        );
        assert_eq!(report.data["queue_orders_send"], "success");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checks_share_one_execution() {
        let broker = MockBroker::new();
        broker.set_latency(Duration::from_millis(20));
        let options = HealthCheckOptions::new()
            .with_queue(QueueProbeOptions::new("orders").with_validate_receive(false));
        let check = Arc::new(health_check(&broker, &options));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let check = Arc::clone(&check);
                tokio::spawn(async move {
                    check
                        .check_health(&HealthCheckContext::new())
                        .await
                        .unwrap()
                })
            })
            .collect();

        let reports = futures::future::try_join_all(handles).await.unwrap();

        assert_eq!(broker.sends(), 1);
        let computed_at = reports[0].computed_at;
        assert!(reports.iter().all(|r| r.computed_at == computed_at));
    }

    #[tokio::test(start_paused = true)]
    async fn test_asymmetric_ttl() {
        let lower = SignedDuration::from_secs(60);
        let upper = SignedDuration::from_secs(65);

        let broker = MockBroker::new();
        let check = health_check(&broker, &queue_options(&["orders"]));
        let report = check.check_health(&HealthCheckContext::new()).await.unwrap();
        let ttl = report.time_to_live().unwrap();
        assert!(ttl >= lower && ttl < upper, "healthy ttl {ttl:?}");

        let lower = SignedDuration::from_secs(35);
        let upper = SignedDuration::from_secs(40);

        broker.fail(MockOperation::Peek, "orders", "receiver faulted");
        let check = health_check(&broker, &queue_options(&["orders"]));
        let report = check.check_health(&HealthCheckContext::new()).await.unwrap();
        let ttl = report.time_to_live().unwrap();
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(ttl >= lower && ttl < upper, "unhealthy ttl {ttl:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_until_expiry() {
        let broker = MockBroker::new();
        let check = health_check(&broker, &queue_options(&["orders"]));
        let context = HealthCheckContext::new();

        let first = check.check_health(&context).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        let second = check.check_health(&context).await.unwrap();
        assert_eq!(first.computed_at, second.computed_at);
        assert_eq!(broker.sends(), 1);

        tokio::time::advance(Duration::from_secs(36)).await;
        check.check_health(&context).await.unwrap();
        assert_eq!(broker.sends(), 2);

        assert!(check.invalidate().await);
        check.check_health(&context).await.unwrap();
        assert_eq!(broker.sends(), 3);
    }

    #[tokio::test]
    async fn test_unbounded_timeout_caches_without_overflow() {
        let broker = MockBroker::new();
        let options = queue_options(&["orders"]).with_cached_result_timeout_secs(u64::MAX);
        let check = health_check(&broker, &options);
        let context = HealthCheckContext::new();

        let report = check.check_health(&context).await.unwrap();
        assert_eq!(report.status, HealthStatus::Healthy);

        let cached = check.check_health(&context).await.unwrap();
        assert_eq!(cached.computed_at, report.computed_at);
        assert_eq!(broker.sends(), 1);
    }

    #[tokio::test]
    async fn test_zero_timeout_disables_caching() {
        let broker = MockBroker::new();
        let options = queue_options(&["orders"]).with_cached_result_timeout_secs(0);
        let check = health_check(&broker, &options);
        let context = HealthCheckContext::new();

        let report = check.check_health(&context).await.unwrap();
        check.check_health(&context).await.unwrap();

        assert!(report.expires_at.is_none());
        assert_eq!(broker.sends(), 2);
        assert!(!check.invalidate().await);
    }

    #[tokio::test]
    async fn test_cancelled_check_returns_error() {
        let broker = MockBroker::new();
        let check = health_check(&broker, &queue_options(&["orders"]));

        let token = CancellationToken::new();
        token.cancel();
        let context = HealthCheckContext::new().with_cancellation(token);

        let error = check.check_health(&context).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert_eq!(broker.sends(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_lock() {
        let broker = MockBroker::new();
        broker.set_latency(Duration::from_secs(30));
        let check = health_check(&broker, &queue_options(&["orders"]));

        let context = HealthCheckContext::new().with_timeout(Duration::from_secs(1));
        let error = check.check_health(&context).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Timeout);

        broker.set_latency(Duration::ZERO);
        let report = check.check_health(&HealthCheckContext::new()).await.unwrap();
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_panic_becomes_unhealthy() {
        init_tracing();
        let broker = MockBroker::new();
        broker.panic_on(MockOperation::Peek, "orders");
        let check = health_check(&broker, &queue_options(&["orders"]));

        let report = check.check_health(&HealthCheckContext::new()).await.unwrap();

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.description, UNEXPECTED_FAILURE_DESCRIPTION);
        assert_eq!(report.data["queue_orders_send"], "success");
        assert_eq!(
            report.primary_error.unwrap().kind(),
            ErrorKind::InternalError
        );
    }

    #[tokio::test]
    async fn test_shared_store_keeps_clients_apart() {
        let broker = MockBroker::new();
        let store: Arc<dyn TtlStore<HealthReport>> = Arc::new(MemoryStore::new());
        let options = queue_options(&["orders"]);

        let checks: Vec<_> = ["billing", "shipping"]
            .into_iter()
            .map(|name| {
                let client = MessagingClient::new(
                    broker.clone(),
                    MessagingConfig::new().with_client_name(name),
                )
                .unwrap();
                MessagingHealthCheck::new(client, Arc::clone(&store), &options)
            })
            .collect();

        assert_eq!(checks[0].cache_key(), "_messaging_health_billing");
        assert_eq!(checks[1].cache_key(), "_messaging_health_shipping");

        for check in &checks {
            check.check_health(&HealthCheckContext::new()).await.unwrap();
        }
        assert_eq!(broker.sends(), 2);
    }
}
