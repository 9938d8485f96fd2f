//! Health check configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ProbeTarget;

// Default values
const DEFAULT_CACHED_RESULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MESSAGE_TTL_SECS: u64 = 5 * 60;
const DEFAULT_MESSAGE_CONTENT: &str = "HealthCheck";
const MIN_FAILURE_TTL: Duration = Duration::from_secs(35);

fn default_true() -> bool {
    true
}

fn default_message_content() -> String {
    DEFAULT_MESSAGE_CONTENT.to_string()
}

/// Which entities a health check probes and how long results are cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckOptions {
    /// Seconds a healthy result stays cached; `0` disables caching.
    pub cached_result_timeout_secs: Option<u64>,
    /// Time-to-live in seconds for probe messages without their own.
    pub default_message_ttl_secs: Option<u64>,
    /// Queues to probe.
    pub queues: Vec<QueueProbeOptions>,
    /// Topics to probe.
    pub topics: Vec<TopicProbeOptions>,
    /// Subscriptions to probe.
    pub subscriptions: Vec<SubscriptionProbeOptions>,
}

impl HealthCheckOptions {
    /// Create options with default values and no probe targets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether results are recomputed on every call.
    #[inline]
    pub fn is_caching_disabled(&self) -> bool {
        self.cached_result_timeout_secs == Some(0)
    }

    /// Returns how long a healthy result is cached, before jitter.
    #[inline]
    pub fn success_ttl(&self) -> Duration {
        Duration::from_secs(
            self.cached_result_timeout_secs
                .unwrap_or(DEFAULT_CACHED_RESULT_TIMEOUT_SECS),
        )
    }

    /// Returns how long an unhealthy result is cached, before jitter.
    ///
    /// Half the success TTL, but never less than 35 seconds.
    #[inline]
    pub fn failure_ttl(&self) -> Duration {
        (self.success_ttl() / 2).max(MIN_FAILURE_TTL)
    }

    /// Returns the probe message TTL used when a target sets none.
    #[inline]
    pub fn default_message_ttl(&self) -> Duration {
        Duration::from_secs(
            self.default_message_ttl_secs
                .unwrap_or(DEFAULT_MESSAGE_TTL_SECS),
        )
    }

    /// Set the cached result timeout in seconds.
    pub fn with_cached_result_timeout_secs(mut self, secs: u64) -> Self {
        self.cached_result_timeout_secs = Some(secs);
        self
    }

    /// Set the default probe message TTL in seconds.
    pub fn with_default_message_ttl_secs(mut self, secs: u64) -> Self {
        self.default_message_ttl_secs = Some(secs);
        self
    }

    /// Add a queue to probe.
    pub fn with_queue(mut self, queue: QueueProbeOptions) -> Self {
        self.queues.push(queue);
        self
    }

    /// Add a topic to probe.
    pub fn with_topic(mut self, topic: TopicProbeOptions) -> Self {
        self.topics.push(topic);
        self
    }

    /// Add a subscription to probe.
    pub fn with_subscription(mut self, subscription: SubscriptionProbeOptions) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Resolves the configured entities into probe targets, queues first,
    /// then topics, then subscriptions.
    pub fn targets(&self) -> Vec<ProbeTarget> {
        let default_ttl = self.default_message_ttl();
        let queues = self.queues.iter().map(|queue| ProbeTarget::Queue {
            name: queue.queue_name.clone(),
            validate_send: queue.validate_send,
            validate_receive: queue.validate_receive,
            ttl: queue.message_ttl().unwrap_or(default_ttl),
            message_body: queue.check_message_content.clone(),
        });
        let topics = self.topics.iter().map(|topic| ProbeTarget::Topic {
            name: topic.topic_name.clone(),
            validate_send: topic.validate_send,
            ttl: topic.message_ttl().unwrap_or(default_ttl),
            message_body: topic.check_message_content.clone(),
        });
        let subscriptions = self
            .subscriptions
            .iter()
            .map(|subscription| ProbeTarget::Subscription {
                topic: subscription.topic_name.clone(),
                subscription: subscription.subscription_name.clone(),
                validate_receive: subscription.validate_receive,
            });

        queues.chain(topics).chain(subscriptions).collect()
    }
}

/// Probe settings for one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueProbeOptions {
    /// Queue name.
    pub queue_name: String,
    /// Probe message TTL in seconds.
    #[serde(default)]
    pub message_ttl_secs: Option<u64>,
    /// Whether to publish a probe message.
    #[serde(default = "default_true")]
    pub validate_send: bool,
    /// Whether to peek the queue.
    #[serde(default = "default_true")]
    pub validate_receive: bool,
    /// Body of the probe message.
    #[serde(default = "default_message_content")]
    pub check_message_content: String,
}

impl QueueProbeOptions {
    /// Probes `queue` with both send and receive validation.
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue_name: queue.into(),
            message_ttl_secs: None,
            validate_send: true,
            validate_receive: true,
            check_message_content: default_message_content(),
        }
    }

    /// Returns the configured probe message TTL.
    pub fn message_ttl(&self) -> Option<Duration> {
        self.message_ttl_secs.map(Duration::from_secs)
    }

    /// Set the probe message TTL in seconds.
    pub fn with_message_ttl_secs(mut self, secs: u64) -> Self {
        self.message_ttl_secs = Some(secs);
        self
    }

    /// Enable or disable send validation.
    pub fn with_validate_send(mut self, validate: bool) -> Self {
        self.validate_send = validate;
        self
    }

    /// Enable or disable receive validation.
    pub fn with_validate_receive(mut self, validate: bool) -> Self {
        self.validate_receive = validate;
        self
    }

    /// Set the probe message body.
    pub fn with_check_message_content(mut self, content: impl Into<String>) -> Self {
        self.check_message_content = content.into();
        self
    }
}

/// Probe settings for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicProbeOptions {
    /// Topic name.
    pub topic_name: String,
    /// Probe message TTL in seconds.
    #[serde(default)]
    pub message_ttl_secs: Option<u64>,
    /// Whether to broadcast a probe message.
    #[serde(default = "default_true")]
    pub validate_send: bool,
    /// Body of the probe message.
    #[serde(default = "default_message_content")]
    pub check_message_content: String,
}

impl TopicProbeOptions {
    /// Probes `topic` with send validation.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic_name: topic.into(),
            message_ttl_secs: None,
            validate_send: true,
            check_message_content: default_message_content(),
        }
    }

    /// Returns the configured probe message TTL.
    pub fn message_ttl(&self) -> Option<Duration> {
        self.message_ttl_secs.map(Duration::from_secs)
    }

    /// Set the probe message TTL in seconds.
    pub fn with_message_ttl_secs(mut self, secs: u64) -> Self {
        self.message_ttl_secs = Some(secs);
        self
    }

    /// Enable or disable send validation.
    pub fn with_validate_send(mut self, validate: bool) -> Self {
        self.validate_send = validate;
        self
    }

    /// Set the probe message body.
    pub fn with_check_message_content(mut self, content: impl Into<String>) -> Self {
        self.check_message_content = content.into();
        self
    }
}

/// Probe settings for one topic subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionProbeOptions {
    /// Parent topic name.
    pub topic_name: String,
    /// Subscription name.
    pub subscription_name: String,
    /// Whether to peek the subscription.
    #[serde(default = "default_true")]
    pub validate_receive: bool,
}

impl SubscriptionProbeOptions {
    /// Probes `subscription` on `topic` with receive validation.
    pub fn new(topic: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self {
            topic_name: topic.into(),
            subscription_name: subscription.into(),
            validate_receive: true,
        }
    }

    /// Enable or disable receive validation.
    pub fn with_validate_receive(mut self, validate: bool) -> Self {
        self.validate_receive = validate;
        self
    }
}
