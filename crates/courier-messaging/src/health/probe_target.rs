//! Resolved probe targets.

use std::time::Duration;

use strum::{AsRefStr, IntoStaticStr};

/// Kind of entity a probe target checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ProbeCategory {
    /// Point-to-point queue.
    Queue,
    /// Publish/subscribe topic.
    Topic,
    /// Topic subscription.
    Subscription,
}

/// One unit of health validation.
///
/// Disabled validation flags skip that sub-check entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeTarget {
    /// Publishes a probe message to a queue and peeks it.
    Queue {
        /// Queue name.
        name: String,
        /// Whether to publish a probe message.
        validate_send: bool,
        /// Whether to peek the queue.
        validate_receive: bool,
        /// Probe message time-to-live.
        ttl: Duration,
        /// Probe message body.
        message_body: String,
    },
    /// Broadcasts a probe message to a topic.
    Topic {
        /// Topic name.
        name: String,
        /// Whether to broadcast a probe message.
        validate_send: bool,
        /// Probe message time-to-live.
        ttl: Duration,
        /// Probe message body.
        message_body: String,
    },
    /// Peeks a topic subscription.
    Subscription {
        /// Parent topic name.
        topic: String,
        /// Subscription name.
        subscription: String,
        /// Whether to peek the subscription.
        validate_receive: bool,
    },
}

impl ProbeTarget {
    /// Returns the kind of entity this target checks.
    pub fn category(&self) -> ProbeCategory {
        match self {
            Self::Queue { .. } => ProbeCategory::Queue,
            Self::Topic { .. } => ProbeCategory::Topic,
            Self::Subscription { .. } => ProbeCategory::Subscription,
        }
    }

    /// Returns the prefix of this target's diagnostic data keys.
    pub fn diagnostic_prefix(&self) -> String {
        match self {
            Self::Queue { name, .. } => format!("queue_{name}"),
            Self::Topic { name, .. } => format!("topic_{name}"),
            Self::Subscription {
                topic,
                subscription,
                ..
            } => format!("subscription_{topic}_{subscription}"),
        }
    }

    /// Returns the diagnostic key for a sub-check, such as `send` or `receive`.
    pub fn check_key(&self, check: &str) -> String {
        format!("{}_{check}", self.diagnostic_prefix())
    }

    /// Returns the diagnostic key for a recorded error.
    pub fn error_key(&self) -> String {
        self.check_key("error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_keys() {
        let queue = ProbeTarget::Queue {
            name: "orders".into(),
            validate_send: true,
            validate_receive: true,
            ttl: Duration::from_secs(60),
            message_body: "HealthCheck".into(),
        };
        assert_eq!(queue.category(), ProbeCategory::Queue);
        assert_eq!(queue.check_key("send"), "queue_orders_send");
        assert_eq!(queue.error_key(), "queue_orders_error");

        let subscription = ProbeTarget::Subscription {
            topic: "events".into(),
            subscription: "audit".into(),
            validate_receive: true,
        };
        assert_eq!(subscription.category().as_ref(), "subscription");
        assert_eq!(
            subscription.check_key("receive"),
            "subscription_events_audit_receive"
        );
    }

    #[test]
    fn test_category_order() {
        assert!(ProbeCategory::Queue < ProbeCategory::Topic);
        assert!(ProbeCategory::Topic < ProbeCategory::Subscription);
    }
}
