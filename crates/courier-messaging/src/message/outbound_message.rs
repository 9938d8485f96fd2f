//! Messages published through a sender.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message to publish to a queue or topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Message body.
    pub content: String,
    /// Broker message identifier.
    pub id: Option<String>,
    /// Correlation identifier for request/reply flows.
    pub correlation_id: Option<String>,
    /// MIME type of the body.
    pub content_type: Option<String>,
    /// Application-defined label.
    pub subject: Option<String>,
    /// Entity replies should be sent to.
    pub reply_to: Option<String>,
    /// How long the broker should retain the message.
    pub time_to_live: Option<Duration>,
    /// Application properties.
    pub properties: HashMap<String, Value>,
}

impl OutboundMessage {
    /// Creates a message with the given body.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Sets the message identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the correlation identifier.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the reply-to entity.
    #[must_use]
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Sets the time-to-live.
    #[must_use]
    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Adds an application property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Adds batch-wide properties that the message does not already define.
    ///
    /// Null values are skipped.
    pub fn merge_common_properties(&mut self, common: &HashMap<String, Value>) {
        for (key, value) in common {
            if value.is_null() || self.properties.contains_key(key) {
                continue;
            }
            self.properties.insert(key.clone(), value.clone());
        }
    }
}
