//! Topic facade.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::apply_common_properties;
use crate::message::OutboundMessage;
use crate::{MessageSender, Result, TRACING_TARGET_CLIENT};

/// Broadcasts to a single topic.
pub struct TopicSender<S> {
    topic: String,
    sender: Arc<S>,
}

impl<S> Clone for TopicSender<S> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<S> std::fmt::Debug for TopicSender<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicSender")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl<S: MessageSender> TopicSender<S> {
    pub(crate) fn new(topic: &str, sender: Arc<S>) -> Self {
        Self {
            topic: topic.to_string(),
            sender,
        }
    }

    /// Returns the topic name.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Broadcasts a single message.
    pub async fn broadcast_message(&self, message: OutboundMessage) -> Result<()> {
        self.broadcast_messages(vec![message], None).await
    }

    /// Broadcasts `messages` as one batch, adding `common` properties each
    /// message does not already define.
    pub async fn broadcast_messages(
        &self,
        mut messages: Vec<OutboundMessage>,
        common: Option<&HashMap<String, Value>>,
    ) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        apply_common_properties(&mut messages, common);

        tracing::trace!(
            target: TRACING_TARGET_CLIENT,
            topic = %self.topic,
            count = messages.len(),
            "Broadcasting messages to topic"
        );

        self.sender.send(messages).await
    }
}
