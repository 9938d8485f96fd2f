//! Subscription facade.

use std::sync::Arc;

use crate::message::PeekedMessage;
use crate::{MessageReceiver, Result};

/// Peeks a single topic subscription without consuming messages.
pub struct SubscriptionReceiver<R> {
    topic: String,
    subscription: String,
    receiver: Arc<R>,
}

impl<R> Clone for SubscriptionReceiver<R> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            subscription: self.subscription.clone(),
            receiver: Arc::clone(&self.receiver),
        }
    }
}

impl<R> std::fmt::Debug for SubscriptionReceiver<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionReceiver")
            .field("topic", &self.topic)
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl<R: MessageReceiver> SubscriptionReceiver<R> {
    pub(crate) fn new(topic: &str, subscription: &str, receiver: Arc<R>) -> Self {
        Self {
            topic: topic.to_string(),
            subscription: subscription.to_string(),
            receiver,
        }
    }

    /// Returns the topic name.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the subscription name.
    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    /// Returns the next message, if any.
    pub async fn peek_message(&self) -> Result<Option<PeekedMessage>> {
        Ok(self.peek_messages(1).await?.into_iter().next())
    }

    /// Returns up to `max_messages` messages.
    pub async fn peek_messages(&self, max_messages: usize) -> Result<Vec<PeekedMessage>> {
        self.receiver.peek(max_messages).await
    }
}
