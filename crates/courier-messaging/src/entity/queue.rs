//! Queue facades.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::apply_common_properties;
use crate::message::{OutboundMessage, PeekedMessage};
use crate::{MessageReceiver, MessageSender, Result, TRACING_TARGET_CLIENT};

/// Publishes to a single queue.
pub struct QueueSender<S> {
    queue: String,
    sender: Arc<S>,
}

impl<S> Clone for QueueSender<S> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<S> std::fmt::Debug for QueueSender<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueSender")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl<S: MessageSender> QueueSender<S> {
    pub(crate) fn new(queue: &str, sender: Arc<S>) -> Self {
        Self {
            queue: queue.to_string(),
            sender,
        }
    }

    /// Returns the queue name.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Publishes a single message.
    pub async fn publish_message(&self, message: OutboundMessage) -> Result<()> {
        self.publish_messages(vec![message], None).await
    }

    /// Publishes `messages` as one batch, adding `common` properties each
    /// message does not already define.
    ///
    /// An empty batch is a no-op.
    pub async fn publish_messages(
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
            queue = %self.queue,
            count = messages.len(),
            "Publishing messages to queue"
        );

        self.sender.send(messages).await
    }
}

/// Peeks a single queue without consuming messages.
pub struct QueueReceiver<R> {
    queue: String,
    receiver: Arc<R>,
}

impl<R> Clone for QueueReceiver<R> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            receiver: Arc::clone(&self.receiver),
        }
    }
}

impl<R> std::fmt::Debug for QueueReceiver<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueReceiver")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl<R: MessageReceiver> QueueReceiver<R> {
    pub(crate) fn new(queue: &str, receiver: Arc<R>) -> Self {
        Self {
            queue: queue.to_string(),
            receiver,
        }
    }

    /// Returns the queue name.
    pub fn queue(&self) -> &str {
        &self.queue
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

/// Publishes to and peeks from the same queue.
pub struct Queue<S, R> {
    sender: QueueSender<S>,
    receiver: QueueReceiver<R>,
}

impl<S, R> Clone for Queue<S, R> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
        }
    }
}

impl<S, R> std::fmt::Debug for Queue<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("queue", &self.sender.queue)
            .finish_non_exhaustive()
    }
}

impl<S: MessageSender, R: MessageReceiver> Queue<S, R> {
    pub(crate) fn new(sender: QueueSender<S>, receiver: QueueReceiver<R>) -> Self {
        Self { sender, receiver }
    }

    /// Returns the queue name.
    pub fn queue(&self) -> &str {
        self.sender.queue()
    }

    /// Returns the publishing half.
    pub fn sender(&self) -> &QueueSender<S> {
        &self.sender
    }

    /// Returns the peeking half.
    pub fn receiver(&self) -> &QueueReceiver<R> {
        &self.receiver
    }

    /// Publishes a single message.
    pub async fn publish_message(&self, message: OutboundMessage) -> Result<()> {
        self.sender.publish_message(message).await
    }

    /// Publishes `messages` as one batch; see [`QueueSender::publish_messages`].
    pub async fn publish_messages(
        &self,
        messages: Vec<OutboundMessage>,
        common: Option<&HashMap<String, Value>>,
    ) -> Result<()> {
        self.sender.publish_messages(messages, common).await
    }

    /// Returns the next message, if any.
    pub async fn peek_message(&self) -> Result<Option<PeekedMessage>> {
        self.receiver.peek_message().await
    }

    /// Returns up to `max_messages` messages.
    pub async fn peek_messages(&self, max_messages: usize) -> Result<Vec<PeekedMessage>> {
        self.receiver.peek_messages(max_messages).await
    }
}
