//! Broker capability consumed by the messaging client.
//!
//! The broker SDK itself (connections, wire format, locks) lives outside this
//! crate. Implementations only need to construct senders and receivers and
//! expose publish and peek on them.

use courier_cache::Teardown;

use crate::Result;
use crate::message::{OutboundMessage, PeekedMessage};

/// Publishes messages to a single queue or topic.
#[async_trait::async_trait]
pub trait MessageSender: Teardown {
    /// Publishes `messages` as one batch.
    async fn send(&self, messages: Vec<OutboundMessage>) -> Result<()>;
}

/// Reads messages from a single queue or subscription without consuming them.
#[async_trait::async_trait]
pub trait MessageReceiver: Teardown {
    /// Returns up to `max_messages` messages without locking or removing them.
    ///
    /// An empty entity yields an empty vector, not an error.
    async fn peek(&self, max_messages: usize) -> Result<Vec<PeekedMessage>>;
}

/// Factory for broker-side senders and receivers.
///
/// Created resources are expensive; the [`MessagingClient`] caches them and
/// calls [`Teardown::teardown`] exactly once when they leave the cache.
///
/// [`MessagingClient`]: crate::MessagingClient
#[async_trait::async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Sender type produced by this broker.
    type Sender: MessageSender;
    /// Receiver type produced by this broker.
    type Receiver: MessageReceiver;

    /// Creates a sender for a queue or topic.
    async fn create_sender(&self, entity: &str) -> Result<Self::Sender>;

    /// Creates a receiver for a queue.
    async fn create_receiver(&self, queue: &str) -> Result<Self::Receiver>;

    /// Creates a receiver for a topic subscription.
    async fn create_subscription_receiver(
        &self,
        topic: &str,
        subscription: &str,
    ) -> Result<Self::Receiver>;
}
