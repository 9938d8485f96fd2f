//! Registry of cached broker senders and receivers.

use std::sync::Arc;

use courier_cache::ResourceCache;

use super::{MessagingConfig, ResourceKey, ResourceRole};
use crate::entity::{Queue, QueueReceiver, QueueSender, SubscriptionReceiver, TopicSender};
use crate::{Broker, Result, TRACING_TARGET_CLIENT};

/// Messaging client that hands out facades over cached broker resources.
///
/// Senders and receivers are created on first use, shared by every caller
/// asking for the same entity, and torn down once they go unused for the
/// configured cache timeout or when [`MessagingClient::teardown`] is called.
/// Cloning is cheap; clones share the same caches.
pub struct MessagingClient<B: Broker> {
    inner: Arc<ClientInner<B>>,
}

struct ClientInner<B: Broker> {
    name: String,
    broker: B,
    senders: ResourceCache<B::Sender>,
    receivers: ResourceCache<B::Receiver>,
}

impl<B: Broker> Clone for MessagingClient<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Broker> std::fmt::Debug for MessagingClient<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingClient")
            .field("name", &self.inner.name)
            .field("senders", &self.inner.senders)
            .field("receivers", &self.inner.receivers)
            .finish_non_exhaustive()
    }
}

impl<B: Broker> MessagingClient<B> {
    /// Creates a client over `broker`.
    ///
    /// Must be called within a Tokio runtime for the background sweep of
    /// expired resources to run.
    pub fn new(broker: B, config: MessagingConfig) -> Result<Self> {
        config.validate()?;

        let inner = ClientInner {
            name: config.client_name().to_string(),
            senders: ResourceCache::new(config.cache_config("senders"))?,
            receivers: ResourceCache::new(config.cache_config("receivers"))?,
            broker,
        };

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            client = %inner.name,
            cache_timeout_secs = config.cache_timeout().as_secs(),
            "Created messaging client"
        );

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the client name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the underlying broker.
    pub fn broker(&self) -> &B {
        &self.inner.broker
    }

    /// Returns the cache of senders.
    pub fn senders(&self) -> &ResourceCache<B::Sender> {
        &self.inner.senders
    }

    /// Returns the cache of receivers.
    pub fn receivers(&self) -> &ResourceCache<B::Receiver> {
        &self.inner.receivers
    }

    /// Returns a facade that can both publish to and peek from `queue`.
    pub async fn use_queue(&self, queue: &str) -> Result<Queue<B::Sender, B::Receiver>> {
        let sender = self.use_queue_sender(queue).await?;
        let receiver = self.use_queue_receiver(queue).await?;
        Ok(Queue::new(sender, receiver))
    }

    /// Returns a publishing facade for `queue`.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn use_queue_sender(&self, queue: &str) -> Result<QueueSender<B::Sender>> {
        let key = ResourceKey::entity(ResourceRole::QueueSender, queue)?;
        let sender = self
            .inner
            .senders
            .get_or_create(key.as_str(), || self.inner.broker.create_sender(queue))
            .await?;
        Ok(QueueSender::new(queue, sender))
    }

    /// Returns a peeking facade for `queue`.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn use_queue_receiver(&self, queue: &str) -> Result<QueueReceiver<B::Receiver>> {
        let key = ResourceKey::entity(ResourceRole::QueueReceiver, queue)?;
        let receiver = self
            .inner
            .receivers
            .get_or_create(key.as_str(), || self.inner.broker.create_receiver(queue))
            .await?;
        Ok(QueueReceiver::new(queue, receiver))
    }

    /// Returns a broadcasting facade for `topic`.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn use_topic(&self, topic: &str) -> Result<TopicSender<B::Sender>> {
        let key = ResourceKey::entity(ResourceRole::TopicSender, topic)?;
        let sender = self
            .inner
            .senders
            .get_or_create(key.as_str(), || self.inner.broker.create_sender(topic))
            .await?;
        Ok(TopicSender::new(topic, sender))
    }

    /// Returns a peeking facade for `subscription` on `topic`.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn use_subscription(
        &self,
        topic: &str,
        subscription: &str,
    ) -> Result<SubscriptionReceiver<B::Receiver>> {
        let key = ResourceKey::subscription(topic, subscription)?;
        let receiver = self
            .inner
            .receivers
            .get_or_create(key.as_str(), || {
                self.inner
                    .broker
                    .create_subscription_receiver(topic, subscription)
            })
            .await?;
        Ok(SubscriptionReceiver::new(topic, subscription, receiver))
    }

    /// Tears down every cached sender and receiver.
    ///
    /// Safe to call repeatedly; returns how many resources were torn down by
    /// this call.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT, fields(client = %self.inner.name))]
    pub async fn teardown(&self) -> usize {
        let senders = self.inner.senders.teardown_all().await;
        let receivers = self.inner.receivers.teardown_all().await;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            client = %self.inner.name,
            senders,
            receivers,
            "Messaging client torn down"
        );

        senders + receivers
    }
}
