use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use courier_cache::Teardown;
use jiff::Timestamp;

use crate::message::{EntityPath, OutboundMessage, PeekedMessage};
use crate::{Broker, Error, MessageReceiver, MessageSender, Result, TRACING_TARGET_MOCK};

/// Broker operations that can be made to fail.
///
/// Failures are matched by entity: the queue or topic name for
/// [`CreateSender`], [`CreateReceiver`] and [`Send`], and the
/// [`EntityPath`] display form (`topic/subscriptions/name`) for subscription
/// receivers and [`Peek`].
///
/// [`CreateSender`]: MockOperation::CreateSender
/// [`CreateReceiver`]: MockOperation::CreateReceiver
/// [`Send`]: MockOperation::Send
/// [`Peek`]: MockOperation::Peek
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    /// Creating a sender.
    CreateSender,
    /// Creating a queue or subscription receiver.
    CreateReceiver,
    /// Publishing messages.
    Send,
    /// Peeking messages.
    Peek,
}

#[derive(Debug, Clone)]
enum MockFailure {
    Error(String),
    Panic,
}

#[derive(Default)]
struct MockState {
    entities: Mutex<HashMap<EntityPath, Vec<PeekedMessage>>>,
    subscriptions: Mutex<HashMap<String, Vec<String>>>,
    failures: Mutex<HashMap<(MockOperation, String), MockFailure>>,
    latency: Mutex<Duration>,
    sequence: AtomicI64,
    senders_created: AtomicUsize,
    receivers_created: AtomicUsize,
    sends: AtomicUsize,
    peeks: AtomicUsize,
    teardowns: AtomicUsize,
    repeated_teardowns: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockState {
    async fn simulate(&self, operation: MockOperation, entity: &str) -> Result<()> {
        let latency = *lock(&self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let failure = lock(&self.failures)
            .get(&(operation, entity.to_string()))
            .cloned();

        match failure {
            None => Ok(()),
            Some(MockFailure::Error(message)) => {
                tracing::debug!(
                    target: TRACING_TARGET_MOCK,
                    ?operation,
                    entity,
                    "Injecting mock broker failure"
                );
                Err(Error::broker().with_message(message))
            }
            Some(MockFailure::Panic) => {
                panic!("mock broker panicked during {operation:?} on '{entity}'")
            }
        }
    }

    fn record_teardown(&self, torn_down: &AtomicBool) {
        if torn_down.swap(true, Ordering::SeqCst) {
            self.repeated_teardowns.fetch_add(1, Ordering::SeqCst);
        }
        self.teardowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory [`Broker`] for tests.
///
/// Messages sent to an entity with registered subscriptions are copied to
/// each subscription; any other entity behaves as a queue.
#[derive(Clone, Default)]
pub struct MockBroker {
    state: Arc<MockState>,
}

impl std::fmt::Debug for MockBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBroker")
            .field("senders_created", &self.senders_created())
            .field("receivers_created", &self.receivers_created())
            .field("teardowns", &self.teardowns())
            .finish_non_exhaustive()
    }
}

impl MockBroker {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `subscription` on `topic`.
    pub fn add_subscription(&self, topic: &str, subscription: &str) {
        lock(&self.state.subscriptions)
            .entry(topic.to_string())
            .or_default()
            .push(subscription.to_string());
    }

    /// Makes `operation` on `entity` fail with a broker error.
    pub fn fail(&self, operation: MockOperation, entity: &str, message: &str) {
        lock(&self.state.failures).insert(
            (operation, entity.to_string()),
            MockFailure::Error(message.to_string()),
        );
    }

    /// Makes `operation` on `entity` panic.
    pub fn panic_on(&self, operation: MockOperation, entity: &str) {
        lock(&self.state.failures).insert((operation, entity.to_string()), MockFailure::Panic);
    }

    /// Removes all injected failures.
    pub fn clear_failures(&self) {
        lock(&self.state.failures).clear();
    }

    /// Delays every broker operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.state.latency) = latency;
    }

    /// Returns the messages currently held by `entity`.
    pub fn messages(&self, entity: &EntityPath) -> Vec<PeekedMessage> {
        lock(&self.state.entities)
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of senders created.
    pub fn senders_created(&self) -> usize {
        self.state.senders_created.load(Ordering::SeqCst)
    }

    /// Number of receivers created.
    pub fn receivers_created(&self) -> usize {
        self.state.receivers_created.load(Ordering::SeqCst)
    }

    /// Number of successful send calls.
    pub fn sends(&self) -> usize {
        self.state.sends.load(Ordering::SeqCst)
    }

    /// Number of successful peek calls.
    pub fn peeks(&self) -> usize {
        self.state.peeks.load(Ordering::SeqCst)
    }

    /// Number of teardown calls across all senders and receivers.
    pub fn teardowns(&self) -> usize {
        self.state.teardowns.load(Ordering::SeqCst)
    }

    /// Number of teardown calls on a resource that was already torn down.
    pub fn repeated_teardowns(&self) -> usize {
        self.state.repeated_teardowns.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Broker for MockBroker {
    type Receiver = MockReceiver;
    type Sender = MockSender;

    async fn create_sender(&self, entity: &str) -> Result<MockSender> {
        self.state
            .simulate(MockOperation::CreateSender, entity)
            .await?;
        self.state.senders_created.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(target: TRACING_TARGET_MOCK, entity, "Created mock sender");

        Ok(MockSender {
            entity: entity.to_string(),
            state: Arc::clone(&self.state),
            torn_down: AtomicBool::new(false),
        })
    }

    async fn create_receiver(&self, queue: &str) -> Result<MockReceiver> {
        self.state
            .simulate(MockOperation::CreateReceiver, queue)
            .await?;
        Ok(self.receiver(EntityPath::queue(queue)))
    }

    async fn create_subscription_receiver(
        &self,
        topic: &str,
        subscription: &str,
    ) -> Result<MockReceiver> {
        let entity = EntityPath::subscription(topic, subscription);
        self.state
            .simulate(MockOperation::CreateReceiver, &entity.to_string())
            .await?;
        Ok(self.receiver(entity))
    }
}

impl MockBroker {
    fn receiver(&self, entity: EntityPath) -> MockReceiver {
        self.state.receivers_created.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(target: TRACING_TARGET_MOCK, %entity, "Created mock receiver");

        MockReceiver {
            entity,
            state: Arc::clone(&self.state),
            torn_down: AtomicBool::new(false),
        }
    }
}

/// Sender produced by [`MockBroker`].
pub struct MockSender {
    entity: String,
    state: Arc<MockState>,
    torn_down: AtomicBool,
}

impl MockSender {
    fn destinations(&self) -> Vec<EntityPath> {
        match lock(&self.state.subscriptions).get(&self.entity) {
            Some(subscriptions) if !subscriptions.is_empty() => subscriptions
                .iter()
                .map(|subscription| EntityPath::subscription(&self.entity, subscription))
                .collect(),
            _ => vec![EntityPath::queue(&self.entity)],
        }
    }

    fn to_peeked(&self, entity: &EntityPath, message: &OutboundMessage) -> PeekedMessage {
        PeekedMessage {
            entity: entity.clone(),
            message_id: message.id.clone(),
            content: message.content.clone(),
            properties: message.properties.clone(),
            sequence_number: self.state.sequence.fetch_add(1, Ordering::SeqCst),
            enqueued_at: Timestamp::now(),
        }
    }
}

#[async_trait::async_trait]
impl MessageSender for MockSender {
    async fn send(&self, messages: Vec<OutboundMessage>) -> Result<()> {
        self.state
            .simulate(MockOperation::Send, &self.entity)
            .await?;

        let destinations = self.destinations();
        let mut entities = lock(&self.state.entities);
        for destination in &destinations {
            let stored = entities.entry(destination.clone()).or_default();
            stored.extend(messages.iter().map(|m| self.to_peeked(destination, m)));
        }
        drop(entities);

        self.state.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Teardown for MockSender {
    async fn teardown(&self) -> Result<()> {
        self.state.record_teardown(&self.torn_down);
        Ok(())
    }
}

/// Receiver produced by [`MockBroker`].
pub struct MockReceiver {
    entity: EntityPath,
    state: Arc<MockState>,
    torn_down: AtomicBool,
}

#[async_trait::async_trait]
impl MessageReceiver for MockReceiver {
    async fn peek(&self, max_messages: usize) -> Result<Vec<PeekedMessage>> {
        self.state
            .simulate(MockOperation::Peek, &self.entity.to_string())
            .await?;

        let messages = lock(&self.state.entities)
            .get(&self.entity)
            .map(|stored| stored.iter().take(max_messages).cloned().collect())
            .unwrap_or_default();

        self.state.peeks.fetch_add(1, Ordering::SeqCst);
        Ok(messages)
    }
}

#[async_trait::async_trait]
impl Teardown for MockReceiver {
    async fn teardown(&self) -> Result<()> {
        self.state.record_teardown(&self.torn_down);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_injected_failure() {
        let broker = MockBroker::new();
        broker.fail(MockOperation::Send, "orders", "queue disabled");

        let sender = broker.create_sender("orders").await.unwrap();
        let error = sender
            .send(vec![OutboundMessage::new("x")])
            .await
            .unwrap_err();
        assert_eq!(error.message.as_deref(), Some("queue disabled"));
        assert_eq!(broker.sends(), 0);
    }

    #[tokio::test]
    async fn test_repeated_teardown_is_counted() {
        let broker = MockBroker::new();
        let receiver = broker.create_receiver("orders").await.unwrap();

        receiver.teardown().await.unwrap();
        receiver.teardown().await.unwrap();

        assert_eq!(broker.teardowns(), 2);
        assert_eq!(broker.repeated_teardowns(), 1);
    }
}
