//! Addressable messaging entities.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A queue, topic, or topic subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum EntityPath {
    /// Point-to-point queue.
    #[display("{_0}")]
    Queue(String),
    /// Publish/subscribe topic.
    #[display("{_0}")]
    Topic(String),
    /// Subscription attached to a topic.
    #[display("{topic}/subscriptions/{subscription}")]
    Subscription {
        /// Parent topic name.
        topic: String,
        /// Subscription name.
        subscription: String,
    },
}

impl EntityPath {
    /// Creates a queue path.
    pub fn queue(name: impl Into<String>) -> Self {
        Self::Queue(name.into())
    }

    /// Creates a topic path.
    pub fn topic(name: impl Into<String>) -> Self {
        Self::Topic(name.into())
    }

    /// Creates a subscription path.
    pub fn subscription(topic: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self::Subscription {
            topic: topic.into(),
            subscription: subscription.into(),
        }
    }
}
