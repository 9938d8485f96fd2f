//! Cache keys for broker resources.

use derive_more::{Deref, Display, Into};
use strum::{AsRefStr, IntoStaticStr};

use crate::{Error, Result};

const SUBSCRIPTION_SEPARATOR: char = '/';

/// Role a cached broker resource plays for its entity.
///
/// Each role owns a disjoint key prefix, so the sender and receiver for the
/// same queue are cached independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr)]
pub enum ResourceRole {
    /// Sender bound to a queue.
    #[strum(serialize = "sender_queue_")]
    QueueSender,
    /// Receiver bound to a queue.
    #[strum(serialize = "receiver_queue_")]
    QueueReceiver,
    /// Sender bound to a topic.
    #[strum(serialize = "sender_topic_")]
    TopicSender,
    /// Receiver bound to a topic subscription.
    #[strum(serialize = "receiver_subscription_")]
    SubscriptionReceiver,
}

impl ResourceRole {
    /// Returns the key prefix for this role.
    #[inline]
    pub fn prefix(self) -> &'static str {
        self.into()
    }
}

/// A cache key derived from a role and a logical entity identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Deref, Into)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Derives the key for a queue or topic resource.
    pub fn entity(role: ResourceRole, entity: &str) -> Result<Self> {
        require_name("entity", entity)?;
        Ok(Self(format!("{}{entity}", role.prefix())))
    }

    /// Derives the key for a subscription receiver.
    ///
    /// Topic and subscription are joined with `/`, which subscription names
    /// may not contain, so every pair maps to a distinct key.
    pub fn subscription(topic: &str, subscription: &str) -> Result<Self> {
        require_name("topic", topic)?;
        require_name("subscription", subscription)?;
        if subscription.contains(SUBSCRIPTION_SEPARATOR) {
            return Err(Error::invalid_input().with_message(format!(
                "The subscription name must not contain '{SUBSCRIPTION_SEPARATOR}'"
            )));
        }
        Ok(Self(format!(
            "{}{topic}{SUBSCRIPTION_SEPARATOR}{subscription}",
            ResourceRole::SubscriptionReceiver.prefix()
        )))
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn require_name(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_input().with_message(format!("The {what} name must not be empty")));
    }
    Ok(())
}
