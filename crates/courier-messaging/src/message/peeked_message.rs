//! Messages observed without being consumed.

use std::collections::HashMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EntityPath;

/// A message read by peeking; it stays on the entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeekedMessage {
    /// Entity the message was peeked from.
    pub entity: EntityPath,
    /// Broker message identifier.
    pub message_id: Option<String>,
    /// Message body.
    pub content: String,
    /// Application properties.
    pub properties: HashMap<String, Value>,
    /// Broker-assigned sequence number.
    pub sequence_number: i64,
    /// When the broker accepted the message.
    pub enqueued_at: Timestamp,
}
