//! Facades bound to a cached sender or receiver.
//!
//! Each facade captures the entity it was resolved for, so callers never
//! re-derive names or cache keys per call.

mod queue;
mod subscription_receiver;
mod topic_sender;

pub use queue::{Queue, QueueReceiver, QueueSender};
pub use subscription_receiver::SubscriptionReceiver;
pub use topic_sender::TopicSender;

use std::collections::HashMap;

use serde_json::Value;

use crate::message::OutboundMessage;

/// Applies batch-wide properties to each message in `messages`.
fn apply_common_properties(
    messages: &mut [OutboundMessage],
    common: Option<&HashMap<String, Value>>,
) {
    let Some(common) = common.filter(|common| !common.is_empty()) else {
        return;
    };

    for message in messages {
        message.merge_common_properties(common);
    }
}
