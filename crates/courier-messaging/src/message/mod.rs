//! Broker-neutral message types.

mod entity_path;
mod outbound_message;
mod peeked_message;

pub use entity_path::EntityPath;
pub use outbound_message::OutboundMessage;
pub use peeked_message::PeekedMessage;
