//! Prelude module for courier-messaging.
//!
//! This module re-exports the most commonly used types and traits from
//! courier-messaging, making it easy to import everything you need with a
//! single `use` statement.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_messaging::prelude::*;
//!
//! # async fn example(broker: impl Broker) -> Result<()> {
//! let client = MessagingClient::new(broker, MessagingConfig::new())?;
//! client.use_queue_sender("orders").await?
//!     .publish_message(OutboundMessage::new("hello"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

// Client types
pub use crate::client::{MessagingClient, MessagingConfig};
// Health check types
pub use crate::health::{
    HealthCheckContext, HealthCheckOptions, MessagingHealthCheck, QueueProbeOptions,
    SubscriptionProbeOptions, TopicProbeOptions,
};
// Message types
pub use crate::message::{EntityPath, OutboundMessage, PeekedMessage};
// Broker capability
pub use crate::{Broker, Error, ErrorKind, MessageReceiver, MessageSender, Result, Teardown};
