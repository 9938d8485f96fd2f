//! Messaging client and resource registry.

mod messaging_client;
mod messaging_config;
mod resource_key;

pub use messaging_client::MessagingClient;
pub use messaging_config::MessagingConfig;
pub use resource_key::{ResourceKey, ResourceRole};
