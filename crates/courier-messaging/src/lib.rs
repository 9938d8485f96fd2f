#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for messaging client operations.
///
/// Use this target for logging sender/receiver resolution and client teardown.
pub const TRACING_TARGET_CLIENT: &str = "courier_messaging::client";

/// Tracing target for health check operations.
///
/// Use this target for logging probe execution, cache hits, and probe failures.
pub const TRACING_TARGET_HEALTH: &str = "courier_messaging::health";

/// Tracing target for the in-memory mock broker.
pub const TRACING_TARGET_MOCK: &str = "courier_messaging::mock";

mod broker;
mod client;
mod entity;
pub mod health;
pub mod message;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;
pub mod prelude;

pub use broker::{Broker, MessageReceiver, MessageSender};
pub use client::{MessagingClient, MessagingConfig, ResourceKey, ResourceRole};
pub use courier_cache::{Expiration, MemoryStore, Teardown, TtlStore};
pub use courier_core::{Error, ErrorKind, HealthReport, HealthStatus, Result};
pub use entity::{Queue, QueueReceiver, QueueSender, SubscriptionReceiver, TopicSender};
