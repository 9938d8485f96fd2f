//! In-memory broker for testing.
//!
//! [`MockBroker`] stores published messages in memory, fans topic messages
//! out to registered subscriptions, counts created and torn down resources,
//! and can be told to fail or panic on specific operations.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! courier-messaging = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_messaging::mock::{MockBroker, MockOperation};
//! use courier_messaging::{MessagingClient, MessagingConfig};
//!
//! let broker = MockBroker::new();
//! broker.fail(MockOperation::Send, "orders", "queue is disabled");
//!
//! let client = MessagingClient::new(broker.clone(), MessagingConfig::new())?;
//! ```

mod mock_broker;

pub use mock_broker::{MockBroker, MockOperation, MockReceiver, MockSender};
