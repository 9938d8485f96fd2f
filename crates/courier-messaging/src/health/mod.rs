//! Coalesced, cached health checks over messaging entities.
//!
//! [`MessagingHealthCheck`] publishes probe messages to configured queues and
//! topics, peeks queues and subscriptions, and caches the aggregated
//! [`HealthReport`] with a shorter lifetime for failures than for successes.
//!
//! [`HealthReport`]: crate::HealthReport

mod health_check;
mod health_context;
mod health_options;
mod probe_target;

pub use health_check::MessagingHealthCheck;
pub use health_context::HealthCheckContext;
pub use health_options::{
    HealthCheckOptions, QueueProbeOptions, SubscriptionProbeOptions, TopicProbeOptions,
};
pub use probe_target::{ProbeCategory, ProbeTarget};
