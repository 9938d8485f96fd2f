//! Messaging client configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use courier_cache::ResourceCacheConfig;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration for a [`MessagingClient`] with sensible defaults.
///
/// [`MessagingClient`]: crate::MessagingClient
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct MessagingConfig {
    /// Client name used in logs and to derive the health check cache key
    #[cfg_attr(
        feature = "config",
        arg(long = "messaging-client-name", env = "MESSAGING_CLIENT_NAME")
    )]
    pub client_name: Option<String>,

    /// Minutes an unused sender or receiver stays cached before teardown
    #[cfg_attr(
        feature = "config",
        arg(long = "messaging-cache-timeout", env = "MESSAGING_CACHE_TIMEOUT_MINS")
    )]
    pub cache_timeout_mins: Option<u64>,

    /// Interval in seconds between sweeps for expired senders and receivers
    #[cfg_attr(
        feature = "config",
        arg(
            long = "messaging-cache-sweep-interval",
            env = "MESSAGING_CACHE_SWEEP_INTERVAL_SECS"
        )
    )]
    pub cache_sweep_interval_secs: Option<u64>,
}

// Default values
const DEFAULT_CLIENT_NAME: &str = "messaging";
const DEFAULT_CACHE_TIMEOUT_MINS: u64 = 30;
const DEFAULT_CACHE_SWEEP_INTERVAL_SECS: u64 = 60;

impl MessagingConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the client name, using the default if not set.
    #[inline]
    pub fn client_name(&self) -> &str {
        self.client_name.as_deref().unwrap_or(DEFAULT_CLIENT_NAME)
    }

    /// Returns the sliding expiration for cached resources.
    #[inline]
    pub fn cache_timeout(&self) -> Duration {
        let mins = self.cache_timeout_mins.unwrap_or(DEFAULT_CACHE_TIMEOUT_MINS);
        Duration::from_secs(mins.saturating_mul(60))
    }

    /// Returns the sweep interval for cached resources.
    #[inline]
    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(
            self.cache_sweep_interval_secs
                .unwrap_or(DEFAULT_CACHE_SWEEP_INTERVAL_SECS),
        )
    }

    /// Set the client name.
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Set the resource cache timeout in minutes.
    pub fn with_cache_timeout_mins(mut self, mins: u64) -> Self {
        self.cache_timeout_mins = Some(mins);
        self
    }

    /// Set the resource cache sweep interval in seconds.
    pub fn with_cache_sweep_interval_secs(mut self, secs: u64) -> Self {
        self.cache_sweep_interval_secs = Some(secs);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.client_name().trim().is_empty() {
            return Err(Error::configuration().with_message("Client name must not be empty"));
        }
        self.cache_config("validate").validate()
    }

    /// Builds the configuration of one of the client's resource caches.
    pub(crate) fn cache_config(&self, role: &str) -> ResourceCacheConfig {
        ResourceCacheConfig {
            cache_name: Some(format!("{}_{role}", self.client_name())),
            sliding_expiration_secs: Some(self.cache_timeout().as_secs()),
            sweep_interval_secs: Some(self.cache_sweep_interval().as_secs()),
        }
    }
}
