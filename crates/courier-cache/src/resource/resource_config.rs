//! Resource cache configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration for a [`ResourceCache`] with sensible defaults.
///
/// [`ResourceCache`]: crate::ResourceCache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ResourceCacheConfig {
    /// Name used to tell caches apart in logs
    #[cfg_attr(
        feature = "config",
        arg(long = "resource-cache-name", env = "RESOURCE_CACHE_NAME")
    )]
    pub cache_name: Option<String>,

    /// Sliding expiration window in seconds (refreshed on every access)
    #[cfg_attr(
        feature = "config",
        arg(
            long = "resource-cache-sliding-expiration",
            env = "RESOURCE_CACHE_SLIDING_EXPIRATION_SECS"
        )
    )]
    pub sliding_expiration_secs: Option<u64>,

    /// Interval in seconds between background sweeps for expired entries
    #[cfg_attr(
        feature = "config",
        arg(
            long = "resource-cache-sweep-interval",
            env = "RESOURCE_CACHE_SWEEP_INTERVAL_SECS"
        )
    )]
    pub sweep_interval_secs: Option<u64>,
}

// Default values
const DEFAULT_NAME: &str = "resources";
const DEFAULT_SLIDING_EXPIRATION_SECS: u64 = 30 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

impl ResourceCacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cache name, using the default if not set.
    #[inline]
    pub fn name(&self) -> &str {
        self.cache_name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    /// Returns the sliding expiration window.
    #[inline]
    pub fn sliding_expiration(&self) -> Duration {
        Duration::from_secs(
            self.sliding_expiration_secs
                .unwrap_or(DEFAULT_SLIDING_EXPIRATION_SECS),
        )
    }

    /// Returns the background sweep interval.
    #[inline]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(
            self.sweep_interval_secs
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        )
    }

    /// Set the cache name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = Some(name.into());
        self
    }

    /// Set the sliding expiration window in seconds.
    #[must_use]
    pub fn with_sliding_expiration_secs(mut self, secs: u64) -> Self {
        self.sliding_expiration_secs = Some(secs);
        self
    }

    /// Set the sliding expiration window in minutes.
    #[must_use]
    pub fn with_sliding_expiration_mins(self, mins: u64) -> Self {
        self.with_sliding_expiration_secs(mins.saturating_mul(60))
    }

    /// Set the background sweep interval in seconds.
    #[must_use]
    pub fn with_sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = Some(secs);
        self
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<()> {
        if self.sliding_expiration().is_zero() {
            return Err(
                Error::configuration().with_message("Sliding expiration must be greater than zero")
            );
        }

        if self.sweep_interval().is_zero() {
            return Err(
                Error::configuration().with_message("Sweep interval must be greater than zero")
            );
        }

        Ok(())
    }
}
