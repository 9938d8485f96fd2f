//! Health reporting types for provider-backed clients.
//!
//! A [`HealthReport`] is the aggregate outcome of one probe batch. It is cheap
//! to clone so that a single computed report can be cached and handed to any
//! number of concurrent callers.

use std::collections::HashMap;
use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// Represents the operational status of a service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Every configured probe passed.
    #[default]
    Healthy,
    /// At least one probe failed.
    Unhealthy,
}

impl HealthStatus {
    /// Returns true for [`HealthStatus::Healthy`].
    #[inline]
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Aggregate health information computed by a single probe execution.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Aggregate status.
    pub status: HealthStatus,
    /// Fixed summary of the aggregate status.
    pub description: String,
    /// First error encountered while probing, if any.
    #[serde(skip)]
    pub primary_error: Option<Arc<Error>>,
    /// Per-target diagnostics keyed by target-specific names.
    pub data: HashMap<String, Value>,
    /// Timestamp when the probes were executed.
    pub computed_at: Timestamp,
    /// Timestamp after which a cached copy of this report is stale.
    pub expires_at: Option<Timestamp>,
}

impl HealthReport {
    /// Creates a new healthy report.
    pub fn healthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            description: description.into(),
            computed_at: Timestamp::now(),
            ..Default::default()
        }
    }

    /// Creates a new unhealthy report.
    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            description: description.into(),
            computed_at: Timestamp::now(),
            ..Default::default()
        }
    }

    /// Sets the primary error for this report.
    pub fn with_error(mut self, error: Option<Arc<Error>>) -> Self {
        self.primary_error = error;
        self
    }

    /// Replaces the diagnostic data of this report.
    pub fn with_data(mut self, data: HashMap<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Adds a diagnostic entry to the report.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Marks the report as expiring `ttl` after it was computed.
    pub fn expiring_after(mut self, ttl: std::time::Duration) -> Self {
        self.expires_at = self.computed_at.checked_add(ttl).ok();
        self
    }

    /// Returns how long the report stays fresh, measured from `computed_at`.
    pub fn time_to_live(&self) -> Option<SignedDuration> {
        self.expires_at
            .map(|expires_at| expires_at.duration_since(self.computed_at))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_constructors() {
        let report = HealthReport::healthy("ok");
        assert!(report.status.is_healthy());
        assert!(report.primary_error.is_none());
        assert!(report.expires_at.is_none());

        let report = HealthReport::unhealthy("down")
            .with_error(Some(Arc::new(Error::broker())))
            .with_entry("queue_orders_error", "Failed");
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.primary_error.is_some());
        assert_eq!(report.data["queue_orders_error"], "Failed");
    }

    #[test]
    fn test_time_to_live() {
        let report = HealthReport::healthy("ok").expiring_after(Duration::from_secs(62));
        assert_eq!(report.time_to_live(), Some(SignedDuration::from_secs(62)));
    }
}
