//! Backend health cache
//!
//! A health probe is expensive and its answer changes slowly, so results
//! are cached for a fixed time. Failed probes are cached as well.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use rampart_core::Value;
use rampart_report::Failure;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
    #[default]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
    #[default]
    Unknown,
}

/// Health report as served by the backend
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: ServiceStatus,
    #[serde(default)]
    pub database: DatabaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        HealthStatus {
            status: ServiceStatus::Healthy,
            database: DatabaseStatus::Connected,
            ..HealthStatus::default()
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        HealthStatus {
            status: ServiceStatus::Unhealthy,
            database: DatabaseStatus::Unknown,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Decode a response body; a malformed body reads as unknown
    pub fn from_response(body: &Value) -> Self {
        serde_json::from_value(body.clone()).unwrap_or_default()
    }

    pub fn is_healthy(&self) -> bool {
        self.status == ServiceStatus::Healthy
    }
}

/// Caches the last probe result for a fixed duration
#[derive(Debug)]
pub struct HealthCache {
    ttl: Duration,
    cached: Mutex<Option<(HealthStatus, Instant)>>,
}

impl HealthCache {
    pub fn new(ttl: Duration) -> Self {
        HealthCache {
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Cached status while fresh, `None` otherwise
    pub fn cached(&self) -> Option<HealthStatus> {
        let cached = self.cached.lock();
        match &*cached {
            Some((status, checked_at)) if checked_at.elapsed() < self.ttl => Some(status.clone()),
            _ => None,
        }
    }

    /// Fresh cached status, or the result of running `probe`.
    ///
    /// A failing probe yields an unhealthy status carrying the failure
    /// message.
    pub async fn check<F, Fut, E>(&self, probe: F) -> HealthStatus
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HealthStatus, E>>,
        E: Into<Failure>,
    {
        if let Some(status) = self.cached() {
            return status;
        }

        let status = match probe().await {
            Ok(status) => status,
            Err(err) => {
                let failure: Failure = err.into();
                tracing::warn!(error = %failure, "health probe failed");
                HealthStatus::unhealthy(failure.message())
            }
        };

        *self.cached.lock() = Some((status.clone(), Instant::now()));
        status
    }

    pub fn clear(&self) {
        *self.cached.lock() = None;
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
