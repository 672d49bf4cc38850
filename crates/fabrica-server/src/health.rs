//! Aggregated health reporting.
//!
//! One document answers "what mode is this instance in": the capability
//! probe's verdict, a live cache ping with latency, per-queue counts and the
//! permission cache counters. Collection never fails; an unreachable
//! component shows up as degraded rather than as an error response.

use std::sync::Arc;
use std::time::Instant;

use fabrica_auth::{PermissionCache, PermissionCacheStats};
use fabrica_cache::{CacheStore, CapabilityProbe, CapabilityState};
use fabrica_core::now_utc;
use fabrica_core::time::to_rfc3339;
use fabrica_jobs::{JobStatusTracker, QueueStats};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

/// Cache section of the health document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHealth {
    pub status: HealthStatus,
    /// Round-trip time of a live ping against the active backend.
    pub latency_ms: u64,
}

/// Snapshot of the subsystem's mode and per-component state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDocument {
    pub status: HealthStatus,
    pub capability: CapabilityState,
    pub cache: CacheHealth,
    pub queues: Vec<QueueStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionCacheStats>,
    pub timestamp: String,
}

pub struct HealthAggregator {
    probe: Arc<dyn CapabilityProbe>,
    cache: Arc<dyn CacheStore>,
    tracker: Arc<JobStatusTracker>,
    permissions: Option<Arc<PermissionCache>>,
}

impl HealthAggregator {
    pub fn new(
        probe: Arc<dyn CapabilityProbe>,
        cache: Arc<dyn CacheStore>,
        tracker: Arc<JobStatusTracker>,
        permissions: Option<Arc<PermissionCache>>,
    ) -> Self {
        Self {
            probe,
            cache,
            tracker,
            permissions,
        }
    }

    /// Collect the health document. Reads the probe's memoized state without
    /// re-probing, so a health check can never flip the instance's mode.
    pub async fn collect(&self) -> HealthDocument {
        let capability = self.probe.state();

        let started = Instant::now();
        let ping_ok = self.cache.ping().await;
        let latency_ms = started.elapsed().as_millis() as u64;
        let cache = CacheHealth {
            status: if ping_ok {
                HealthStatus::Ok
            } else {
                HealthStatus::Degraded
            },
            latency_ms,
        };

        let queues = self.tracker.get_all_queues_stats().await;
        let permissions = self.permissions.as_ref().map(|cache| cache.stats());

        let degraded = !capability.available
            || cache.status == HealthStatus::Degraded
            || queues.iter().any(|q| !q.backend_available);

        HealthDocument {
            status: if degraded {
                HealthStatus::Degraded
            } else {
                HealthStatus::Ok
            },
            capability,
            cache,
            queues,
            permissions,
            timestamp: to_rfc3339(now_utc()).unwrap_or_default(),
        }
    }
}
