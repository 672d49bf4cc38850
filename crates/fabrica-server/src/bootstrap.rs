//! Startup wiring.
//!
//! The capability probe runs exactly once here; every backend-selecting
//! component (cache, broker) is constructed from its verdict. The permission
//! cache is wired in only when a permission source is registered.

use std::sync::Arc;
use std::time::Duration;

use fabrica_auth::{PermissionCache, PermissionSource};
use fabrica_cache::{CacheStore, CapabilityProbe, RedisCapabilityProbe, create_cache};
use fabrica_jobs::{JobBroker, JobStatusTracker};

use crate::config::AppConfig;
use crate::health::HealthAggregator;
use crate::state::AppState;

/// Everything the running server needs a handle on after startup.
pub struct Runtime {
    pub state: Arc<AppState>,
    pub cache: Arc<dyn CacheStore>,
    /// TTL applied when a caller caches without an explicit expiry.
    pub cache_ttl: Duration,
    pub broker: Arc<JobBroker>,
    pub permissions: Option<Arc<PermissionCache>>,
}

impl Runtime {
    /// Cache a value under the configured default TTL.
    pub async fn cache_set(&self, key: &str, value: &str) {
        self.cache.set(key, value, Some(self.cache_ttl)).await;
    }
}

/// Wire the subsystem from configuration, probing the external store once.
pub async fn build(
    config: &AppConfig,
    permission_source: Option<Arc<dyn PermissionSource>>,
) -> Runtime {
    let probe: Arc<dyn CapabilityProbe> =
        Arc::new(RedisCapabilityProbe::new(config.redis.clone()));
    build_with_probe(config, probe, permission_source).await
}

/// Same wiring over an injected probe, for tests and embedding.
pub async fn build_with_probe(
    config: &AppConfig,
    probe: Arc<dyn CapabilityProbe>,
    permission_source: Option<Arc<dyn PermissionSource>>,
) -> Runtime {
    let state = probe.check().await;
    tracing::info!(
        available = state.available,
        "external store capability resolved"
    );

    let cache = create_cache(probe.as_ref()).await;
    let broker = Arc::new(JobBroker::connect(probe.as_ref(), config.jobs.clone()).await);
    let tracker = Arc::new(JobStatusTracker::new(Arc::clone(&broker)));

    let permissions = permission_source
        .map(|source| Arc::new(PermissionCache::new(source, config.auth_cache.ttl())));

    let health = HealthAggregator::new(
        Arc::clone(&probe),
        Arc::clone(&cache),
        Arc::clone(&tracker),
        permissions.clone(),
    );

    Runtime {
        state: Arc::new(AppState { tracker, health }),
        cache,
        cache_ttl: config.cache.default_ttl(),
        broker,
        permissions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabrica_cache::FixedCapabilityProbe;

    #[tokio::test]
    async fn test_degraded_wiring_still_serves() {
        let config = AppConfig::default();
        let probe = Arc::new(FixedCapabilityProbe::unavailable());
        let runtime = build_with_probe(&config, probe, None).await;

        // Cache falls back to the in-process store
        runtime.cache.set("k", "v", None).await;
        assert_eq!(runtime.cache.get("k").await.as_deref(), Some("v"));

        // Broker degrades rather than fails
        assert!(!runtime.broker.is_available());
        assert!(runtime.permissions.is_none());

        let doc = runtime.state.health.collect().await;
        assert!(!doc.capability.available);
    }

    #[tokio::test]
    async fn test_configured_cache_ttl_reaches_runtime() {
        let mut config = AppConfig::default();
        config.cache.default_ttl_seconds = 120;
        let probe = Arc::new(FixedCapabilityProbe::unavailable());
        let runtime = build_with_probe(&config, probe, None).await;

        assert_eq!(runtime.cache_ttl, Duration::from_secs(120));
        runtime.cache_set("product:42", "gearbox").await;
        assert_eq!(
            runtime.cache.get("product:42").await.as_deref(),
            Some("gearbox")
        );
    }
}
