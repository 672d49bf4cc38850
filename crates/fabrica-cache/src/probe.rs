//! One-time capability detection for the external store.
//!
//! The probe makes a single bounded connection attempt and memoizes the
//! outcome for the process lifetime. Any failure (refused connection,
//! timeout, authentication error) resolves uniformly to "unavailable" and is
//! logged, never raised. If the store recovers mid-process the server stays
//! in degraded mode until restarted.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::config::RedisConfig;

/// Process-wide capability flag. Once `checked` is true, `available` never
/// changes for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapabilityState {
    pub checked: bool,
    pub available: bool,
}

impl CapabilityState {
    pub fn unchecked() -> Self {
        Self {
            checked: false,
            available: false,
        }
    }
}

/// Capability detection service, injected into every backend-selecting
/// component so tests can substitute a fixed verdict.
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    /// Run the probe if it has not run yet and return the memoized state.
    async fn check(&self) -> CapabilityState;

    /// Current state without triggering a probe.
    fn state(&self) -> CapabilityState;

    /// Connection pool for the external store, when reachable.
    async fn pool(&self) -> Option<Pool>;
}

/// Probe backed by a real Redis connection attempt.
pub struct RedisCapabilityProbe {
    config: RedisConfig,
    outcome: OnceCell<Option<Pool>>,
}

impl RedisCapabilityProbe {
    pub fn new(config: RedisConfig) -> Self {
        Self {
            config,
            outcome: OnceCell::new(),
        }
    }

    /// Single connection attempt, bounded by the configured timeout, no
    /// retry. Avoids retry storms and unbounded startup latency.
    async fn attempt_connection(&self) -> Option<Pool> {
        if !self.config.enabled {
            tracing::info!("external store disabled, running in degraded mode");
            return None;
        }

        tracing::info!(url = %self.config.url, "probing external store");

        let mut redis_config = deadpool_redis::Config::from_url(&self.config.url);
        let timeout = Duration::from_millis(self.config.timeout_ms);
        if let Some(ref mut pool_config) = redis_config.pool {
            pool_config.max_size = self.config.pool_size;
            pool_config.timeouts.wait = Some(timeout);
            pool_config.timeouts.create = Some(timeout);
            pool_config.timeouts.recycle = Some(timeout);
        }

        let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!(error = %e, "failed to create store pool, running in degraded mode");
                return None;
            }
        };

        match tokio::time::timeout(timeout, pool.get()).await {
            Ok(Ok(_)) => {
                tracing::info!("external store reachable");
                Some(pool)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "external store unreachable, running in degraded mode");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.timeout_ms,
                    "external store probe timed out, running in degraded mode"
                );
                None
            }
        }
    }
}

#[async_trait]
impl CapabilityProbe for RedisCapabilityProbe {
    async fn check(&self) -> CapabilityState {
        let pool = self
            .outcome
            .get_or_init(|| self.attempt_connection())
            .await;
        CapabilityState {
            checked: true,
            available: pool.is_some(),
        }
    }

    fn state(&self) -> CapabilityState {
        match self.outcome.get() {
            Some(pool) => CapabilityState {
                checked: true,
                available: pool.is_some(),
            },
            None => CapabilityState::unchecked(),
        }
    }

    async fn pool(&self) -> Option<Pool> {
        self.outcome
            .get_or_init(|| self.attempt_connection())
            .await
            .clone()
    }
}

/// Probe with a fixed verdict, for tests and embedding without a store.
pub struct FixedCapabilityProbe {
    available: bool,
}

impl FixedCapabilityProbe {
    pub fn available() -> Self {
        Self { available: true }
    }

    pub fn unavailable() -> Self {
        Self { available: false }
    }
}

#[async_trait]
impl CapabilityProbe for FixedCapabilityProbe {
    async fn check(&self) -> CapabilityState {
        CapabilityState {
            checked: true,
            available: self.available,
        }
    }

    fn state(&self) -> CapabilityState {
        CapabilityState {
            checked: true,
            available: self.available,
        }
    }

    async fn pool(&self) -> Option<Pool> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_config_resolves_unavailable() {
        let probe = RedisCapabilityProbe::new(RedisConfig::default());
        assert!(!probe.state().checked);

        let state = probe.check().await;
        assert!(state.checked);
        assert!(!state.available);
        assert!(probe.pool().await.is_none());
    }

    #[tokio::test]
    async fn test_probe_result_is_memoized() {
        let probe = RedisCapabilityProbe::new(RedisConfig {
            enabled: true,
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 1,
            timeout_ms: 100,
        });

        let first = probe.check().await;
        let second = probe.check().await;
        assert_eq!(first, second);
        assert!(!first.available);
        assert!(probe.state().checked);
    }

    #[tokio::test]
    async fn test_fixed_probe() {
        let probe = FixedCapabilityProbe::available();
        assert!(probe.check().await.available);
        assert!(probe.state().checked);

        let probe = FixedCapabilityProbe::unavailable();
        assert!(!probe.check().await.available);
    }
}
