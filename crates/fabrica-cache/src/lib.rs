//! Dual-mode key-value cache for the Fabrica server.
//!
//! ## Architecture
//!
//! - **Redis backend**: shared across instances, used when the external store
//!   is reachable at startup
//! - **Memory backend**: in-process DashMap with lazy TTL eviction, used when
//!   Redis is disabled or unreachable
//!
//! Both backends implement the same [`CacheStore`] contract, so callers never
//! branch on which one is active.
//!
//! ## Graceful Degradation
//!
//! Backend selection happens once, at construction, based on the
//! [`CapabilityProbe`]. If Redis is unavailable the server keeps running on
//! the in-process fallback until restarted.

pub mod config;
pub mod memory;
pub mod probe;
pub mod redis_store;
pub mod store;

pub use config::RedisConfig;
pub use memory::{CacheStats, MemoryCacheStore};
pub use probe::{CapabilityProbe, CapabilityState, FixedCapabilityProbe, RedisCapabilityProbe};
pub use redis_store::RedisCacheStore;
pub use store::CacheStore;

use std::sync::Arc;

/// Create a cache store based on the capability probe's verdict.
///
/// The probe runs at most once per process; this function selects the Redis
/// backend only when the probe reports the store reachable and hands over a
/// live pool. Every other outcome falls back to the in-process store.
pub async fn create_cache(probe: &dyn CapabilityProbe) -> Arc<dyn CacheStore> {
    let state = probe.check().await;
    if state.available {
        if let Some(pool) = probe.pool().await {
            tracing::info!("cache backed by external store");
            return Arc::new(RedisCacheStore::new(pool));
        }
    }
    tracing::info!("cache backed by in-process fallback");
    Arc::new(MemoryCacheStore::new())
}
