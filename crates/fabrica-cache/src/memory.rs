//! In-process fallback cache.
//!
//! Serves a single process with a bounded working set; `keys` does a full
//! scan, which is acceptable only under that assumption. Expired entries are
//! evicted lazily by the access that finds them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::store::{CacheStore, glob_match};

/// A cached entry with optional expiry.
#[derive(Clone, Debug)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CacheStats {
    /// Number of entries currently in the cache.
    pub size: usize,
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries evicted due to TTL expiration.
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// In-process cache store backed by a concurrent map.
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Statistics snapshot for the health document.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            // Expired: delete, then report absent
            drop(entry);
            self.entries.remove(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        self.entries
            .insert(key.to_string(), CacheEntry::new(value.to_string(), ttl));
    }

    async fn setex(&self, key: &str, seconds: u64, value: &str) {
        self.set(key, value, Some(Duration::from_secs(seconds)))
            .await;
    }

    async fn del(&self, keys: &[&str]) -> u64 {
        let mut removed = 0;
        for key in keys {
            if self.entries.remove(*key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    async fn keys(&self, pattern: &str) -> Vec<String> {
        let mut expired = Vec::new();
        let mut matching = Vec::new();

        for entry in self.entries.iter() {
            if entry.value().is_expired() {
                expired.push(entry.key().clone());
            } else if glob_match(pattern, entry.key()) {
                matching.push(entry.key().clone());
            }
        }

        // keys() touched the expired entries, so it removes them
        for key in expired {
            if self.entries.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        matching
    }

    async fn ping(&self) -> bool {
        true
    }

    async fn quit(&self) {
        self.entries.clear();
    }

    async fn flushdb(&self) {
        self.entries.clear();
    }
}
