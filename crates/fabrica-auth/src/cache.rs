//! Short-TTL cache of resolved permission grants.
//!
//! Reduces role lookups on hot authorization paths. Entries expire after the
//! configured TTL (default 5 minutes) and are re-resolved from the source of
//! truth on the next check; any collaborator that mutates a user's role must
//! call [`PermissionCache::invalidate`] for immediate effect.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::AuthResult;
use crate::permission::PermissionSet;

/// Default TTL for cached grants.
pub const DEFAULT_PERMISSION_TTL: Duration = Duration::from_secs(300);

/// Source of truth for a user's grants — the external authorization
/// collaborator (roles, user records).
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Raw grant strings for a user.
    async fn grants_for(&self, user_id: &str) -> AuthResult<Vec<String>>;
}

struct CachedGrants {
    permissions: Arc<PermissionSet>,
    cached_at: Instant,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PermissionCacheStats {
    /// Number of users currently cached.
    pub size: usize,
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (including expired entries).
    pub misses: u64,
}

/// Process-wide permission cache.
pub struct PermissionCache {
    source: Arc<dyn PermissionSource>,
    entries: DashMap<String, CachedGrants>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PermissionCache {
    pub fn new(source: Arc<dyn PermissionSource>, ttl: Duration) -> Self {
        Self {
            source,
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache with the default 5-minute TTL.
    pub fn with_default_ttl(source: Arc<dyn PermissionSource>) -> Self {
        Self::new(source, DEFAULT_PERMISSION_TTL)
    }

    /// Resolved permission set for a user.
    ///
    /// Serves the cached entry while it is younger than the TTL, otherwise
    /// recomputes from the source. Resolution failures fail closed: the user
    /// gets an empty (deny-everything) set and the failure is not cached.
    pub async fn get_permissions(&self, user_id: &str) -> Arc<PermissionSet> {
        if let Some(entry) = self.entries.get(user_id) {
            if entry.cached_at.elapsed() < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Arc::clone(&entry.permissions);
            }
            // Stale: drop the entry, then re-resolve
            drop(entry);
            self.entries.remove(user_id);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        match self.source.grants_for(user_id).await {
            Ok(grants) => {
                let permissions = Arc::new(PermissionSet::resolve(&grants));
                self.entries.insert(
                    user_id.to_string(),
                    CachedGrants {
                        permissions: Arc::clone(&permissions),
                        cached_at: Instant::now(),
                    },
                );
                permissions
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "permission resolution failed, denying by default");
                Arc::new(PermissionSet::empty())
            }
        }
    }

    /// True if the user's grants allow the permission, either literally,
    /// via a `prefix.*` grant, or via the global wildcard.
    pub async fn has_permission(&self, user_id: &str, permission: &str) -> bool {
        self.get_permissions(user_id).await.allows(permission)
    }

    /// Remove a user's cached grants. Called by any collaborator that
    /// changes the user's role.
    pub fn invalidate(&self, user_id: &str) {
        self.entries.remove(user_id);
        tracing::debug!(user_id = %user_id, "permission cache invalidated");
    }

    /// Statistics snapshot for the health document.
    pub fn stats(&self) -> PermissionCacheStats {
        PermissionCacheStats {
            size: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
