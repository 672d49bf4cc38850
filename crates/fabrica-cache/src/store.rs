use std::time::Duration;

use async_trait::async_trait;

/// Key-value cache contract implemented identically by both backends.
///
/// The contract never raises from normal operation: backend failures are
/// absorbed and logged, and callers only ever observe "absent" or a default
/// return. Values are opaque strings; interpreting them is the caller's
/// concern.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value, or `None` if the key was never set or has expired.
    ///
    /// Expiry is checked lazily on every read; an expired entry is removed by
    /// the access that finds it, never by a background sweep.
    async fn get(&self, key: &str) -> Option<String>;

    /// Set a value. With `ttl` the entry expires that long from now,
    /// otherwise it has no expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>);

    /// Set a value with a mandatory TTL in seconds.
    async fn setex(&self, key: &str, seconds: u64, value: &str);

    /// Delete keys, returning how many were actually removed.
    async fn del(&self, keys: &[&str]) -> u64;

    /// List live (non-expired) keys matching `pattern`, where `*` matches any
    /// substring (glob semantics, not regex).
    async fn keys(&self, pattern: &str) -> Vec<String>;

    /// Liveness check.
    async fn ping(&self) -> bool;

    /// Release resources. Behavior of subsequent calls is undefined.
    async fn quit(&self);

    /// Remove all entries.
    async fn flushdb(&self);
}

/// Match a key against a glob pattern where `*` matches any substring.
///
/// Segments between wildcards must appear in order; leading and trailing
/// segments are anchored.
pub(crate) fn glob_match(pattern: &str, key: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == key;
    }

    let segments: Vec<&str> = pattern.split('*').collect();
    let mut remainder = key;

    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if i == 0 {
            match remainder.strip_prefix(segment) {
                Some(rest) => remainder = rest,
                None => return false,
            }
        } else if i == segments.len() - 1 {
            return remainder.ends_with(segment);
        } else {
            match remainder.find(segment) {
                Some(pos) => remainder = &remainder[pos + segment.len()..],
                None => return false,
            }
        }
    }

    true
}
