//! Redis-backed cache store.
//!
//! Delegates every call to the external store through the shared pool.
//! Failures are absorbed into the contract's defined defaults and logged,
//! never raised to callers.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;

use crate::store::CacheStore;

pub struct RedisCacheStore {
    pool: Pool,
}

impl RedisCacheStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Option<Connection> {
        match self.pool.get().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::warn!(error = %e, "failed to get store connection");
                None
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connection().await?;
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "store GET error");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        let result = match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await,
            None => conn.set::<_, _, ()>(key, value).await,
        };
        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "store SET error");
        }
    }

    async fn setex(&self, key: &str, seconds: u64, value: &str) {
        self.set(key, value, Some(Duration::from_secs(seconds)))
            .await;
    }

    async fn del(&self, keys: &[&str]) -> u64 {
        if keys.is_empty() {
            return 0;
        }
        let Some(mut conn) = self.connection().await else {
            return 0;
        };
        match conn.del::<_, u64>(keys.to_vec()).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(error = %e, "store DEL error");
                0
            }
        }
    }

    async fn keys(&self, pattern: &str) -> Vec<String> {
        let Some(mut conn) = self.connection().await else {
            return Vec::new();
        };
        match conn.keys::<_, Vec<String>>(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "store KEYS error");
                Vec::new()
            }
        }
    }

    async fn ping(&self) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(reply) => reply == "PONG",
            Err(e) => {
                tracing::warn!(error = %e, "store PING error");
                false
            }
        }
    }

    async fn quit(&self) {
        self.pool.close();
        tracing::debug!("store pool closed");
    }

    async fn flushdb(&self) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        if let Err(e) = redis::cmd("FLUSHDB").query_async::<()>(&mut conn).await {
            tracing::warn!(error = %e, "store FLUSHDB error");
        }
    }
}
