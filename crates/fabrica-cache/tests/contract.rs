//! Backend contract suite.
//!
//! Exercises the `CacheStore` contract through a `dyn` handle so the same
//! assertions apply to any backend. The in-process store runs here; the
//! Redis-backed store implements the identical trait and shares these
//! semantics, but needs a live server and is exercised in deployment.

use std::sync::Arc;
use std::time::Duration;

use fabrica_cache::{CacheStore, MemoryCacheStore};

fn store() -> Arc<dyn CacheStore> {
    Arc::new(MemoryCacheStore::new())
}

#[tokio::test]
async fn get_absent_key_returns_none() {
    let cache = store();
    assert!(cache.get("never-set").await.is_none());
}

#[tokio::test]
async fn setex_value_visible_until_ttl_elapses() {
    let cache = store();
    cache.set("wo:7", "released", Some(Duration::from_millis(50))).await;
    assert_eq!(cache.get("wo:7").await.as_deref(), Some("released"));

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(cache.get("wo:7").await.is_none());
}

#[tokio::test]
async fn setex_seconds_form() {
    let cache = store();
    cache.setex("supplier:3", 60, "acme").await;
    assert_eq!(cache.get("supplier:3").await.as_deref(), Some("acme"));
}

#[tokio::test]
async fn most_recent_set_wins() {
    let cache = store();
    cache.set("k", "v1", None).await;
    cache.set("k", "v2", None).await;
    assert_eq!(cache.get("k").await.as_deref(), Some("v2"));
}

#[tokio::test]
async fn del_returns_count_of_existing_keys() {
    let cache = store();
    cache.set("a", "1", None).await;
    assert_eq!(cache.del(&["a", "b"]).await, 1);
    assert_eq!(cache.del(&["a"]).await, 0);
}

#[tokio::test]
async fn keys_returns_live_matches_only() {
    let cache = store();
    cache.set("foo:alpha", "1", None).await;
    cache.set("foo:beta", "2", None).await;
    cache.set("other", "3", None).await;
    cache.set("foo:gone", "4", Some(Duration::from_millis(10))).await;

    tokio::time::sleep(Duration::from_millis(30)).await;

    let mut keys = cache.keys("foo*").await;
    keys.sort();
    assert_eq!(keys, vec!["foo:alpha", "foo:beta"]);
}

#[tokio::test]
async fn ping_and_flushdb() {
    let cache = store();
    assert!(cache.ping().await);

    cache.set("a", "1", None).await;
    cache.flushdb().await;
    assert!(cache.get("a").await.is_none());
}
