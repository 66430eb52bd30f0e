//! Integration Tests for the Response Cache
//!
//! Exercises the public cache API end to end, with the background tasks running.

use std::sync::Arc;
use std::time::Duration;

use resource_cache::cache::estimate_size;
use resource_cache::{
    normalize_key, ByteSize, CacheError, Config, FreshnessMetadata, ResponseCache,
    ResponsePayload,
};

// == Helper Functions ==

fn payload(body: &str) -> ResponsePayload {
    ResponsePayload::new(body.to_string())
}

/// Size of an entry stored with `payload(body)` and no metadata.
fn entry_size(key: &str, body: &str) -> u64 {
    estimate_size(key, &payload(body), &FreshnessMetadata::new())
}

/// Polls until usage is back within budget, then gives an eviction that was
/// already under way time to finish.
async fn wait_within_budget(cache: &ResponseCache) {
    for _ in 0..500 {
        if cache.size_bytes().await <= cache.max_size().await.as_u64() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
}

// == Capacity Tests ==

#[tokio::test]
async fn test_capacity_of_one_entry_evicts_previous() {
    let cache = ResponseCache::with_max_size(ByteSize(entry_size("a", "body")));

    cache.store("a", payload("body"), FreshnessMetadata::new()).await.unwrap();
    cache.store("b", payload("body"), FreshnessMetadata::new()).await.unwrap();
    wait_within_budget(&cache).await;

    assert!(cache.lookup("a").await.is_none());
    assert!(cache.lookup("b").await.is_some());
    assert_eq!(cache.stats().await.capacity_evictions, 1);
}

#[tokio::test]
async fn test_lookup_protects_entry_from_eviction() {
    let cache = ResponseCache::with_max_size(ByteSize(3 * entry_size("a", "body")));

    for key in ["a", "b", "c"] {
        cache.store(key, payload("body"), FreshnessMetadata::new()).await.unwrap();
    }
    assert!(cache.lookup("a").await.is_some());
    cache.store("d", payload("body"), FreshnessMetadata::new()).await.unwrap();
    wait_within_budget(&cache).await;

    assert!(cache.lookup("b").await.is_none(), "b was least recently used");
    for key in ["a", "c", "d"] {
        assert!(cache.lookup(key).await.is_some(), "{} should remain", key);
    }
}

#[tokio::test]
async fn test_shrinking_capacity_evicts_immediately() {
    let one = entry_size("k0", "body");
    let cache = ResponseCache::with_max_size(ByteSize::mb(1));

    for n in 0..5 {
        cache
            .store(format!("k{}", n), payload("body"), FreshnessMetadata::new())
            .await
            .unwrap();
    }
    assert_eq!(cache.len().await, 5);

    cache.set_max_size(ByteSize(2 * one)).await;
    wait_within_budget(&cache).await;

    assert_eq!(cache.len().await, 2);
    assert_eq!(cache.max_size().await, ByteSize(2 * one));
    // The two most recently stored survive
    let mut order = cache.recency_order().await.unwrap();
    order.sort();
    assert_eq!(order, vec!["k3", "k4"]);
}

#[tokio::test]
async fn test_oversized_entry_is_rejected() {
    let cache = ResponseCache::with_max_size(ByteSize::kb(1));
    cache.store("small", payload("ok"), FreshnessMetadata::new()).await.unwrap();

    let err = cache
        .store("big", ResponsePayload::new(vec![0u8; 4096]), FreshnessMetadata::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CacheError::EntryTooLarge { max: 1024, .. }));
    assert!(cache.lookup("small").await.is_some());
    assert!(cache.lookup("big").await.is_none());
}

// == TTL Tests ==

#[tokio::test]
async fn test_entry_expires_after_ttl() {
    let cache = ResponseCache::with_max_size(ByteSize::mb(1));

    cache
        .store(
            "a",
            payload("short lived"),
            FreshnessMetadata::new().with_ttl(Duration::from_millis(10)),
        )
        .await
        .unwrap();
    assert!(cache.lookup("a").await.is_some());

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(cache.lookup("a").await.is_none());
    assert_eq!(cache.len().await, 0);
    assert_eq!(cache.size_bytes().await, 0);
    assert_eq!(cache.stats().await.expirations, 1);
}

#[tokio::test]
async fn test_entry_reachable_before_deadline() {
    let cache = ResponseCache::with_max_size(ByteSize::mb(1));

    cache
        .store(
            "a",
            payload("fresh"),
            FreshnessMetadata::new().with_ttl(Duration::from_secs(60)),
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let entry = cache.lookup("a").await.unwrap();
    assert!(!entry.is_expired());
    assert!(entry.ttl_remaining().unwrap() > Duration::from_secs(50));
}

#[tokio::test]
async fn test_expired_key_leaves_no_index_handles() {
    let cache = ResponseCache::with_max_size(ByteSize::mb(1));

    cache
        .store("gone", payload("x"), FreshnessMetadata::new().with_ttl(Duration::from_millis(10)))
        .await
        .unwrap();
    cache
        .store("kept", payload("x"), FreshnessMetadata::new().with_ttl(Duration::from_secs(60)))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(cache.recency_order().await.unwrap(), vec!["kept"]);
    assert_eq!(cache.expiry_order().await.unwrap(), vec!["kept"]);
}

#[tokio::test]
async fn test_capacity_eviction_clears_expiry_handle() {
    let meta = FreshnessMetadata::new().with_ttl(Duration::from_secs(60));
    let one = estimate_size("a", &payload("body"), &meta);
    let cache = ResponseCache::with_max_size(ByteSize(one));

    cache.store("a", payload("body"), meta.clone()).await.unwrap();
    cache.store("b", payload("body"), meta).await.unwrap();
    wait_within_budget(&cache).await;

    assert_eq!(cache.recency_order().await.unwrap(), vec!["b"]);
    assert_eq!(cache.expiry_order().await.unwrap(), vec!["b"]);
}

#[tokio::test]
async fn test_past_expiry_is_rejected() {
    let cache = ResponseCache::with_max_size(ByteSize::mb(1));
    let past = chrono::Utc::now() - chrono::Duration::minutes(1);

    let err = cache
        .store("a", payload("x"), FreshnessMetadata::new().with_expires_at(past))
        .await
        .unwrap_err();

    assert!(matches!(err, CacheError::InvalidMetadata(_)));
    assert!(cache.is_empty().await);
}

// == Overwrite and Invalidate Tests ==

#[tokio::test]
async fn test_overwrite_replaces_without_double_counting() {
    let cache = ResponseCache::with_max_size(ByteSize::mb(1));
    let meta = FreshnessMetadata::new().with_ttl(Duration::from_secs(60));

    cache.store("a", payload("first version"), meta.clone()).await.unwrap();
    cache.store("a", payload("v2"), meta.clone()).await.unwrap();

    assert_eq!(cache.len().await, 1);
    assert_eq!(cache.size_bytes().await, estimate_size("a", &payload("v2"), &meta));
    assert_eq!(cache.lookup("a").await.unwrap().text(), "v2");
    assert_eq!(cache.recency_order().await.unwrap(), vec!["a"]);
    assert_eq!(cache.expiry_order().await.unwrap(), vec!["a"]);
}

#[tokio::test]
async fn test_invalidate_removes_everywhere() {
    let cache = ResponseCache::with_max_size(ByteSize::mb(1));
    cache
        .store("a", payload("x"), FreshnessMetadata::new().with_ttl(Duration::from_secs(60)))
        .await
        .unwrap();

    assert!(cache.invalidate("a").await);
    assert!(!cache.invalidate("a").await);

    assert!(cache.lookup("a").await.is_none());
    assert!(cache.recency_order().await.unwrap().is_empty());
    assert!(cache.expiry_order().await.unwrap().is_empty());
    assert_eq!(cache.size_bytes().await, 0);
}

// == Entry Metadata Tests ==

#[tokio::test]
async fn test_metadata_round_trip() {
    let cache = ResponseCache::with_max_size(ByteSize::mb(1));
    let modified = chrono::Utc::now() - chrono::Duration::hours(1);
    let key = normalize_key("https://API.example.com/items?page=2#top").unwrap();

    cache
        .store(
            key.clone(),
            ResponsePayload::new("[]").with_status(404, "404 Not Found").with_protocol("HTTP/2.0"),
            FreshnessMetadata::new()
                .with_last_modified(modified)
                .with_etag("W/\"abc\""),
        )
        .await
        .unwrap();

    let entry = cache
        .lookup(&normalize_key("https://api.example.com/items?page=2").unwrap())
        .await
        .unwrap();
    assert_eq!(entry.key(), key);
    assert_eq!(entry.status(), 404);
    assert_eq!(entry.payload().protocol, "HTTP/2.0");
    assert_eq!(entry.last_modified(), Some(modified));
    assert_eq!(entry.etag(), Some("W/\"abc\""));
    assert!(entry.expires_at().is_none());
    assert!(entry.cache_hit());
}

#[tokio::test]
async fn test_stats_track_hits_and_misses() {
    let cache = ResponseCache::new(&Config::with_max_size(ByteSize::mb(1)));
    cache.store("a", payload("x"), FreshnessMetadata::new()).await.unwrap();

    cache.lookup("a").await;
    cache.lookup("a").await;
    cache.lookup("missing").await;

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.total_entries, 1);
    assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
}

// == Concurrency Tests ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_access_stays_within_budget() {
    let max = ByteSize::kb(16);
    let cache = Arc::new(ResponseCache::with_max_size(max));

    let mut workers = Vec::new();
    for worker in 0..8 {
        let cache = Arc::clone(&cache);
        workers.push(tokio::spawn(async move {
            for n in 0..200u32 {
                let key = format!("https://example.com/{}", (worker * 31 + n) % 64);
                match n % 4 {
                    0 | 1 => {
                        let meta = if n % 3 == 0 {
                            FreshnessMetadata::new().with_ttl(Duration::from_millis(20))
                        } else {
                            FreshnessMetadata::new()
                        };
                        cache
                            .store(key, ResponsePayload::new(vec![b'x'; 256]), meta)
                            .await
                            .unwrap();
                    }
                    2 => {
                        cache.lookup(&key).await;
                    }
                    _ => {
                        cache.invalidate(&key).await;
                    }
                }
            }
        }));
    }
    for worker in workers {
        worker.await.unwrap();
    }

    wait_within_budget(&cache).await;
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(cache.size_bytes().await <= max.as_u64());

    let mut recency = cache.recency_order().await.unwrap();
    let total = recency.len();
    recency.sort();
    recency.dedup();
    assert_eq!(recency.len(), total, "duplicate recency handles");
    assert_eq!(total, cache.len().await);
    // Short-lived entries have all been reaped
    assert!(cache.expiry_order().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_slot_queues_apply_backpressure_without_deadlock() {
    let max = ByteSize::kb(8);
    let config = Config {
        recency_queue_capacity: 1,
        expiry_queue_capacity: 1,
        ..Config::with_max_size(max)
    };
    let cache = Arc::new(ResponseCache::new(&config));

    let mut workers = Vec::new();
    for worker in 0..16u32 {
        let cache = Arc::clone(&cache);
        workers.push(tokio::spawn(async move {
            for n in 0..300u32 {
                let key = format!("https://example.com/{}", (worker * 17 + n) % 48);
                match n % 5 {
                    0 | 1 => {
                        let meta = if n % 2 == 0 {
                            FreshnessMetadata::new().with_ttl(Duration::from_millis(20))
                        } else {
                            FreshnessMetadata::new()
                        };
                        cache
                            .store(key, ResponsePayload::new(vec![b'y'; 128]), meta)
                            .await
                            .unwrap();
                    }
                    2 | 3 => {
                        cache.lookup(&key).await;
                    }
                    _ => {
                        cache.invalidate(&key).await;
                    }
                }
            }
        }));
    }

    let all = async {
        for worker in workers {
            worker.await.unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(20), all)
        .await
        .expect("index queues deadlocked");

    wait_within_budget(&cache).await;
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(cache.size_bytes().await <= max.as_u64());
    assert_eq!(cache.recency_order().await.unwrap().len(), cache.len().await);
    assert!(cache.expiry_order().await.unwrap().is_empty());
}
