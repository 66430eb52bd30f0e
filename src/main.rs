//! Resource Cache Demo
//!
//! Drives a deliberately small response cache through a burst of synthetic
//! traffic and prints the resulting statistics.

use std::env;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resource_cache::{
    normalize_key, ByteSize, Config, FreshnessMetadata, ResponseCache, ResponsePayload,
};

/// Budget used when `CACHE_MAX_SIZE` is not set, small enough to force evictions
const DEMO_MAX_SIZE: ByteSize = ByteSize::kb(64);

const REQUESTS: usize = 200;

/// Entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Store synthetic responses, a third of them short-lived
/// 4. Look up a mix of recent and old keys
/// 5. Wait for the TTL monitor, then print stats as JSON
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resource_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if env::var("CACHE_MAX_SIZE").is_err() {
        config.max_cache_size = DEMO_MAX_SIZE;
    }
    let cache = ResponseCache::new(&config);

    for n in 0..REQUESTS {
        let key = normalize_key(&format!("https://api.example.com/items/{}#details", n))?;
        let body = serde_json::json!({ "id": n, "padding": "x".repeat(512) }).to_string();
        let metadata = if n % 3 == 0 {
            FreshnessMetadata::new().with_ttl(Duration::from_millis(100))
        } else {
            FreshnessMetadata::new().with_etag(format!("\"item-{}\"", n))
        };

        cache
            .store(key.clone(), ResponsePayload::new(body), metadata)
            .await
            .with_context(|| format!("failed to cache {}", key))?;
    }
    info!(
        "Stored {} responses: {} cached, {} in use",
        REQUESTS,
        cache.len().await,
        ByteSize(cache.size_bytes().await)
    );

    let mut hits = 0;
    for n in (0..REQUESTS).step_by(7) {
        let key = normalize_key(&format!("https://api.example.com/items/{}", n))?;
        if cache.lookup(&key).await.is_some() {
            hits += 1;
        }
    }
    info!("Lookup pass served {} hits", hits);

    tokio::time::sleep(Duration::from_millis(250)).await;
    info!(
        "After expiry: {} cached, {} in use",
        cache.len().await,
        ByteSize(cache.size_bytes().await)
    );

    let stats = cache.stats().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
