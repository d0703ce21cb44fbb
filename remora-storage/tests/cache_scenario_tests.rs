//! End-to-end cache scenarios against the in-memory store.
//!
//! Covers the namespaced round-trip of documents and falsy scalars, expiry,
//! removal idempotence, and a chunked scanning clear over five keys.

use std::sync::Arc;
use std::time::Duration;

use remora_storage::{CacheStore, CommandKind, InMemoryStore, KeyValueStore, QueryCache};
use remora_test_utils::assertions::{
    assert_invalid_field, assert_transport_error, assert_unknown_strategy,
};
use remora_test_utils::fixtures;
use remora_test_utils::{CacheOptions, ClearStrategy, RemoraConfig, Ttl};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

/// Route cache logs to the test output; `RUST_LOG=remora_storage=debug` shows every command.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn store_with(config: RemoraConfig) -> (Arc<InMemoryStore>, CacheStore<InMemoryStore>) {
    init_tracing();
    let store = Arc::new(InMemoryStore::new());
    let cache = CacheStore::new(Arc::clone(&store), config).expect("valid config");
    (store, cache)
}

#[tokio::test]
async fn test_document_and_zero_roundtrip_then_chunked_clear() {
    let config = RemoraConfig::new()
        .with_prefix("cache")
        .with_strategy(ClearStrategy::ScanUnlinkChunked)
        .with_chunk(2);
    let (store, cache) = store_with(config);

    cache.set("k1", &json!({"a": 1}), Ttl::Seconds(120)).await.unwrap();
    assert_eq!(cache.get::<Value>("k1").await.unwrap(), Some(json!({"a": 1})));

    cache.set("k2", &0, Ttl::Seconds(120)).await.unwrap();
    assert_eq!(cache.get::<Value>("k2").await.unwrap(), Some(json!(0)));
    assert_eq!(cache.get::<i64>("k2").await.unwrap(), Some(0));

    for key in ["k3", "k4", "k5"] {
        cache.set(key, &key, Ttl::Seconds(120)).await.unwrap();
    }
    assert_eq!(store.len(), 5);
    store.reset_log();

    let report = cache.clear().await.unwrap();

    for key in ["k1", "k2", "k3", "k4", "k5"] {
        assert_eq!(cache.get::<Value>(key).await.unwrap(), None, "{} survived", key);
    }
    assert!(store.command_count(CommandKind::Scan) >= 3);
    assert_eq!(report.enumeration_calls, store.command_count(CommandKind::Scan));
    assert_eq!(report.keys_removed, 5);
}

#[tokio::test(start_paused = true)]
async fn test_expiry_and_sentinel_through_the_adapter() {
    let (store, cache) = store_with(RemoraConfig::default());

    cache.set("short", &false, Ttl::from_secs(1)).await.unwrap();
    cache.set("forever", &false, Ttl::from_secs(-1)).await.unwrap();
    assert!(store.ttl_of("cache:forever").is_none());

    tokio::time::sleep(Duration::from_millis(1_001)).await;
    assert_eq!(cache.get::<bool>("short").await.unwrap(), None);

    tokio::time::sleep(Duration::from_secs(30 * 86_400)).await;
    assert_eq!(cache.get::<bool>("forever").await.unwrap(), Some(false));
}

#[tokio::test]
async fn test_delete_absent_key_is_a_noop() {
    let (store, cache) = store_with(RemoraConfig::default());

    assert_eq!(cache.delete(["nope"]).await.unwrap(), 0);
    assert_eq!(cache.unlink(["nope"]).await.unwrap(), 0);
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_configuration_loaded_from_toml() {
    let config = RemoraConfig::from_toml_str(
        r#"
        prefix = "queries"
        ttl = 300

        [clear]
        strategy = "scanDelChunks"
        chunk = 4
        "#,
    )
    .unwrap();
    let (store, cache) = store_with(config);

    cache.set_default("User:1", &json!({"name": "ada"})).await.unwrap();
    assert_eq!(store.ttl_of("queries:User:1"), Some(Duration::from_secs(300)));

    let report = cache.clear().await.unwrap();
    assert_eq!(report.strategy, ClearStrategy::ScanDeleteChunked);
    assert_eq!(store.command_count(CommandKind::Del), 1);
}

#[test]
fn test_invalid_configuration_fails_at_construction() {
    let store = Arc::new(InMemoryStore::new());
    let result = CacheStore::new(store, RemoraConfig::new().with_chunk(1)).map(|_| ());
    assert_invalid_field(&result, "clear.chunk");
}

#[tokio::test]
async fn test_query_wrapper_over_shared_store() {
    let store = Arc::new(InMemoryStore::new());
    let cache = QueryCache::new(CacheStore::with_defaults(Arc::clone(&store)).unwrap());
    let query = fixtures::active_users();
    let opts = CacheOptions::enabled();

    let first: Vec<Value> = cache
        .execute_with_cache(&query, &opts, || async { Ok(vec![json!({"name": "ada"})]) })
        .await
        .unwrap();
    let again: Vec<Value> = cache
        .execute_with_cache(&query, &opts, || async { Ok(Vec::new()) })
        .await
        .unwrap();
    assert_eq!(first, again);

    let key = cache.key_for(&query, &opts);
    assert_eq!(key.scope(), "User");
    assert!(store.get(&format!("cache:{}", key)).await.unwrap().is_some());

    cache.clear().await.unwrap();
    assert!(store.is_empty());

    store.fail_on(CommandKind::Get);
    let result: remora_test_utils::RemoraResult<Vec<Value>> = cache
        .execute_with_cache(&query, &opts, || async { Ok(Vec::new()) })
        .await;
    assert_transport_error(&result, "GET");
}

#[tokio::test]
async fn test_pipeline_cached_under_label_then_cleared_by_name() {
    let store = Arc::new(InMemoryStore::new());
    let cache = QueryCache::new(CacheStore::with_defaults(Arc::clone(&store)).unwrap());
    let pipeline = fixtures::order_totals();
    let opts = CacheOptions::enabled().with_key("totals").with_ttl(0);

    let totals: Value = cache
        .execute_with_cache(&pipeline, &opts, || async {
            Ok(json!([{"_id": "acme", "total": 0}]))
        })
        .await
        .unwrap();
    assert_eq!(totals, json!([{"_id": "acme", "total": 0}]));
    assert_eq!(store.ttl_of("cache:aggregate:totals"), None);
    assert_eq!(store.command_count(CommandKind::Set), 1);

    store.reset_log();
    let result = cache.store().clear_named("truncate").await;
    assert_unknown_strategy(&result);
    assert!(store.command_log().is_empty());

    let report = cache.store().clear_named("unlinkSeries").await.unwrap();
    assert_eq!(report.strategy, ClearStrategy::FullUnlinkSeries);
    assert!(store.is_empty());
}
