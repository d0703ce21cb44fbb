//! Property-based tests for value round-trips and key stability.
//!
//! Any JSON value written through the adapter reads back deep-equal, whatever
//! TTL it was written with, including `0`, `false`, `null` and nested
//! documents. Queries whose descriptors differ only in mapping order share one
//! cache entry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;
use remora_core::CacheableQuery;
use remora_storage::{CacheStore, InMemoryStore, KeyValueStore, QueryCache};
use remora_test_utils::assertions::{assert_ok, assert_store_error};
use remora_test_utils::generators::{
    arb_descriptor, arb_find_query, arb_json, arb_logical_key, arb_ttl_secs,
};
use remora_test_utils::{reverse_key_order, CacheOptions, RemoraError, StoreError, Ttl};
use serde_json::Value;
use tokio::runtime::Runtime;

fn test_runtime() -> Result<Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn fail(e: impl ToString) -> TestCaseError {
    TestCaseError::fail(e.to_string())
}

fn query_cache() -> Result<(Arc<InMemoryStore>, QueryCache<InMemoryStore>), TestCaseError> {
    let store = Arc::new(InMemoryStore::new());
    let cache = CacheStore::with_defaults(Arc::clone(&store)).map_err(fail)?;
    Ok((store, QueryCache::new(cache)))
}

/// Query identified only by a raw descriptor.
struct RawQuery(Value);

impl CacheableQuery for RawQuery {
    fn cache_scope(&self) -> String {
        "raw".to_string()
    }

    fn descriptor(&self) -> Value {
        self.0.clone()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: `get` after `set` returns a deep-equal value for any TTL.
    #[test]
    fn prop_set_then_get_roundtrips(
        key in arb_logical_key(),
        value in arb_json(),
        ttl in arb_ttl_secs(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (_, wrapper) = query_cache()?;
            let cache = wrapper.store();

            let written = cache.set(&key, &value, Ttl::from_secs(ttl)).await;
            assert_ok(&written);
            let read = cache.get::<Value>(&key).await.map_err(fail)?;

            prop_assert_eq!(read, Some(value));
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Property: reordering descriptor mappings hits the entry written before.
    #[test]
    fn prop_reordered_descriptor_hits_the_same_entry(descriptor in arb_descriptor()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (store, cache) = query_cache()?;
            let opts = CacheOptions::enabled();
            let counter = AtomicUsize::new(0);
            let calls = &counter;
            let run = move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Value::from(42))
            };

            let original = RawQuery(descriptor.clone());
            let reordered = RawQuery(reverse_key_order(&descriptor));
            let first: Value = cache
                .execute_with_cache(&original, &opts, run)
                .await
                .map_err(fail)?;
            let second: Value = cache
                .execute_with_cache(&reordered, &opts, run)
                .await
                .map_err(fail)?;

            prop_assert_eq!(first, second);
            prop_assert_eq!(counter.load(Ordering::SeqCst), 1);
            prop_assert_eq!(store.len(), 1);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Property: a cached find query runs its executor once, and `forget`
    /// makes the next read run it again.
    #[test]
    fn prop_find_query_cached_until_forgotten(query in arb_find_query()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (_, cache) = query_cache()?;
            let opts = CacheOptions::enabled();
            let counter = AtomicUsize::new(0);
            let calls = &counter;
            let run = move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![Value::from(false)])
            };

            for _ in 0..3 {
                let rows: Vec<Value> = cache
                    .execute_with_cache(&query, &opts, run)
                    .await
                    .map_err(fail)?;
                prop_assert_eq!(rows, vec![Value::from(false)]);
            }
            prop_assert_eq!(counter.load(Ordering::SeqCst), 1);

            cache.forget(&query, None).await.map_err(fail)?;
            let _: Vec<Value> = cache
                .execute_with_cache(&query, &opts, run)
                .await
                .map_err(fail)?;
            prop_assert_eq!(counter.load(Ordering::SeqCst), 2);
            Ok::<(), TestCaseError>(())
        })?;
    }
}

#[tokio::test]
async fn test_non_json_text_is_a_store_error() {
    let store = Arc::new(InMemoryStore::new());
    let cache = CacheStore::with_defaults(Arc::clone(&store)).unwrap();
    store.set("cache:raw", "<html>").await.unwrap();

    let result = cache.get::<Value>("raw").await;
    assert_store_error(&result);
    assert!(matches!(
        result,
        Err(RemoraError::Store(StoreError::Deserialization { .. }))
    ));
}
