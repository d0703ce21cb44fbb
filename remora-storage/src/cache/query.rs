//! Cache-aware query execution.
//!
//! [`QueryCache::execute_with_cache`] is the single entry point a query layer
//! calls: it decides from the [`CacheOptions`] whether to consult the cache,
//! runs the executor on a miss, and stores the result with the right TTL.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use remora_core::{CacheKey, CacheOptions, CacheableQuery, RemoraResult, StoreError, Ttl};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::adapter::CacheStore;
use crate::store::KeyValueStore;

/// Statistics about wrapper usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from the cache.
    pub hits: u64,
    /// Cache-enabled reads that ran the executor.
    pub misses: u64,
    /// Reads with caching disabled.
    pub bypassed: u64,
    /// Results written back after a miss.
    pub stores: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0) over cache-enabled reads.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct StatsInner {
    hits: AtomicU64,
    misses: AtomicU64,
    bypassed: AtomicU64,
    stores: AtomicU64,
}

/// Query wrapper around a [`CacheStore`].
///
/// Constructing several wrappers over the same store yields independent
/// instances; nothing is registered globally.
pub struct QueryCache<S>
where
    S: KeyValueStore,
{
    cache: CacheStore<S>,
    stats: Arc<StatsInner>,
}

impl<S> QueryCache<S>
where
    S: KeyValueStore,
{
    pub fn new(cache: CacheStore<S>) -> Self {
        Self {
            cache,
            stats: Arc::new(StatsInner::default()),
        }
    }

    /// Get a reference to the cache store.
    pub fn store(&self) -> &CacheStore<S> {
        &self.cache
    }

    /// Snapshot of hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            bypassed: self.stats.bypassed.load(Ordering::Relaxed),
            stores: self.stats.stores.load(Ordering::Relaxed),
        }
    }

    /// Logical key the query would be cached under.
    pub fn key_for<Q: CacheableQuery>(&self, query: &Q, options: &CacheOptions) -> CacheKey {
        query.cache_key(options)
    }

    /// Run `executor` unless a cached result exists.
    ///
    /// With caching disabled the executor always runs and nothing is read or
    /// written. Otherwise a cached value is returned as-is; a stored `null`
    /// counts as no value. On a miss the executor runs and its result is
    /// stored before being returned. Executor errors are returned unchanged
    /// and nothing is cached.
    pub async fn execute_with_cache<Q, T, F, Fut>(
        &self,
        query: &Q,
        options: &CacheOptions,
        executor: F,
    ) -> RemoraResult<T>
    where
        Q: CacheableQuery,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = RemoraResult<T>>,
    {
        if !options.enabled {
            self.stats.bypassed.fetch_add(1, Ordering::Relaxed);
            return executor().await;
        }

        let key = query.cache_key(options).to_string();
        let ttl = options
            .ttl
            .map(Ttl::from_secs)
            .unwrap_or_else(|| self.cache.default_ttl());

        match self.cache.get::<Value>(&key).await? {
            Some(Value::Null) | None => {}
            Some(cached) => {
                let value = serde_json::from_value(cached).map_err(|e| {
                    StoreError::Deserialization {
                        key: self.cache.physical_key(&key),
                        reason: e.to_string(),
                    }
                })?;
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(value);
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "executing query after cache miss");
        let result = executor().await?;

        self.cache.set(&key, &result, ttl).await?;
        self.stats.stores.fetch_add(1, Ordering::Relaxed);
        Ok(result)
    }

    /// Remove exactly one cached entry for `query`.
    ///
    /// With `label` the entry cached under that explicit key (scoped to the
    /// query) is removed; otherwise the entry under the derived fingerprint.
    pub async fn forget<Q: CacheableQuery>(
        &self,
        query: &Q,
        label: Option<&str>,
    ) -> RemoraResult<()> {
        let key = match label {
            Some(label) => CacheKey::labeled(query.cache_scope(), label),
            None => CacheKey::fingerprint(query.cache_scope(), &query.descriptor()),
        };
        self.cache.unlink([key.to_string()]).await?;
        Ok(())
    }

    /// Remove every entry under the namespace with the configured strategy.
    pub async fn clear(&self) -> RemoraResult<super::ClearReport> {
        self.cache.clear().await
    }
}

impl<S> Clone for QueryCache<S>
where
    S: KeyValueStore,
{
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}
