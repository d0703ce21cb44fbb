//! Namespaced cache store adapter.
//!
//! Every logical key is stored as `<prefix>:<key>`. Values are written as
//! JSON text and parsed back on read.
//!
//! A stored JSON `null` reads back as `Some(Value::Null)` when the target
//! type can represent it, which keeps it distinguishable from a missing key.

use std::sync::Arc;

use remora_core::{
    CacheNamespace, ClearStrategy, RemoraConfig, RemoraResult, RemovalPrimitive, StoreError, Ttl,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::store::{KeyValueStore, ScanCursor, ScanPage};

/// Cache store bound to one namespace.
pub struct CacheStore<S>
where
    S: KeyValueStore,
{
    store: Arc<S>,
    namespace: CacheNamespace,
    config: RemoraConfig,
}

impl<S> CacheStore<S>
where
    S: KeyValueStore,
{
    /// Create a cache store, failing fast on invalid configuration.
    pub fn new(store: Arc<S>, config: RemoraConfig) -> RemoraResult<Self> {
        config.validate()?;
        let namespace = config.namespace()?;
        Ok(Self {
            store,
            namespace,
            config,
        })
    }

    /// Create a cache store with default configuration.
    pub fn with_defaults(store: Arc<S>) -> RemoraResult<Self> {
        Self::new(store, RemoraConfig::default())
    }

    pub fn config(&self) -> &RemoraConfig {
        &self.config
    }

    pub fn namespace(&self) -> &CacheNamespace {
        &self.namespace
    }

    /// Get a reference to the underlying store.
    pub fn backend(&self) -> &S {
        &self.store
    }

    pub fn default_ttl(&self) -> Ttl {
        Ttl::from_secs(self.config.ttl)
    }

    pub fn strategy(&self) -> ClearStrategy {
        self.config.clear.strategy
    }

    /// Scan page-size hint.
    pub fn chunk(&self) -> usize {
        self.config.clear.chunk
    }

    /// Physical key for a logical key.
    pub fn physical_key(&self, key: &str) -> String {
        self.namespace.physical_key(key)
    }

    /// Read and deserialize a cached value.
    ///
    /// Returns `Ok(None)` when the key does not exist. A value that cannot be
    /// parsed as `T` is an error, never a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> RemoraResult<Option<T>> {
        let physical = self.physical_key(key);
        let Some(raw) = self.store.get(&physical).await? else {
            debug!(key = %physical, "cache miss");
            return Ok(None);
        };

        let value = serde_json::from_str(&raw).map_err(|e| StoreError::Deserialization {
            key: physical.clone(),
            reason: e.to_string(),
        })?;
        debug!(key = %physical, "cache hit");
        Ok(Some(value))
    }

    /// Serialize and store a value. `Ttl::Never` and `Ttl::Seconds(0)` write
    /// without expiry.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Ttl,
    ) -> RemoraResult<()> {
        let physical = self.physical_key(key);
        let raw = serde_json::to_string(value).map_err(|e| StoreError::Serialization {
            key: physical.clone(),
            reason: e.to_string(),
        })?;

        match ttl.as_secs() {
            Some(seconds) => self.store.set_ex(&physical, &raw, seconds).await?,
            None => self.store.set(&physical, &raw).await?,
        }
        debug!(key = %physical, ttl = ?ttl, "cache set");
        Ok(())
    }

    /// Store a value with the configured default TTL.
    pub async fn set_default<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> RemoraResult<()> {
        self.set(key, value, self.default_ttl()).await
    }

    /// Remove one or more logical keys with `DEL`.
    ///
    /// Pass a single key as `["key"]`. An empty batch is a no-op.
    pub async fn delete<I, K>(&self, keys: I) -> RemoraResult<u64>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let physical = self.physical_keys(keys);
        self.remove_physical(RemovalPrimitive::Delete, &physical).await
    }

    /// Remove one or more logical keys with `UNLINK`.
    pub async fn unlink<I, K>(&self, keys: I) -> RemoraResult<u64>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let physical = self.physical_keys(keys);
        self.remove_physical(RemovalPrimitive::Unlink, &physical).await
    }

    fn physical_keys<I, K>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .map(|k| self.physical_key(k.as_ref()))
            .collect()
    }

    /// Remove already-namespaced keys with the given primitive.
    pub(crate) async fn remove_physical(
        &self,
        primitive: RemovalPrimitive,
        keys: &[String],
    ) -> RemoraResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let removed = match primitive {
            RemovalPrimitive::Delete => self.store.del(keys).await?,
            RemovalPrimitive::Unlink => self.store.unlink(keys).await?,
        };
        debug!(
            command = primitive.command(),
            requested = keys.len(),
            removed,
            "cache keys removed"
        );
        Ok(removed)
    }

    /// Every physical key under the namespace, in one blocking listing.
    pub async fn list_keys(&self) -> RemoraResult<Vec<String>> {
        Ok(self.store.keys(&self.namespace.match_pattern()).await?)
    }

    /// One incremental scan page under the namespace.
    pub async fn scan_page(&self, cursor: &ScanCursor) -> RemoraResult<ScanPage> {
        Ok(self
            .store
            .scan(cursor, &self.namespace.match_pattern(), self.chunk())
            .await?)
    }
}

impl<S> Clone for CacheStore<S>
where
    S: KeyValueStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: self.namespace.clone(),
            config: self.config.clone(),
        }
    }
}
