//! Redis-backed store.
//!
//! Wraps a [`ConnectionManager`] built by the host process. The manager is
//! cloned per command, which shares the underlying multiplexed connection.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{ErrorKind, RedisError};
use remora_core::StoreError;
use tracing::debug;

use super::{KeyValueStore, ScanCursor, ScanPage};

/// Store that issues commands to Redis.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Wrap an already established connection.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

fn store_error(command: &str, e: RedisError) -> StoreError {
    if e.kind() == ErrorKind::TypeError {
        StoreError::Protocol {
            command: command.to_string(),
            reason: e.to_string(),
        }
    } else {
        StoreError::transport(command, e)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("GET", e))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("SET", e))?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SETEX")
            .arg(key)
            .arg(seconds)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("SETEX", e))?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        // DEL with no arguments is a protocol error.
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: u64 = redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("DEL", e))?;
        Ok(removed)
    }

    async fn unlink(&self, keys: &[String]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: u64 = redis::cmd("UNLINK")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("UNLINK", e))?;
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(pattern)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("KEYS", e))?;
        Ok(keys)
    }

    async fn scan(
        &self,
        cursor: &ScanCursor,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        let mut conn = self.conn.clone();
        let (next, keys): (String, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor.as_str())
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("SCAN", e))?;
        debug!(cursor = %next, matched = keys.len(), "redis scan page");
        Ok(ScanPage {
            cursor: ScanCursor::new(next),
            keys,
        })
    }
}
