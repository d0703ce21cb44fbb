//! Key-value store seam.
//!
//! The cache talks to its store only through [`KeyValueStore`]. The store is
//! handed in already connected; nothing in this crate opens, pools or closes
//! connections.

pub mod glob;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use async_trait::async_trait;
use remora_core::StoreError;

pub use memory::{Command, CommandKind, InMemoryStore};
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// Opaque incremental scan cursor.
///
/// `"0"` both starts a scan and, when returned by the store, marks it complete.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanCursor(String);

impl ScanCursor {
    const START: &'static str = "0";

    pub fn new(cursor: impl Into<String>) -> Self {
        Self(cursor.into())
    }

    /// Cursor that begins a scan.
    pub fn start() -> Self {
        Self(Self::START.to_string())
    }

    /// Whether the store signalled that the scan has finished.
    pub fn is_complete(&self) -> bool {
        self.0 == Self::START
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of an incremental scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPage {
    pub cursor: ScanCursor,
    pub keys: Vec<String>,
}

/// Minimal command surface the cache needs from a key-value store.
///
/// All keys here are physical keys; namespacing happens in the adapter.
/// Each command is expected to be atomic at the store; nothing spans
/// commands.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `GET`: the raw stored text, or `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// `SET` without expiry.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// `SETEX`: write that expires after `seconds`.
    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), StoreError>;

    /// `DEL`: returns how many keys existed.
    async fn del(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// `UNLINK`: like `del`, but the store may reclaim memory lazily.
    async fn unlink(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// `KEYS`: every key matching a glob pattern, in one blocking call.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// `SCAN cursor MATCH pattern COUNT count`.
    ///
    /// No snapshot isolation: keys added or removed between pages may or may
    /// not be reported, and a key may be reported more than once.
    async fn scan(
        &self,
        cursor: &ScanCursor,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage, StoreError>;
}
