//! remora core - cache keys, TTLs and configuration
//!
//! Pure types with no I/O. The storage crate builds the cache engine on top
//! of these.

pub mod config;
pub mod error;
pub mod key;
pub mod query;
pub mod strategy;

use std::fmt;

pub use config::{ClearConfig, RemoraConfig};
pub use error::{ConfigError, QueryError, RemoraError, RemoraResult, StoreError, StrategyError};
pub use key::{canonicalize, derive_key, CacheKey, Pattern, FINGERPRINT_LEN};
pub use query::{
    AggregatePipeline, CacheOptions, CacheableQuery, FindQuery, Operation, SortOrder,
    AGGREGATE_SCOPE,
};
pub use strategy::{ClearStrategy, Enumeration, Granularity, RemovalPrimitive};

// ============================================================================
// TTL
// ============================================================================

/// Time-to-live for a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ttl {
    /// Expires after this many seconds. `Seconds(0)` behaves like `Never`.
    Seconds(u64),
    /// Never expires.
    Never,
}

impl Ttl {
    /// Any value below 1 is the no-expiry sentinel.
    pub fn from_secs(secs: i64) -> Self {
        if secs < 1 {
            Ttl::Never
        } else {
            Ttl::Seconds(secs as u64)
        }
    }

    /// Expiry in seconds, or `None` when the entry should never expire.
    pub fn as_secs(&self) -> Option<u64> {
        match self {
            Ttl::Seconds(secs) if *secs >= 1 => Some(*secs),
            _ => None,
        }
    }
}

impl From<i64> for Ttl {
    fn from(secs: i64) -> Self {
        Ttl::from_secs(secs)
    }
}

// ============================================================================
// NAMESPACE
// ============================================================================

/// Characters with meaning in a glob match pattern.
const GLOB_METACHARACTERS: [char; 5] = ['*', '?', '[', ']', '\\'];

/// Immutable key prefix shared by every entry of one cache instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheNamespace(String);

impl CacheNamespace {
    /// Validate and wrap a prefix.
    ///
    /// An empty prefix is a missing field. Otherwise the prefix must be
    /// already trimmed, not blank, and free of glob metacharacters since it
    /// is embedded verbatim in `<prefix>*`.
    pub fn new(prefix: impl Into<String>) -> Result<Self, ConfigError> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "prefix".to_string(),
            });
        }

        let reason = if prefix.trim().is_empty() {
            Some("prefix must not be blank")
        } else if prefix.trim() != prefix {
            Some("prefix must not have leading or trailing whitespace")
        } else if prefix.contains(&GLOB_METACHARACTERS[..]) {
            Some("prefix must not contain glob metacharacters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ConfigError::InvalidValue {
                field: "prefix".to_string(),
                value: prefix,
                reason: reason.to_string(),
            }),
            None => Ok(Self(prefix)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Physical key `<prefix>:<key>`.
    pub fn physical_key(&self, key: &str) -> String {
        format!("{}:{}", self.0, key)
    }

    /// Glob pattern `<prefix>*` used for enumeration.
    pub fn match_pattern(&self) -> String {
        format!("{}*", self.0)
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
