//! Configuration types

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RemoraError, RemoraResult};
use crate::strategy::ClearStrategy;
use crate::CacheNamespace;

/// Default namespace prefix.
pub const DEFAULT_PREFIX: &str = "cache";
/// Default entry TTL in seconds.
pub const DEFAULT_TTL_SECS: i64 = 60;
/// Smallest TTL accepted as a configured default.
pub const MIN_TTL_SECS: i64 = 60;
/// Default scan page-size hint.
pub const DEFAULT_CHUNK: usize = 100;
/// Smallest accepted scan page-size hint.
pub const MIN_CHUNK: usize = 2;

/// Bulk invalidation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClearConfig {
    pub strategy: ClearStrategy,
    /// Page-size hint passed to incremental scans.
    pub chunk: usize,
}

impl Default for ClearConfig {
    fn default() -> Self {
        Self {
            strategy: ClearStrategy::default(),
            chunk: DEFAULT_CHUNK,
        }
    }
}

/// Master configuration struct.
///
/// Missing fields take their defaults; present fields are never coerced.
/// Call [`RemoraConfig::validate`] (or construct a cache, which does) to
/// reject invalid values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoraConfig {
    /// Namespace prefix; every physical key is `<prefix>:<key>`.
    pub prefix: String,
    /// Default TTL in seconds for cached results.
    pub ttl: i64,
    pub clear: ClearConfig,
}

impl Default for RemoraConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            ttl: DEFAULT_TTL_SECS,
            clear: ClearConfig::default(),
        }
    }
}

impl RemoraConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text.
    ///
    /// ```toml
    /// prefix = "cache"
    /// ttl = 120
    ///
    /// [clear]
    /// strategy = "scan-unlink-chunked"
    /// chunk = 100
    /// ```
    pub fn from_toml_str(text: &str) -> RemoraResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_strategy(mut self, strategy: ClearStrategy) -> Self {
        self.clear.strategy = strategy;
        self
    }

    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.clear.chunk = chunk;
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - prefix is a valid [`CacheNamespace`]
    /// - ttl >= 60
    /// - chunk >= 2
    pub fn validate(&self) -> RemoraResult<()> {
        CacheNamespace::new(&self.prefix)?;

        if self.ttl < MIN_TTL_SECS {
            return Err(RemoraError::Config(ConfigError::InvalidValue {
                field: "ttl".to_string(),
                value: self.ttl.to_string(),
                reason: format!("ttl must be an integer of at least {} seconds", MIN_TTL_SECS),
            }));
        }

        if self.clear.chunk < MIN_CHUNK {
            return Err(RemoraError::Config(ConfigError::InvalidValue {
                field: "clear.chunk".to_string(),
                value: self.clear.chunk.to_string(),
                reason: format!("chunk must be an integer of at least {}", MIN_CHUNK),
            }));
        }

        Ok(())
    }

    /// Validated namespace for this config.
    pub fn namespace(&self) -> RemoraResult<CacheNamespace> {
        Ok(CacheNamespace::new(&self.prefix)?)
    }
}
