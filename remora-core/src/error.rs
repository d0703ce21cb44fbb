//! Error types for remora operations

use thiserror::Error;

/// Configuration errors, raised synchronously at construction time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Key-value store errors.
///
/// Transport and protocol failures are propagated unchanged; this crate never
/// retries a store command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store command {command} failed: {reason}")]
    Transport { command: String, reason: String },

    #[error("Unexpected reply to {command}: {reason}")]
    Protocol { command: String, reason: String },

    #[error("Failed to serialize value for {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Cached value at {key} is corrupt: {reason}")]
    Deserialization { key: String, reason: String },
}

/// Clear strategy selection errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrategyError {
    #[error("Unknown clear strategy '{name}', available strategies are: {available}")]
    Unknown { name: String, available: String },
}

/// Errors reported by the query executor behind the cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query execution failed: {reason}")]
    ExecutionFailed { reason: String },
}

/// Master error type for all remora errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoraError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),
}

/// Result type alias for remora operations.
pub type RemoraResult<T> = Result<T, RemoraError>;

impl StoreError {
    /// Build a transport error for a named store command.
    pub fn transport(command: impl Into<String>, reason: impl ToString) -> Self {
        StoreError::Transport {
            command: command.into(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
