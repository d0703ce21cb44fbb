//! Cache key derivation.
//!
//! A descriptor is canonicalized by sorting the keys of every mapping
//! (recursively) while leaving sequence order untouched, rendered as compact
//! JSON, and hashed with SHA-256. The resulting lowercase hex string is the
//! fingerprint.

use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 64;

/// Derive the fingerprint of a query descriptor.
///
/// Pure: two descriptors that differ only in mapping insertion order produce
/// the same fingerprint.
pub fn derive_key(descriptor: &Value) -> String {
    let canonical = canonicalize(descriptor).to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Recursively sort mapping keys. Sequences keep their element order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key.clone(), canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        scalar => scalar.clone(),
    }
}

// ============================================================================
// PATTERNS
// ============================================================================

/// A regular-expression condition inside a descriptor.
///
/// Patterns are embedded in descriptors by their canonical text
/// `/<source>/<flags>` so that equal patterns hash identically. Flags are
/// sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    source: String,
    flags: String,
}

impl Pattern {
    pub fn new(source: impl Into<String>, flags: &str) -> Self {
        let mut flags: Vec<char> = flags.chars().collect();
        flags.sort_unstable();
        flags.dedup();
        Self {
            source: source.into(),
            flags: flags.into_iter().collect(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

impl From<&regex::Regex> for Pattern {
    fn from(re: &regex::Regex) -> Self {
        Pattern::new(re.as_str(), "")
    }
}

impl From<Pattern> for Value {
    fn from(pattern: Pattern) -> Self {
        Value::String(pattern.to_string())
    }
}

// ============================================================================
// CACHE KEYS
// ============================================================================

/// Logical cache key `<scope>:<id>`, before namespacing.
///
/// The scope is the entity the query targets (a model name, or `aggregate`
/// for pipelines); the id is either a fingerprint or a caller-supplied label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    scope: String,
    id: String,
}

impl CacheKey {
    /// Key derived from the descriptor's fingerprint.
    pub fn fingerprint(scope: impl Into<String>, descriptor: &Value) -> Self {
        Self {
            scope: scope.into(),
            id: derive_key(descriptor),
        }
    }

    /// Key with an explicit label in place of the fingerprint.
    pub fn labeled(scope: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            id: label.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.id)
    }
}
