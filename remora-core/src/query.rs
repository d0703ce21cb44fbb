//! Cacheable query shapes and per-query cache options.
//!
//! A query exposes a scope and a descriptor; the descriptor captures
//! everything that changes the shape of the result. The cache never inspects
//! a descriptor beyond fingerprinting it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::key::CacheKey;

/// Scope used for aggregation pipeline keys.
pub const AGGREGATE_SCOPE: &str = "aggregate";

/// Per-query caching decision, passed alongside the descriptor.
///
/// `ttl` of `None` means the cache's configured default; any integer is
/// accepted, values below 1 mean the entry never expires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    pub enabled: bool,
    pub key: Option<String>,
    pub ttl: Option<i64>,
}

impl CacheOptions {
    /// Caching disabled: the executor always runs.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Caching enabled with the default TTL and a derived key.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Use `label` instead of the fingerprint. The label is still scoped.
    pub fn with_key(mut self, label: impl Into<String>) -> Self {
        self.key = Some(label.into());
        self
    }
}

/// A query that can be served from the cache.
pub trait CacheableQuery {
    /// Entity scope used as the first key segment.
    fn cache_scope(&self) -> String;

    /// Normalized shape of the query.
    fn descriptor(&self) -> Value;

    /// Key for this query: the explicit label if given, else the fingerprint.
    fn cache_key(&self, options: &CacheOptions) -> CacheKey {
        match &options.key {
            Some(label) => CacheKey::labeled(self.cache_scope(), label.clone()),
            None => CacheKey::fingerprint(self.cache_scope(), &self.descriptor()),
        }
    }
}

// ============================================================================
// FIND QUERIES
// ============================================================================

/// Query operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Find,
    FindOne,
    Count,
    CountDocuments,
    EstimatedDocumentCount,
    Distinct,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_i64(&self) -> i64 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

/// A collection query against one model.
///
/// Sort fields are kept as an ordered sequence: their order changes the
/// result, so it must survive canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    model: String,
    operation: Operation,
    filter: Map<String, Value>,
    projection: Option<Value>,
    sort: Vec<(String, SortOrder)>,
    skip: Option<u64>,
    limit: Option<u64>,
    distinct: Option<String>,
    options: Map<String, Value>,
}

impl FindQuery {
    pub fn new(model: impl Into<String>, operation: Operation) -> Self {
        Self {
            model: model.into(),
            operation,
            filter: Map::new(),
            projection: None,
            sort: Vec::new(),
            skip: None,
            limit: None,
            distinct: None,
            options: Map::new(),
        }
    }

    pub fn find(model: impl Into<String>) -> Self {
        Self::new(model, Operation::Find)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Add a filter condition on `field`.
    pub fn filter(mut self, field: impl Into<String>, condition: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), condition.into());
        self
    }

    pub fn project(mut self, projection: Value) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn distinct(mut self, field: impl Into<String>) -> Self {
        self.operation = Operation::Distinct;
        self.distinct = Some(field.into());
        self
    }

    /// Set a store-specific option (`lean`, `collation`, ...).
    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}

impl CacheableQuery for FindQuery {
    fn cache_scope(&self) -> String {
        self.model.clone()
    }

    fn descriptor(&self) -> Value {
        let sort: Vec<Value> = self
            .sort
            .iter()
            .map(|(field, order)| json!([field, order.as_i64()]))
            .collect();

        json!({
            "model": self.model,
            "op": self.operation,
            "filter": self.filter,
            "fields": self.projection,
            "sort": sort,
            "skip": self.skip,
            "limit": self.limit,
            "distinct": self.distinct,
            "options": self.options,
        })
    }
}

// ============================================================================
// AGGREGATION PIPELINES
// ============================================================================

/// An aggregation pipeline; its stages are the whole descriptor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregatePipeline {
    stages: Vec<Value>,
}

impl AggregatePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Value) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Value] {
        &self.stages
    }
}

impl CacheableQuery for AggregatePipeline {
    fn cache_scope(&self) -> String {
        AGGREGATE_SCOPE.to_string()
    }

    fn descriptor(&self) -> Value {
        Value::Array(self.stages.clone())
    }
}
