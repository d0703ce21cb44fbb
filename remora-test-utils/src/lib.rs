//! remora test utilities
//!
//! Shared test infrastructure for the remora workspace:
//! - Proptest generators for descriptors, keys and configuration
//! - Fixtures for common cache scenarios
//! - Assertions on `RemoraResult` error variants

pub use remora_core::{
    canonicalize, derive_key, AggregatePipeline, CacheKey, CacheOptions, ClearStrategy,
    ConfigError, FindQuery, Operation, Pattern, RemoraConfig, RemoraError, RemoraResult,
    SortOrder, StoreError, StrategyError, Ttl,
};

use serde_json::{Map, Value};

/// Rebuild `value` with every mapping's keys inserted in reverse order.
///
/// Sequences keep their order. The result is equal to the input as a JSON
/// document but serializes with a different key order whenever a mapping has
/// more than one key.
pub fn reverse_key_order(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut reversed = Map::with_capacity(map.len());
            for (key, inner) in map.iter().rev() {
                reversed.insert(key.clone(), reverse_key_order(inner));
            }
            Value::Object(reversed)
        }
        Value::Array(items) => Value::Array(items.iter().map(reverse_key_order).collect()),
        scalar => scalar.clone(),
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for remora types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a JSON scalar, including the falsy ones.
    ///
    /// Floats are multiples of 1/8 so that their decimal text parses back to
    /// the same value.
    pub fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            (-8_000_000i64..8_000_000).prop_map(|n| Value::from(n as f64 / 8.0)),
            "[a-z0-9 ]{0,12}".prop_map(Value::String),
        ]
    }

    /// Generate a field name.
    pub fn arb_field() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9_]{0,8}"
    }

    /// Generate a nested JSON document.
    pub fn arb_json() -> impl Strategy<Value = Value> {
        arb_scalar().prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::vec((arb_field(), inner), 0..6)
                    .prop_map(|entries| Value::Object(entries.into_iter().collect())),
            ]
        })
    }

    /// Generate a mapping-rooted descriptor.
    pub fn arb_descriptor() -> impl Strategy<Value = Value> {
        prop::collection::vec((arb_field(), arb_json()), 1..8)
            .prop_map(|entries| Value::Object(entries.into_iter().collect()))
    }

    /// Generate a clear strategy.
    pub fn arb_strategy() -> impl Strategy<Value = ClearStrategy> {
        prop::sample::select(ClearStrategy::ALL.to_vec())
    }

    /// Generate a valid chunk size.
    pub fn arb_chunk() -> impl Strategy<Value = usize> {
        2usize..16
    }

    /// Generate a TTL in seconds, covering the no-expiry sentinel.
    pub fn arb_ttl_secs() -> impl Strategy<Value = i64> {
        prop_oneof![Just(0i64), Just(-1i64), 1i64..86_400]
    }

    /// Generate a logical cache key.
    pub fn arb_logical_key() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9]{0,6}:[a-z0-9]{1,10}"
    }

    /// Generate a valid configuration.
    pub fn arb_valid_config() -> impl Strategy<Value = RemoraConfig> {
        ("[a-z]{1,8}", 60i64..3_600, arb_strategy(), arb_chunk()).prop_map(
            |(prefix, ttl, strategy, chunk)| {
                RemoraConfig::new()
                    .with_prefix(prefix)
                    .with_ttl(ttl)
                    .with_strategy(strategy)
                    .with_chunk(chunk)
            },
        )
    }

    /// Generate a find query over a small model vocabulary.
    pub fn arb_find_query() -> impl Strategy<Value = FindQuery> {
        (
            prop::sample::select(vec!["User", "Team", "Order"]),
            prop::collection::vec((arb_field(), arb_scalar()), 0..4),
            prop::option::of(1u64..100),
        )
            .prop_map(|(model, filter, limit)| {
                let mut query = FindQuery::find(model);
                for (field, condition) in filter {
                    query = query.filter(field, condition);
                }
                match limit {
                    Some(limit) => query.limit(limit),
                    None => query,
                }
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common cache scenarios.

    use super::*;
    use serde_json::json;

    /// Configuration with the given strategy and chunk, defaults otherwise.
    pub fn config_with(strategy: ClearStrategy, chunk: usize) -> RemoraConfig {
        RemoraConfig::new().with_strategy(strategy).with_chunk(chunk)
    }

    /// A descriptor with nested mappings, a sequence and a pattern.
    pub fn nested_descriptor() -> Value {
        json!({
            "model": "User",
            "op": "find",
            "filter": {
                "age": {"$gte": 18, "$lt": 65},
                "name": Value::from(Pattern::new("^ad", "i")),
            },
            "sort": [["age", -1], ["name", 1]],
            "limit": 10,
        })
    }

    /// Active users sorted by name.
    pub fn active_users() -> FindQuery {
        FindQuery::find("User")
            .filter("active", true)
            .sort("name", SortOrder::Ascending)
    }

    /// Order totals grouped by customer.
    pub fn order_totals() -> AggregatePipeline {
        AggregatePipeline::new()
            .stage(json!({"$match": {"status": "paid"}}))
            .stage(json!({"$group": {"_id": "$customer", "total": {"$sum": "$amount"}}}))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on remora error variants.

    use super::*;

    /// Assert that a RemoraResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &RemoraResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a RemoraResult is a Store error.
    #[track_caller]
    pub fn assert_store_error<T: std::fmt::Debug>(result: &RemoraResult<T>) {
        match result {
            Err(RemoraError::Store(_)) => {}
            other => panic!("Expected Store error, got: {:?}", other),
        }
    }

    /// Assert that a RemoraResult is a Transport store error for `command`.
    #[track_caller]
    pub fn assert_transport_error<T: std::fmt::Debug>(result: &RemoraResult<T>, command: &str) {
        match result {
            Err(RemoraError::Store(StoreError::Transport { command: c, .. })) => {
                assert_eq!(c, command, "Wrong command in Transport error");
            }
            other => panic!("Expected Transport error for {}, got: {:?}", command, other),
        }
    }

    /// Assert that a RemoraResult is a Config error on `field`.
    #[track_caller]
    pub fn assert_invalid_field<T: std::fmt::Debug>(result: &RemoraResult<T>, field: &str) {
        match result {
            Err(RemoraError::Config(ConfigError::InvalidValue { field: f, .. })) => {
                assert_eq!(f, field, "Wrong field in InvalidValue error");
            }
            other => panic!("Expected InvalidValue for {}, got: {:?}", field, other),
        }
    }

    /// Assert that a RemoraResult is an unknown-strategy error.
    #[track_caller]
    pub fn assert_unknown_strategy<T: std::fmt::Debug>(result: &RemoraResult<T>) {
        match result {
            Err(RemoraError::Strategy(StrategyError::Unknown { .. })) => {}
            other => panic!("Expected Unknown strategy error, got: {:?}", other),
        }
    }
}
