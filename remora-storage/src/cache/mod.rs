//! Namespaced query cache.
//!
//! [`CacheStore`] binds a [`KeyValueStore`](crate::store::KeyValueStore) to
//! one prefix and handles value encoding and TTLs. The bulk invalidator in
//! [`clear`] removes every key under that prefix with one of eight traffic
//! shapes. [`QueryCache`] is the wrapper a query layer calls to run a query
//! through the cache.
//!
//! # Example
//!
//! ```ignore
//! let cache = QueryCache::new(CacheStore::new(store, RemoraConfig::default())?);
//! let users: Vec<User> = cache
//!     .execute_with_cache(&FindQuery::find("User"), &CacheOptions::enabled(), || run(query))
//!     .await?;
//! cache.clear().await?;
//! ```

pub mod adapter;
pub mod clear;
pub mod query;

pub use adapter::CacheStore;
pub use clear::ClearReport;
pub use query::{CacheStats, QueryCache};
