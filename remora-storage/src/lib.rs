//! remora storage - store adapter, bulk invalidation and query wrapper
//!
//! Builds the cache engine on the types in `remora-core`:
//! - [`store`]: the key-value seam, an in-memory store and an optional Redis store
//! - [`cache`]: the namespaced adapter, the clear strategies and the query wrapper

pub mod cache;
pub mod store;

pub use cache::{CacheStats, CacheStore, ClearReport, QueryCache};
pub use store::{Command, CommandKind, InMemoryStore, KeyValueStore, ScanCursor, ScanPage};

#[cfg(feature = "redis")]
pub use store::RedisStore;
