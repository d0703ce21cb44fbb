//! Bulk invalidation of every key under the namespace.
//!
//! Full-listing strategies fetch all keys with one blocking `KEYS` call.
//! Scanning strategies walk the namespace with `SCAN` and either remove each
//! page before fetching the next (chunked) or remove everything once the
//! cursor signals completion (batched).
//!
//! Invalidation is at-least-once and not atomic. The first store failure
//! aborts the clear; keys removed by earlier commands stay removed. Keys
//! written by other clients while a scan is running may be missed.

use remora_core::{ClearStrategy, Enumeration, Granularity, RemoraResult, RemovalPrimitive};
use tracing::{info, warn};

use super::adapter::CacheStore;
use crate::store::{KeyValueStore, ScanCursor};

/// Traffic issued by one clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearReport {
    pub strategy: ClearStrategy,
    /// Keys reported by enumeration, counting duplicates across pages.
    pub keys_found: usize,
    /// Keys the store reported as removed.
    pub keys_removed: u64,
    /// `KEYS` or `SCAN` calls issued.
    pub enumeration_calls: usize,
    /// `DEL` or `UNLINK` calls issued.
    pub removal_calls: usize,
}

impl ClearReport {
    fn new(strategy: ClearStrategy) -> Self {
        Self {
            strategy,
            keys_found: 0,
            keys_removed: 0,
            enumeration_calls: 0,
            removal_calls: 0,
        }
    }
}

/// States of a scanning clear. Any store failure leaves the loop with an error.
enum ScanState {
    Scanning(ScanCursor),
    Removing {
        keys: Vec<String>,
        resume: Option<ScanCursor>,
    },
    Done,
}

impl<S> CacheStore<S>
where
    S: KeyValueStore,
{
    /// Remove every entry under the namespace using the configured strategy.
    pub async fn clear(&self) -> RemoraResult<ClearReport> {
        self.clear_using(self.strategy()).await
    }

    /// Clear with a strategy selected by name at call time.
    ///
    /// Fails with a strategy error if the name is not recognized.
    pub async fn clear_named(&self, name: &str) -> RemoraResult<ClearReport> {
        let strategy: ClearStrategy = name.parse()?;
        self.clear_using(strategy).await
    }

    /// Clear with an explicit strategy, overriding the configured one.
    pub async fn clear_using(&self, strategy: ClearStrategy) -> RemoraResult<ClearReport> {
        let mut report = ClearReport::new(strategy);

        let outcome = match strategy.enumeration() {
            Enumeration::FullListing => self.clear_listed(strategy, &mut report).await,
            Enumeration::IncrementalScan => self.clear_scanned(strategy, &mut report).await,
        };

        match outcome {
            Ok(()) => {
                info!(
                    namespace = %self.namespace(),
                    strategy = %strategy,
                    keys_found = report.keys_found,
                    keys_removed = report.keys_removed,
                    enumeration_calls = report.enumeration_calls,
                    removal_calls = report.removal_calls,
                    "cache namespace cleared"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(
                    namespace = %self.namespace(),
                    strategy = %strategy,
                    keys_removed = report.keys_removed,
                    error = %e,
                    "cache clear failed, entries removed before the failure stay removed"
                );
                Err(e)
            }
        }
    }

    async fn clear_listed(
        &self,
        strategy: ClearStrategy,
        report: &mut ClearReport,
    ) -> RemoraResult<()> {
        let keys = self.list_keys().await?;
        report.enumeration_calls += 1;
        report.keys_found = keys.len();

        let primitive = strategy.primitive();
        match strategy.granularity() {
            Granularity::Series => {
                for key in keys {
                    self.remove_counted(primitive, std::slice::from_ref(&key), report)
                        .await?;
                }
            }
            Granularity::Batched | Granularity::Chunked => {
                self.remove_counted(primitive, &keys, report).await?;
            }
        }
        Ok(())
    }

    async fn clear_scanned(
        &self,
        strategy: ClearStrategy,
        report: &mut ClearReport,
    ) -> RemoraResult<()> {
        let primitive = strategy.primitive();
        let chunked = strategy.granularity() == Granularity::Chunked;
        let mut accumulated: Vec<String> = Vec::new();
        let mut state = ScanState::Scanning(ScanCursor::start());

        loop {
            state = match state {
                ScanState::Scanning(cursor) => {
                    let page = self.scan_page(&cursor).await?;
                    report.enumeration_calls += 1;
                    report.keys_found += page.keys.len();

                    let resume = (!page.cursor.is_complete()).then_some(page.cursor);
                    if chunked && !page.keys.is_empty() {
                        ScanState::Removing {
                            keys: page.keys,
                            resume,
                        }
                    } else {
                        accumulated.extend(page.keys);
                        match resume {
                            Some(cursor) => ScanState::Scanning(cursor),
                            None if accumulated.is_empty() => ScanState::Done,
                            None => ScanState::Removing {
                                keys: std::mem::take(&mut accumulated),
                                resume: None,
                            },
                        }
                    }
                }
                ScanState::Removing { keys, resume } => {
                    self.remove_counted(primitive, &keys, report).await?;
                    match resume {
                        Some(cursor) => ScanState::Scanning(cursor),
                        None => ScanState::Done,
                    }
                }
                ScanState::Done => return Ok(()),
            };
        }
    }

    async fn remove_counted(
        &self,
        primitive: RemovalPrimitive,
        keys: &[String],
        report: &mut ClearReport,
    ) -> RemoraResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        report.keys_removed += self.remove_physical(primitive, keys).await?;
        report.removal_calls += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Command, CommandKind, InMemoryStore};
    use remora_core::{RemoraConfig, RemoraError, StoreError, StrategyError, Ttl};
    use serde_json::Value;
    use std::sync::Arc;

    async fn seeded(
        strategy: ClearStrategy,
        chunk: usize,
        n: usize,
    ) -> (Arc<InMemoryStore>, CacheStore<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let config = RemoraConfig::new().with_strategy(strategy).with_chunk(chunk);
        let cache = CacheStore::new(Arc::clone(&store), config).unwrap();
        for i in 0..n {
            cache.set(&format!("k{}", i), &i, Ttl::Seconds(120)).await.unwrap();
        }
        store.reset_log();
        (store, cache)
    }

    #[tokio::test]
    async fn test_every_strategy_empties_the_namespace() {
        for strategy in ClearStrategy::ALL {
            let (store, cache) = seeded(strategy, 3, 10).await;
            store.set("other:keep", "1").await.unwrap();

            let report = cache.clear().await.unwrap();
            assert_eq!(report.strategy, strategy);
            assert_eq!(report.keys_removed, 10, "{}", strategy);
            for i in 0..10 {
                let key = format!("k{}", i);
                assert_eq!(cache.get::<Value>(&key).await.unwrap(), None, "{}", strategy);
            }
            assert_eq!(store.get("other:keep").await.unwrap().as_deref(), Some("1"));
        }
    }

    #[tokio::test]
    async fn test_empty_namespace_is_a_noop() {
        for strategy in ClearStrategy::ALL {
            let (store, cache) = seeded(strategy, 2, 0).await;
            let report = cache.clear().await.unwrap();
            assert_eq!(report.keys_removed, 0);
            assert_eq!(report.removal_calls, 0);
            assert_eq!(store.command_count(CommandKind::Del), 0);
            assert_eq!(store.command_count(CommandKind::Unlink), 0);
        }
    }

    #[tokio::test]
    async fn test_full_batched_issues_one_listing_and_one_removal() {
        let (store, cache) = seeded(ClearStrategy::FullDeleteBatched, 2, 4).await;
        cache.clear().await.unwrap();

        let log = store.command_log();
        assert_eq!(log.len(), 2);
        assert_eq!(
            log[0],
            Command::Keys {
                pattern: "cache*".to_string()
            }
        );
        assert!(matches!(&log[1], Command::Del { keys } if keys.len() == 4));
    }

    #[tokio::test]
    async fn test_full_series_removes_one_key_per_command() {
        let (store, cache) = seeded(ClearStrategy::FullUnlinkSeries, 2, 4).await;
        let report = cache.clear().await.unwrap();

        assert_eq!(report.removal_calls, 4);
        assert_eq!(store.command_count(CommandKind::Unlink), 4);
        for command in store.command_log().iter().skip(1) {
            assert!(matches!(command, Command::Unlink { keys } if keys.len() == 1));
        }
    }

    #[tokio::test]
    async fn test_full_series_stops_at_first_failure() {
        let (store, cache) = seeded(ClearStrategy::FullDeleteSeries, 2, 5).await;
        store.fail_on_after(CommandKind::Del, 2);

        let err = cache.clear().await.unwrap_err();
        assert!(matches!(err, RemoraError::Store(StoreError::Transport { .. })));
        assert_eq!(store.command_count(CommandKind::Del), 3);
        // No rollback: the two successful removals stick.
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_scan_chunked_removes_between_pages() {
        let (store, cache) = seeded(ClearStrategy::ScanUnlinkChunked, 2, 5).await;
        let report = cache.clear().await.unwrap();

        let kinds: Vec<CommandKind> = store.command_log().iter().map(Command::kind).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::Scan,
                CommandKind::Unlink,
                CommandKind::Scan,
                CommandKind::Unlink,
                CommandKind::Scan,
                CommandKind::Unlink,
            ]
        );
        assert_eq!(report.enumeration_calls, 3);
        assert_eq!(report.removal_calls, 3);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_scan_batched_removes_once_at_the_end() {
        let (store, cache) = seeded(ClearStrategy::ScanDeleteBatched, 2, 5).await;
        let report = cache.clear().await.unwrap();

        let log = store.command_log();
        let scans = log.iter().filter(|c| c.kind() == CommandKind::Scan).count();
        assert_eq!(scans, 3);
        assert!(matches!(log.last(), Some(Command::Del { keys }) if keys.len() == 5));
        assert_eq!(report.removal_calls, 1);
        assert_eq!(report.keys_found, 5);
    }

    #[tokio::test]
    async fn test_scan_uses_chunk_as_count_hint() {
        let (store, cache) = seeded(ClearStrategy::ScanUnlinkBatched, 7, 1).await;
        cache.clear().await.unwrap();
        assert_eq!(
            store.command_log()[0],
            Command::Scan {
                cursor: "0".to_string(),
                pattern: "cache*".to_string(),
                count: 7,
            }
        );
    }

    #[tokio::test]
    async fn test_scan_failure_mid_clear_keeps_removed_chunks() {
        let (store, cache) = seeded(ClearStrategy::ScanDeleteChunked, 2, 6).await;
        store.fail_on_after(CommandKind::Scan, 1);

        let err = cache.clear().await.unwrap_err();
        assert!(matches!(err, RemoraError::Store(_)));
        assert_eq!(store.command_count(CommandKind::Del), 1);
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_batched_removal_failure_fails_the_clear() {
        let (store, cache) = seeded(ClearStrategy::ScanUnlinkBatched, 2, 3).await;
        store.fail_on(CommandKind::Unlink);

        assert!(cache.clear().await.is_err());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_clear_named() {
        let (store, cache) = seeded(ClearStrategy::ScanUnlinkChunked, 2, 3).await;

        let err = cache.clear_named("truncate").await.unwrap_err();
        assert!(matches!(err, RemoraError::Strategy(StrategyError::Unknown { .. })));
        assert!(store.command_log().is_empty());

        let report = cache.clear_named("delAll").await.unwrap();
        assert_eq!(report.strategy, ClearStrategy::FullDeleteBatched);
        assert!(store.is_empty());
    }
}
