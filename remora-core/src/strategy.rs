//! Clear strategies for bulk invalidation.
//!
//! A strategy is the cross product of three independent choices: how keys are
//! enumerated, how removal is grouped, and which removal primitive is issued.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StrategyError;

/// How the invalidator discovers keys under the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Enumeration {
    /// One blocking listing of every matching key (`KEYS`).
    FullListing,
    /// Cursor-based incremental scan (`SCAN`), one bounded page per call.
    IncrementalScan,
}

/// How removal commands are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// Everything found is removed with a single command at the end.
    Batched,
    /// One command per key, in listing order, stopping at the first failure.
    Series,
    /// One command per scanned page, issued before the next page is fetched.
    Chunked,
}

/// Which store command removes keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalPrimitive {
    Delete,
    Unlink,
}

impl RemovalPrimitive {
    /// Wire name of the store command.
    pub fn command(&self) -> &'static str {
        match self {
            RemovalPrimitive::Delete => "DEL",
            RemovalPrimitive::Unlink => "UNLINK",
        }
    }
}

/// The eight selectable bulk invalidation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ClearStrategy {
    FullDeleteBatched,
    FullDeleteSeries,
    FullUnlinkBatched,
    FullUnlinkSeries,
    ScanDeleteBatched,
    ScanDeleteChunked,
    ScanUnlinkBatched,
    #[default]
    ScanUnlinkChunked,
}

impl ClearStrategy {
    /// Every strategy, in table order.
    pub const ALL: [ClearStrategy; 8] = [
        ClearStrategy::FullDeleteBatched,
        ClearStrategy::FullDeleteSeries,
        ClearStrategy::FullUnlinkBatched,
        ClearStrategy::FullUnlinkSeries,
        ClearStrategy::ScanDeleteBatched,
        ClearStrategy::ScanDeleteChunked,
        ClearStrategy::ScanUnlinkBatched,
        ClearStrategy::ScanUnlinkChunked,
    ];

    /// Canonical kebab-case name.
    pub fn name(&self) -> &'static str {
        match self {
            ClearStrategy::FullDeleteBatched => "full-delete-batched",
            ClearStrategy::FullDeleteSeries => "full-delete-series",
            ClearStrategy::FullUnlinkBatched => "full-unlink-batched",
            ClearStrategy::FullUnlinkSeries => "full-unlink-series",
            ClearStrategy::ScanDeleteBatched => "scan-delete-batched",
            ClearStrategy::ScanDeleteChunked => "scan-delete-chunked",
            ClearStrategy::ScanUnlinkBatched => "scan-unlink-batched",
            ClearStrategy::ScanUnlinkChunked => "scan-unlink-chunked",
        }
    }

    /// Camel-case name accepted for compatibility with older configuration files.
    pub fn legacy_name(&self) -> &'static str {
        match self {
            ClearStrategy::FullDeleteBatched => "delAll",
            ClearStrategy::FullDeleteSeries => "delSeries",
            ClearStrategy::FullUnlinkBatched => "unlinkAll",
            ClearStrategy::FullUnlinkSeries => "unlinkSeries",
            ClearStrategy::ScanDeleteBatched => "scanDelAll",
            ClearStrategy::ScanDeleteChunked => "scanDelChunks",
            ClearStrategy::ScanUnlinkBatched => "scanUnlinkAll",
            ClearStrategy::ScanUnlinkChunked => "scanUnlinkChunks",
        }
    }

    pub fn enumeration(&self) -> Enumeration {
        match self {
            ClearStrategy::FullDeleteBatched
            | ClearStrategy::FullDeleteSeries
            | ClearStrategy::FullUnlinkBatched
            | ClearStrategy::FullUnlinkSeries => Enumeration::FullListing,
            _ => Enumeration::IncrementalScan,
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            ClearStrategy::FullDeleteBatched
            | ClearStrategy::FullUnlinkBatched
            | ClearStrategy::ScanDeleteBatched
            | ClearStrategy::ScanUnlinkBatched => Granularity::Batched,
            ClearStrategy::FullDeleteSeries | ClearStrategy::FullUnlinkSeries => {
                Granularity::Series
            }
            ClearStrategy::ScanDeleteChunked | ClearStrategy::ScanUnlinkChunked => {
                Granularity::Chunked
            }
        }
    }

    pub fn primitive(&self) -> RemovalPrimitive {
        match self {
            ClearStrategy::FullDeleteBatched
            | ClearStrategy::FullDeleteSeries
            | ClearStrategy::ScanDeleteBatched
            | ClearStrategy::ScanDeleteChunked => RemovalPrimitive::Delete,
            _ => RemovalPrimitive::Unlink,
        }
    }

    /// Quoted, comma-separated list of canonical names for error messages.
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(|s| format!("'{}'", s.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ClearStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClearStrategy {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.name() == s || strategy.legacy_name() == s)
            .ok_or_else(|| StrategyError::Unknown {
                name: s.to_string(),
                available: Self::available(),
            })
    }
}

impl TryFrom<String> for ClearStrategy {
    type Error = StrategyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClearStrategy> for String {
    fn from(strategy: ClearStrategy) -> Self {
        strategy.name().to_string()
    }
}
