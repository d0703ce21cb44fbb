//! In-process key-value store.
//!
//! Keeps entries in a sorted map so that scans can resume from the last key
//! examined: deleting keys that were already returned never makes a later
//! page skip anything, while keys inserted behind the cursor are not seen.
//! Every command is recorded so tests can assert traffic patterns, and any
//! command kind can be made to fail.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use remora_core::StoreError;
use tokio::time::Instant;

use super::glob::glob_match;
use super::{KeyValueStore, ScanCursor, ScanPage};

/// Command kinds understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Get,
    Set,
    SetEx,
    Del,
    Unlink,
    Keys,
    Scan,
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Get => "GET",
            CommandKind::Set => "SET",
            CommandKind::SetEx => "SETEX",
            CommandKind::Del => "DEL",
            CommandKind::Unlink => "UNLINK",
            CommandKind::Keys => "KEYS",
            CommandKind::Scan => "SCAN",
        }
    }
}

/// A recorded command with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { key: String },
    Set { key: String },
    SetEx { key: String, seconds: u64 },
    Del { keys: Vec<String> },
    Unlink { keys: Vec<String> },
    Keys { pattern: String },
    Scan { cursor: String, pattern: String, count: usize },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Get { .. } => CommandKind::Get,
            Command::Set { .. } => CommandKind::Set,
            Command::SetEx { .. } => CommandKind::SetEx,
            Command::Del { .. } => CommandKind::Del,
            Command::Unlink { .. } => CommandKind::Unlink,
            Command::Keys { .. } => CommandKind::Keys,
            Command::Scan { .. } => CommandKind::Scan,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Thread-safe in-memory store with TTL expiry.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, Entry>>,
    log: RwLock<Vec<Command>>,
    /// Remaining successful calls per command kind before failures start.
    failures: RwLock<HashMap<CommandKind, usize>>,
}

fn poisoned(kind: CommandKind) -> StoreError {
    StoreError::transport(kind.name(), "store lock poisoned")
}

fn encode_cursor(key: &str) -> ScanCursor {
    ScanCursor::new(format!("c{}", hex::encode(key)))
}

fn decode_cursor(cursor: &ScanCursor) -> Result<Option<String>, StoreError> {
    if cursor.is_complete() {
        return Ok(None);
    }
    let invalid = || StoreError::Protocol {
        command: "SCAN".to_string(),
        reason: format!("invalid cursor '{}'", cursor.as_str()),
    };
    let encoded = cursor.as_str().strip_prefix('c').ok_or_else(invalid)?;
    let bytes = hex::decode(encoded).map_err(|_| invalid())?;
    String::from_utf8(bytes).map(Some).map_err(|_| invalid())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `kind` command from now on.
    pub fn fail_on(&self, kind: CommandKind) {
        self.fail_on_after(kind, 0);
    }

    /// Let `successes` more `kind` commands succeed, then fail the rest.
    pub fn fail_on_after(&self, kind: CommandKind, successes: usize) {
        if let Ok(mut failures) = self.failures.write() {
            failures.insert(kind, successes);
        }
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        if let Ok(mut failures) = self.failures.write() {
            failures.clear();
        }
    }

    /// Every command received so far, in order.
    pub fn command_log(&self) -> Vec<Command> {
        self.log.read().map(|log| log.clone()).unwrap_or_default()
    }

    /// Number of recorded commands of one kind.
    pub fn command_count(&self, kind: CommandKind) -> usize {
        self.log
            .read()
            .map(|log| log.iter().filter(|c| c.kind() == kind).count())
            .unwrap_or(0)
    }

    pub fn reset_log(&self) {
        if let Ok(mut log) = self.log.write() {
            log.clear();
        }
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .map(|entries| entries.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining lifetime of a live key, `None` if absent or without expiry.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key).filter(|e| e.is_live(now))?;
        entry.expires_at.map(|at| at.saturating_duration_since(now))
    }

    /// Log the command, then apply any injected failure for its kind.
    fn record(&self, command: Command) -> Result<(), StoreError> {
        let kind = command.kind();
        self.log.write().map_err(|_| poisoned(kind))?.push(command);

        let mut failures = self.failures.write().map_err(|_| poisoned(kind))?;
        if let Some(remaining) = failures.get_mut(&kind) {
            if *remaining == 0 {
                return Err(StoreError::transport(kind.name(), "injected failure"));
            }
            *remaining -= 1;
        }
        Ok(())
    }

    fn write(
        &self,
        kind: CommandKind,
        key: &str,
        value: &str,
        expires_at: Option<Instant>,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| poisoned(kind))?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    /// Drop every expired entry.
    fn purge_expired(&self, kind: CommandKind) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().map_err(|_| poisoned(kind))?;
        entries.retain(|_, entry| entry.is_live(now));
        Ok(())
    }

    fn remove(&self, kind: CommandKind, keys: &[String]) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().map_err(|_| poisoned(kind))?;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if entry.is_live(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.record(Command::Get {
            key: key.to_string(),
        })?;
        let now = Instant::now();
        let entries = self.entries.read().map_err(|_| poisoned(CommandKind::Get))?;
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.record(Command::Set {
            key: key.to_string(),
        })?;
        self.write(CommandKind::Set, key, value, None)
    }

    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), StoreError> {
        self.record(Command::SetEx {
            key: key.to_string(),
            seconds,
        })?;
        // A lifetime past the clock's range never expires.
        let expires_at = Instant::now().checked_add(Duration::from_secs(seconds));
        self.write(CommandKind::SetEx, key, value, expires_at)
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        self.record(Command::Del {
            keys: keys.to_vec(),
        })?;
        self.remove(CommandKind::Del, keys)
    }

    async fn unlink(&self, keys: &[String]) -> Result<u64, StoreError> {
        self.record(Command::Unlink {
            keys: keys.to_vec(),
        })?;
        self.remove(CommandKind::Unlink, keys)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.record(Command::Keys {
            pattern: pattern.to_string(),
        })?;
        self.purge_expired(CommandKind::Keys)?;
        let now = Instant::now();
        let entries = self.entries.read().map_err(|_| poisoned(CommandKind::Keys))?;
        Ok(entries
            .iter()
            .filter(|(key, entry)| entry.is_live(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn scan(
        &self,
        cursor: &ScanCursor,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        self.record(Command::Scan {
            cursor: cursor.as_str().to_string(),
            pattern: pattern.to_string(),
            count,
        })?;

        let lower = match decode_cursor(cursor)? {
            Some(last) => Bound::Excluded(last),
            None => Bound::Unbounded,
        };

        self.purge_expired(CommandKind::Scan)?;
        let now = Instant::now();
        let entries = self.entries.read().map_err(|_| poisoned(CommandKind::Scan))?;
        let mut iter = entries.range((lower, Bound::Unbounded)).peekable();

        // COUNT bounds the work per call, not the number of matches.
        let mut keys = Vec::new();
        let mut last = None;
        for _ in 0..count.max(1) {
            let Some((key, entry)) = iter.next() else {
                break;
            };
            if entry.is_live(now) && glob_match(pattern, key) {
                keys.push(key.clone());
            }
            last = Some(key);
        }

        let cursor = match (iter.peek(), last) {
            (Some(_), Some(last)) => encode_cursor(last),
            _ => ScanCursor::start(),
        };

        Ok(ScanPage { cursor, keys })
    }
}
