//! TTL memoization cache
//!
//! Derived dashboard metrics are cheap to recompute but requested in
//! bursts, so repeated derivations within a short window are served from
//! an in-process cache. Entries are immutable JSON snapshots keyed by the
//! operation name plus its semantic parameters; staleness is detected
//! lazily at lookup time and capacity is bounded by evicting the single
//! oldest-written entry.
//!
//! There is no request coalescing: two concurrent misses on the same key
//! may both compute, and the second write overwrites the first. The
//! computations are side-effect-free, so this costs time, not
//! correctness.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;

/// Default TTL for dashboard derivations
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Default resident-entry ceiling
pub const DEFAULT_CAPACITY: usize = 100;

/// Deterministic cache key: operation name plus canonicalized named
/// arguments. Argument order at the call site does not matter; the
/// BTreeMap renders them sorted by name.
#[derive(Debug, Clone)]
pub struct CacheKey {
    operation: &'static str,
    args: BTreeMap<&'static str, String>,
}

impl CacheKey {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            args: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.args.insert(name, value.to_string());
        self
    }

    fn render(&self) -> String {
        if self.args.is_empty() {
            return self.operation.to_string();
        }
        let args: Vec<String> = self
            .args
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        format!("{}?{}", self.operation, args.join("&"))
    }
}

struct CacheEntry {
    value: Value,
    created_at: Instant,
}

/// Bounded TTL cache over immutable JSON value snapshots.
///
/// All bookkeeping, including the `compute` call on a miss, runs under
/// one exclusive critical section; independent keys serialize through
/// the same lock. Acceptable at dashboard request volume.
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    capacity: usize,
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TtlCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Serve `key` from cache when a fresh entry exists, otherwise run
    /// `compute`, snapshot its result, and return it.
    ///
    /// Errors from `compute` propagate unmodified and leave no entry, so
    /// the next call retries instead of replaying a failure.
    pub fn get_or_compute<T, F>(&self, key: &CacheKey, ttl: Duration, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        let rendered = key.render();
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        if let Some(entry) = entries.get(&rendered) {
            if entry.created_at.elapsed() < ttl {
                debug!(key = %rendered, "cache hit");
                return Ok(serde_json::from_value(entry.value.clone())?);
            }
            // Stale: drop lazily before recomputing
            entries.remove(&rendered);
        }

        debug!(key = %rendered, "cache miss, computing");
        let result = compute()?;
        let snapshot = serde_json::to_value(&result)?;
        entries.insert(
            rendered,
            CacheEntry {
                value: snapshot,
                created_at: Instant::now(),
            },
        );

        if entries.len() > self.capacity {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            {
                debug!(key = %oldest, "evicting oldest cache entry");
                entries.remove(&oldest);
            }
        }

        Ok(result)
    }

    /// Resident entry count (stale entries included until touched).
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }
}
