//! Query Result Cache
//!
//! Time-boxed store of log query results, keyed by a hash of the normalized
//! request. Repeated requests inside the TTL are answered locally instead of
//! spending remote quota.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::util::CompositeKey;
use crate::core::LogRecord;

/// Cached result set. Never mutated after insertion, only replaced.
#[derive(Debug, Clone)]
struct CacheEntry {
    records: Arc<Vec<LogRecord>>,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// Valid for exactly `[created_at, created_at + ttl)`
    fn is_live_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) < self.ttl
    }
}

/// Result cache shared by every query executor in the process
///
/// Reads take a shared lock, writes and sweeps take the exclusive lock.
/// TTLs are chosen per entry by the caller; the cache has no policy of its own.
///
/// # Example
///
/// ```rust,ignore
/// let cache = Arc::new(ResultCache::new());
/// let key = ResultCache::generate_key("search_logs", &request);
///
/// if let Some(records) = cache.get(&key) {
///     return records;
/// }
///
/// let records = store.list_entries(&query).await?;
/// cache.put(key, records, Duration::from_secs(120));
/// ```
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a fixed-length key from a scope (tool name) and the full request
    ///
    /// Structurally equal requests always map to the same key. Different
    /// requests collide only with 64-bit hash probability; a collision is a
    /// false hit, which is accepted.
    pub fn generate_key<T: Hash + ?Sized>(scope: &str, request: &T) -> String {
        let mut key = CompositeKey::with_capacity(2);
        key.push_str(scope);
        key.push(request);
        key.to_hex()
    }

    /// Get live records for `key`. Does not extend the TTL.
    pub fn get(&self, key: &str) -> Option<Arc<Vec<LogRecord>>> {
        let now = Instant::now();
        let entries = self.entries.read();

        match entries.get(key) {
            Some(entry) if entry.is_live_at(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&entry.records))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or replace the entry for `key`, stamped now
    pub fn put(
        &self,
        key: impl Into<String>,
        records: impl Into<Arc<Vec<LogRecord>>>,
        ttl: Duration,
    ) {
        let entry = CacheEntry {
            records: records.into(),
            created_at: Instant::now(),
            ttl,
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Remove a single entry
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Remove every expired entry in one locked pass. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live_at(now));
        let removed = before - entries.len();

        if removed > 0 {
            debug!("Cache sweep removed {} expired entries", removed);
        }
        removed
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> ResultCacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        ResultCacheStats {
            entries: self.len(),
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

/// Result cache statistics
#[derive(Debug, Clone)]
pub struct ResultCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}
