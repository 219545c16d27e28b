//! Query result cache
//!
//! The original workflow memoized every store fetch to disk behind a
//! transparent decorator; here the cache is an explicit collaborator the
//! pipeline consults before touching the store. Entries are keyed by the
//! full logical query (identity, bounds, columns, row cap) so a cached
//! table can never be served for a mismatched request.
//!
//! There is no TTL: the archive is append-only historical data that does
//! not go stale. A plain entry cap bounds memory, evicting the oldest
//! insertion.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::query::QuerySpec;
use crate::series::SensorTable;
use tracing::warn;

/// Default maximum number of cached per-sensor tables
const DEFAULT_MAX_ENTRIES: usize = 256;

/// Hit/miss/eviction counters
#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time view of the cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that fell through to the store
    pub misses: u64,
    /// Entries evicted by the entry cap
    pub evictions: u64,
}

struct CacheInner {
    map: HashMap<QuerySpec, SensorTable>,
    /// Insertion order, oldest first
    order: VecDeque<QuerySpec>,
}

/// Cache of normalized, resampled per-sensor tables keyed by the full
/// query tuple
pub struct QueryCache {
    inner: RwLock<CacheInner>,
    stats: CacheStats,
    max_entries: usize,
}

impl QueryCache {
    /// Cache holding at most `max_entries` tables
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            stats: CacheStats::default(),
            max_entries: max_entries.max(1),
        }
    }

    /// Look up a table for an identical query
    pub fn get(&self, spec: &QuerySpec) -> Option<SensorTable> {
        let inner = self.inner.read();
        match inner.map.get(spec) {
            Some(table) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(table.clone())
            },
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    /// Insert a table, evicting the oldest entry if the cap is reached
    pub fn insert(&self, spec: QuerySpec, table: SensorTable) {
        let mut inner = self.inner.write();
        if inner.map.contains_key(&spec) {
            inner.map.insert(spec, table);
            return;
        }
        while inner.map.len() >= self.max_entries {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.map.remove(&oldest);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            warn!(sensor = ?oldest.sensor_id, "query cache full, evicting oldest entry");
        }
        inner.order.push_back(spec.clone());
        inner.map.insert(spec, table);
    }

    /// Number of cached tables
    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counter values
    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str) -> QuerySpec {
        QuerySpec::for_sensor(id).columns(["pm25"])
    }

    fn table() -> SensorTable {
        SensorTable::new(vec!["pm25".to_string()])
    }

    #[test]
    fn hit_on_identical_spec_only() {
        let cache = QueryCache::default();
        cache.insert(spec("s1"), table());

        assert!(cache.get(&spec("s1")).is_some());
        assert!(cache.get(&spec("s2")).is_none());
        // A changed row cap is a different query.
        assert!(cache.get(&spec("s1").max_rows(10)).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn eviction_respects_entry_cap() {
        let cache = QueryCache::new(2);
        cache.insert(spec("s1"), table());
        cache.insert(spec("s2"), table());
        cache.insert(spec("s3"), table());

        assert_eq!(cache.len(), 2);
        // Oldest insertion went first.
        assert!(cache.get(&spec("s1")).is_none());
        assert!(cache.get(&spec("s2")).is_some());
        assert!(cache.get(&spec("s3")).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn reinsert_replaces_without_eviction() {
        let cache = QueryCache::new(2);
        cache.insert(spec("s1"), table());

        let mut updated = table();
        updated
            .insert_row(chrono::Utc::now(), None, vec![Some(1.0)])
            .unwrap();
        cache.insert(spec("s1"), updated.clone());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&spec("s1")).unwrap(), updated);
        assert_eq!(cache.stats().evictions, 0);
    }
}
