//! An LRU cache with per-entry TTL for search results, keyed on the query
//! text plus `top_k`, so repeated lookups for the same finding (common
//! when the orchestrator processes several contracts that trip the same
//! pattern) don't re-run embedding and similarity search.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::types::ScoredDocument;

pub const DEFAULT_CAPACITY: usize = 256;
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CacheEntry {
    value: Vec<ScoredDocument>,
    inserted_at: Instant,
}

struct Inner {
    map: FxHashMap<String, CacheEntry>,
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

/// A thread-safe LRU+TTL cache for search results.
pub struct SearchCache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}

/// A point-in-time snapshot of cache effectiveness.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

impl SearchCache {
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map: FxHashMap::default(),
                order: VecDeque::new(),
                hits: 0,
                misses: 0,
            }),
            capacity: capacity.max(1),
            ttl,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<ScoredDocument>> {
        let mut inner = self.inner.lock();
        let expired = inner
            .map
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() > self.ttl);
        if expired {
            inner.map.remove(key);
            inner.order.retain(|k| k != key);
        }

        if let Some(entry) = inner.map.get(key) {
            let value = entry.value.clone();
            inner.hits += 1;
            inner.order.retain(|k| k != key);
            inner.order.push_back(key.to_string());
            Some(value)
        } else {
            inner.misses += 1;
            None
        }
    }

    pub fn put(&self, key: String, value: Vec<ScoredDocument>) {
        let mut inner = self.inner.lock();
        if inner.map.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        } else if inner.map.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
            }
        }
        inner.order.push_back(key.clone());
        inner.map.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            len: inner.map.len(),
            capacity: self.capacity,
        }
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

/// Builds a stable cache key from a query and top-k, so two calls with the
/// same inputs always hit or miss consistently.
#[must_use]
pub fn cache_key(query: &str, top_k: usize) -> String {
    format!("{top_k}:{query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VulnerabilityDocument;

    fn doc(id: &str) -> ScoredDocument {
        ScoredDocument {
            document: VulnerabilityDocument {
                id: id.to_string(),
                title: "t".into(),
                taxonomy_ids: vec![],
                summary: "s".into(),
                detail: "d".into(),
                remediation: "r".into(),
                tags: vec![],
            },
            score: 0.5,
        }
    }

    #[test]
    fn put_then_get_hits() {
        let cache = SearchCache::new(4, Duration::from_secs(60));
        cache.put("k".to_string(), vec![doc("d1")]);
        assert!(cache.get("k").is_some());
        assert_eq!(cache.cache_stats().hits, 1);
    }

    #[test]
    fn missing_key_is_a_miss() {
        let cache = SearchCache::new(4, Duration::from_secs(60));
        assert!(cache.get("nope").is_none());
        assert_eq!(cache.cache_stats().misses, 1);
    }

    #[test]
    fn expired_entry_is_treated_as_a_miss() {
        let cache = SearchCache::new(4, Duration::from_millis(1));
        cache.put("k".to_string(), vec![doc("d1")]);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn capacity_overflow_evicts_least_recently_used() {
        let cache = SearchCache::new(2, Duration::from_secs(60));
        cache.put("a".to_string(), vec![doc("a")]);
        cache.put("b".to_string(), vec![doc("b")]);
        cache.put("c".to_string(), vec![doc("c")]);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }
}
