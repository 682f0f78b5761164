//! Bounded LRU + TTL cache of recent question/answer pairs.
//!
//! The cache is an optimization only: a fault is logged and treated as a
//! miss, never surfaced to the caller, and the lock is scoped to the map
//! mutation alone so it is never held across an adapter call. There is no
//! single-flight coalescing; duplicate concurrent misses for the same key
//! each trigger their own adapter call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

use kiosk_core::{ChatResponse, ResponseCache};

struct Entry {
    response: ChatResponse,
    created_at: Instant,
    last_access: Instant,
}

impl Entry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// In-memory response cache with LRU eviction and TTL expiry.
pub struct LruResponseCache {
    inner: Mutex<HashMap<String, Entry>>,
    capacity: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LruResponseCache {
    /// Create a cache holding at most `capacity` entries, each living at
    /// most `ttl` regardless of access recency.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(map) => map.len(),
            Err(_) => 0,
        }
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counters for the stats surface.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drop expired entries. Called opportunistically; correctness does not
    /// depend on it since `lookup` checks expiry itself.
    pub fn cleanup(&self) {
        if let Ok(mut map) = self.inner.lock() {
            map.retain(|_, entry| !entry.is_expired(self.ttl));
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl ResponseCache for LruResponseCache {
    fn lookup(&self, key: &str) -> Option<ChatResponse> {
        let mut map = match self.inner.lock() {
            Ok(map) => map,
            Err(_) => {
                tracing::warn!("Response cache lock poisoned, bypassing");
                return None;
            }
        };

        let expired = match map.get(key) {
            Some(entry) => entry.is_expired(self.ttl),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            map.remove(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let entry = map.get_mut(key)?;
        entry.last_access = Instant::now();
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.response.clone())
    }

    fn store(&self, key: &str, response: &ChatResponse) {
        let mut map = match self.inner.lock() {
            Ok(map) => map,
            Err(_) => {
                tracing::warn!("Response cache lock poisoned, dropping store");
                return;
            }
        };

        if !map.contains_key(key) && map.len() >= self.capacity {
            // Evict the least-recently-accessed entry.
            let oldest = map
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                map.remove(&oldest);
            }
        }

        let now = Instant::now();
        map.insert(
            key.to_string(),
            Entry {
                response: response.clone(),
                created_at: now,
                last_access: now,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_core::{ModelId, ProviderKind};

    fn response(text: &str) -> ChatResponse {
        ChatResponse {
            text: text.to_string(),
            model_used: ModelId::new(ProviderKind::Ollama, "neural-chat"),
            latency_seconds: 0.5,
            cached: false,
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_store_then_lookup() {
        let cache = LruResponseCache::new(10, Duration::from_secs(60));
        cache.store("k1", &response("hello"));

        let hit = cache.lookup("k1").unwrap();
        assert_eq!(hit.text, "hello");
        assert!(cache.lookup("k2").is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_eviction_removes_least_recently_accessed() {
        let cache = LruResponseCache::new(2, Duration::from_secs(60));
        cache.store("a", &response("a"));
        std::thread::sleep(Duration::from_millis(5));
        cache.store("b", &response("b"));
        std::thread::sleep(Duration::from_millis(5));

        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.lookup("a").is_some());
        std::thread::sleep(Duration::from_millis(5));

        cache.store("c", &response("c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup("a").is_some());
        assert!(cache.lookup("b").is_none());
        assert!(cache.lookup("c").is_some());
    }

    #[test]
    fn test_capacity_plus_one_keeps_capacity_entries() {
        let cache = LruResponseCache::new(3, Duration::from_secs(60));
        for i in 0..4 {
            cache.store(&format!("k{i}"), &response("x"));
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(cache.len(), 3);
        // k0 was the least recently accessed before the overflow insert.
        assert!(cache.lookup("k0").is_none());
    }

    #[test]
    fn test_ttl_expiry_is_a_miss() {
        let cache = LruResponseCache::new(10, Duration::from_millis(20));
        cache.store("k1", &response("hello"));
        std::thread::sleep(Duration::from_millis(40));

        assert!(cache.lookup("k1").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = LruResponseCache::new(2, Duration::from_secs(60));
        cache.store("a", &response("a1"));
        cache.store("b", &response("b"));
        cache.store("a", &response("a2"));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("a").unwrap().text, "a2");
        assert!(cache.lookup("b").is_some());
    }

    #[test]
    fn test_cleanup_drops_expired_entries() {
        let cache = LruResponseCache::new(10, Duration::from_millis(10));
        cache.store("a", &response("a"));
        std::thread::sleep(Duration::from_millis(30));
        cache.cleanup();
        assert!(cache.is_empty());
    }
}
