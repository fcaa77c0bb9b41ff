//! Bounded TTL cache holding the latest result of each category.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

/// Cache entry with its own TTL.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }

    /// Expired once strictly more than `ttl` has elapsed.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.age(now) > self.ttl
    }
}

/// Result of a "force" read that ignores expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct StaleRead<V> {
    pub value: V,
    pub age: Duration,
    pub expired: bool,
}

/// Counters for operational visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    /// Absent and expired reads alike.
    pub misses: u64,
    pub inserts: u64,
    /// Entries dropped to make room (least recently used).
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed.
    pub expirations: u64,
}

struct Inner<V> {
    map: HashMap<String, CacheEntry<V>>,
    /// Least recently used at the front.
    lru: VecDeque<String>,
    metrics: CacheMetrics,
}

/// Bounded in-memory TTL cache.
///
/// Guarantees:
/// - Expiry is checked lazily on read; an expired entry reads as absent
///   through `get` but stays available to `get_stale` until evicted.
/// - `set` atomically replaces any prior entry for the key.
/// - Memory is bounded by `capacity`. Inserting a new key into a full cache
///   first drops expired entries, then the least recently used one.
pub struct CacheStore<V> {
    capacity: usize,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> CacheStore<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                lru: VecDeque::new(),
                metrics: CacheMetrics::default(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the value only while it is fresh.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let g = &mut *guard;

        let fresh = match g.map.get(key) {
            Some(e) if !e.is_expired(now) => Some(e.value.clone()),
            _ => None,
        };

        if fresh.is_some() {
            g.metrics.hits += 1;
            touch(&mut g.lru, key);
        } else {
            g.metrics.misses += 1;
        }
        fresh
    }

    /// Returns the value regardless of expiry, with its age.
    pub fn get_stale(&self, key: &str) -> Option<StaleRead<V>> {
        let now = Instant::now();
        let g = self.inner.lock();
        let read = g.map.get(key).map(|e| StaleRead {
            value: e.value.clone(),
            age: e.age(now),
            expired: e.is_expired(now),
        });
        read
    }

    /// Stores `value` stamped with the current time, replacing any prior entry.
    #[instrument(skip(self, value), target = "cache", level = "debug")]
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let g = &mut *guard;

        if !g.map.contains_key(key) && g.map.len() >= self.capacity {
            let purged = purge_expired_locked(g, now);
            if purged == 0 {
                if let Some(victim) = g.lru.pop_front() {
                    g.map.remove(&victim);
                    g.metrics.evictions += 1;
                    info!(
                        evicted_key = %victim,
                        cache_size = g.map.len(),
                        "cache capacity reached; evicted least recently used entry"
                    );
                }
            }
        }

        g.map.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                value,
                stored_at: now,
                ttl,
            },
        );
        touch(&mut g.lru, key);
        g.metrics.inserts += 1;

        debug!(cache_size = g.map.len(), "cache entry stored");
    }

    pub fn remove(&self, key: &str) -> bool {
        let mut guard = self.inner.lock();
        let g = &mut *guard;
        g.lru.retain(|k| k != key);
        g.map.remove(key).is_some()
    }

    /// Drops every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        purge_expired_locked(&mut *guard, now)
    }

    #[instrument(skip(self), target = "cache")]
    pub fn clear(&self) {
        let mut guard = self.inner.lock();
        let g = &mut *guard;
        let count = g.map.len();
        g.map.clear();
        g.lru.clear();
        info!(count, "cache cleared");
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner.lock().metrics
    }
}

fn touch(lru: &mut VecDeque<String>, key: &str) {
    lru.retain(|k| k != key);
    lru.push_back(key.to_string());
}

fn purge_expired_locked<V>(g: &mut Inner<V>, now: Instant) -> usize {
    let expired: Vec<String> = g
        .map
        .values()
        .filter(|e| e.is_expired(now))
        .map(|e| e.key.clone())
        .collect();

    for k in &expired {
        g.map.remove(k);
        g.lru.retain(|x| x != k);
    }
    g.metrics.expirations += expired.len() as u64;

    expired.len()
}
