//! Generic TTL-keyed cache (component C1).
//!
//! Backs the JWKS cache (C2), the discovery cache (C6), and can double as a
//! building block for a host's own response caching. Expiry is evaluated
//! lazily on access against a monotonic clock, so the cache tolerates
//! wall-clock jumps; entries are stored behind a [`DashMap`] so concurrent
//! `get`/`set` on the same key never observe a torn value.

use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// A thread-safe, per-entry TTL cache keyed by `K`.
pub struct TtlCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    default_ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    /// Create an empty cache with the given default TTL (used by [`Self::set`]
    /// callers that don't supply one explicitly via [`Self::set_with_ttl`]).
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Return the value for `key` if present and not expired; `None` otherwise.
    /// An expired entry is evicted as a side effect.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove(key);
        None
    }

    /// Insert `value` under `key` with the cache's default TTL.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert `value` under `key` with an explicit TTL.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Remove `key` unconditionally.
    pub fn delete(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries currently stored, including any not-yet-evicted
    /// expired ones (a sweep call shrinks this; `get` does not scan eagerly).
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Evict all expired entries. Callers MAY invoke this periodically;
    /// correctness never depends on it since `get` checks expiry itself.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }
}
