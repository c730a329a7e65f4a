use super::entry::CachedEntry;
use super::CacheMetrics;
use crate::dns::message::{map_record_ttls, min_positive_ttl};
use dashmap::DashMap;
use hickory_proto::op::Message;
use rustc_hash::FxBuildHasher;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use veil_dns_domain::MIN_CACHE_CAPACITY;

/// Bounded concurrent response cache, generic over the key so the client can
/// run either shared-cache (keyed by question) or independent-cache (keyed by
/// question + transport tag) without duplicating the engine.
///
/// Expiry is checked lazily on read; capacity pressure evicts a batch of the
/// least recently used entries. `now` is an explicit parameter on the read
/// and write paths so decay and expiry stay testable without sleeping.
pub struct MessageCache<K> {
    map: DashMap<K, CachedEntry, FxBuildHasher>,
    capacity: usize,
    expire: bool,
    round_robin: bool,
    /// Monotonic stamp source for LRU bookkeeping; every get/put draws one.
    access_clock: AtomicU64,
    metrics: Arc<CacheMetrics>,
}

impl<K: Eq + Hash + Clone> MessageCache<K> {
    pub fn new(capacity: u32, expire: bool, round_robin: bool) -> Self {
        let capacity = capacity.max(MIN_CACHE_CAPACITY) as usize;

        info!(capacity, expire, round_robin, "Initializing response cache");

        Self {
            map: DashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            capacity,
            expire,
            round_robin,
            access_clock: AtomicU64::new(0),
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    /// A decayed (and, when enabled, rotated) copy of the stored response
    /// plus its remaining lifetime in seconds. In non-expiring mode the
    /// remaining lifetime is always reported as 0 and record TTLs are served
    /// as stored.
    pub fn get(&self, key: &K, now: Instant) -> Option<(Message, u32)> {
        let Some(entry) = self.map.get(key) else {
            self.metrics.misses.fetch_add(1, AtomicOrdering::Relaxed);
            return None;
        };

        if self.expire && now >= entry.expires_at() {
            drop(entry);
            self.map.remove(key);
            self.metrics.misses.fetch_add(1, AtomicOrdering::Relaxed);
            return None;
        }

        entry.touch(self.access_clock.fetch_add(1, AtomicOrdering::Relaxed));
        let mut response = entry.rotated_copy(self.round_robin);
        let remaining = if self.expire {
            entry.expires_at().duration_since(now).as_secs() as u32
        } else {
            0
        };
        drop(entry);

        if self.expire {
            decay_record_ttls(&mut response, remaining);
        }
        self.metrics.hits.fetch_add(1, AtomicOrdering::Relaxed);
        Some((response, remaining))
    }

    pub fn put(&self, key: K, message: Message, ttl: u32, now: Instant) {
        // Zero-TTL responses are never cached.
        if ttl == 0 {
            return;
        }
        if self.map.len() >= self.capacity {
            self.evict_batch();
        }
        let entry = CachedEntry::new(
            message,
            now,
            ttl,
            self.access_clock.fetch_add(1, AtomicOrdering::Relaxed),
        );
        self.map.insert(key, entry);
        self.metrics.insertions.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn remove(&self, key: &K) -> bool {
        self.map.remove(key).is_some()
    }

    pub fn purge(&self) {
        self.map.clear();
        debug!("Response cache purged");
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    fn evict_batch(&self) {
        let batch = (self.capacity / 16).max(1);

        let mut candidates: Vec<(K, u64)> = Vec::with_capacity(self.map.len());
        for entry in self.map.iter() {
            candidates.push((entry.key().clone(), entry.value().last_access()));
        }
        // Iterator released — safe to take write locks below.
        candidates.sort_unstable_by_key(|(_, last_access)| *last_access);

        let mut evicted = 0u64;
        for (key, _) in candidates.into_iter().take(batch) {
            if self.map.remove(&key).is_some() {
                evicted += 1;
            }
        }

        if evicted > 0 {
            self.metrics
                .evictions
                .fetch_add(evicted, AtomicOrdering::Relaxed);
            debug!(evicted, "Evicted least recently used cache entries");
        }
    }
}

/// Age the copy's record TTLs to match the entry's remaining lifetime: when
/// the stored message had a positive minimum TTL, every record loses the
/// elapsed share; when all stored TTLs were zero, records get the remaining
/// lifetime directly.
fn decay_record_ttls(message: &mut Message, remaining: u32) {
    let origin_ttl = min_positive_ttl(message);
    if origin_ttl > 0 {
        let decay = origin_ttl.saturating_sub(remaining);
        map_record_ttls(message, |ttl| ttl.saturating_sub(decay));
    } else {
        map_record_ttls(message, |_| remaining);
    }
}
