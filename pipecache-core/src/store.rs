// Copyright 2025 Pipecache (https://github.com/pipecache)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Bounded entry store for a single cache tier
//!
//! TTL-aware key-value storage with LRU eviction. Expired entries are
//! removed lazily on the next access rather than by a sweeper thread.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A single cached value with expiry and access-frequency metadata
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached payload; opaque to the store
    pub value: V,
    /// Absolute expiry; the entry is never returned past this point
    pub expires_at: Instant,
    /// Reads served since the value was written
    pub access_count: u32,
    /// Insertion order, used as the LRU tie-break
    inserted_seq: u64,
    /// Recency of last get/put, primary LRU key
    touched_seq: u64,
}

impl<V> CacheEntry<V> {
    /// Whether the entry has passed its expiry
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Bounded key-value storage for one tier.
///
/// Not internally synchronized; callers wrap the store in a lock so that
/// an entry's fields are always updated as a unit.
#[derive(Debug)]
pub struct EntryStore<V> {
    entries: HashMap<String, CacheEntry<V>>,
    capacity: usize,
    seq: u64,
}

impl<V: Clone> EntryStore<V> {
    /// Create a store holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            seq: 0,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Insert or overwrite an entry.
    ///
    /// Overwriting resets `access_count` to 0: a new value is a new logical
    /// entry and has not yet proven demand. At capacity the least-recently
    /// used entry is evicted first; ties on recency evict the entry inserted
    /// first. Never fails.
    pub fn put(&mut self, key: &str, value: V, ttl: Duration) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        let seq = self.next_seq();
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
                access_count: 0,
                inserted_seq: seq,
                touched_seq: seq,
            },
        );
    }

    /// Re-insert an entry carried over from another tier, preserving its
    /// expiry. Used by tier promotion so a move does not extend the TTL.
    pub fn put_entry(&mut self, key: &str, entry: CacheEntry<V>) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        let seq = self.next_seq();
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                touched_seq: seq,
                inserted_seq: seq,
                ..entry
            },
        );
    }

    /// Return the value if present and unexpired, bumping `access_count`
    /// and recency. An expired entry is removed and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = self.entries.get(key)?.is_expired();
        if expired {
            self.entries.remove(key);
            return None;
        }
        let seq = self.next_seq();
        let entry = self.entries.get_mut(key)?;
        entry.access_count += 1;
        entry.touched_seq = seq;
        Some(entry.value.clone())
    }

    /// Like `get`, but also reports the post-read `access_count` so the
    /// tier layer can apply its promotion policy.
    pub fn get_counted(&mut self, key: &str) -> Option<(V, u32)> {
        let value = self.get(key)?;
        let count = self.entries.get(key).map(|e| e.access_count)?;
        Some((value, count))
    }

    /// Remove and return the full entry, promotion's move half
    pub fn take(&mut self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.remove(key)
    }

    /// Unconditionally delete the entry; no-op if absent
    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Whether an unexpired entry exists, without touching metadata
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|e| !e.is_expired())
    }

    /// Current item count
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_lru(&mut self) {
        // Prefer reclaiming an expired entry before touching live ones.
        if let Some(key) = self
            .entries
            .iter()
            .find(|(_, e)| e.is_expired())
            .map(|(k, _)| k.clone())
        {
            self.entries.remove(&key);
            return;
        }
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| (e.touched_seq, e.inserted_seq))
            .map(|(k, _)| k.clone());
        if let Some(key) = victim {
            tracing::debug!(key = %key, "evicting LRU entry");
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_put_get_round_trip() {
        let mut store = EntryStore::new(4);
        store.put("a", 1u32, TTL);
        assert_eq!(store.get("a"), Some(1));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_expired_entry_is_miss_and_removed() {
        let mut store = EntryStore::new(4);
        store.put("a", 1u32, Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.get("a"), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_access_count_increments_on_hit() {
        let mut store = EntryStore::new(4);
        store.put("a", 1u32, TTL);
        store.get("a");
        store.get("a");
        let (_, count) = store.get_counted("a").unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_overwrite_resets_access_count() {
        let mut store = EntryStore::new(4);
        store.put("a", 1u32, TTL);
        store.get("a");
        store.get("a");
        store.put("a", 2u32, TTL);
        let (value, count) = store.get_counted("a").unwrap();
        assert_eq!(value, 2);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_lru_eviction_under_capacity_pressure() {
        let mut store = EntryStore::new(2);
        store.put("a", 1u32, TTL);
        store.put("b", 2u32, TTL);
        // Touch "a" so "b" becomes least recently used.
        store.get("a");
        store.put("c", 3u32, TTL);
        assert_eq!(store.get("b"), None);
        assert_eq!(store.get("a"), Some(1));
        assert_eq!(store.get("c"), Some(3));
    }

    #[test]
    fn test_eviction_tie_breaks_on_insertion_order() {
        let mut store = EntryStore::new(2);
        store.put("first", 1u32, TTL);
        store.put("second", 2u32, TTL);
        // No reads; recency equals insertion, so "first" goes.
        store.put("third", 3u32, TTL);
        assert_eq!(store.get("first"), None);
        assert_eq!(store.get("second"), Some(2));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = EntryStore::new(2);
        store.put("a", 1u32, TTL);
        store.remove("a");
        store.remove("a");
        assert!(store.is_empty());
    }

    #[test]
    fn test_promotion_take_preserves_expiry() {
        let mut store = EntryStore::new(2);
        store.put("a", 1u32, TTL);
        let entry = store.take("a").unwrap();
        let mut other: EntryStore<u32> = EntryStore::new(2);
        let expires_at = entry.expires_at;
        other.put_entry("a", entry);
        assert_eq!(other.get("a"), Some(1));
        assert_eq!(other.take("a").unwrap().expires_at, expires_at);
    }

    proptest! {
        #[test]
        fn prop_len_never_exceeds_capacity(
            keys in proptest::collection::vec("[a-d]{1,2}", 0..64),
            capacity in 1usize..8,
        ) {
            let mut store = EntryStore::new(capacity);
            for (i, key) in keys.iter().enumerate() {
                store.put(key, i as u32, TTL);
                prop_assert!(store.len() <= capacity);
            }
        }
    }
}
