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

//! Two-tier in-process cache with promotion
//!
//! Hot tier: small, reserved for entries with proven demand. Warm tier:
//! larger, default destination for every write. An entry moves from warm
//! to hot once its warm-residency access count reaches the promotion
//! threshold; promotion is a move, never a copy, so a key is present in
//! at most one tier.
//!
//! Both stores sit behind one mutex so a promotion is atomic with respect
//! to concurrent readers: no interleaving can observe the key duplicated
//! across tiers or briefly absent from both.

use parking_lot::Mutex;
use std::time::Duration;

use crate::store::EntryStore;

/// Tier an entry currently occupies, reported for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Hot,
    Warm,
}

struct TierStores<V> {
    hot: EntryStore<V>,
    warm: EntryStore<V>,
}

/// Hot/warm tier pair with move-semantics promotion
pub struct TieredCache<V> {
    stores: Mutex<TierStores<V>>,
    promotion_threshold: u32,
}

impl<V: Clone> TieredCache<V> {
    pub fn new(max_hot_items: usize, max_warm_items: usize, promotion_threshold: u32) -> Self {
        Self {
            stores: Mutex::new(TierStores {
                hot: EntryStore::new(max_hot_items),
                warm: EntryStore::new(max_warm_items),
            }),
            promotion_threshold,
        }
    }

    /// Look up a key across both tiers.
    ///
    /// Hot is checked first and returns immediately on hit. A warm hit that
    /// crosses the promotion threshold moves the entry into hot before
    /// returning.
    pub fn get(&self, key: &str) -> Option<(V, CacheTier)> {
        let mut stores = self.stores.lock();
        if let Some(value) = stores.hot.get(key) {
            return Some((value, CacheTier::Hot));
        }
        let (value, access_count) = stores.warm.get_counted(key)?;
        if access_count >= self.promotion_threshold {
            if let Some(entry) = stores.warm.take(key) {
                tracing::debug!(key = %key, access_count, "promoting entry to hot tier");
                stores.hot.put_entry(key, entry);
            }
        }
        Some((value, CacheTier::Warm))
    }

    /// Write a value into the warm tier.
    ///
    /// Hot is populated only via promotion; a stale hot entry for the key
    /// is dropped so the next reads re-promote fresh data.
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let mut stores = self.stores.lock();
        stores.hot.remove(key);
        stores.warm.put(key, value, ttl);
    }

    /// Remove the key from both tiers; no-op if absent
    pub fn invalidate(&self, key: &str) {
        let mut stores = self.stores.lock();
        stores.hot.remove(key);
        stores.warm.remove(key);
    }

    /// Whether either tier holds an unexpired entry for the key
    pub fn contains_key(&self, key: &str) -> bool {
        let stores = self.stores.lock();
        stores.hot.contains_key(key) || stores.warm.contains_key(key)
    }

    /// Item counts per tier, `(hot, warm)`
    pub fn len(&self) -> (usize, usize) {
        let stores = self.stores.lock();
        (stores.hot.len(), stores.warm.len())
    }

    /// Whether both tiers are empty
    pub fn is_empty(&self) -> bool {
        let stores = self.stores.lock();
        stores.hot.is_empty() && stores.warm.is_empty()
    }

    /// Drop every entry from both tiers
    pub fn clear(&self) {
        let mut stores = self.stores.lock();
        stores.hot.clear();
        stores.warm.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn cache() -> TieredCache<String> {
        TieredCache::new(4, 8, 3)
    }

    #[test]
    fn test_set_lands_in_warm_tier() {
        let cache = cache();
        cache.set("a", "v".into(), TTL);
        let (_, tier) = cache.get("a").unwrap();
        assert_eq!(tier, CacheTier::Warm);
        assert_eq!(cache.len(), (0, 1));
    }

    #[test]
    fn test_promotion_moves_entry_at_threshold() {
        let cache = cache();
        cache.set("a", "v".into(), TTL);
        // Accesses 1 and 2 stay warm; access 3 crosses the threshold.
        assert_eq!(cache.get("a").unwrap().1, CacheTier::Warm);
        assert_eq!(cache.get("a").unwrap().1, CacheTier::Warm);
        assert_eq!(cache.get("a").unwrap().1, CacheTier::Warm);
        assert_eq!(cache.len(), (1, 0), "promotion must move, not copy");
        assert_eq!(cache.get("a").unwrap().1, CacheTier::Hot);
    }

    #[test]
    fn test_set_invalidates_stale_hot_entry() {
        let cache = cache();
        cache.set("a", "old".into(), TTL);
        for _ in 0..3 {
            cache.get("a");
        }
        assert_eq!(cache.len(), (1, 0));
        cache.set("a", "new".into(), TTL);
        let (value, tier) = cache.get("a").unwrap();
        assert_eq!(value, "new");
        assert_eq!(tier, CacheTier::Warm);
        assert_eq!(cache.len(), (0, 1));
    }

    #[test]
    fn test_invalidate_clears_both_tiers() {
        let cache = cache();
        cache.set("a", "v".into(), TTL);
        for _ in 0..3 {
            cache.get("a");
        }
        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
        // Second invalidation of an absent key is a no-op.
        cache.invalidate("a");
    }

    #[test]
    fn test_warm_eviction_under_capacity_pressure() {
        let cache: TieredCache<String> = TieredCache::new(4, 2, 3);
        cache.set("a", "1".into(), TTL);
        cache.set("b", "2".into(), TTL);
        cache.set("c", "3".into(), TTL);
        assert!(cache.get("a").is_none(), "oldest entry should be evicted");
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_expired_entry_misses_in_either_tier() {
        let cache = cache();
        cache.set("a", "v".into(), Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("a").is_none());
    }
}
