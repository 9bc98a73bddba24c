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

//! Hit/miss accounting for the monitoring surface

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::breaker::BreakerStatus;
use crate::cache::CacheMode;

/// Lock-free counters updated on every facade operation
#[derive(Debug, Default)]
pub struct CacheStats {
    pub(crate) local_hits: AtomicU64,
    pub(crate) external_hits: AtomicU64,
    pub(crate) misses: AtomicU64,
}

impl CacheStats {
    pub(crate) fn record_local_hit(&self) {
        self.local_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_external_hit(&self) {
        self.external_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of cache health, serializable for whatever
/// monitoring endpoint the host system exposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsSnapshot {
    /// Hits served from the hot or warm tier
    pub local_hits: u64,
    /// Hits served by the external tier
    pub external_hits: u64,
    /// Lookups that found no valid value anywhere
    pub misses: u64,
    /// Overall hit rate (0.0 to 1.0)
    pub hit_rate: f64,
    /// Entries currently resident in the hot tier
    pub hot_items: usize,
    /// Entries currently resident in the warm tier
    pub warm_items: usize,
    /// Breaker state; `None` when no external tier is configured
    pub breaker_status: Option<BreakerStatus>,
    /// Configured mode; never a function of transient breaker state
    pub mode: CacheMode,
}

impl CacheStatsSnapshot {
    pub(crate) fn build(
        stats: &CacheStats,
        hot_items: usize,
        warm_items: usize,
        breaker_status: Option<BreakerStatus>,
        mode: CacheMode,
    ) -> Self {
        let local_hits = stats.local_hits.load(Ordering::Relaxed);
        let external_hits = stats.external_hits.load(Ordering::Relaxed);
        let misses = stats.misses.load(Ordering::Relaxed);
        let hits = local_hits + external_hits;
        let total = hits + misses;
        Self {
            local_hits,
            external_hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            hot_items,
            warm_items,
            breaker_status,
            mode,
        }
    }

    /// Total hits across local tiers and the external tier
    pub fn hits(&self) -> u64 {
        self.local_hits + self.external_hits
    }
}
