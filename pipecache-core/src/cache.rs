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

//! Hybrid cache facade
//!
//! Single entry point consumed by callers. Composes the two in-process
//! tiers with an optional circuit-breaker-protected external tier and
//! guarantees that no external-tier fault is ever surfaced as an error:
//! a broken external tier degrades to a lower hit rate, nothing more.
//! The cache never computes values; a miss means the caller recomputes
//! and calls [`set`](HybridCache::set).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::breaker::{BreakerStatus, CircuitBreaker};
use crate::config::{CacheConfig, CacheStrategy};
use crate::error::{CacheResult, ExternalTierError};
use crate::external::ExternalTier;
use crate::stats::{CacheStats, CacheStatsSnapshot};
use crate::tiers::TieredCache;

/// Observable operating mode.
///
/// Reflects configuration only: a hybrid cache whose breaker is open is
/// still `Hybrid`, because "external tier temporarily down" must stay
/// distinguishable from "never had an external tier". Transient
/// unavailability is visible separately via the breaker status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// In-process tiers backed by an external tier
    Hybrid,
    /// In-process tiers only
    MemoryOnly,
}

struct ExternalHandle {
    tier: Arc<dyn ExternalTier>,
    breaker: CircuitBreaker,
}

/// Hybrid get/set/invalidate cache consumed by source adapters and the
/// search layer. Keys are opaque strings owned by the caller; values are
/// any serde-serializable payload.
pub struct HybridCache<V> {
    tiers: TieredCache<V>,
    stats: CacheStats,
    external: Option<ExternalHandle>,
    default_ttl: Duration,
    external_timeout: Duration,
}

impl<V> HybridCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a memory-only cache.
    ///
    /// Invalid configuration is fatal here; a silently misconfigured cache
    /// would produce misleading hit-rate and availability signals.
    pub fn new(config: &CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        info!(
            max_hot = config.max_hot_items,
            max_warm = config.max_warm_items,
            "initializing cache in memory-only mode"
        );
        Ok(Self {
            tiers: TieredCache::new(
                config.max_hot_items,
                config.max_warm_items,
                config.hot_promotion_threshold,
            ),
            stats: CacheStats::default(),
            external: None,
            default_ttl: config.ttl(),
            external_timeout: config.external_timeout(),
        })
    }

    /// Create a cache backed by the given external tier.
    ///
    /// A `memory` strategy ignores the external tier and runs memory-only;
    /// the supplied tier is only wired in for `redis` and `hybrid`
    /// strategies, each behind its own circuit breaker.
    pub fn with_external(config: &CacheConfig, tier: Arc<dyn ExternalTier>) -> CacheResult<Self> {
        let mut cache = Self::new(config)?;
        if config.strategy == CacheStrategy::Memory {
            warn!("strategy is 'memory', ignoring configured external tier");
            return Ok(cache);
        }
        info!("external tier attached, cache running in hybrid mode");
        cache.external = Some(ExternalHandle {
            tier,
            breaker: CircuitBreaker::new(config.failure_threshold, config.recovery_timeout()),
        });
        Ok(cache)
    }

    /// Look up a key: hot tier, warm tier, then the external tier when one
    /// is configured and the breaker permits. An external hit repopulates
    /// the warm tier with the configured default TTL. Every external-tier
    /// outcome, including timeouts, feeds the breaker.
    pub async fn get(&self, key: &str) -> Option<V> {
        if let Some((value, tier)) = self.tiers.get(key) {
            debug!(key, ?tier, "local tier hit");
            self.stats.record_local_hit();
            return Some(value);
        }
        if let Some(external) = &self.external {
            if external.breaker.try_acquire() {
                match self.fetch_external(external, key).await {
                    Ok(Some(value)) => {
                        external.breaker.record_success();
                        self.tiers.set(key, value.clone(), self.default_ttl);
                        self.stats.record_external_hit();
                        debug!(key, "external tier hit, warm tier populated");
                        return Some(value);
                    }
                    Ok(None) => external.breaker.record_success(),
                    Err(e) => {
                        warn!(key, error = %e, "external tier fetch failed");
                        external.breaker.record_failure();
                    }
                }
            }
        }
        self.stats.record_miss();
        None
    }

    /// Write a value to the warm tier and, best-effort, through to the
    /// external tier. Write-through failure is reported to the breaker and
    /// swallowed: the in-process tiers are the source of truth for
    /// immediate reads, so the call still succeeds.
    pub async fn set(&self, key: &str, value: V, ttl: Duration) {
        self.tiers.set(key, value.clone(), ttl);
        let Some(external) = &self.external else {
            return;
        };
        if !external.breaker.try_acquire() {
            return;
        }
        let payload = match serde_json::to_value(&value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "payload not serializable for write-through");
                external.breaker.record_failure();
                return;
            }
        };
        let result = tokio::time::timeout(
            self.external_timeout,
            external.tier.store(key, &payload, ttl),
        )
        .await
        .map_err(|_| ExternalTierError::Timeout);
        match result {
            Ok(Ok(())) => external.breaker.record_success(),
            Ok(Err(e)) | Err(e) => {
                warn!(key, error = %e, "external tier write-through failed");
                external.breaker.record_failure();
            }
        }
    }

    /// Remove a key from both local tiers and, best-effort, from the
    /// external tier. Idempotent; external failures are logged only.
    pub async fn invalidate(&self, key: &str) {
        self.tiers.invalidate(key);
        let Some(external) = &self.external else {
            return;
        };
        if !external.breaker.try_acquire() {
            return;
        }
        let result = tokio::time::timeout(self.external_timeout, external.tier.delete(key))
            .await
            .map_err(|_| ExternalTierError::Timeout);
        match result {
            Ok(Ok(())) => external.breaker.record_success(),
            Ok(Err(e)) | Err(e) => {
                warn!(key, error = %e, "external tier invalidation failed");
                external.breaker.record_failure();
            }
        }
    }

    /// Drop every entry from both local tiers and, best-effort, the
    /// external tier's namespace
    pub async fn clear(&self) {
        self.tiers.clear();
        let Some(external) = &self.external else {
            return;
        };
        if !external.breaker.try_acquire() {
            return;
        }
        let result = tokio::time::timeout(self.external_timeout, external.tier.purge())
            .await
            .map_err(|_| ExternalTierError::Timeout);
        match result {
            Ok(Ok(())) => external.breaker.record_success(),
            Ok(Err(e)) | Err(e) => {
                warn!(error = %e, "external tier purge failed");
                external.breaker.record_failure();
            }
        }
    }

    /// Whether either local tier holds an unexpired entry for the key.
    /// Does not consult the external tier.
    pub fn contains_key(&self, key: &str) -> bool {
        self.tiers.contains_key(key)
    }

    /// Configured operating mode; see [`CacheMode`]
    pub fn mode(&self) -> CacheMode {
        if self.external.is_some() {
            CacheMode::Hybrid
        } else {
            CacheMode::MemoryOnly
        }
    }

    /// Breaker state for the external tier, `None` in memory-only mode
    pub fn breaker_status(&self) -> Option<BreakerStatus> {
        self.external.as_ref().map(|e| e.breaker.status())
    }

    /// Point-in-time stats for the monitoring surface
    pub fn stats(&self) -> CacheStatsSnapshot {
        let (hot_items, warm_items) = self.tiers.len();
        CacheStatsSnapshot::build(
            &self.stats,
            hot_items,
            warm_items,
            self.breaker_status(),
            self.mode(),
        )
    }

    async fn fetch_external(
        &self,
        external: &ExternalHandle,
        key: &str,
    ) -> Result<Option<V>, ExternalTierError> {
        let raw = tokio::time::timeout(self.external_timeout, external.tier.fetch(key))
            .await
            .map_err(|_| ExternalTierError::Timeout)??;
        match raw {
            Some(payload) => serde_json::from_value(payload)
                .map(Some)
                .map_err(|e| ExternalTierError::Corrupt(e.to_string())),
            None => Ok(None),
        }
    }
}
