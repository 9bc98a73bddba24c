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

//! Pipecache Core
//!
//! Hybrid caching layer for documentation/runbook retrieval pipelines:
//! - **Tiered storage**: small hot tier for proven-hot entries, larger warm
//!   tier as the default write destination, promotion on demonstrated demand
//! - **External tier**: optional persistent/shared backend behind a trait
//!   seam, protected by a circuit breaker
//! - **Graceful degradation**: external-tier faults never reach callers;
//!   they degrade to misses and an observable breaker-open signal
//!
//! # Architecture
//!
//! ```text
//! caller ──► HybridCache (facade)
//!              │
//!              ├─► hot tier  ──┐
//!              ├─► warm tier ──┤  TieredCache (promotion on access)
//!              │               │
//!              └─► CircuitBreaker ──► ExternalTier (Redis, ...)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use pipecache_core::{CacheConfig, HybridCache};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache: HybridCache<serde_json::Value> =
//!         HybridCache::new(&CacheConfig::default())?;
//!
//!     cache.set("runbook:disk-full", payload, Duration::from_secs(3600)).await;
//!     if let Some(hit) = cache.get("runbook:disk-full").await {
//!         // serve from cache
//!     }
//!
//!     let stats = cache.stats();
//!     tracing::info!(hit_rate = stats.hit_rate, "cache health");
//!     Ok(())
//! }
//! ```

pub mod breaker;
pub mod cache;
pub mod config;
pub mod error;
pub mod external;
pub mod stats;
pub mod store;
pub mod tiers;

// Re-exports
pub use breaker::{BreakerStatus, CircuitBreaker};
pub use cache::{CacheMode, HybridCache};
pub use config::{CacheConfig, CacheStrategy, ExternalTierSettings};
pub use error::{CacheError, CacheResult, ExternalTierError};
pub use external::{ExternalResult, ExternalTier};
pub use stats::CacheStatsSnapshot;
pub use tiers::{CacheTier, TieredCache};
