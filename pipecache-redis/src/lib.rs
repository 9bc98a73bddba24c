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

//! Redis implementation of the pipecache external tier
//!
//! Values are stored as JSON strings under namespaced keys
//! (`<prefix>:<key>`) with `SETEX`-style TTLs, so entries expire
//! server-side even if the process never touches them again. The facade
//! owns timeouts and the circuit breaker; this crate does no retrying of
//! its own.
//!
//! # Example
//!
//! ```rust,ignore
//! use pipecache_core::{CacheConfig, ExternalTierSettings, HybridCache};
//! use pipecache_redis::RedisTier;
//! use std::sync::Arc;
//!
//! let settings = ExternalTierSettings {
//!     url: "redis://127.0.0.1:6379".into(),
//!     key_prefix: "pipecache".into(),
//! };
//! let tier = Arc::new(RedisTier::connect(&settings).await?);
//! let cache: HybridCache<serde_json::Value> =
//!     HybridCache::with_external(&config, tier)?;
//! ```

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info};

use pipecache_core::{ExternalResult, ExternalTier, ExternalTierError, ExternalTierSettings};

fn map_redis_err(e: redis::RedisError) -> ExternalTierError {
    if e.is_timeout() {
        ExternalTierError::Timeout
    } else {
        ExternalTierError::Unavailable(e.to_string())
    }
}

fn namespaced(prefix: &str, key: &str) -> String {
    format!("{prefix}:{key}")
}

/// External tier backed by a Redis server.
///
/// Cheap to share: the underlying [`ConnectionManager`] multiplexes one
/// connection and reconnects automatically after drops.
pub struct RedisTier {
    manager: ConnectionManager,
    prefix: String,
}

impl RedisTier {
    /// Open a connection to the server named in `settings`.
    ///
    /// A connect failure here is reported as [`ExternalTierError`] so the
    /// host can fall back to memory-only mode instead of aborting.
    pub async fn connect(settings: &ExternalTierSettings) -> ExternalResult<Self> {
        let client = redis::Client::open(settings.url.as_str()).map_err(map_redis_err)?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(map_redis_err)?;
        info!(url = %settings.url, prefix = %settings.key_prefix, "connected to redis external tier");
        Ok(Self {
            manager,
            prefix: settings.key_prefix.clone(),
        })
    }

    fn key(&self, key: &str) -> String {
        namespaced(&self.prefix, key)
    }
}

#[async_trait]
impl ExternalTier for RedisTier {
    async fn fetch(&self, key: &str) -> ExternalResult<Option<serde_json::Value>> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(self.key(key)).await.map_err(map_redis_err)?;
        match raw {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .map_err(|e| ExternalTierError::Corrupt(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn store(
        &self,
        key: &str,
        value: &serde_json::Value,
        ttl: Duration,
    ) -> ExternalResult<()> {
        let payload = serde_json::to_string(value)
            .map_err(|e| ExternalTierError::Corrupt(e.to_string()))?;
        let mut conn = self.manager.clone();
        // Redis TTLs are whole seconds; round sub-second TTLs up to 1.
        let ttl_secs = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(self.key(key), payload, ttl_secs)
            .await
            .map_err(map_redis_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> ExternalResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(self.key(key)).await.map_err(map_redis_err)?;
        Ok(())
    }

    async fn purge(&self) -> ExternalResult<()> {
        let pattern = namespaced(&self.prefix, "*");
        let mut scan_conn = self.manager.clone();
        let mut keys = Vec::new();
        {
            let mut iter: redis::AsyncIter<'_, String> = scan_conn
                .scan_match(pattern)
                .await
                .map_err(map_redis_err)?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        if keys.is_empty() {
            return Ok(());
        }
        debug!(count = keys.len(), "purging namespaced keys");
        let mut conn = self.manager.clone();
        let _: () = conn.del(keys).await.map_err(map_redis_err)?;
        Ok(())
    }

    async fn ping(&self) -> ExternalResult<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(())
    }
}
