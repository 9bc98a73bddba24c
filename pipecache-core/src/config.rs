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

//! Cache configuration
//!
//! All thresholds and capacities are configuration inputs, not hardcoded.
//! Validation runs at cache construction; a misconfigured cache refuses to
//! start rather than silently producing misleading hit-rate signals.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CacheError, CacheResult};

/// Caching strategy requested by the operator.
///
/// The effective mode also depends on connection details being present:
/// without them the cache runs memory-only regardless of strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    /// In-process tiers only
    Memory,
    /// External tier only (still fronted by the in-process tiers)
    Redis,
    /// In-process tiers backed by the external tier
    Hybrid,
}

/// Connection settings for the external persistent tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalTierSettings {
    /// Connection URL (e.g. "redis://127.0.0.1:6379")
    pub url: String,

    /// Namespace prefix applied to every key stored externally
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "pipecache".to_string()
}

/// Configuration for the hybrid cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Requested caching strategy
    pub strategy: CacheStrategy,

    /// Default TTL for entries populated from the external tier, in seconds
    pub ttl_seconds: u64,

    /// Maximum entries in the hot tier
    pub max_hot_items: usize,

    /// Maximum entries in the warm tier
    pub max_warm_items: usize,

    /// Warm-tier accesses required before an entry moves to the hot tier
    pub hot_promotion_threshold: u32,

    /// Consecutive external-tier failures before the breaker opens
    pub failure_threshold: u32,

    /// Time the breaker stays open before probing for recovery, in ms
    pub recovery_timeout_ms: u64,

    /// Per-call timeout for external-tier operations, in ms
    pub external_timeout_ms: u64,

    /// External tier connection details. Absence forces memory-only mode
    /// regardless of the configured strategy.
    #[serde(default)]
    pub external: Option<ExternalTierSettings>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            strategy: CacheStrategy::Hybrid,
            ttl_seconds: 3_600,
            max_hot_items: 100,
            max_warm_items: 1_000,
            hot_promotion_threshold: 3,
            failure_threshold: 5,
            recovery_timeout_ms: 30_000,
            external_timeout_ms: 250,
            external: None,
        }
    }
}

impl CacheConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CacheError::Config(format!("cannot read config file: {e}")))?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| CacheError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all thresholds and capacities.
    ///
    /// Called by the facade at construction; invalid configuration is fatal.
    pub fn validate(&self) -> CacheResult<()> {
        if self.ttl_seconds == 0 {
            return Err(CacheError::Config("ttl_seconds must be > 0".into()));
        }
        if self.max_hot_items == 0 {
            return Err(CacheError::Config("max_hot_items must be > 0".into()));
        }
        if self.max_warm_items == 0 {
            return Err(CacheError::Config("max_warm_items must be > 0".into()));
        }
        if self.hot_promotion_threshold == 0 {
            return Err(CacheError::Config(
                "hot_promotion_threshold must be > 0".into(),
            ));
        }
        if self.failure_threshold == 0 {
            return Err(CacheError::Config("failure_threshold must be > 0".into()));
        }
        if self.recovery_timeout_ms == 0 {
            return Err(CacheError::Config("recovery_timeout_ms must be > 0".into()));
        }
        if self.external_timeout_ms == 0 {
            return Err(CacheError::Config("external_timeout_ms must be > 0".into()));
        }
        if let Some(external) = &self.external {
            if external.url.is_empty() {
                return Err(CacheError::Config("external.url must not be empty".into()));
            }
        }
        Ok(())
    }

    /// Default TTL applied to entries populated from the external tier
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Time the breaker stays open before probing for recovery
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }

    /// Per-call timeout for external-tier operations
    pub fn external_timeout(&self) -> Duration {
        Duration::from_millis(self.external_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = CacheConfig {
            ttl_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CacheError::Config(_))));
    }

    #[test]
    fn test_zero_thresholds_rejected() {
        for field in ["promotion", "failure", "recovery", "timeout"] {
            let mut config = CacheConfig::default();
            match field {
                "promotion" => config.hot_promotion_threshold = 0,
                "failure" => config.failure_threshold = 0,
                "recovery" => config.recovery_timeout_ms = 0,
                _ => config.external_timeout_ms = 0,
            }
            assert!(config.validate().is_err(), "{field} should be rejected");
        }
    }

    #[test]
    fn test_empty_external_url_rejected() {
        let config = CacheConfig {
            external: Some(ExternalTierSettings {
                url: String::new(),
                key_prefix: "pipecache".into(),
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategy_serde_names() {
        let json = serde_json::to_string(&CacheStrategy::Hybrid).unwrap();
        assert_eq!(json, "\"hybrid\"");
        let parsed: CacheStrategy = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(parsed, CacheStrategy::Memory);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = CacheConfig::default();
        let raw = toml::to_string(&config).unwrap();
        let parsed: CacheConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.max_hot_items, config.max_hot_items);
        assert_eq!(parsed.recovery_timeout_ms, config.recovery_timeout_ms);
    }
}
