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

//! External persistent tier seam
//!
//! The transport behind the external tier (Redis or otherwise) is an
//! implementation detail; the facade only speaks this trait. Payloads
//! cross the seam as JSON so the trait stays object-safe and transports
//! never need to know the caller's value type.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::ExternalTierError;

/// Result type for external-tier operations
pub type ExternalResult<T> = Result<T, ExternalTierError>;

/// A persistent/shared cache level backing the in-process tiers.
///
/// Implementations must not retry internally; the facade reports each
/// call's outcome to the circuit breaker exactly once. Per-call timeouts
/// are enforced by the facade, not the implementation.
#[async_trait]
pub trait ExternalTier: Send + Sync {
    /// Fetch a value; `Ok(None)` is a successful call that found nothing
    async fn fetch(&self, key: &str) -> ExternalResult<Option<serde_json::Value>>;

    /// Store a value with the given TTL
    async fn store(&self, key: &str, value: &serde_json::Value, ttl: Duration)
        -> ExternalResult<()>;

    /// Delete a key; absent keys are not an error
    async fn delete(&self, key: &str) -> ExternalResult<()>;

    /// Drop every entry this tier holds for the cache's namespace
    async fn purge(&self) -> ExternalResult<()>;

    /// Liveness probe for the health surface
    async fn ping(&self) -> ExternalResult<()>;
}
