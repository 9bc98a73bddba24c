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

//! Cache error types
//!
//! External-tier faults never reach callers of the cache API; they are
//! absorbed into the circuit breaker and degrade to misses. The only error
//! the cache surfaces is invalid configuration, which is fatal at
//! construction time.

use thiserror::Error;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors surfaced by the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// Invalid configuration detected at construction
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Faults accessing the external persistent tier.
///
/// These are reported to the circuit breaker and converted to misses;
/// they are never propagated to callers of the facade.
#[derive(Debug, Error)]
pub enum ExternalTierError {
    /// The call did not complete within the configured timeout
    #[error("External tier call timed out")]
    Timeout,

    /// Transport-level failure (connection refused, protocol error)
    #[error("External tier unavailable: {0}")]
    Unavailable(String),

    /// Stored payload could not be decoded
    #[error("External tier payload corrupt: {0}")]
    Corrupt(String),
}
