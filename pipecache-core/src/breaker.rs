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

//! Circuit breaker for the external persistent tier
//!
//! Short-circuits external-tier calls after repeated failures and probes
//! for recovery. One breaker instance guards one external tier; it is
//! injected into the facade at construction rather than living as a
//! module-level singleton. All transitions happen under a single mutex.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Observable breaker state, surfaced through the metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerStatus {
    /// External-tier calls are attempted
    Closed,
    /// Calls fail fast without attempting I/O
    Open,
    /// One trial call is in flight
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    status: BreakerStatus,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Guards the single trial call permitted while half-open
    probe_in_flight: bool,
}

/// Circuit breaker with closed / open / half-open states.
///
/// Callers ask for permission via [`try_acquire`](Self::try_acquire) before
/// every external-tier call and report the outcome afterwards. Nothing else
/// touches breaker state.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState {
                status: BreakerStatus::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
            failure_threshold,
            recovery_timeout,
        }
    }

    /// Whether an external-tier call may be attempted now.
    ///
    /// While open, flips to half-open once the recovery timeout has elapsed
    /// and admits exactly one trial call; concurrent callers are refused
    /// until that probe reports its outcome.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        match state.status {
            BreakerStatus::Closed => true,
            BreakerStatus::Open => {
                let elapsed = state
                    .opened_at
                    .map(|at| at.elapsed() >= self.recovery_timeout)
                    .unwrap_or(true);
                if elapsed {
                    tracing::debug!("breaker transitioning open -> half-open");
                    state.status = BreakerStatus::HalfOpen;
                    state.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
            BreakerStatus::HalfOpen => {
                if state.probe_in_flight {
                    false
                } else {
                    state.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Record a successful external-tier call
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        match state.status {
            BreakerStatus::Closed => {
                state.consecutive_failures = 0;
            }
            BreakerStatus::HalfOpen => {
                tracing::info!("external tier recovered, breaker closing");
                state.status = BreakerStatus::Closed;
                state.consecutive_failures = 0;
                state.opened_at = None;
                state.probe_in_flight = false;
            }
            BreakerStatus::Open => {}
        }
    }

    /// Record a failed external-tier call (including timeouts)
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        match state.status {
            BreakerStatus::Closed => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.failure_threshold {
                    tracing::warn!(
                        failures = state.consecutive_failures,
                        "failure threshold reached, breaker opening"
                    );
                    state.status = BreakerStatus::Open;
                    state.opened_at = Some(Instant::now());
                }
            }
            BreakerStatus::HalfOpen => {
                tracing::warn!("trial call failed, breaker re-opening");
                state.status = BreakerStatus::Open;
                state.opened_at = Some(Instant::now());
                state.probe_in_flight = false;
            }
            BreakerStatus::Open => {}
        }
    }

    /// Current stored status; does not itself trigger transitions
    pub fn status(&self) -> BreakerStatus {
        self.state.lock().status
    }

    /// Failures since the last success, for the metrics surface
    pub fn consecutive_failures(&self) -> u32 {
        self.state.lock().consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECOVERY: Duration = Duration::from_millis(50);

    #[test]
    fn test_opens_after_failure_threshold() {
        let breaker = CircuitBreaker::new(3, RECOVERY);
        assert_eq!(breaker.status(), BreakerStatus::Closed);
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.status(), BreakerStatus::Closed);
        breaker.record_failure();
        assert_eq!(breaker.status(), BreakerStatus::Open);
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn test_success_resets_failure_count_while_closed() {
        let breaker = CircuitBreaker::new(3, RECOVERY);
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.consecutive_failures(), 0);
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.status(), BreakerStatus::Closed);
    }

    #[test]
    fn test_half_open_after_recovery_timeout() {
        let breaker = CircuitBreaker::new(1, RECOVERY);
        breaker.record_failure();
        assert_eq!(breaker.status(), BreakerStatus::Open);
        assert!(!breaker.try_acquire());
        std::thread::sleep(RECOVERY + Duration::from_millis(10));
        assert!(breaker.try_acquire());
        assert_eq!(breaker.status(), BreakerStatus::HalfOpen);
    }

    #[test]
    fn test_half_open_admits_exactly_one_probe() {
        let breaker = CircuitBreaker::new(1, RECOVERY);
        breaker.record_failure();
        std::thread::sleep(RECOVERY + Duration::from_millis(10));
        assert!(breaker.try_acquire());
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn test_probe_success_closes_breaker() {
        let breaker = CircuitBreaker::new(1, RECOVERY);
        breaker.record_failure();
        std::thread::sleep(RECOVERY + Duration::from_millis(10));
        assert!(breaker.try_acquire());
        breaker.record_success();
        assert_eq!(breaker.status(), BreakerStatus::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
        assert!(breaker.try_acquire());
    }

    #[test]
    fn test_probe_failure_reopens_with_fresh_timer() {
        let breaker = CircuitBreaker::new(1, RECOVERY);
        breaker.record_failure();
        std::thread::sleep(RECOVERY + Duration::from_millis(10));
        assert!(breaker.try_acquire());
        breaker.record_failure();
        assert_eq!(breaker.status(), BreakerStatus::Open);
        // Timer restarted; still open immediately after the probe failure.
        assert!(!breaker.try_acquire());
    }
}
