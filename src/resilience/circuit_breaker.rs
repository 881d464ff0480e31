//! Circuit breaker for LLM providers
//!
//! Prevents cascading failures by cutting off calls to a failing
//! provider.
//!
//! # State Machine
//!
//! ```text
//!   CLOSED ──(failure_threshold)──▶ OPEN ──(timeout)──▶ HALF_OPEN
//!     ▲                                                     │
//!     │              (success_threshold successes)          │
//!     └─────────────────────────────────────────────────────┤
//!                                                (any failure ▶ OPEN)
//! ```
//!
//! - **CLOSED**: normal operation, requests pass; a success resets the
//!   failure counter
//! - **OPEN**: requests fail immediately until the timeout elapses
//! - **HALF_OPEN**: probe requests allowed; enough consecutive successes
//!   close the circuit, any failure reopens it

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Circuit state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Rejection issued while the circuit is open
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("circuit breaker '{provider}' is open; provider unavailable, try again later")]
pub struct CircuitOpen {
    pub provider: String,
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitConfig {
    /// Consecutive failures in CLOSED before opening
    pub failure_threshold: u32,
    /// Time to wait in OPEN before allowing probes
    pub timeout: Duration,
    /// Consecutive successes in HALF_OPEN before closing
    pub success_threshold: u32,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

/// Read-only view of breaker statistics
///
/// Readers may observe slightly stale values; the counters only move
/// under the internal lock.
#[derive(Debug, Clone)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_successes: u64,
    pub failure_rate: f64,
    /// How long ago the circuit opened, if it is open
    pub open_for: Option<Duration>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    total_requests: u64,
    total_failures: u64,
    total_successes: u64,
    opened_at: Option<Instant>,
}

/// Per-provider circuit breaker
///
/// Process-lifetime value; interior mutability so it can be shared
/// across the runtime without wrapping. The lock is never held across a
/// provider call: callers `check` before and `record_*` after.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CircuitConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: CircuitConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                total_requests: 0,
                total_failures: 0,
                total_successes: 0,
                opened_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Admit or reject a request
    ///
    /// Transitions OPEN → HALF_OPEN lazily once the timeout has elapsed.
    /// Returns `CircuitOpen` while the circuit is open.
    pub fn check(&self) -> Result<(), CircuitOpen> {
        let mut inner = self.inner.lock().unwrap();
        inner.total_requests += 1;

        if inner.state == CircuitState::Open {
            let expired = inner
                .opened_at
                .map(|at| at.elapsed() >= self.config.timeout)
                .unwrap_or(true);
            if expired {
                inner.state = CircuitState::HalfOpen;
                inner.success_count = 0;
            } else {
                return Err(CircuitOpen {
                    provider: self.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Record a successful provider call
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.total_successes += 1;

        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.opened_at = None;
                }
            }
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed provider call
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.total_failures += 1;

        match inner.state {
            // Any failure while probing reopens the circuit and resets the timer
            CircuitState::HalfOpen => open(&mut inner),
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    open(&mut inner);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Force the circuit back to CLOSED, clearing history counters
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.opened_at = None;
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.inner.lock().unwrap();
        CircuitSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            total_requests: inner.total_requests,
            total_failures: inner.total_failures,
            total_successes: inner.total_successes,
            failure_rate: if inner.total_requests > 0 {
                inner.total_failures as f64 / inner.total_requests as f64
            } else {
                0.0
            },
            open_for: inner.opened_at.map(|at| at.elapsed()),
        }
    }
}

fn open(inner: &mut Inner) {
    inner.state = CircuitState::Open;
    inner.opened_at = Some(Instant::now());
    inner.failure_count = 0;
    inner.success_count = 0;
}
