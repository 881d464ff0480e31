//! Retry with exponential backoff
//!
//! `delay(attempt) = min(initial · base^(attempt−1), max_delay)`, scaled
//! by a uniform random factor in [0.5, 1.5) when jitter is enabled.
//! Only declared-transient errors are retried; permanent errors
//! propagate immediately. Every retry consumes one unit of the
//! operation's budget, checked before the backoff sleep.

use crate::resilience::retry_budget::{BudgetExceeded, RetryBudget};
use rand::Rng;
use std::time::Duration;

/// Backoff policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub base: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            base: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base.powi(attempt.saturating_sub(1) as i32);
        let raw = self.initial_delay.as_secs_f64() * exp;
        let capped = raw.min(self.max_delay.as_secs_f64());

        let scaled = if self.jitter {
            capped * rand::thread_rng().gen_range(0.5..1.5)
        } else {
            capped
        };
        Duration::from_secs_f64(scaled)
    }
}

/// Terminal outcome of a retried operation
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Error was not in the transient set
    #[error("permanent error: {0}")]
    Permanent(E),

    /// All attempts failed with transient errors
    #[error("all {attempts} attempts exhausted; last error: {last}")]
    Exhausted { attempts: u32, last: E },

    /// Window budget was empty before the next retry
    #[error(transparent)]
    Budget(#[from] BudgetExceeded),
}

/// Run `op` with bounded, budgeted retries
///
/// `is_transient` declares which errors are worth retrying. The budget
/// check happens before the backoff sleep, so a spent budget rejects
/// without sleeping.
pub fn retry_with_budget<T, E, F, P>(
    policy: &RetryPolicy,
    budget: &RetryBudget,
    mut op: F,
    is_transient: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, E>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if !is_transient(&err) => return Err(RetryError::Permanent(err)),
            Err(err) => {
                if attempt >= policy.max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                budget.try_consume()?;
                std::thread::sleep(policy.delay_for(attempt));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            base: 2.0,
            jitter: false,
        }
    }

    fn wide_budget() -> RetryBudget {
        RetryBudget::with_limits("test", 100, Duration::from_secs(600))
    }

    #[test]
    fn test_delay_grows_exponentially_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            base: 2.0,
            jitter: false,
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        // Capped at max_delay
        assert_eq!(policy.delay_for(4), Duration::from_secs(4));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let policy = RetryPolicy {
            jitter: true,
            initial_delay: Duration::from_secs(2),
            ..fast_policy(3)
        };
        for _ in 0..50 {
            let d = policy.delay_for(1).as_secs_f64();
            assert!((1.0..3.0).contains(&d), "delay {} out of band", d);
        }
    }

    #[test]
    fn test_success_needs_no_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, RetryError<&str>> = retry_with_budget(
            &fast_policy(3),
            &wide_budget(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            },
            |_| true,
        );
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_errors_retry_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_with_budget(
            &fast_policy(3),
            &wide_budget(),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("flaky")
                } else {
                    Ok("done")
                }
            },
            |_| true,
        );
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_attempts_bounded_by_max() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_budget(
            &fast_policy(3),
            &wide_budget(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("always down")
            },
            |_| true,
        );
        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_permanent_error_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_budget(
            &fast_policy(3),
            &wide_budget(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("bad request")
            },
            |_| false,
        );
        assert!(matches!(result, Err(RetryError::Permanent(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_budget_rejects_without_sleeping() {
        let budget = RetryBudget::with_limits("test", 0, Duration::from_secs(600));
        let started = std::time::Instant::now();
        let result: Result<(), _> = retry_with_budget(
            &RetryPolicy {
                initial_delay: Duration::from_secs(5),
                jitter: false,
                ..fast_policy(3)
            },
            &budget,
            || Err("down"),
            |_| true,
        );
        assert!(matches!(result, Err(RetryError::Budget(_))));
        // No backoff sleep happened
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
