//! Retry budget
//!
//! Rolling-window cap on total retries per operation kind. Each retry
//! consumes one unit; an empty budget rejects with `BudgetExceeded`.
//! The window resets on the first access past its end.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Rejection when the window's budget is spent
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("retry budget exceeded for '{operation}': used {used}/{total} in current window")]
pub struct BudgetExceeded {
    pub operation: String,
    pub used: u32,
    pub total: u32,
}

#[derive(Debug)]
struct Window {
    used: u32,
    started: Instant,
}

/// Per-operation-kind retry budget
#[derive(Debug)]
pub struct RetryBudget {
    operation: String,
    total: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl RetryBudget {
    /// Default budget: 100 retries per 10-minute window
    pub fn new(operation: impl Into<String>) -> Self {
        Self::with_limits(operation, 100, Duration::from_secs(600))
    }

    pub fn with_limits(operation: impl Into<String>, total: u32, window: Duration) -> Self {
        Self {
            operation: operation.into(),
            total,
            window,
            state: Mutex::new(Window {
                used: 0,
                started: Instant::now(),
            }),
        }
    }

    /// Consume one unit, failing when the window is exhausted
    pub fn try_consume(&self) -> Result<(), BudgetExceeded> {
        let mut state = self.state.lock().unwrap();
        reset_if_expired(&mut state, self.window);

        if state.used >= self.total {
            return Err(BudgetExceeded {
                operation: self.operation.clone(),
                used: state.used,
                total: self.total,
            });
        }
        state.used += 1;
        Ok(())
    }

    /// Whether at least one unit remains in the current window
    pub fn can_retry(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        reset_if_expired(&mut state, self.window);
        state.used < self.total
    }

    /// Units remaining in the current window
    pub fn remaining(&self) -> u32 {
        let mut state = self.state.lock().unwrap();
        reset_if_expired(&mut state, self.window);
        self.total.saturating_sub(state.used)
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}

fn reset_if_expired(state: &mut Window, window: Duration) {
    if state.started.elapsed() >= window {
        state.used = 0;
        state.started = Instant::now();
    }
}

/// Budgets keyed by operation kind
///
/// Process-lifetime map; budgets are created on first use with the
/// provided limits.
#[derive(Debug)]
pub struct RetryBudgets {
    total: u32,
    window: Duration,
    budgets: Mutex<HashMap<String, std::sync::Arc<RetryBudget>>>,
}

impl RetryBudgets {
    pub fn new(total: u32, window: Duration) -> Self {
        Self {
            total,
            window,
            budgets: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the budget for an operation kind
    pub fn for_operation(&self, operation: &str) -> std::sync::Arc<RetryBudget> {
        let mut budgets = self.budgets.lock().unwrap();
        budgets
            .entry(operation.to_string())
            .or_insert_with(|| {
                std::sync::Arc::new(RetryBudget::with_limits(operation, self.total, self.window))
            })
            .clone()
    }
}

impl Default for RetryBudgets {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_consumes_until_empty() {
        let budget = RetryBudget::with_limits("translate", 3, Duration::from_secs(600));
        assert_eq!(budget.remaining(), 3);
        for _ in 0..3 {
            assert!(budget.try_consume().is_ok());
        }
        assert_eq!(budget.remaining(), 0);

        let err = budget.try_consume().unwrap_err();
        assert_eq!(err.operation, "translate");
        assert_eq!(err.used, 3);
        assert_eq!(err.total, 3);
    }

    #[test]
    fn test_can_retry_tracks_remaining() {
        let budget = RetryBudget::with_limits("reflect", 1, Duration::from_secs(600));
        assert!(budget.can_retry());
        budget.try_consume().unwrap();
        assert!(!budget.can_retry());
    }

    #[test]
    fn test_window_resets_on_first_access_past_expiry() {
        let budget = RetryBudget::with_limits("translate", 1, Duration::from_millis(10));
        budget.try_consume().unwrap();
        assert!(!budget.can_retry());

        std::thread::sleep(Duration::from_millis(20));
        assert!(budget.can_retry());
        assert!(budget.try_consume().is_ok());
    }

    #[test]
    fn test_registry_reuses_budget_per_operation() {
        let budgets = RetryBudgets::new(2, Duration::from_secs(600));
        let a = budgets.for_operation("translate");
        a.try_consume().unwrap();

        let b = budgets.for_operation("translate");
        assert_eq!(b.remaining(), 1);

        let other = budgets.for_operation("reflect");
        assert_eq!(other.remaining(), 2);
    }
}
