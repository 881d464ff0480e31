//! Resilience layer
//!
//! Per-provider circuit breakers, per-operation retry budgets, exponential
//! backoff with jitter, and an ordered provider fallback chain. These
//! primitives wrap LLM calls; the executor's error recovery reuses the
//! backoff policy for transient tool failures.

mod circuit_breaker;
mod fallback;
mod retry;
mod retry_budget;

pub use circuit_breaker::{CircuitBreaker, CircuitConfig, CircuitOpen, CircuitSnapshot, CircuitState};
pub use fallback::{AllFallbacksFailed, AttemptError, FallbackChain};
pub use retry::{retry_with_budget, RetryError, RetryPolicy};
pub use retry_budget::{BudgetExceeded, RetryBudget, RetryBudgets};
