//! Error recovery
//!
//! Classifies tool failures and applies one of retry, skip, alternative
//! or abort. Transient I/O retries reuse the resilience backoff policy;
//! skips produce synthetic results so execution can continue; known
//! program substitutions (e.g. yarn for npm) are tried once.

use crate::intent::Step;
use crate::resilience::RetryPolicy;
use crate::tools::{ToolError, ToolRegistry};
use serde_json::Value;
use std::fmt;
use std::sync::Mutex;
use tracing::{info, warn};

/// Applied recovery strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    Retry,
    Skip,
    Alternative,
    Abort,
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStrategy::Retry => write!(f, "retry"),
            RecoveryStrategy::Skip => write!(f, "skip"),
            RecoveryStrategy::Alternative => write!(f, "alternative"),
            RecoveryStrategy::Abort => write!(f, "abort"),
        }
    }
}

/// Outcome of a recovery attempt
#[derive(Debug, Clone)]
pub struct RecoveryResult {
    pub success: bool,
    pub strategy: RecoveryStrategy,
    pub message: String,
    /// Tool invocations made during recovery
    pub attempts: u32,
}

/// Recovery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    pub retries: u64,
    pub skips: u64,
    pub alternatives: u64,
    pub aborts: u64,
}

/// Known equivalent substitutions, applied to string arguments
const ALTERNATIVES: &[(&str, &str)] = &[("npm", "yarn"), ("vim", "nano"), ("wget", "curl")];

/// Error recovery engine
pub struct ErrorRecovery {
    max_retries: u32,
    policy: RetryPolicy,
    stats: Mutex<RecoveryStats>,
}

impl ErrorRecovery {
    pub fn new() -> Self {
        Self::with_max_retries(2)
    }

    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            policy: RetryPolicy {
                max_attempts: max_retries.max(1),
                ..RetryPolicy::default()
            },
            stats: Mutex::new(RecoveryStats::default()),
        }
    }

    /// Override the backoff policy (tests use millisecond delays)
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn stats(&self) -> RecoveryStats {
        *self.stats.lock().unwrap()
    }

    /// Classify a failure into a strategy
    pub fn classify(&self, error: &ToolError) -> RecoveryStrategy {
        match error {
            // Missing optional input: skip and continue
            ToolError::MissingArgument { .. } => RecoveryStrategy::Skip,

            // Dispatch failures and argument type problems are fatal
            ToolError::ToolNotFound(_)
            | ToolError::ActionNotFound { .. }
            | ToolError::InvalidArgument { .. } => RecoveryStrategy::Abort,

            ToolError::Io(message) | ToolError::Failed(message) => {
                let lowered = message.to_lowercase();
                if is_security(&lowered) {
                    RecoveryStrategy::Abort
                } else if has_alternative(&lowered) {
                    RecoveryStrategy::Alternative
                } else if is_transient(&lowered) {
                    RecoveryStrategy::Retry
                } else if lowered.contains("no such file")
                    || lowered.contains("not found")
                    || lowered.contains("no files match")
                {
                    // Missing optional dependency of the plan
                    RecoveryStrategy::Skip
                } else {
                    RecoveryStrategy::Abort
                }
            }
        }
    }

    /// Attempt to recover a failed step
    pub async fn recover(
        &self,
        registry: &ToolRegistry,
        step: &Step,
        error: &ToolError,
    ) -> RecoveryResult {
        let strategy = self.classify(error);
        info!(
            tool = %step.tool,
            action = %step.action,
            strategy = %strategy,
            "recovering failed step"
        );

        match strategy {
            RecoveryStrategy::Retry => self.retry(registry, step, error).await,
            RecoveryStrategy::Skip => {
                self.bump(|s| s.skips += 1);
                RecoveryResult {
                    success: true,
                    strategy,
                    message: format!("skipped: {}", error),
                    attempts: 0,
                }
            }
            RecoveryStrategy::Alternative => self.alternative(registry, step, error).await,
            RecoveryStrategy::Abort => {
                self.bump(|s| s.aborts += 1);
                RecoveryResult {
                    success: false,
                    strategy,
                    message: error.to_string(),
                    attempts: 0,
                }
            }
        }
    }

    async fn retry(
        &self,
        registry: &ToolRegistry,
        step: &Step,
        error: &ToolError,
    ) -> RecoveryResult {
        let mut last = error.to_string();
        for attempt in 1..=self.max_retries {
            self.bump(|s| s.retries += 1);
            tokio::time::sleep(self.policy.delay_for(attempt)).await;

            match registry.invoke(step).await {
                Ok(output) => {
                    return RecoveryResult {
                        success: true,
                        strategy: RecoveryStrategy::Retry,
                        message: output,
                        attempts: attempt,
                    };
                }
                Err(err) => {
                    warn!(attempt, error = %err, "retry attempt failed");
                    last = err.to_string();
                }
            }
        }

        RecoveryResult {
            success: false,
            strategy: RecoveryStrategy::Retry,
            message: format!("retries exhausted: {}", last),
            attempts: self.max_retries,
        }
    }

    async fn alternative(
        &self,
        registry: &ToolRegistry,
        step: &Step,
        error: &ToolError,
    ) -> RecoveryResult {
        self.bump(|s| s.alternatives += 1);

        let Some(substituted) = substitute_step(step) else {
            return RecoveryResult {
                success: false,
                strategy: RecoveryStrategy::Alternative,
                message: format!("no substitute available: {}", error),
                attempts: 0,
            };
        };

        match registry.invoke(&substituted).await {
            Ok(output) => RecoveryResult {
                success: true,
                strategy: RecoveryStrategy::Alternative,
                message: output,
                attempts: 1,
            },
            Err(err) => RecoveryResult {
                success: false,
                strategy: RecoveryStrategy::Alternative,
                message: format!("substitute also failed: {}", err),
                attempts: 1,
            },
        }
    }

    fn bump(&self, update: impl FnOnce(&mut RecoveryStats)) {
        update(&mut self.stats.lock().unwrap());
    }
}

impl Default for ErrorRecovery {
    fn default() -> Self {
        Self::new()
    }
}

fn is_transient(message: &str) -> bool {
    ["temporarily unavailable", "resource busy", "timed out", "connection", "interrupted"]
        .iter()
        .any(|needle| message.contains(needle))
}

fn is_security(message: &str) -> bool {
    ["permission denied", "access denied", "operation not permitted", "sandbox"]
        .iter()
        .any(|needle| message.contains(needle))
}

fn has_alternative(message: &str) -> bool {
    ALTERNATIVES.iter().any(|(from, _)| message.contains(from))
}

/// Substitute known-equivalent program names in string arguments
pub(crate) fn substitute_step(step: &Step) -> Option<Step> {
    let mut substituted = step.clone();
    let mut changed = false;

    for value in substituted.args.values_mut() {
        if let Value::String(s) = value {
            for (from, to) in ALTERNATIVES {
                if s.contains(from) {
                    *s = s.replace(from, to);
                    changed = true;
                }
            }
        }
    }

    changed.then_some(substituted)
}
