//! Step results

use serde::{Deserialize, Serialize};

/// Outcome of one executed (or previewed) step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    /// Invocation attempts, including recovery retries
    pub attempts: u32,
    /// Recovery strategy that produced this result, if any; a plain
    /// success leaves this unset
    pub recovered_by: Option<String>,
}

impl StepResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            attempts: 1,
            recovered_by: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            attempts: 1,
            recovered_by: None,
        }
    }

    pub fn recovered(output: impl Into<String>, strategy: impl Into<String>, attempts: u32) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            attempts,
            recovered_by: Some(strategy.into()),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}
