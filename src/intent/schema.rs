//! Intent and Step schema
//!
//! Wire format (from the LLM):
//! `{"goal": string, "requires_confirmation": bool, "steps": [{"tool",
//! "action", "args", "risk"}]}` — no additional keys accepted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Risk level 0 — read-only (info gathering)
pub const RISK_READ: u8 = 0;
/// Risk level 1 — create/move (safe modifications)
pub const RISK_CREATE: u8 = 1;
/// Risk level 2 — overwrite (data changes)
pub const RISK_OVERWRITE: u8 = 2;
/// Risk level 3 — delete/kill (destructive, requires explicit confirmation)
pub const RISK_DESTROY: u8 = 3;

/// Schema validation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("step {0}: tool name is empty")]
    EmptyTool(usize),

    #[error("step {0}: action name is empty")]
    EmptyAction(usize),

    #[error("step {index}: risk {risk} out of range (0..=3)")]
    RiskOutOfRange { index: usize, risk: u8 },
}

/// Single step in an intent
///
/// One tool invocation: tool name, action name, argument map, risk level.
/// Created by the LLM, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Tool name, e.g. "FileOps"
    pub tool: String,

    /// Action name, e.g. "scan"
    pub action: String,

    /// Heterogeneous string-keyed argument map
    #[serde(default)]
    pub args: HashMap<String, Value>,

    /// Risk level 0..=3
    pub risk: u8,
}

impl Step {
    pub fn new(tool: impl Into<String>, action: impl Into<String>, risk: u8) -> Self {
        Step {
            tool: tool.into(),
            action: action.into(),
            args: HashMap::new(),
            risk,
        }
    }

    /// Builder-style argument insertion (mostly for tests and inverses)
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Mutating steps (risk >= 1) are journaled and eligible for rollback
    pub fn is_mutating(&self) -> bool {
        self.risk >= RISK_CREATE
    }

    /// Destructive steps (risk == 3) require explicit confirmation
    pub fn is_destructive(&self) -> bool {
        self.risk >= RISK_DESTROY
    }

    /// String argument lookup with JSON scalars coerced to text
    pub fn arg_str(&self, key: &str) -> Option<String> {
        self.args.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Structured plan produced by the LLM
///
/// Goal description, confirmation flag, ordered steps. Steps may be
/// empty; ordering defines sequential semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Intent {
    /// Short description of the user's goal
    pub goal: String,

    /// True when the plan contains work the user must acknowledge
    pub requires_confirmation: bool,

    /// Steps to execute, in order
    pub steps: Vec<Step>,
}

impl Intent {
    /// Validate structural invariants: non-empty tool/action, risk bounds
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (index, step) in self.steps.iter().enumerate() {
            if step.tool.trim().is_empty() {
                return Err(ValidationError::EmptyTool(index));
            }
            if step.action.trim().is_empty() {
                return Err(ValidationError::EmptyAction(index));
            }
            if step.risk > RISK_DESTROY {
                return Err(ValidationError::RiskOutOfRange {
                    index,
                    risk: step.risk,
                });
            }
        }
        Ok(())
    }

    /// Highest risk level across all steps (0 for an empty plan)
    pub fn max_risk(&self) -> u8 {
        self.steps.iter().map(|s| s.risk).max().unwrap_or(RISK_READ)
    }

    /// True when any step is destructive (risk == 3)
    pub fn has_destructive_step(&self) -> bool {
        self.steps.iter().any(Step::is_destructive)
    }
}
