//! Execution engine errors

use crate::intent::PolicyViolation;
use crate::journal::JournalError;
use crate::tools::ToolError;

/// Execution engine errors
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// Plan failed structural validation
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Plan carries `requires_confirmation` and no acknowledgement was given
    #[error("plan requires confirmation before execution (rerun and confirm, or use --dry-run to preview)")]
    ConfirmationRequired,

    /// Safety policy rejected a step; always surfaces
    #[error(transparent)]
    BlockedByPolicy(#[from] PolicyViolation),

    /// Dispatch-time failure (tool/action/argument resolution)
    #[error(transparent)]
    Dispatch(#[from] ToolError),

    /// Step failed after recovery gave up; preserves the cause
    #[error("step {index} ({tool}.{action}) failed: {cause}")]
    StepFailed {
        index: usize,
        tool: String,
        action: String,
        cause: String,
    },

    /// Plan run canceled by the user
    #[error("plan run canceled")]
    Canceled,

    /// Journal write failed while recording a mutating step
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
}
