//! Execution engine
//!
//! Dependency-aware plan executor with safety checks, per-step error
//! recovery, journal recording and optional wave parallelism, plus the
//! adaptive planner that wraps it with per-step retry and adaptation.

mod dependency;
mod errors;
mod planner;
mod recovery;
mod result;

pub mod executor;

pub use dependency::{DependencyAnalyzer, DependencyGraph};
pub use errors::ExecutionError;
pub use executor::{ExecOptions, PlanExecutor};
pub use planner::{AdaptHook, AdaptivePlanner, FailureHook, HistoryEntry};
pub use recovery::{ErrorRecovery, RecoveryResult, RecoveryStats, RecoveryStrategy};
pub use result::StepResult;
