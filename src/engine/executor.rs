//! Plan executor
//!
//! Dispatches an intent's steps through the tool registry with safety
//! checks, error recovery, journal recording and audit logging. With
//! `parallel` enabled, independent steps run concurrently in dependency
//! waves, bounded by a semaphore sized from the CPU count. A step
//! failure cancels the rest of its wave and short-circuits later waves.

use crate::audit::AuditLogger;
use crate::engine::dependency::{output_placeholder, DependencyAnalyzer};
use crate::engine::errors::ExecutionError;
use crate::engine::recovery::{substitute_step, ErrorRecovery, RecoveryStrategy};
use crate::engine::result::StepResult;
use crate::intent::{check_step, Intent, Step};
use crate::journal::{ActionTracker, TransactionStatus};
use crate::tools::ToolRegistry;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Execution flags
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecOptions {
    /// Execute independent steps concurrently
    pub parallel: bool,
    /// Preview with safety results only; nothing is dispatched
    pub dry_run: bool,
    /// Caller acknowledged the plan's confirmation flag
    pub confirmed: bool,
}

/// Dependency-aware plan executor
///
/// Cheap to clone; all components are shared. The cancellation token
/// stops scheduling of pending work; in-flight tool calls finish but
/// their results are discarded and the transaction is marked failed.
#[derive(Clone)]
pub struct PlanExecutor {
    registry: Arc<ToolRegistry>,
    recovery: Arc<ErrorRecovery>,
    journal: Option<Arc<ActionTracker>>,
    audit: Option<Arc<AuditLogger>>,
    max_parallel: usize,
    cancel: CancellationToken,
}

impl PlanExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            registry,
            recovery: Arc::new(ErrorRecovery::new()),
            journal: None,
            audit: None,
            max_parallel: cores,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_recovery(mut self, recovery: Arc<ErrorRecovery>) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_journal(mut self, journal: Arc<ActionTracker>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute an intent; results come back in original step order
    pub async fn execute(
        &self,
        intent: &Intent,
        user_input: &str,
        options: ExecOptions,
    ) -> Result<Vec<StepResult>, ExecutionError> {
        intent
            .validate()
            .map_err(|e| ExecutionError::InvalidPlan(e.to_string()))?;

        if options.dry_run {
            return Ok(self.preview(intent, options.confirmed));
        }

        if intent.requires_confirmation && !options.confirmed {
            return Err(ExecutionError::ConfirmationRequired);
        }

        let txn_id = match &self.journal {
            Some(journal) => Some(journal.begin(user_input, &intent.goal)?),
            None => None,
        };
        if let Some(audit) = &self.audit {
            audit.log_execution_start(&intent.goal);
        }

        let graph = DependencyAnalyzer::build(&intent.steps);
        let run = if options.parallel && graph.can_parallelize() {
            self.execute_waves(intent, &txn_id, options.confirmed).await
        } else {
            self.execute_sequential(intent, &txn_id, options.confirmed)
                .await
        };

        match &run {
            Ok(_) => self.finish(&txn_id, TransactionStatus::Completed, true, None),
            Err(ExecutionError::Canceled) => {
                self.finish(&txn_id, TransactionStatus::Failed, false, Some("canceled"))
            }
            Err(err) => {
                let message = err.to_string();
                self.finish(&txn_id, TransactionStatus::Failed, false, Some(&message))
            }
        }

        run
    }

    /// Preview the plan: safety results only, nothing dispatched
    fn preview(&self, intent: &Intent, confirmed: bool) -> Vec<StepResult> {
        intent
            .steps
            .iter()
            .map(|step| match check_step(step, confirmed) {
                Ok(()) => StepResult {
                    success: true,
                    output: format!(
                        "dry-run: would invoke {}.{} (risk {})",
                        step.tool, step.action, step.risk
                    ),
                    error: None,
                    attempts: 0,
                    recovered_by: None,
                },
                Err(violation) => StepResult {
                    success: false,
                    output: String::new(),
                    error: Some(violation.to_string()),
                    attempts: 0,
                    recovered_by: None,
                },
            })
            .collect()
    }

    async fn execute_sequential(
        &self,
        intent: &Intent,
        txn_id: &Option<String>,
        confirmed: bool,
    ) -> Result<Vec<StepResult>, ExecutionError> {
        let mut outputs: Vec<Option<String>> = vec![None; intent.steps.len()];
        let mut results = Vec::with_capacity(intent.steps.len());

        for (index, step) in intent.steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(ExecutionError::Canceled);
            }
            let resolved = resolve_placeholders(step, &outputs);
            let result = self
                .run_step(&resolved, index, txn_id.as_deref(), confirmed)
                .await?;
            outputs[index] = Some(result.output.clone());
            results.push(result);
        }

        Ok(results)
    }

    async fn execute_waves(
        &self,
        intent: &Intent,
        txn_id: &Option<String>,
        confirmed: bool,
    ) -> Result<Vec<StepResult>, ExecutionError> {
        let graph = DependencyAnalyzer::build(&intent.steps);
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));

        let mut outputs: Vec<Option<String>> = vec![None; intent.steps.len()];
        let mut results: Vec<Option<StepResult>> = vec![None; intent.steps.len()];

        for wave in graph.waves() {
            if self.cancel.is_cancelled() {
                return Err(ExecutionError::Canceled);
            }

            let failed = Arc::new(AtomicBool::new(false));
            let mut join_set: JoinSet<(usize, Result<StepResult, ExecutionError>)> =
                JoinSet::new();

            for index in wave {
                let resolved = resolve_placeholders(&intent.steps[index], &outputs);
                let executor = self.clone();
                let semaphore = Arc::clone(&semaphore);
                let failed = Arc::clone(&failed);
                let txn = txn_id.clone();

                join_set.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                    // A failure in this wave cancels its remaining steps
                    if failed.load(Ordering::SeqCst) || executor.cancel.is_cancelled() {
                        return (index, Err(ExecutionError::Canceled));
                    }

                    let outcome = executor
                        .run_step(&resolved, index, txn.as_deref(), confirmed)
                        .await;
                    if outcome.is_err() {
                        failed.store(true, Ordering::SeqCst);
                    }
                    (index, outcome)
                });
            }

            let mut wave_error: Option<ExecutionError> = None;
            while let Some(joined) = join_set.join_next().await {
                let (index, outcome) = joined.expect("step task panicked");
                match outcome {
                    Ok(result) => {
                        outputs[index] = Some(result.output.clone());
                        results[index] = Some(result);
                    }
                    Err(err) => {
                        // Prefer the real failure over cancellations it caused
                        let is_cancel = matches!(err, ExecutionError::Canceled);
                        match wave_error {
                            None => wave_error = Some(err),
                            Some(ExecutionError::Canceled) if !is_cancel => {
                                wave_error = Some(err)
                            }
                            Some(_) => {}
                        }
                    }
                }
            }

            // Short-circuit subsequent waves
            if let Some(err) = wave_error {
                return Err(err);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    /// Run one step: safety, dispatch, recovery, journal, audit
    ///
    /// Public so the adaptive planner can drive steps individually.
    pub async fn run_step(
        &self,
        step: &Step,
        index: usize,
        txn_id: Option<&str>,
        confirmed: bool,
    ) -> Result<StepResult, ExecutionError> {
        if self.cancel.is_cancelled() {
            return Err(ExecutionError::Canceled);
        }

        if let Err(violation) = check_step(step, confirmed) {
            self.audit_step(step, &violation.to_string(), false);
            return Err(ExecutionError::BlockedByPolicy(violation));
        }

        // Dispatch-time resolution fails without touching recovery
        self.registry.resolve(&step.tool, &step.action)?;

        info!(index, tool = %step.tool, action = %step.action, "running step");

        match self.registry.invoke(step).await {
            Ok(output) => {
                self.record_mutation(txn_id, step)?;
                self.audit_step(step, &output, true);
                Ok(StepResult::ok(output))
            }
            Err(tool_error) => {
                warn!(index, error = %tool_error, "step failed, attempting recovery");
                let recovered = self.recovery.recover(&self.registry, step, &tool_error).await;

                if recovered.success {
                    // Skips made no changes; retried/substituted steps did
                    if recovered.strategy != RecoveryStrategy::Skip {
                        let executed = match recovered.strategy {
                            RecoveryStrategy::Alternative => {
                                substitute_step(step).unwrap_or_else(|| step.clone())
                            }
                            _ => step.clone(),
                        };
                        self.record_mutation(txn_id, &executed)?;
                    }
                    self.audit_step(step, &recovered.message, true);
                    Ok(StepResult::recovered(
                        recovered.message,
                        recovered.strategy.to_string(),
                        1 + recovered.attempts,
                    ))
                } else {
                    error!(index, cause = %recovered.message, "step failed permanently");
                    self.audit_step(step, &recovered.message, false);
                    Err(ExecutionError::StepFailed {
                        index,
                        tool: step.tool.clone(),
                        action: step.action.clone(),
                        cause: recovered.message,
                    })
                }
            }
        }
    }

    /// Open a transaction for a caller that drives steps itself
    pub(crate) fn begin_transaction(
        &self,
        user_input: &str,
        goal: &str,
    ) -> Result<Option<String>, ExecutionError> {
        match &self.journal {
            Some(journal) => Ok(Some(journal.begin(user_input, goal)?)),
            None => Ok(None),
        }
    }

    /// Close a transaction opened with `begin_transaction`
    pub(crate) fn close_transaction(
        &self,
        txn_id: &Option<String>,
        status: TransactionStatus,
        success: bool,
        message: Option<&str>,
    ) {
        self.finish(txn_id, status, success, message);
    }

    fn record_mutation(&self, txn_id: Option<&str>, step: &Step) -> Result<(), ExecutionError> {
        if !step.is_mutating() {
            return Ok(());
        }
        if let (Some(journal), Some(txn)) = (&self.journal, txn_id) {
            let inverse = self.registry.inverse_hint(step);
            journal.record_action(txn, step, inverse)?;
        }
        Ok(())
    }

    fn audit_step(&self, step: &Step, result: &str, success: bool) {
        if let Some(audit) = &self.audit {
            audit.log_step_result(&step.tool, &step.action, result, success);
        }
    }

    fn finish(
        &self,
        txn_id: &Option<String>,
        status: TransactionStatus,
        success: bool,
        message: Option<&str>,
    ) {
        if let (Some(journal), Some(txn)) = (&self.journal, txn_id) {
            if let Err(err) = journal.close(txn, status) {
                warn!(error = %err, "failed to close transaction");
            }
        }
        if let Some(audit) = &self.audit {
            audit.log_execution_end(success, message);
        }
    }
}

/// Replace `{{step_N.output}}` placeholders with earlier outputs
fn resolve_placeholders(step: &Step, outputs: &[Option<String>]) -> Step {
    let mut resolved = step.clone();
    for value in resolved.args.values_mut() {
        substitute_value(value, outputs);
    }
    resolved
}

fn substitute_value(value: &mut Value, outputs: &[Option<String>]) {
    match value {
        Value::String(s) => {
            for (index, output) in outputs.iter().enumerate() {
                if let Some(output) = output {
                    let placeholder = output_placeholder(index);
                    if s.contains(&placeholder) {
                        *s = s.replace(&placeholder, output);
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_value(item, outputs);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_value(item, outputs);
            }
        }
        _ => {}
    }
}
