//! Adaptive planner
//!
//! Wraps the executor with per-step retry and failure-based adaptation.
//! When the adapt hook proposes an alternative step, it replaces the
//! failing one for the next attempt; otherwise the step fails
//! permanently once its retries are spent and the plan aborts.

use crate::engine::errors::ExecutionError;
use crate::engine::executor::PlanExecutor;
use crate::engine::result::StepResult;
use crate::intent::{Intent, Step};
use crate::journal::TransactionStatus;
use tracing::{info, warn};

/// One executed attempt in the planner's history
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub step: Step,
    pub result: StepResult,
    /// 0 for the first attempt, counting retries upward
    pub attempt: u32,
}

/// Hook proposing an alternative step after a failure
pub type AdaptHook = Box<dyn Fn(&Step, &StepResult, &[HistoryEntry]) -> Option<Step> + Send + Sync>;

/// Hook observing failures (logging, user feedback)
pub type FailureHook = Box<dyn Fn(&Step, &StepResult) + Send + Sync>;

/// Executor wrapper with per-step retry and adaptation
pub struct AdaptivePlanner {
    executor: PlanExecutor,
    max_retries: u32,
    adapt: Option<AdaptHook>,
    on_failure: Option<FailureHook>,
    history: Vec<HistoryEntry>,
}

impl AdaptivePlanner {
    pub fn new(executor: PlanExecutor) -> Self {
        Self {
            executor,
            max_retries: 2,
            adapt: None,
            on_failure: None,
            history: Vec::new(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_adapt(mut self, hook: AdaptHook) -> Self {
        self.adapt = Some(hook);
        self
    }

    pub fn with_on_failure(mut self, hook: FailureHook) -> Self {
        self.on_failure = Some(hook);
        self
    }

    /// Execution history of (step, result, attempt)
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Execute a plan with per-step retry and adaptation
    pub async fn execute_adaptive(
        &mut self,
        intent: &Intent,
        user_input: &str,
        confirmed: bool,
    ) -> Result<Vec<StepResult>, ExecutionError> {
        intent
            .validate()
            .map_err(|e| ExecutionError::InvalidPlan(e.to_string()))?;
        if intent.requires_confirmation && !confirmed {
            return Err(ExecutionError::ConfirmationRequired);
        }

        let txn_id = self.executor.begin_transaction(user_input, &intent.goal)?;
        let mut results = Vec::with_capacity(intent.steps.len());

        for (index, original) in intent.steps.iter().enumerate() {
            match self
                .run_with_retry(original.clone(), index, &txn_id, confirmed)
                .await
            {
                Ok(result) => results.push(result),
                Err(err) => {
                    let message = err.to_string();
                    self.executor.close_transaction(
                        &txn_id,
                        TransactionStatus::Failed,
                        false,
                        Some(&message),
                    );
                    return Err(err);
                }
            }
        }

        self.executor
            .close_transaction(&txn_id, TransactionStatus::Completed, true, None);
        Ok(results)
    }

    async fn run_with_retry(
        &mut self,
        mut step: Step,
        index: usize,
        txn_id: &Option<String>,
        confirmed: bool,
    ) -> Result<StepResult, ExecutionError> {
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                info!(index, attempt, "retrying step");
            }

            match self
                .executor
                .run_step(&step, index, txn_id.as_deref(), confirmed)
                .await
            {
                Ok(result) => {
                    self.history.push(HistoryEntry {
                        step: step.clone(),
                        result: result.clone(),
                        attempt,
                    });
                    return Ok(result);
                }

                // Step-level failures feed the hooks and may be retried
                Err(ExecutionError::StepFailed {
                    index,
                    tool,
                    action,
                    cause,
                }) => {
                    let failed = StepResult::failed(cause.clone()).with_attempts(attempt + 1);
                    if let Some(on_failure) = &self.on_failure {
                        on_failure(&step, &failed);
                    }
                    self.history.push(HistoryEntry {
                        step: step.clone(),
                        result: failed.clone(),
                        attempt,
                    });

                    if attempt >= self.max_retries {
                        return Err(ExecutionError::StepFailed {
                            index,
                            tool,
                            action,
                            cause,
                        });
                    }

                    if let Some(adapt) = &self.adapt {
                        if let Some(alternative) = adapt(&step, &failed, &self.history) {
                            warn!(
                                index,
                                tool = %alternative.tool,
                                action = %alternative.action,
                                "adapting failed step"
                            );
                            step = alternative;
                        }
                    }
                    attempt += 1;
                }

                // Policy, dispatch, cancellation: not retriable
                Err(other) => return Err(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolError, ToolRegistry};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Tool whose "broken" action always aborts and whose "fixed" action
    /// succeeds; "counted" fails a set number of times with fatal errors.
    struct Scriptable {
        fatal_left: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Tool for Scriptable {
        fn name(&self) -> &'static str {
            "Scriptable"
        }
        fn actions(&self) -> &'static [&'static str] {
            &["broken", "fixed", "counted"]
        }
        async fn invoke(
            &self,
            action: &str,
            _args: &HashMap<String, Value>,
        ) -> Result<String, ToolError> {
            match action {
                "broken" => Err(ToolError::Failed("unrecoverable widget jam".into())),
                "fixed" => Ok("fixed output".to_string()),
                "counted" => {
                    if self
                        .fatal_left
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                        .is_ok()
                    {
                        Err(ToolError::Failed("unrecoverable widget jam".into()))
                    } else {
                        Ok("eventually fine".to_string())
                    }
                }
                other => Err(ToolError::ActionNotFound {
                    tool: "Scriptable".into(),
                    action: other.into(),
                }),
            }
        }
    }

    fn planner(fatal_left: u32) -> AdaptivePlanner {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(Scriptable {
            fatal_left: Arc::new(AtomicU32::new(fatal_left)),
        }));
        AdaptivePlanner::new(PlanExecutor::new(Arc::new(registry)))
    }

    fn plan(action: &str) -> Intent {
        Intent {
            goal: "test".to_string(),
            requires_confirmation: false,
            steps: vec![Step::new("Scriptable", action, 0)],
        }
    }

    #[tokio::test]
    async fn test_successful_step_recorded_once() {
        let mut planner = planner(0);
        let results = planner
            .execute_adaptive(&plan("fixed"), "x", false)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(planner.history().len(), 1);
        assert_eq!(planner.history()[0].attempt, 0);
    }

    #[tokio::test]
    async fn test_per_step_retry_eventually_succeeds() {
        let mut planner = planner(2);
        let results = planner
            .execute_adaptive(&plan("counted"), "x", false)
            .await
            .unwrap();

        assert_eq!(results[0].output, "eventually fine");
        // Two failed attempts plus the final success
        assert_eq!(planner.history().len(), 3);
        assert_eq!(planner.history()[2].attempt, 2);
    }

    #[tokio::test]
    async fn test_step_fails_permanently_after_retries() {
        let mut planner = planner(0).with_max_retries(1);
        let err = planner
            .execute_adaptive(&plan("broken"), "x", false)
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::StepFailed { .. }));
        // First attempt + one retry
        assert_eq!(planner.history().len(), 2);
    }

    #[tokio::test]
    async fn test_adapt_hook_replaces_failing_step() {
        let mut planner = planner(0).with_adapt(Box::new(|step, _result, _history| {
            (step.action == "broken").then(|| Step::new("Scriptable", "fixed", 0))
        }));

        let results = planner
            .execute_adaptive(&plan("broken"), "x", false)
            .await
            .unwrap();

        assert_eq!(results[0].output, "fixed output");
        // Failed original, then the adapted replacement
        assert_eq!(planner.history().len(), 2);
        assert_eq!(planner.history()[1].step.action, "fixed");
    }

    #[tokio::test]
    async fn test_on_failure_hook_observes_each_failure() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = Arc::clone(&seen);

        let mut planner = planner(0)
            .with_max_retries(2)
            .with_on_failure(Box::new(move |_step, _result| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
            }));

        let _ = planner.execute_adaptive(&plan("broken"), "x", false).await;
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_confirmation_gate_applies() {
        let mut planner = planner(0);
        let mut intent = plan("fixed");
        intent.requires_confirmation = true;

        let err = planner
            .execute_adaptive(&intent, "x", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::ConfirmationRequired));
    }
}
