//! Runtime
//!
//! Process-lifetime environment: providers, registry, journal, failure
//! store, memory and audit log, constructed once at startup and passed
//! explicitly — no hidden module state. The CLI layers (shell, direct
//! mode, iterative mode) drive everything through this struct.

use crate::audit::AuditLogger;
use crate::config::{bootstrap, Config, DataPaths};
use crate::engine::{ExecOptions, ExecutionError, PlanExecutor, StepResult};
use crate::failures::{normalize_signature, FailureLogger};
use crate::goal::{GoalError, GoalOutcome, GoalTracker};
use crate::intent::Intent;
use crate::journal::{ActionTracker, RollbackEngine, RollbackError, RollbackReport, TransactionSummary};
use crate::llm::adapters::factory::create_provider;
use crate::llm::{Brain, BrainError, ModelRouter, Translated};
use crate::memory::{IntentHistory, SuggestionMemory, WorldModel};
use crate::tools::{ToolError, ToolRegistry};
use anyhow::Context;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Top-level run errors surfaced to the user
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Brain(#[from] BrainError),

    #[error("{source}")]
    Execution {
        #[source]
        source: ExecutionError,
        /// Learned suggestion from the pattern store, if any
        suggestion: Option<String>,
        /// Next-action hint for the user
        hint: Option<String>,
    },

    #[error(transparent)]
    Goal(#[from] GoalError),

    #[error(transparent)]
    Rollback(#[from] RollbackError),
}

impl RunError {
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            RunError::Execution { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            RunError::Execution { hint, .. } => hint.as_deref(),
            RunError::Brain(_) => {
                Some("check provider configuration (ZENUS_LLM, API keys) and connectivity")
            }
            _ => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            RunError::Execution {
                source: ExecutionError::Canceled,
                ..
            } | RunError::Goal(GoalError::Canceled)
        )
    }
}

/// A completed plan run
#[derive(Debug)]
pub struct RunOutcome {
    pub intent: Intent,
    pub provider: String,
    pub results: Vec<StepResult>,
}

/// Process-lifetime engine environment
pub struct Runtime {
    pub config: Config,
    paths: DataPaths,
    brain: Arc<Brain>,
    tracker: Arc<ActionTracker>,
    failures: Arc<FailureLogger>,
    world: Arc<WorldModel>,
    history: Arc<IntentHistory>,
    audit: Arc<AuditLogger>,
    suggestions: Arc<SuggestionMemory>,
    executor: PlanExecutor,
    rollback_engine: RollbackEngine,
    cancel: CancellationToken,
}

impl Runtime {
    /// Build the runtime from configuration
    pub fn initialize(config: Config) -> anyhow::Result<Self> {
        let paths = bootstrap(&config.data_dir).with_context(|| {
            format!("cannot prepare data directory {}", config.data_dir.display())
        })?;

        // Construct every provider the chain names; skip the unconfigured
        let mut providers = Vec::new();
        let mut available = Vec::new();
        for name in &config.fallback_chain {
            match create_provider(name) {
                Ok(adapter) => {
                    available.push(name.clone());
                    providers.push(adapter);
                }
                Err(err) => warn!(provider = %name, error = %err, "provider unavailable"),
            }
        }
        if providers.is_empty() {
            anyhow::bail!(
                "no LLM provider available (tried: {}); set the matching API key, or ZENUS_LLM=ollama for a local model",
                config.fallback_chain.join(", ")
            );
        }

        let pick = |preferred: &str| -> String {
            if available.iter().any(|p| p == preferred) {
                preferred.to_string()
            } else {
                available[0].clone()
            }
        };
        let router = ModelRouter::new(pick(&config.cheap_provider), pick(&config.powerful_provider));
        let brain = Arc::new(Brain::new(providers, available, router));

        let registry = Arc::new(ToolRegistry::with_default_tools());
        let tracker = Arc::new(ActionTracker::open(&paths.transactions_file)?);
        let failures = Arc::new(FailureLogger::open(&paths.failures_db)?);
        let world = Arc::new(WorldModel::load(&paths.world_model_file));
        let history = Arc::new(IntentHistory::new(&paths.history_dir)?);
        let audit = Arc::new(AuditLogger::new(&paths.logs_dir)?);
        let suggestions = Arc::new(SuggestionMemory::load(&paths.suggestions_file));

        let cancel = CancellationToken::new();
        let executor = PlanExecutor::new(Arc::clone(&registry))
            .with_journal(Arc::clone(&tracker))
            .with_audit(Arc::clone(&audit))
            .with_max_parallel(config.max_parallel)
            .with_cancellation(cancel.clone());
        let rollback_engine = RollbackEngine::new(Arc::clone(&tracker), Arc::clone(&registry));

        info!(
            data_dir = %config.data_dir.display(),
            providers = %config.fallback_chain.join(","),
            "runtime initialized"
        );

        Ok(Self {
            config,
            paths,
            brain,
            tracker,
            failures,
            world,
            history,
            audit,
            suggestions,
            executor,
            rollback_engine,
            cancel,
        })
    }

    /// Token canceling in-flight plan runs (wired to Ctrl-C)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub fn data_paths(&self) -> &DataPaths {
        &self.paths
    }

    /// Translate user input, streaming chunks to `on_chunk`
    pub async fn translate<F>(
        &self,
        input: &str,
        iterative: bool,
        on_chunk: F,
    ) -> Result<Translated, RunError>
    where
        F: FnMut(&str) + Send + 'static,
    {
        let brain = Arc::clone(&self.brain);
        let input = input.to_string();
        let translated = tokio::task::spawn_blocking(move || {
            let mut on_chunk = on_chunk;
            brain.translate_streaming(&input, iterative, None, &mut on_chunk)
        })
        .await
        .expect("translate task panicked")?;

        Ok(translated)
    }

    /// Execute a translated intent
    pub async fn execute(
        &self,
        intent: &Intent,
        user_input: &str,
        options: ExecOptions,
    ) -> Result<Vec<StepResult>, RunError> {
        self.audit.log_intent(
            user_input,
            intent,
            if options.dry_run { "dry-run" } else { "execution" },
        );

        match self.executor.execute(intent, user_input, options).await {
            Ok(results) => {
                if !options.dry_run {
                    let success = results.iter().all(|r| r.success);
                    self.history.record(user_input, intent, &results, success);
                    self.note_world_paths(intent);
                }
                Ok(results)
            }
            Err(err) => {
                if !options.dry_run {
                    self.history.record(user_input, intent, &[], false);
                }
                Err(self.enrich_execution_error(err, intent, user_input))
            }
        }
    }

    /// One-shot pipeline: translate then execute
    pub async fn run_text(
        &self,
        input: &str,
        options: ExecOptions,
    ) -> Result<RunOutcome, RunError> {
        let translated = self.translate(input, false, |_| {}).await?;
        let results = self.execute(&translated.intent, input, options).await?;
        Ok(RunOutcome {
            intent: translated.intent,
            provider: translated.provider,
            results,
        })
    }

    /// Iterative goal-tracker mode
    pub async fn run_iterative(&self, input: &str) -> Result<GoalOutcome, RunError> {
        let tracker = GoalTracker::new().with_max_iterations(self.config.max_iterations);
        let outcome = tracker
            .run(Arc::clone(&self.brain), &self.executor, input, false)
            .await?;

        self.audit.log_info(
            "iterative_run",
            json!({
                "achieved": outcome.achieved,
                "iterations": outcome.iterations,
                "confidence": outcome.confidence,
            }),
        );
        Ok(outcome)
    }

    /// Roll back the last `n` mutating actions
    pub async fn rollback(&self, n: usize, dry_run: bool) -> Result<RollbackReport, RunError> {
        let report = self.rollback_engine.rollback(n, dry_run).await?;
        if !dry_run {
            self.audit.log_info(
                "rollback",
                json!({"rolled_back": report.rolled_back, "failed": report.failed}),
            );
        }
        Ok(report)
    }

    /// Recent transactions for the `history` command
    pub fn recent_transactions(&self, limit: usize) -> Vec<TransactionSummary> {
        self.tracker.recent_transactions(limit).unwrap_or_default()
    }

    /// Failure summary for `history --failures`
    pub fn failure_summary(&self) -> String {
        match self.failures.stats() {
            Ok(stats) => {
                let mut lines = vec![
                    format!("Failures recorded: {}", stats.total),
                    format!("Last 7 days: {}", stats.recent_7_days),
                ];
                if !stats.by_tool.is_empty() {
                    lines.push("By tool:".to_string());
                    for (tool, count) in &stats.by_tool {
                        lines.push(format!("  {} - {}", tool, count));
                    }
                }
                if !stats.by_error_kind.is_empty() {
                    lines.push("By error kind:".to_string());
                    for (kind, count) in &stats.by_error_kind {
                        lines.push(format!("  {} - {}", kind, count));
                    }
                }
                lines.join("\n")
            }
            Err(err) => format!("failure store unavailable: {}", err),
        }
    }

    /// Status summary for the shell
    pub fn status_summary(&self) -> String {
        let mut lines = vec![format!("LLM provider: {}", self.config.provider)];
        for name in &self.config.fallback_chain {
            if let Some(breaker) = self.brain.circuit(name) {
                let snap = breaker.snapshot();
                lines.push(format!(
                    "  {}: circuit {} ({} requests, {:.0}% failures)",
                    name,
                    snap.state,
                    snap.total_requests,
                    snap.failure_rate * 100.0
                ));
            }
        }
        lines.push(self.world.summary());
        lines.push(format!(
            "Success rate (7 days): {:.0}%",
            self.history.success_rate(7) * 100.0
        ));
        lines.join("\n")
    }

    /// Memory summary for the shell's `memory` command
    pub fn memory_summary(&self) -> String {
        let mut lines = vec![self.world.summary()];
        let frequent = self.world.frequent_paths(5);
        if !frequent.is_empty() {
            lines.push("Frequent paths:".to_string());
            for path in frequent {
                lines.push(format!("  {}", path));
            }
        }
        lines.push(format!(
            "Success rate (7 days): {:.0}%",
            self.history.success_rate(7) * 100.0
        ));
        lines.join("\n")
    }

    /// Track frequently touched paths from a plan's mutating steps
    fn note_world_paths(&self, intent: &Intent) {
        for step in &intent.steps {
            if !step.is_mutating() {
                continue;
            }
            for key in ["path", "destination"] {
                if let Some(path) = step.arg_str(key) {
                    self.world.record_path_access(&path);
                }
            }
        }
    }

    /// Attach failure learning and a next-action hint to an error
    fn enrich_execution_error(
        &self,
        err: ExecutionError,
        intent: &Intent,
        user_input: &str,
    ) -> RunError {
        let (tool, action, message, kind) = match &err {
            ExecutionError::StepFailed {
                tool,
                action,
                cause,
                ..
            } => (tool.clone(), action.clone(), cause.clone(), "step_failed"),
            ExecutionError::BlockedByPolicy(violation) => (
                violation.tool.clone(),
                violation.action.clone(),
                violation.to_string(),
                "blocked_by_policy",
            ),
            ExecutionError::Dispatch(tool_err) => {
                let (tool, action) = match tool_err {
                    ToolError::ToolNotFound(tool) => (tool.clone(), String::new()),
                    ToolError::ActionNotFound { tool, action } => (tool.clone(), action.clone()),
                    other => (other.to_string(), String::new()),
                };
                (tool, action, tool_err.to_string(), "dispatch")
            }
            ExecutionError::Canceled => {
                return RunError::Execution {
                    source: err,
                    suggestion: None,
                    hint: None,
                }
            }
            // Not a failure to learn from; just tell the user what to do
            ExecutionError::ConfirmationRequired => {
                return RunError::Execution {
                    source: err,
                    suggestion: None,
                    hint: Some("rerun and confirm, or preview with --dry-run".to_string()),
                }
            }
            other => (String::new(), String::new(), other.to_string(), "execution"),
        };

        if let Err(log_err) = self.failures.log_failure(
            user_input,
            &tool,
            &action,
            kind,
            &message,
            &json!({"goal": intent.goal}),
            None,
        ) {
            warn!(error = %log_err, "failure logging failed");
        }

        // Surface a learned suggestion once per pattern
        let suggestion = self
            .failures
            .suggestion_for(&tool, &action, &message)
            .ok()
            .flatten()
            .filter(|_| {
                let key = normalize_signature(&tool, &action, &message);
                if self.suggestions.has_suggested(&key) {
                    false
                } else {
                    self.suggestions.mark_suggested(&key);
                    true
                }
            });

        let hint = Some("rerun with --dry-run to inspect the plan".to_string());

        self.audit.log_error(&message, json!({"user_input": user_input}));

        RunError::Execution {
            source: err,
            suggestion,
            hint,
        }
    }
}
