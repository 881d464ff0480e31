//! Rollback engine
//!
//! Replays inverse operations for the most recent completed, not-yet-
//! rolled-back actions, newest first. Inverses run through the plan
//! executor (subject to safety, with the rollback acknowledged as
//! confirmation); records without an inverse hint are rejected before
//! anything executes.

use crate::engine::{ExecOptions, PlanExecutor};
use crate::intent::Intent;
use crate::journal::tracker::{ActionRecord, ActionTracker, JournalError};
use crate::tools::ToolRegistry;
use std::sync::Arc;
use tracing::{info, warn};

/// Rollback failures
#[derive(Debug, thiserror::Error)]
pub enum RollbackError {
    /// A selected action has no declared inverse
    #[error("cannot roll back {tool}.{action} (transaction {transaction_id}, seq {sequence}): action is not invertible")]
    NotInvertible {
        transaction_id: String,
        sequence: u64,
        tool: String,
        action: String,
    },

    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// Outcome of a rollback run
#[derive(Debug)]
pub struct RollbackReport {
    pub rolled_back: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    /// Human-readable inverse plan, in execution order
    pub planned: Vec<String>,
    pub dry_run: bool,
}

/// Reverse-order rollback over the action journal
pub struct RollbackEngine {
    tracker: Arc<ActionTracker>,
    executor: PlanExecutor,
}

impl RollbackEngine {
    pub fn new(tracker: Arc<ActionTracker>, registry: Arc<ToolRegistry>) -> Self {
        // Inverse executions are not re-journaled
        Self {
            tracker,
            executor: PlanExecutor::new(registry),
        }
    }

    /// Roll back the last `n` mutating actions
    pub async fn rollback(&self, n: usize, dry_run: bool) -> Result<RollbackReport, RollbackError> {
        let actions = self.tracker.latest_actions(n)?;

        // Reject non-invertible selections before executing anything
        for action in &actions {
            if action.inverse_hint.is_none() {
                return Err(RollbackError::NotInvertible {
                    transaction_id: action.transaction_id.clone(),
                    sequence: action.sequence,
                    tool: action.tool.clone(),
                    action: action.action.clone(),
                });
            }
        }

        let planned: Vec<String> = actions.iter().map(describe_inverse).collect();

        let mut report = RollbackReport {
            rolled_back: 0,
            failed: 0,
            errors: Vec::new(),
            planned,
            dry_run,
        };
        if dry_run {
            return Ok(report);
        }

        for action in &actions {
            let inverse = action
                .inverse_hint
                .clone()
                .expect("checked above");

            let intent = Intent {
                goal: format!("Roll back {}.{}", action.tool, action.action),
                requires_confirmation: true,
                steps: vec![inverse],
            };

            // The rollback command itself is the acknowledgement
            let options = ExecOptions {
                confirmed: true,
                ..Default::default()
            };
            match self.executor.execute(&intent, "rollback", options).await {
                // A skipped inverse restored nothing; count it as failed
                Ok(results)
                    if results
                        .first()
                        .is_some_and(|r| r.recovered_by.as_deref() == Some("skip")) =>
                {
                    let detail = results[0].output.clone();
                    warn!(
                        transaction = %action.transaction_id,
                        sequence = action.sequence,
                        "inverse operation skipped"
                    );
                    report.failed += 1;
                    report
                        .errors
                        .push(format!("{}.{}: inverse {}", action.tool, action.action, detail));
                }
                Ok(_) => {
                    info!(
                        transaction = %action.transaction_id,
                        sequence = action.sequence,
                        "action rolled back"
                    );
                    self.tracker
                        .mark_rolled_back(&action.transaction_id, action.sequence)?;
                    report.rolled_back += 1;
                }
                Err(err) => {
                    warn!(
                        transaction = %action.transaction_id,
                        sequence = action.sequence,
                        error = %err,
                        "inverse operation failed"
                    );
                    report.failed += 1;
                    report
                        .errors
                        .push(format!("{}.{}: {}", action.tool, action.action, err));
                }
            }
        }

        Ok(report)
    }
}

fn describe_inverse(record: &ActionRecord) -> String {
    match &record.inverse_hint {
        Some(step) => {
            let args = serde_json::to_string(&step.args).unwrap_or_else(|_| "{}".into());
            format!(
                "undo {}.{} via {}.{}({})",
                record.tool, record.action, step.tool, step.action, args
            )
        }
        None => format!("undo {}.{} (no inverse)", record.tool, record.action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Step;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> (Arc<ActionTracker>, Arc<ToolRegistry>, RollbackEngine) {
        let tracker =
            Arc::new(ActionTracker::open(dir.path().join("transactions.jsonl")).unwrap());
        let registry = Arc::new(ToolRegistry::with_default_tools());
        let engine = RollbackEngine::new(Arc::clone(&tracker), Arc::clone(&registry));
        (tracker, registry, engine)
    }

    fn move_step(src: &std::path::Path, dst: &std::path::Path) -> Step {
        Step::new("FileOps", "move", 1)
            .with_arg("source", src.to_str().unwrap())
            .with_arg("destination", dst.to_str().unwrap())
    }

    #[tokio::test]
    async fn test_rollback_two_moves_in_reverse_order() {
        let dir = TempDir::new().unwrap();
        let (tracker, registry, engine) = setup(&dir);

        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let c = dir.path().join("c.txt");
        let d = dir.path().join("d.txt");
        std::fs::write(&a, "first").unwrap();
        std::fs::write(&c, "second").unwrap();

        // Perform and journal: move a→b, then move c→d
        let txn = tracker.begin("moves", "Move files").unwrap();
        for (src, dst) in [(&a, &b), (&c, &d)] {
            let step = move_step(src, dst);
            std::fs::rename(src, dst).unwrap();
            let inverse = registry.inverse_hint(&step);
            tracker.record_action(&txn, &step, inverse).unwrap();
        }

        let report = engine.rollback(2, false).await.unwrap();
        assert_eq!(report.rolled_back, 2);
        assert_eq!(report.failed, 0);

        // Both files back at their origins
        assert!(a.exists());
        assert!(c.exists());
        assert!(!b.exists());
        assert!(!d.exists());

        // Newest action undone first: d→c before b→a
        assert!(report.planned[0].contains("d.txt"));
        assert!(report.planned[1].contains("b.txt"));

        // Records marked rolled back
        assert!(tracker.latest_actions(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_reports_plan_without_executing() {
        let dir = TempDir::new().unwrap();
        let (tracker, registry, engine) = setup(&dir);

        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "x").unwrap();

        let step = move_step(&a, &b);
        std::fs::rename(&a, &b).unwrap();
        let txn = tracker.begin("mv", "Move").unwrap();
        let inverse = registry.inverse_hint(&step);
        tracker.record_action(&txn, &step, inverse).unwrap();

        let report = engine.rollback(1, true).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.planned.len(), 1);
        assert_eq!(report.rolled_back, 0);

        // Nothing moved, nothing marked
        assert!(b.exists());
        assert_eq!(tracker.latest_actions(10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_invertible_action_rejected_before_any_execution() {
        let dir = TempDir::new().unwrap();
        let (tracker, _registry, engine) = setup(&dir);

        let txn = tracker.begin("wf", "Write").unwrap();
        let step = Step::new("FileOps", "write_file", 2)
            .with_arg("path", "/tmp/x")
            .with_arg("content", "data");
        tracker.record_action(&txn, &step, None).unwrap();

        let err = engine.rollback(1, false).await.unwrap_err();
        assert!(matches!(err, RollbackError::NotInvertible { .. }));
        assert!(err.to_string().contains("FileOps.write_file"));
    }

    #[tokio::test]
    async fn test_partial_failure_counts_and_continues() {
        let dir = TempDir::new().unwrap();
        let (tracker, registry, engine) = setup(&dir);

        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "x").unwrap();

        let txn = tracker.begin("mixed", "Mixed").unwrap();

        // A move whose inverse will fail: journal it but delete the moved
        // file so the inverse has nothing to move back
        let ghost_src = dir.path().join("ghost.txt");
        let ghost_dst = dir.path().join("ghost-moved.txt");
        std::fs::write(&ghost_src, "g").unwrap();
        let ghost_step = move_step(&ghost_src, &ghost_dst);
        std::fs::rename(&ghost_src, &ghost_dst).unwrap();
        let inverse = registry.inverse_hint(&ghost_step);
        tracker.record_action(&txn, &ghost_step, inverse).unwrap();
        std::fs::remove_file(&ghost_dst).unwrap();

        // A healthy move
        let step = move_step(&a, &b);
        std::fs::rename(&a, &b).unwrap();
        let inverse = registry.inverse_hint(&step);
        tracker.record_action(&txn, &step, inverse).unwrap();

        let report = engine.rollback(2, false).await.unwrap();
        assert_eq!(report.rolled_back, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(a.exists());
    }

    #[tokio::test]
    async fn test_rollback_with_empty_journal_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let (_tracker, _registry, engine) = setup(&dir);

        let report = engine.rollback(3, false).await.unwrap();
        assert_eq!(report.rolled_back, 0);
        assert!(report.planned.is_empty());
    }
}
