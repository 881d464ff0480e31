//! Goal tracker
//!
//! Bounded iterative loop: translate the goal, execute the plan,
//! collect observations, reflect, decide. Termination rules, in order:
//! achieved with confidence ≥ threshold; iteration limit reached; no
//! next steps while unachieved; otherwise continue with the reflection's
//! next steps as the new input.

use crate::engine::{ExecOptions, ExecutionError, PlanExecutor};
use crate::goal::reflection::Reflection;
use crate::llm::{Brain, BrainError};
use std::sync::Arc;
use tracing::{info, warn};

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalTermination {
    /// Achieved with sufficient confidence
    Achieved,
    /// Iteration limit reached
    Exhausted,
    /// Not achieved and no next steps proposed
    Stuck,
}

/// Final state of an iterative goal run
#[derive(Debug)]
pub struct GoalOutcome {
    pub termination: GoalTermination,
    pub achieved: bool,
    pub confidence: f64,
    pub reasoning: String,
    pub iterations: u32,
    pub observations: Vec<String>,
}

/// Goal-loop errors
#[derive(Debug, thiserror::Error)]
pub enum GoalError {
    #[error(transparent)]
    Brain(#[from] BrainError),

    #[error("goal run canceled")]
    Canceled,
}

/// Bounded ReAct-style goal tracker
pub struct GoalTracker {
    max_iterations: u32,
    confidence_threshold: f64,
}

impl GoalTracker {
    pub fn new() -> Self {
        Self {
            max_iterations: 10,
            confidence_threshold: 0.7,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Drive a goal to completion or a terminal state
    ///
    /// `confirmed` acknowledges destructive plans for the whole run.
    pub async fn run(
        &self,
        brain: Arc<Brain>,
        executor: &PlanExecutor,
        user_goal: &str,
        confirmed: bool,
    ) -> Result<GoalOutcome, GoalError> {
        let mut input = user_goal.to_string();
        let mut observations: Vec<String> = Vec::new();

        for iteration in 1..=self.max_iterations {
            info!(iteration, input = %input, "goal iteration");

            // Translate on a blocking thread; provider transport is sync
            let translated = {
                let brain = Arc::clone(&brain);
                let input = input.clone();
                tokio::task::spawn_blocking(move || brain.translate(&input, true))
                    .await
                    .expect("translate task panicked")?
            };
            let intent = translated.intent;

            // Execute; failures become observations for the next reflection
            let options = ExecOptions {
                parallel: true,
                confirmed,
                ..Default::default()
            };
            match executor.execute(&intent, &input, options).await {
                Ok(results) => {
                    for (step, result) in intent.steps.iter().zip(&results) {
                        observations.push(format!(
                            "{}.{} -> {}",
                            step.tool, step.action, result.output
                        ));
                    }
                    if intent.steps.is_empty() {
                        observations.push("plan contained no steps".to_string());
                    }
                }
                Err(ExecutionError::Canceled) => return Err(GoalError::Canceled),
                Err(err) => {
                    warn!(iteration, error = %err, "plan execution failed");
                    observations.push(format!("execution failed: {}", err));
                }
            }

            // Reflect; a failed reflection keeps the loop going
            let reflection = {
                let brain = Arc::clone(&brain);
                let goal = user_goal.to_string();
                let obs = observations.clone();
                let intent_for_prompt = intent.clone();
                let reflected = tokio::task::spawn_blocking(move || {
                    brain.reflect(&goal, &intent_for_prompt, &obs)
                })
                .await
                .expect("reflect task panicked");

                match reflected {
                    Ok(text) => Reflection::parse(&text),
                    Err(err) => {
                        warn!(iteration, error = %err, "reflection failed");
                        Reflection {
                            reasoning: format!("Could not determine goal status: {}", err),
                            next_steps: vec!["continue with the next logical step".to_string()],
                            ..Reflection::default()
                        }
                    }
                }
            };

            // Terminal rules, evaluated in order
            if reflection.achieved && reflection.confidence >= self.confidence_threshold {
                return Ok(GoalOutcome {
                    termination: GoalTermination::Achieved,
                    achieved: true,
                    confidence: reflection.confidence,
                    reasoning: reflection.reasoning,
                    iterations: iteration,
                    observations,
                });
            }

            if iteration >= self.max_iterations {
                return Ok(GoalOutcome {
                    termination: GoalTermination::Exhausted,
                    achieved: false,
                    confidence: reflection.confidence,
                    reasoning: format!(
                        "Maximum iterations ({}) reached. Task may be too complex or ill-defined.",
                        self.max_iterations
                    ),
                    iterations: iteration,
                    observations,
                });
            }

            if reflection.next_steps.is_empty() {
                return Ok(GoalOutcome {
                    termination: GoalTermination::Stuck,
                    achieved: false,
                    confidence: reflection.confidence,
                    reasoning: reflection.reasoning,
                    iterations: iteration,
                    observations,
                });
            }

            input = reflection.next_steps.join("; ");
        }

        unreachable!("loop always terminates via the rules above")
    }
}

impl Default for GoalTracker {
    fn default() -> Self {
        Self::new()
    }
}
