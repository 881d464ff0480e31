//! CLI mode dispatch
//!
//! Builds the runtime and runs the selected mode. Exit codes: 0 on
//! success, 1 on error, 130 on user interrupt.

use crate::cli::shell::run_shell;
use crate::cli::{Mode, EXIT_FAILURE, EXIT_INTERRUPT, EXIT_SUCCESS};
use crate::config::Config;
use crate::engine::ExecOptions;
use crate::goal::GoalTermination;
use crate::intent::Intent;
use crate::runtime::{RunError, Runtime};
use std::io::Write;

/// Exit code for the process
pub type ExitCode = i32;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Dispatch a parsed CLI mode
pub async fn run_mode(mode: Mode) -> ExitCode {
    match mode {
        Mode::Help => {
            print_help();
            EXIT_SUCCESS
        }
        Mode::Version => {
            println!("zenus v{}", VERSION);
            EXIT_SUCCESS
        }
        other => {
            let runtime = match Runtime::initialize(Config::from_env()) {
                Ok(runtime) => runtime,
                Err(err) => {
                    eprintln!("Error: {:#}", err);
                    return EXIT_FAILURE;
                }
            };

            // Ctrl-C cancels the in-flight plan run
            let cancel = runtime.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });

            match other {
                Mode::Shell => run_shell(&runtime).await,
                Mode::Direct { text } => run_direct(&runtime, &text, false).await,
                Mode::DryRun { text } => run_direct(&runtime, &text, true).await,
                Mode::Iterative { text } => run_iterative(&runtime, &text).await,
                Mode::Rollback { count, dry_run } => run_rollback(&runtime, count, dry_run).await,
                Mode::History { failures } => run_history(&runtime, failures),
                Mode::Help | Mode::Version => unreachable!("handled above"),
            }
        }
    }
}

/// Translate and execute (or preview) free text
pub(crate) async fn run_direct(runtime: &Runtime, text: &str, dry_run: bool) -> ExitCode {
    // Stream the provider's output as it arrives, then show the plan
    let translated = match runtime
        .translate(text, false, |chunk| {
            print!("{}", chunk);
            let _ = std::io::stdout().flush();
        })
        .await
    {
        Ok(translated) => {
            println!();
            translated
        }
        Err(err) => {
            println!();
            return report_error(&err);
        }
    };

    print_plan(&translated.intent, &translated.provider);

    let confirmed = if translated.intent.requires_confirmation && !dry_run {
        if !prompt_confirmation() {
            println!("Aborted.");
            return EXIT_SUCCESS;
        }
        true
    } else {
        false
    };

    let options = ExecOptions {
        parallel: true,
        dry_run,
        confirmed,
    };
    match runtime.execute(&translated.intent, text, options).await {
        Ok(results) => {
            for (step, result) in translated.intent.steps.iter().zip(&results) {
                let marker = if result.success { "done" } else { "failed" };
                println!("  [{}] {}.{}: {}", marker, step.tool, step.action, result.output);
                if let Some(error) = &result.error {
                    println!("        {}", error);
                }
            }
            if translated.intent.steps.is_empty() {
                println!("  (plan has no steps)");
            }
            EXIT_SUCCESS
        }
        Err(err) => report_error(&err),
    }
}

pub(crate) async fn run_iterative(runtime: &Runtime, text: &str) -> ExitCode {
    match runtime.run_iterative(text).await {
        Ok(outcome) => {
            let label = match outcome.termination {
                GoalTermination::Achieved => "achieved",
                GoalTermination::Exhausted => "exhausted",
                GoalTermination::Stuck => "stuck",
            };
            println!(
                "Goal {} after {} iteration{} (confidence {:.2})",
                label,
                outcome.iterations,
                if outcome.iterations == 1 { "" } else { "s" },
                outcome.confidence
            );
            println!("{}", outcome.reasoning);
            if outcome.achieved {
                EXIT_SUCCESS
            } else {
                EXIT_FAILURE
            }
        }
        Err(err) => report_error(&err),
    }
}

pub(crate) async fn run_rollback(runtime: &Runtime, count: usize, dry_run: bool) -> ExitCode {
    match runtime.rollback(count, dry_run).await {
        Ok(report) => {
            if report.planned.is_empty() {
                println!("Nothing to roll back.");
                return EXIT_SUCCESS;
            }
            for line in &report.planned {
                println!("  {}", line);
            }
            if dry_run {
                println!("Dry run: no actions were rolled back.");
                return EXIT_SUCCESS;
            }
            println!(
                "Rolled back {} action{}, {} failed.",
                report.rolled_back,
                if report.rolled_back == 1 { "" } else { "s" },
                report.failed
            );
            for error in &report.errors {
                eprintln!("  error: {}", error);
            }
            if report.failed == 0 {
                EXIT_SUCCESS
            } else {
                EXIT_FAILURE
            }
        }
        Err(err) => report_error(&err),
    }
}

pub(crate) fn run_history(runtime: &Runtime, failures: bool) -> ExitCode {
    if failures {
        println!("{}", runtime.failure_summary());
        return EXIT_SUCCESS;
    }

    let transactions = runtime.recent_transactions(10);
    if transactions.is_empty() {
        println!("No transactions recorded yet.");
        return EXIT_SUCCESS;
    }
    for txn in transactions {
        println!(
            "{}  {:?}  {} action{}  \"{}\"",
            txn.opened_at.format("%Y-%m-%d %H:%M:%S"),
            txn.status,
            txn.action_count,
            if txn.action_count == 1 { "" } else { "s" },
            txn.user_input
        );
    }
    EXIT_SUCCESS
}

pub(crate) fn print_plan(intent: &Intent, provider: &str) {
    println!("Plan ({} via {}):", intent.goal, provider);
    for (index, step) in intent.steps.iter().enumerate() {
        let args = serde_json::to_string(&step.args).unwrap_or_else(|_| "{}".to_string());
        println!(
            "  {}. {}.{} {} (risk {})",
            index + 1,
            step.tool,
            step.action,
            args,
            step.risk
        );
    }
    if intent.requires_confirmation {
        println!("  ! plan contains destructive steps and requires confirmation");
    }
}

pub(crate) fn prompt_confirmation() -> bool {
    print!("This plan requires confirmation. Proceed? [y/N] ");
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub(crate) fn report_error(err: &RunError) -> ExitCode {
    if err.is_canceled() {
        eprintln!("Interrupted.");
        return EXIT_INTERRUPT;
    }

    eprintln!("Error: {}", err);
    if let Some(suggestion) = err.suggestion() {
        eprintln!("Suggestion: {}", suggestion);
    }
    if let Some(hint) = err.hint() {
        eprintln!("Hint: {}", hint);
    }
    EXIT_FAILURE
}

fn print_help() {
    println!(
        r#"zenus v{} - intent execution engine

USAGE:
    zenus [OPTIONS] [COMMAND | free text]

COMMANDS:
    shell                     Start the interactive shell (default)
    help                      Show this help message
    version                   Show version information
    rollback [N] [--dry-run]  Roll back the last N mutating actions (default 1)
    history [--failures]      List recent transactions, or the failure summary
    <free text>               Translate and execute immediately

OPTIONS:
    --dry-run <text...>       Translate and validate, print the plan, do not execute
    --iterative <text...>     Drive the goal tracker until the goal is achieved

EXAMPLES:
    zenus                                     # interactive shell
    zenus "list files in ~/Documents"         # direct execution
    zenus --dry-run "delete all tmp files"    # preview without executing
    zenus --iterative "organize my downloads" # iterate until done
    zenus rollback 2                          # undo the last two actions

ENVIRONMENT:
    ZENUS_LLM                 Provider: openai (default), deepseek, ollama, stub
    OPENAI_API_KEY            Key for the OpenAI provider
    DEEPSEEK_API_KEY          Key for the DeepSeek provider
    OLLAMA_MODEL              Local model name (default phi3:mini)
    ZENUS_HOME                Data directory (default ~/.zenus)

LOGS:
    Session and transaction logs live under the data directory."#,
        VERSION
    );
}
