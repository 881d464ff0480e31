//! Interactive shell
//!
//! Line loop over stdin. Special commands (status, history, exit) are
//! routed before translation; `--dry-run` and `--iterative` prefixes
//! work inside the shell the same way they do on the command line.

use crate::cli::dispatch::{run_direct, run_history, run_iterative, run_rollback};
use crate::cli::{ExitCode, EXIT_INTERRUPT, EXIT_SUCCESS};
use crate::runtime::Runtime;
use std::io::Write;

/// Run the interactive loop until exit or EOF
pub async fn run_shell(runtime: &Runtime) -> ExitCode {
    println!("zenus shell - type 'help' for commands, 'exit' to leave");

    loop {
        print!("zenus> ");
        let _ = std::io::stdout().flush();

        // Blocking read off the async runtime
        let line = tokio::task::spawn_blocking(|| {
            let mut buffer = String::new();
            match std::io::stdin().read_line(&mut buffer) {
                Ok(0) => None,
                Ok(_) => Some(buffer),
                Err(_) => None,
            }
        })
        .await
        .expect("stdin task panicked");

        let Some(line) = line else {
            // EOF
            println!();
            return EXIT_SUCCESS;
        };

        if runtime.cancellation_token().is_cancelled() {
            return EXIT_INTERRUPT;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match route_line(runtime, line).await {
            ShellAction::Continue => {}
            ShellAction::Exit(code) => return code,
        }
    }
}

enum ShellAction {
    Continue,
    Exit(ExitCode),
}

async fn route_line(runtime: &Runtime, line: &str) -> ShellAction {
    let mut parts = line.split_whitespace();
    let first = parts.next().unwrap_or_default();

    match first {
        "exit" | "quit" => return ShellAction::Exit(EXIT_SUCCESS),
        "help" => {
            print_shell_help();
        }
        "status" => {
            println!("{}", runtime.status_summary());
        }
        "memory" => {
            println!("{}", runtime.memory_summary());
        }
        "history" => {
            let failures = parts.next() == Some("--failures");
            run_history(runtime, failures);
        }
        "rollback" => {
            let rest: Vec<String> = parts.map(str::to_string).collect();
            match crate::cli::args::parse_args(
                std::iter::once("rollback".to_string()).chain(rest),
            ) {
                Ok(crate::cli::Mode::Rollback { count, dry_run }) => {
                    run_rollback(runtime, count, dry_run).await;
                }
                _ => println!("usage: rollback [N] [--dry-run]"),
            }
        }
        "--dry-run" => {
            let text = rest_of(line, "--dry-run");
            if text.is_empty() {
                println!("usage: --dry-run <command>");
            } else {
                run_direct(runtime, &text, true).await;
            }
        }
        "--iterative" => {
            let text = rest_of(line, "--iterative");
            if text.is_empty() {
                println!("usage: --iterative <goal>");
            } else {
                run_iterative(runtime, &text).await;
            }
        }
        _ => {
            run_direct(runtime, line, false).await;
        }
    }

    ShellAction::Continue
}

fn rest_of(line: &str, prefix: &str) -> String {
    line[prefix.len()..].trim().to_string()
}

fn print_shell_help() {
    println!(
        r#"Shell commands:
    status                    Provider circuits, world model, success rate
    memory                    Frequent paths and memory statistics
    history [--failures]      Recent transactions or failure summary
    rollback [N] [--dry-run]  Undo the last N mutating actions
    --dry-run <command>       Preview a plan without executing
    --iterative <goal>        Drive the goal tracker
    exit | quit               Leave the shell
    <anything else>           Translate and execute"#
    );
}
