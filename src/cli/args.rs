//! CLI argument parsing
//!
//! Free-text-first surface:
//! - no args / `shell` → interactive loop
//! - `help` / `--help` / `-h`, `version` / `--version` / `-v`
//! - `--dry-run <text…>`, `--iterative <text…>`
//! - `rollback [N] [--dry-run]`
//! - `history [--failures]`
//! - anything else → direct execution of the joined text

use crate::cli::{Error, Result};

/// Parsed CLI mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Interactive shell
    Shell,
    /// Usage text
    Help,
    /// Version string
    Version,
    /// Translate + execute
    Direct { text: String },
    /// Translate + validate + print plan, no execution
    DryRun { text: String },
    /// Goal-tracker mode
    Iterative { text: String },
    /// Roll back the last N mutating actions
    Rollback { count: usize, dry_run: bool },
    /// Recent transactions, or the failure summary
    History { failures: bool },
}

/// Parse command-line arguments (program name already stripped)
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Mode> {
    let args: Vec<String> = args.into_iter().collect();

    let Some(first) = args.first() else {
        return Ok(Mode::Shell);
    };

    match first.as_str() {
        "shell" => Ok(Mode::Shell),
        "help" | "--help" | "-h" => Ok(Mode::Help),
        "version" | "--version" | "-v" => Ok(Mode::Version),
        "rollback" => parse_rollback(&args[1..]),
        "history" => parse_history(&args[1..]),
        "--dry-run" => {
            let text = join_text(&args[1..]);
            if text.is_empty() {
                return Err(Error::MissingArgument(
                    "--dry-run requires a command".to_string(),
                ));
            }
            Ok(Mode::DryRun { text })
        }
        "--iterative" => {
            let text = join_text(&args[1..]);
            if text.is_empty() {
                return Err(Error::MissingArgument(
                    "--iterative requires a goal".to_string(),
                ));
            }
            Ok(Mode::Iterative { text })
        }
        arg if arg.starts_with("--") => Err(Error::InvalidArgs(format!("unknown option: {}", arg))),
        _ => Ok(Mode::Direct {
            text: join_text(&args),
        }),
    }
}

fn parse_rollback(rest: &[String]) -> Result<Mode> {
    let mut count = 1usize;
    let mut dry_run = false;
    let mut saw_count = false;

    for arg in rest {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            other => {
                if saw_count {
                    return Err(Error::InvalidArgs(format!(
                        "unexpected rollback argument: {}",
                        other
                    )));
                }
                count = other.parse().map_err(|_| {
                    Error::InvalidArgs(format!("rollback count must be a number, got '{}'", other))
                })?;
                saw_count = true;
            }
        }
    }

    if count == 0 {
        return Err(Error::InvalidArgs(
            "rollback count must be at least 1".to_string(),
        ));
    }
    Ok(Mode::Rollback { count, dry_run })
}

fn parse_history(rest: &[String]) -> Result<Mode> {
    match rest {
        [] => Ok(Mode::History { failures: false }),
        [flag] if flag == "--failures" => Ok(Mode::History { failures: true }),
        [other, ..] => Err(Error::InvalidArgs(format!(
            "unexpected history argument: {}",
            other
        ))),
    }
}

fn join_text(parts: &[String]) -> String {
    parts.join(" ").trim().to_string()
}
