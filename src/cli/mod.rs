//! CLI layer
//!
//! Argument parsing, mode dispatch, and the interactive shell. The core
//! engine stays programmatic; this module is the thin surface that
//! drives it.

pub mod args;
pub mod dispatch;
pub mod shell;

pub use args::{parse_args, Mode};
pub use dispatch::{run_mode, ExitCode};

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("missing required argument: {0}")]
    MissingArgument(String),
}

/// Deterministic exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INTERRUPT: i32 = 130;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, Error>;
