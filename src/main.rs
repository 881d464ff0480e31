//! zenus — CLI entry point

use tracing_subscriber::EnvFilter;
use zenus::cli::{self, parse_args};

#[tokio::main]
async fn main() {
    // Tracing goes to a debug log under the data dir; stdout stays clean
    // for user-facing output. The guard must outlive main.
    let _log_guard = init_tracing();

    let mode = match parse_args(std::env::args().skip(1)) {
        Ok(mode) => mode,
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!("Run 'zenus help' for usage.");
            std::process::exit(cli::EXIT_FAILURE);
        }
    };

    let exit_code = cli::run_mode(mode).await;
    std::process::exit(exit_code);
}

fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let data_dir = std::env::var("ZENUS_HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("."))
                .join(".zenus")
        });
    let log_dir = data_dir.join("logs");
    if std::fs::create_dir_all(&log_dir).is_err() {
        return None;
    }

    let appender = tracing_appender::rolling::never(log_dir, "zenus.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .try_init();

    Some(guard)
}
