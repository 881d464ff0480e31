//! Configuration
//!
//! Environment-driven settings resolved once at startup, plus the
//! per-user data directory bootstrap. `ZENUS_LLM` names the default
//! provider; `ZENUS_HOME` overrides the data directory (default
//! `~/.zenus`).

use std::path::{Path, PathBuf};

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Default provider (`ZENUS_LLM`)
    pub provider: String,
    /// Provider for simple inputs (`ZENUS_CHEAP_LLM`)
    pub cheap_provider: String,
    /// Provider for complex inputs (`ZENUS_POWERFUL_LLM`)
    pub powerful_provider: String,
    /// Fallback order across all configured providers
    pub fallback_chain: Vec<String>,
    /// Per-user data directory
    pub data_dir: PathBuf,
    /// Parallel step limit (`ZENUS_MAX_PARALLEL`, default CPU cores)
    pub max_parallel: usize,
    /// Iterative-mode bound (`ZENUS_MAX_ITERATIONS`)
    pub max_iterations: u32,
}

impl Config {
    /// Read configuration from the environment
    pub fn from_env() -> Self {
        let provider = env_or("ZENUS_LLM", "openai");
        let cheap_provider = env_or("ZENUS_CHEAP_LLM", &provider);
        let powerful_provider = env_or("ZENUS_POWERFUL_LLM", &provider);

        let mut fallback_chain = vec![
            provider.clone(),
            cheap_provider.clone(),
            powerful_provider.clone(),
        ];
        if let Ok(extra) = std::env::var("ZENUS_LLM_FALLBACKS") {
            fallback_chain.extend(extra.split(',').map(|s| s.trim().to_string()));
        }
        dedup_in_order(&mut fallback_chain);

        let data_dir = std::env::var("ZENUS_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".zenus")
            });

        let max_parallel = std::env::var("ZENUS_MAX_PARALLEL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            });

        let max_iterations = std::env::var("ZENUS_MAX_ITERATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Self {
            provider,
            cheap_provider,
            powerful_provider,
            fallback_chain,
            data_dir,
            max_parallel,
            max_iterations,
        }
    }
}

/// Resolved locations inside the data directory
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub logs_dir: PathBuf,
    pub history_dir: PathBuf,
    pub transactions_file: PathBuf,
    pub failures_db: PathBuf,
    pub world_model_file: PathBuf,
    pub suggestions_file: PathBuf,
}

/// Create the data directory layout
pub fn bootstrap(data_dir: &Path) -> std::io::Result<DataPaths> {
    let logs_dir = data_dir.join("logs");
    let history_dir = data_dir.join("history");
    std::fs::create_dir_all(&logs_dir)?;
    std::fs::create_dir_all(&history_dir)?;

    Ok(DataPaths {
        logs_dir,
        history_dir,
        transactions_file: data_dir.join("transactions.jsonl"),
        failures_db: data_dir.join("failures.db"),
        world_model_file: data_dir.join("world_model.json"),
        suggestions_file: data_dir.join("pattern_suggestions.json"),
    })
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn dedup_in_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
