//! Intent history
//!
//! Daily JSONL files (`history/intents_<YYYY-MM-DD>.jsonl`) recording
//! executed intents and their outcomes, searchable for learning and the
//! `history` command.

use crate::engine::StepResult;
use crate::intent::Intent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// One recorded intent execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub user_input: String,
    pub goal: String,
    pub steps_count: usize,
    pub success: bool,
    pub results: Vec<String>,
}

/// Append-only daily intent history
pub struct IntentHistory {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl IntentHistory {
    pub fn new(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn current_file(&self) -> PathBuf {
        let today = Utc::now().format("%Y-%m-%d");
        self.dir.join(format!("intents_{}.jsonl", today))
    }

    /// Record an executed intent
    pub fn record(&self, user_input: &str, intent: &Intent, results: &[StepResult], success: bool) {
        let entry = HistoryEntry {
            timestamp: Utc::now(),
            user_input: user_input.to_string(),
            goal: intent.goal.clone(),
            steps_count: intent.steps.len(),
            success,
            results: results.iter().map(|r| r.output.clone()).collect(),
        };

        let _guard = self.write_lock.lock().unwrap();
        let open = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.current_file());
        match open {
            Ok(mut file) => {
                if let Ok(line) = serde_json::to_string(&entry) {
                    if let Err(err) = writeln!(file, "{}", line) {
                        warn!(error = %err, "intent history write failed");
                    }
                }
            }
            Err(err) => warn!(error = %err, "intent history open failed"),
        }
    }

    /// Most recent entries (newest last, capped at `limit`)
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let mut entries = self.read_all();
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
        entries
    }

    /// Entries whose input, goal or results mention `query`
    pub fn search(&self, query: &str, limit: usize) -> Vec<HistoryEntry> {
        let needle = query.to_lowercase();
        self.read_all()
            .into_iter()
            .rev()
            .filter(|entry| {
                entry.user_input.to_lowercase().contains(&needle)
                    || entry.goal.to_lowercase().contains(&needle)
                    || entry
                        .results
                        .iter()
                        .any(|r| r.to_lowercase().contains(&needle))
            })
            .take(limit)
            .collect()
    }

    /// Success rate across entries of the last `days`
    pub fn success_rate(&self, days: i64) -> f64 {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let entries: Vec<_> = self
            .read_all()
            .into_iter()
            .filter(|e| e.timestamp >= cutoff)
            .collect();
        if entries.is_empty() {
            return 0.0;
        }
        entries.iter().filter(|e| e.success).count() as f64 / entries.len() as f64
    }

    fn read_all(&self) -> Vec<HistoryEntry> {
        let mut files: Vec<PathBuf> = match std::fs::read_dir(&self.dir) {
            Ok(read) => read
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| {
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with("intents_") && n.ends_with(".jsonl"))
                        .unwrap_or(false)
                })
                .collect(),
            Err(_) => return Vec::new(),
        };
        files.sort();

        let mut entries = Vec::new();
        for file in files {
            if let Ok(content) = std::fs::read_to_string(&file) {
                for line in content.lines() {
                    if let Ok(entry) = serde_json::from_str::<HistoryEntry>(line) {
                        entries.push(entry);
                    }
                }
            }
        }
        entries
    }
}
