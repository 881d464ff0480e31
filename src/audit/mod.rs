//! Audit logger
//!
//! Structured session log: one JSON object per event, appended to
//! `logs/session_<timestamp>.jsonl` under the data directory. Event
//! types: intent, execution_start, step_result, execution_end, error,
//! info.

use crate::intent::Intent;
use chrono::Utc;
use serde_json::{json, Value};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Session-scoped audit logger
///
/// Appends are serialized through a mutex; write failures are logged
/// and swallowed so auditing never takes down an execution.
pub struct AuditLogger {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLogger {
    /// Create a fresh session log under `log_dir`
    pub fn new(log_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let log_dir = log_dir.as_ref();
        std::fs::create_dir_all(log_dir)?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = log_dir.join(format!("session_{}.jsonl", stamp));
        let file = OpenOptions::new().append(true).create(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_intent(&self, user_input: &str, intent: &Intent, mode: &str) {
        self.write(json!({
            "type": "intent",
            "mode": mode,
            "user_input": user_input,
            "goal": intent.goal,
            "requires_confirmation": intent.requires_confirmation,
            "steps": intent.steps,
        }));
    }

    pub fn log_execution_start(&self, goal: &str) {
        self.write(json!({
            "type": "execution_start",
            "goal": goal,
        }));
    }

    pub fn log_step_result(&self, tool: &str, action: &str, result: &str, success: bool) {
        self.write(json!({
            "type": "step_result",
            "tool": tool,
            "action": action,
            "result": result,
            "success": success,
        }));
    }

    pub fn log_execution_end(&self, success: bool, message: Option<&str>) {
        self.write(json!({
            "type": "execution_end",
            "success": success,
            "message": message,
        }));
    }

    pub fn log_error(&self, error: &str, context: Value) {
        self.write(json!({
            "type": "error",
            "error": error,
            "context": context,
        }));
    }

    pub fn log_info(&self, event: &str, data: Value) {
        self.write(json!({
            "type": "info",
            "event": event,
            "data": data,
        }));
    }

    fn write(&self, mut entry: Value) {
        entry["timestamp"] = json!(Utc::now().to_rfc3339());
        let mut file = self.file.lock().unwrap();
        if let Err(err) = writeln!(file, "{}", entry) {
            warn!(error = %err, "audit write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Step;
    use tempfile::TempDir;

    fn read_events(logger: &AuditLogger) -> Vec<Value> {
        std::fs::read_to_string(logger.path())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_session_file_created_under_logs() {
        let dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(dir.path().join("logs")).unwrap();
        let name = logger.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("session_"));
        assert!(name.ends_with(".jsonl"));
    }

    #[test]
    fn test_events_carry_timestamp_and_type() {
        let dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(dir.path()).unwrap();

        let intent = Intent {
            goal: "List files".to_string(),
            requires_confirmation: false,
            steps: vec![Step::new("FileOps", "scan", 0)],
        };
        logger.log_intent("list files", &intent, "execution");
        logger.log_execution_start("List files");
        logger.log_step_result("FileOps", "scan", "a.txt", true);
        logger.log_execution_end(true, None);

        let events = read_events(&logger);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["type"], "intent");
        assert_eq!(events[1]["type"], "execution_start");
        assert_eq!(events[2]["type"], "step_result");
        assert_eq!(events[3]["type"], "execution_end");
        assert!(events.iter().all(|e| e["timestamp"].is_string()));
    }

    #[test]
    fn test_error_and_info_events() {
        let dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(dir.path()).unwrap();

        logger.log_error("boom", json!({"tool": "FileOps"}));
        logger.log_info("provider_selected", json!({"provider": "deepseek"}));

        let events = read_events(&logger);
        assert_eq!(events[0]["type"], "error");
        assert_eq!(events[0]["context"]["tool"], "FileOps");
        assert_eq!(events[1]["type"], "info");
        assert_eq!(events[1]["event"], "provider_selected");
    }
}
