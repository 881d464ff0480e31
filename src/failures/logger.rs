//! Failure store
//!
//! SQLite-backed log of unrecovered failures plus aggregated pattern
//! counts. Patterns accumulate a count with first/last-seen timestamps
//! and may carry an operator-set suggestion that is surfaced when a
//! similar failure happens again.

use crate::failures::signature::normalize_signature;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;

/// Failure store errors
#[derive(Debug, thiserror::Error)]
pub enum FailureStoreError {
    #[error("failure store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// One recorded failure
#[derive(Debug, Clone)]
pub struct Failure {
    pub id: i64,
    pub signature: String,
    pub tool: String,
    pub action: String,
    pub error_kind: String,
    pub user_input: String,
    pub context: Value,
    pub resolution: Option<String>,
    pub created_at: String,
}

/// Aggregate counts for `history --failures`
#[derive(Debug, Clone)]
pub struct FailureStats {
    pub total: u64,
    pub by_tool: Vec<(String, u64)>,
    pub by_error_kind: Vec<(String, u64)>,
    pub recent_7_days: u64,
}

/// Durable failure log with pattern learning
pub struct FailureLogger {
    conn: Mutex<Connection>,
}

impl FailureLogger {
    /// Open (or create) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FailureStoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store (tests)
    pub fn open_in_memory() -> Result<Self, FailureStoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, FailureStoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS failures (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 signature TEXT NOT NULL,
                 tool TEXT NOT NULL,
                 action TEXT NOT NULL,
                 error_kind TEXT NOT NULL,
                 user_input TEXT NOT NULL,
                 context_json TEXT NOT NULL,
                 resolution TEXT,
                 created_at TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS failure_patterns (
                 signature TEXT PRIMARY KEY,
                 count INTEGER NOT NULL,
                 first_seen TEXT NOT NULL,
                 last_seen TEXT NOT NULL,
                 suggestion TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_failures_tool ON failures(tool);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record a failure and bump its pattern count; returns the row id
    #[allow(clippy::too_many_arguments)]
    pub fn log_failure(
        &self,
        user_input: &str,
        tool: &str,
        action: &str,
        error_kind: &str,
        message: &str,
        context: &Value,
        resolution: Option<&str>,
    ) -> Result<i64, FailureStoreError> {
        let signature = normalize_signature(tool, action, message);
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO failures (signature, tool, action, error_kind, user_input, context_json, resolution, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                signature,
                tool,
                action,
                error_kind,
                user_input,
                context.to_string(),
                resolution,
                now
            ],
        )?;
        let id = conn.last_insert_rowid();

        conn.execute(
            "INSERT INTO failure_patterns (signature, count, first_seen, last_seen)
             VALUES (?1, 1, ?2, ?2)
             ON CONFLICT(signature) DO UPDATE SET
                 count = count + 1,
                 last_seen = ?2",
            params![signature, now],
        )?;

        Ok(id)
    }

    /// Pattern count for a signature
    pub fn pattern_count(&self, signature: &str) -> Result<u64, FailureStoreError> {
        let conn = self.conn.lock().unwrap();
        let count: Option<u64> = conn
            .query_row(
                "SELECT count FROM failure_patterns WHERE signature = ?1",
                params![signature],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    /// Attach a suggestion to a pattern (operator or learning process)
    pub fn set_suggestion(
        &self,
        signature: &str,
        suggestion: &str,
    ) -> Result<(), FailureStoreError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO failure_patterns (signature, count, first_seen, last_seen, suggestion)
             VALUES (?1, 0, ?2, ?2, ?3)
             ON CONFLICT(signature) DO UPDATE SET suggestion = ?3",
            params![signature, now, suggestion],
        )?;
        Ok(())
    }

    /// Suggestion for the pattern matching a fresh failure, if any
    pub fn suggestion_for(
        &self,
        tool: &str,
        action: &str,
        message: &str,
    ) -> Result<Option<String>, FailureStoreError> {
        let signature = normalize_signature(tool, action, message);
        let conn = self.conn.lock().unwrap();
        let suggestion: Option<Option<String>> = conn
            .query_row(
                "SELECT suggestion FROM failure_patterns WHERE signature = ?1",
                params![signature],
                |row| row.get(0),
            )
            .optional()?;
        Ok(suggestion.flatten())
    }

    /// Most recent failures on the same tool with token overlap against
    /// the user input
    pub fn get_similar_failures(
        &self,
        user_input: &str,
        tool: &str,
        limit: usize,
    ) -> Result<Vec<Failure>, FailureStoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, signature, tool, action, error_kind, user_input, context_json, resolution, created_at
             FROM failures WHERE tool = ?1 ORDER BY id DESC",
        )?;

        let rows = stmt.query_map(params![tool], row_to_failure)?;

        let input_tokens = tokens(user_input);
        let mut similar = Vec::new();
        for row in rows {
            let failure = row?;
            let overlap = tokens(&failure.user_input)
                .iter()
                .any(|t| input_tokens.contains(t));
            if overlap {
                similar.push(failure);
                if similar.len() >= limit {
                    break;
                }
            }
        }
        Ok(similar)
    }

    /// Aggregate statistics
    pub fn stats(&self) -> Result<FailureStats, FailureStoreError> {
        let conn = self.conn.lock().unwrap();

        let total: u64 = conn.query_row("SELECT COUNT(*) FROM failures", [], |row| row.get(0))?;

        let mut by_tool = Vec::new();
        let mut stmt =
            conn.prepare("SELECT tool, COUNT(*) FROM failures GROUP BY tool ORDER BY COUNT(*) DESC")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?;
        for row in rows {
            by_tool.push(row?);
        }

        let mut by_error_kind = Vec::new();
        let mut stmt = conn.prepare(
            "SELECT error_kind, COUNT(*) FROM failures GROUP BY error_kind ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?;
        for row in rows {
            by_error_kind.push(row?);
        }

        let week_ago = (Utc::now() - chrono::Duration::days(7)).to_rfc3339();
        let recent_7_days: u64 = conn.query_row(
            "SELECT COUNT(*) FROM failures WHERE created_at >= ?1",
            params![week_ago],
            |row| row.get(0),
        )?;

        Ok(FailureStats {
            total,
            by_tool,
            by_error_kind,
            recent_7_days,
        })
    }
}

fn row_to_failure(row: &rusqlite::Row<'_>) -> rusqlite::Result<Failure> {
    let context_json: String = row.get(6)?;
    Ok(Failure {
        id: row.get(0)?,
        signature: row.get(1)?,
        tool: row.get(2)?,
        action: row.get(3)?,
        error_kind: row.get(4)?,
        user_input: row.get(5)?,
        context: serde_json::from_str(&context_json).unwrap_or(Value::Null),
        resolution: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Lowercased tokens longer than three characters
fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|t| t.len() > 3)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn logger() -> FailureLogger {
        FailureLogger::open_in_memory().unwrap()
    }

    #[test]
    fn test_log_failure_returns_id() {
        let logger = logger();
        let id = logger
            .log_failure(
                "delete system files",
                "FileOps",
                "remove",
                "permission_denied",
                "Permission denied: /system32",
                &json!({"cwd": "/home/user"}),
                None,
            )
            .unwrap();
        assert!(id > 0);
    }

    #[test]
    fn test_pattern_count_increments_for_same_shape() {
        let logger = logger();
        for i in 0..3 {
            logger
                .log_failure(
                    &format!("read file-{}.txt", i),
                    "FileOps",
                    "scan",
                    "permission_denied",
                    &format!("Permission denied: /root/file{}.txt", i),
                    &json!({}),
                    None,
                )
                .unwrap();
        }

        let signature = normalize_signature("FileOps", "scan", "Permission denied: /root/file0.txt");
        assert_eq!(logger.pattern_count(&signature).unwrap(), 3);
    }

    #[test]
    fn test_similar_failures_filtered_by_tool_and_tokens() {
        let logger = logger();
        for i in 0..3 {
            logger
                .log_failure(
                    &format!("install package-{}", i),
                    "PackageOps",
                    "install",
                    "network_error",
                    "connection refused",
                    &json!({}),
                    None,
                )
                .unwrap();
        }
        logger
            .log_failure(
                "scan downloads",
                "FileOps",
                "scan",
                "io_error",
                "boom",
                &json!({}),
                None,
            )
            .unwrap();

        let similar = logger
            .get_similar_failures("install another-package", "PackageOps", 2)
            .unwrap();
        assert_eq!(similar.len(), 2);
        assert!(similar.iter().all(|f| f.tool == "PackageOps"));
        // Newest first
        assert!(similar[0].user_input.contains("package-2"));
    }

    #[test]
    fn test_no_token_overlap_yields_nothing() {
        let logger = logger();
        logger
            .log_failure(
                "move reports into archive",
                "FileOps",
                "move",
                "io_error",
                "disk full",
                &json!({}),
                None,
            )
            .unwrap();

        let similar = logger
            .get_similar_failures("kill zombie", "FileOps", 5)
            .unwrap();
        assert!(similar.is_empty());
    }

    #[test]
    fn test_suggestion_round_trip() {
        let logger = logger();
        logger
            .log_failure(
                "run container",
                "ContainerOps",
                "run",
                "permission_denied",
                "Permission denied: /var/run/docker.sock",
                &json!({}),
                None,
            )
            .unwrap();

        // No suggestion yet
        assert!(logger
            .suggestion_for("ContainerOps", "run", "Permission denied: /var/run/docker.sock")
            .unwrap()
            .is_none());

        let signature = normalize_signature(
            "ContainerOps",
            "run",
            "Permission denied: /var/run/docker.sock",
        );
        logger
            .set_suggestion(&signature, "add your user to the docker group")
            .unwrap();

        let suggestion = logger
            .suggestion_for("ContainerOps", "run", "Permission denied: /var/run/docker.sock")
            .unwrap();
        assert_eq!(suggestion.as_deref(), Some("add your user to the docker group"));
    }

    #[test]
    fn test_resolution_stored() {
        let logger = logger();
        let id = logger
            .log_failure(
                "npm install",
                "PackageOps",
                "install",
                "network_error",
                "ECONNREFUSED",
                &json!({}),
                Some("switched to yarn and succeeded"),
            )
            .unwrap();
        assert!(id > 0);

        let similar = logger
            .get_similar_failures("npm install", "PackageOps", 1)
            .unwrap();
        assert_eq!(
            similar[0].resolution.as_deref(),
            Some("switched to yarn and succeeded")
        );
    }

    #[test]
    fn test_stats_aggregate() {
        let logger = logger();
        logger
            .log_failure("a", "FileOps", "scan", "permission_denied", "e1", &json!({}), None)
            .unwrap();
        logger
            .log_failure("b", "FileOps", "move", "io_error", "e2", &json!({}), None)
            .unwrap();
        logger
            .log_failure("c", "ProcessOps", "kill", "not_found", "e3", &json!({}), None)
            .unwrap();

        let stats = logger.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_tool[0], ("FileOps".to_string(), 2));
        assert_eq!(stats.by_error_kind.len(), 3);
        assert!(stats.recent_7_days >= 3);
    }
}
