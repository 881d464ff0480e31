//! TextOps — text file operations
//!
//! read, write, append, search, count_lines, head, tail, plus the
//! journal-only truncate_tail used to undo appends.

use crate::tools::{expand_user, optional_bool, optional_u64, require_str, Tool, ToolError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Read output is capped to keep step results observable
const MAX_READ_CHARS: usize = 10_000;

pub struct TextOps;

impl TextOps {
    pub fn new() -> Self {
        TextOps
    }

    fn read(&self, path: &str) -> Result<String, ToolError> {
        let full = existing(path)?;
        let mut content = fs::read_to_string(full)?;
        let total = content.chars().count();
        if total > MAX_READ_CHARS {
            content = content.chars().take(MAX_READ_CHARS).collect();
            content.push_str(&format!("\n... (truncated, total {} chars)", total));
        }
        Ok(content)
    }

    fn write(&self, path: &str, content: &str, overwrite: bool) -> Result<String, ToolError> {
        let full = PathBuf::from(expand_user(path));
        let existed = full.exists();

        if existed && !overwrite {
            return Err(ToolError::Failed(format!(
                "file exists: {} (pass overwrite=true to replace)",
                path
            )));
        }
        if let Some(parent) = full.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&full, content)?;

        let verb = if existed { "Overwrote" } else { "Wrote" };
        Ok(format!("{} {} chars to {}", verb, content.chars().count(), path))
    }

    fn append(&self, path: &str, content: &str) -> Result<String, ToolError> {
        let full = PathBuf::from(expand_user(path));
        use std::io::Write;
        let mut file = fs::OpenOptions::new().append(true).create(true).open(&full)?;
        file.write_all(content.as_bytes())?;
        Ok(format!("Appended {} chars to {}", content.chars().count(), path))
    }

    fn search(&self, path: &str, pattern: &str, case_sensitive: bool) -> Result<String, ToolError> {
        let full = existing(path)?;
        let content = fs::read_to_string(full)?;

        let needle = if case_sensitive {
            pattern.to_string()
        } else {
            pattern.to_lowercase()
        };

        let matches: Vec<String> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                if case_sensitive {
                    line.contains(&needle)
                } else {
                    line.to_lowercase().contains(&needle)
                }
            })
            .map(|(n, line)| format!("Line {}: {}", n + 1, line))
            .collect();

        if matches.is_empty() {
            return Ok(format!("No matches found for '{}' in {}", pattern, path));
        }
        let shown = matches.len().min(50);
        Ok(format!(
            "Found {} matches:\n{}",
            matches.len(),
            matches[..shown].join("\n")
        ))
    }

    fn count_lines(&self, path: &str) -> Result<String, ToolError> {
        let full = existing(path)?;
        let count = fs::read_to_string(full)?.lines().count();
        Ok(format!("{}: {} lines", path, count))
    }

    fn head(&self, path: &str, lines: usize) -> Result<String, ToolError> {
        let full = existing(path)?;
        let content = fs::read_to_string(full)?;
        let taken: Vec<&str> = content.lines().take(lines).collect();
        Ok(format!(
            "First {} lines of {}:\n{}",
            taken.len(),
            path,
            taken.join("\n")
        ))
    }

    fn tail(&self, path: &str, lines: usize) -> Result<String, ToolError> {
        let full = existing(path)?;
        let content = fs::read_to_string(full)?;
        let all: Vec<&str> = content.lines().collect();
        let start = all.len().saturating_sub(lines);
        Ok(format!(
            "Last {} lines of {}:\n{}",
            all.len() - start,
            path,
            all[start..].join("\n")
        ))
    }

    /// Drop the last `chars` characters of a file (inverse of append)
    fn truncate_tail(&self, path: &str, chars: usize) -> Result<String, ToolError> {
        let full = existing(path)?;
        let content = fs::read_to_string(&full)?;
        let total = content.chars().count();
        let keep = total.saturating_sub(chars);
        let kept: String = content.chars().take(keep).collect();
        fs::write(&full, kept)?;
        Ok(format!("Truncated {} chars from {}", total - keep, path))
    }
}

fn existing(path: &str) -> Result<PathBuf, ToolError> {
    let full = PathBuf::from(expand_user(path));
    if !full.exists() {
        return Err(ToolError::Failed(format!("file not found: {}", path)));
    }
    Ok(full)
}

impl Default for TextOps {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for TextOps {
    fn name(&self) -> &'static str {
        "TextOps"
    }

    fn actions(&self) -> &'static [&'static str] {
        &[
            "read",
            "write",
            "append",
            "search",
            "count_lines",
            "head",
            "tail",
            "truncate_tail",
        ]
    }

    async fn invoke(
        &self,
        action: &str,
        args: &HashMap<String, Value>,
    ) -> Result<String, ToolError> {
        match action {
            "read" => {
                let path = require_str("TextOps", action, args, "path")?;
                self.read(&path)
            }
            "write" => {
                let path = require_str("TextOps", action, args, "path")?;
                let content = require_str("TextOps", action, args, "content")?;
                let overwrite = optional_bool(args, "overwrite", true);
                self.write(&path, &content, overwrite)
            }
            "append" => {
                let path = require_str("TextOps", action, args, "path")?;
                let content = require_str("TextOps", action, args, "content")?;
                self.append(&path, &content)
            }
            "search" => {
                let path = require_str("TextOps", action, args, "path")?;
                let pattern = require_str("TextOps", action, args, "pattern")?;
                let case_sensitive = optional_bool(args, "case_sensitive", false);
                self.search(&path, &pattern, case_sensitive)
            }
            "count_lines" => {
                let path = require_str("TextOps", action, args, "path")?;
                self.count_lines(&path)
            }
            "head" => {
                let path = require_str("TextOps", action, args, "path")?;
                let lines = optional_u64(args, "lines", 10) as usize;
                self.head(&path, lines)
            }
            "tail" => {
                let path = require_str("TextOps", action, args, "path")?;
                let lines = optional_u64(args, "lines", 10) as usize;
                self.tail(&path, lines)
            }
            "truncate_tail" => {
                let path = require_str("TextOps", action, args, "path")?;
                let chars = optional_u64(args, "chars", 0) as usize;
                self.truncate_tail(&path, chars)
            }
            other => Err(ToolError::ActionNotFound {
                tool: "TextOps".to_string(),
                action: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn args(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("note.txt");
        let ops = TextOps::new();

        ops.invoke(
            "write",
            &args(&[
                ("path", json!(file.to_str().unwrap())),
                ("content", json!("line1\nline2")),
            ]),
        )
        .await
        .unwrap();

        let content = ops
            .invoke("read", &args(&[("path", json!(file.to_str().unwrap()))]))
            .await
            .unwrap();
        assert_eq!(content, "line1\nline2");
    }

    #[tokio::test]
    async fn test_write_without_overwrite_refuses_existing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("note.txt");
        fs::write(&file, "original").unwrap();

        let result = TextOps::new()
            .invoke(
                "write",
                &args(&[
                    ("path", json!(file.to_str().unwrap())),
                    ("content", json!("new")),
                    ("overwrite", json!(false)),
                ]),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&file).unwrap(), "original");
    }

    #[tokio::test]
    async fn test_append_then_truncate_tail_restores() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("log.txt");
        fs::write(&file, "base").unwrap();
        let ops = TextOps::new();

        ops.invoke(
            "append",
            &args(&[
                ("path", json!(file.to_str().unwrap())),
                ("content", json!("+extra")),
            ]),
        )
        .await
        .unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "base+extra");

        ops.invoke(
            "truncate_tail",
            &args(&[
                ("path", json!(file.to_str().unwrap())),
                ("chars", json!(6)),
            ]),
        )
        .await
        .unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "base");
    }

    #[tokio::test]
    async fn test_search_reports_line_numbers() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("data.txt");
        fs::write(&file, "alpha\nBeta match\ngamma match\n").unwrap();

        let out = TextOps::new()
            .invoke(
                "search",
                &args(&[
                    ("path", json!(file.to_str().unwrap())),
                    ("pattern", json!("MATCH")),
                ]),
            )
            .await
            .unwrap();
        assert!(out.contains("Found 2 matches"));
        assert!(out.contains("Line 2"));
        assert!(out.contains("Line 3"));
    }

    #[tokio::test]
    async fn test_search_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("data.txt");
        fs::write(&file, "Match\nmatch\n").unwrap();

        let out = TextOps::new()
            .invoke(
                "search",
                &args(&[
                    ("path", json!(file.to_str().unwrap())),
                    ("pattern", json!("Match")),
                    ("case_sensitive", json!(true)),
                ]),
            )
            .await
            .unwrap();
        assert!(out.contains("Found 1 matches"));
    }

    #[tokio::test]
    async fn test_head_tail_and_count() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("data.txt");
        let body: String = (1..=20).map(|i| format!("row {}\n", i)).collect();
        fs::write(&file, body).unwrap();
        let ops = TextOps::new();
        let path = json!(file.to_str().unwrap());

        let head = ops
            .invoke("head", &args(&[("path", path.clone()), ("lines", json!(3))]))
            .await
            .unwrap();
        assert!(head.contains("row 1"));
        assert!(!head.contains("row 4"));

        let tail = ops
            .invoke("tail", &args(&[("path", path.clone()), ("lines", json!(2))]))
            .await
            .unwrap();
        assert!(tail.contains("row 19"));
        assert!(tail.contains("row 20"));

        let count = ops
            .invoke("count_lines", &args(&[("path", path)]))
            .await
            .unwrap();
        assert!(count.contains("20 lines"));
    }

    #[tokio::test]
    async fn test_read_missing_file_fails() {
        let result = TextOps::new()
            .invoke("read", &args(&[("path", json!("/no/such/file.txt"))]))
            .await;
        assert!(matches!(result, Err(ToolError::Failed(_))));
    }
}
