//! FileOps — filesystem operations
//!
//! scan, mkdir, move, write_file, touch, remove. Glob patterns are
//! accepted for move/remove sources; `~` expands to the home directory.
//! Path checks only — there is no OS-level sandboxing here.

use crate::tools::{expand_user, require_str, Tool, ToolError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub struct FileOps;

impl FileOps {
    pub fn new() -> Self {
        FileOps
    }

    fn scan(&self, path: &str) -> Result<String, ToolError> {
        let full = expand_user(path);
        let mut entries: Vec<String> = fs::read_dir(&full)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();

        if entries.is_empty() {
            return Ok(format!("{} is empty", path));
        }
        Ok(entries.join("\n"))
    }

    fn mkdir(&self, path: &str) -> Result<String, ToolError> {
        let full = expand_user(path);
        fs::create_dir_all(&full)?;
        Ok(format!("Directory created: {}", path))
    }

    fn move_matches(&self, source: &str, destination: &str) -> Result<String, ToolError> {
        let src_pattern = expand_user(source);
        let dst = PathBuf::from(expand_user(destination));

        let matches = glob_matches(&src_pattern)?;
        if matches.is_empty() {
            return Err(ToolError::Failed(format!(
                "no files match source: {}",
                source
            )));
        }

        // Single match onto a non-directory target is a plain rename;
        // everything else moves into the destination directory.
        if matches.len() == 1 && !dst.is_dir() {
            if let Some(parent) = dst.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::rename(&matches[0], &dst)?;
        } else {
            fs::create_dir_all(&dst)?;
            for path in &matches {
                let file_name = path
                    .file_name()
                    .ok_or_else(|| ToolError::Failed(format!("unnamed path: {}", path.display())))?;
                fs::rename(path, dst.join(file_name))?;
            }
        }

        Ok(format!(
            "Moved {} entr{} matching {} -> {}",
            matches.len(),
            if matches.len() == 1 { "y" } else { "ies" },
            source,
            destination
        ))
    }

    fn write_file(&self, path: &str, content: &str) -> Result<String, ToolError> {
        let full = PathBuf::from(expand_user(path));
        if let Some(parent) = full.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&full, content)?;
        Ok(format!("File written: {} ({} bytes)", path, content.len()))
    }

    fn touch(&self, path: &str) -> Result<String, ToolError> {
        let full = PathBuf::from(expand_user(path));
        if let Some(parent) = full.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&full)?;
        Ok(format!("File created: {}", path))
    }

    fn remove(&self, path: &str) -> Result<String, ToolError> {
        let pattern = expand_user(path);
        let matches = glob_matches(&pattern)?;
        if matches.is_empty() {
            return Err(ToolError::Failed(format!("no files match: {}", path)));
        }

        let mut removed = 0usize;
        for entry in &matches {
            if entry.is_dir() {
                // Only empty directories; anything else must be explicit
                fs::remove_dir(entry)?;
            } else {
                fs::remove_file(entry)?;
            }
            removed += 1;
        }
        Ok(format!("Removed {} entr{}", removed, if removed == 1 { "y" } else { "ies" }))
    }
}

/// Matching paths for a pattern; a literal existing path matches itself
fn glob_matches(pattern: &str) -> Result<Vec<PathBuf>, ToolError> {
    let literal = Path::new(pattern);
    if literal.exists() {
        return Ok(vec![literal.to_path_buf()]);
    }

    let paths = glob::glob(pattern)
        .map_err(|e| ToolError::Failed(format!("invalid pattern '{}': {}", pattern, e)))?;
    Ok(paths.filter_map(Result::ok).collect())
}

impl Default for FileOps {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FileOps {
    fn name(&self) -> &'static str {
        "FileOps"
    }

    fn actions(&self) -> &'static [&'static str] {
        &["scan", "mkdir", "move", "write_file", "touch", "remove"]
    }

    async fn invoke(
        &self,
        action: &str,
        args: &HashMap<String, Value>,
    ) -> Result<String, ToolError> {
        match action {
            "scan" => {
                let path = require_str("FileOps", action, args, "path")?;
                self.scan(&path)
            }
            "mkdir" => {
                let path = require_str("FileOps", action, args, "path")?;
                self.mkdir(&path)
            }
            "move" => {
                let source = require_str("FileOps", action, args, "source")?;
                let destination = require_str("FileOps", action, args, "destination")?;
                self.move_matches(&source, &destination)
            }
            "write_file" => {
                let path = require_str("FileOps", action, args, "path")?;
                let content = require_str("FileOps", action, args, "content")?;
                self.write_file(&path, &content)
            }
            "touch" => {
                let path = require_str("FileOps", action, args, "path")?;
                self.touch(&path)
            }
            "remove" => {
                let path = require_str("FileOps", action, args, "path")?;
                self.remove(&path)
            }
            other => Err(ToolError::ActionNotFound {
                tool: "FileOps".to_string(),
                action: other.to_string(),
            }),
        }
    }
}
