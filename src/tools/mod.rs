//! Tool registry and dispatch
//!
//! Tools register a name plus a table of action names; dispatch is a
//! lookup, not reflection. An unknown name yields `ToolNotFound` /
//! `ActionNotFound`. The registry also owns the invertibility table
//! used by the rollback engine.

mod file_ops;
mod process_ops;
mod system_ops;
mod text_ops;

pub use file_ops::FileOps;
pub use process_ops::ProcessOps;
pub use system_ops::SystemOps;
pub use text_ops::TextOps;

use crate::intent::Step;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Tool dispatch and execution errors
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("action not found: {tool}.{action}")]
    ActionNotFound { tool: String, action: String },

    #[error("missing required argument '{argument}' for {tool}.{action}")]
    MissingArgument {
        tool: String,
        action: String,
        argument: String,
    },

    #[error("invalid argument '{argument}' for {tool}.{action}: {reason}")]
    InvalidArgument {
        tool: String,
        action: String,
        argument: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(String),

    #[error("{0}")]
    Failed(String),
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::Io(err.to_string())
    }
}

/// A registered tool: a name and a table of actions
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry name, e.g. "FileOps"
    fn name(&self) -> &'static str;

    /// Action names this tool dispatches
    fn actions(&self) -> &'static [&'static str];

    /// Invoke an action with a JSON argument map
    async fn invoke(&self, action: &str, args: &HashMap<String, Value>)
        -> Result<String, ToolError>;
}

/// Name → tool mapping with a priori inverse hints
pub struct ToolRegistry {
    tools: HashMap<&'static str, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Empty registry (tests register their own tools)
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with the standard tool suite
    pub fn with_default_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(FileOps::new()));
        registry.register(Box::new(TextOps::new()));
        registry.register(Box::new(SystemOps::new()));
        registry.register(Box::new(ProcessOps::new()));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    /// Tool names in the registry
    pub fn tool_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.tools.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Check that `tool.action` resolves, without invoking it
    pub fn resolve(&self, tool: &str, action: &str) -> Result<(), ToolError> {
        let entry = self
            .tools
            .get(tool)
            .ok_or_else(|| ToolError::ToolNotFound(tool.to_string()))?;
        if !entry.actions().contains(&action) {
            return Err(ToolError::ActionNotFound {
                tool: tool.to_string(),
                action: action.to_string(),
            });
        }
        Ok(())
    }

    /// Dispatch a step to its tool
    pub async fn invoke(&self, step: &Step) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(step.tool.as_str())
            .ok_or_else(|| ToolError::ToolNotFound(step.tool.clone()))?;
        tool.invoke(&step.action, &step.args).await
    }

    /// Declarative inverse for a mutating step, known a priori
    ///
    /// Returns the step that undoes `step`, or `None` when the action is
    /// not invertible (overwrites, deletes, kills). The rollback engine
    /// rejects records without a hint.
    pub fn inverse_hint(&self, step: &Step) -> Option<Step> {
        match (step.tool.as_str(), step.action.as_str()) {
            ("FileOps", "move") => {
                let source = step.arg_str("source")?;
                let destination = step.arg_str("destination")?;
                Some(
                    Step::new("FileOps", "move", 1)
                        .with_arg("source", destination)
                        .with_arg("destination", source),
                )
            }
            ("FileOps", "mkdir") | ("FileOps", "touch") => {
                let path = step.arg_str("path")?;
                Some(Step::new("FileOps", "remove", 3).with_arg("path", path))
            }
            ("TextOps", "append") => {
                let path = step.arg_str("path")?;
                let content = step.arg_str("content")?;
                Some(
                    Step::new("TextOps", "truncate_tail", 2)
                        .with_arg("path", path)
                        .with_arg("chars", content.chars().count() as u64),
                )
            }
            _ => None,
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_default_tools()
    }
}

/// Expand a leading `~` to the user's home directory
pub(crate) fn expand_user(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home.to_string_lossy().into_owned();
        }
    }
    path.to_string()
}

/// Extract a required string argument
pub(crate) fn require_str(
    tool: &'static str,
    action: &str,
    args: &HashMap<String, Value>,
    key: &str,
) -> Result<String, ToolError> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(ToolError::InvalidArgument {
            tool: tool.to_string(),
            action: action.to_string(),
            argument: key.to_string(),
            reason: format!("expected string, got {}", other),
        }),
        None => Err(ToolError::MissingArgument {
            tool: tool.to_string(),
            action: action.to_string(),
            argument: key.to_string(),
        }),
    }
}

/// Extract an optional u64 argument with a default
pub(crate) fn optional_u64(args: &HashMap<String, Value>, key: &str, default: u64) -> u64 {
    args.get(key).and_then(Value::as_u64).unwrap_or(default)
}

/// Extract an optional bool argument with a default
pub(crate) fn optional_bool(args: &HashMap<String, Value>, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_standard_tools() {
        let registry = ToolRegistry::with_default_tools();
        assert_eq!(
            registry.tool_names(),
            vec!["FileOps", "ProcessOps", "SystemOps", "TextOps"]
        );
    }

    #[test]
    fn test_resolve_unknown_tool() {
        let registry = ToolRegistry::with_default_tools();
        assert_eq!(
            registry.resolve("CloudOps", "launch"),
            Err(ToolError::ToolNotFound("CloudOps".to_string()))
        );
    }

    #[test]
    fn test_resolve_unknown_action() {
        let registry = ToolRegistry::with_default_tools();
        assert_eq!(
            registry.resolve("FileOps", "teleport"),
            Err(ToolError::ActionNotFound {
                tool: "FileOps".to_string(),
                action: "teleport".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool_fails() {
        let registry = ToolRegistry::with_default_tools();
        let step = Step::new("CloudOps", "launch", 0);
        assert!(matches!(
            registry.invoke(&step).await,
            Err(ToolError::ToolNotFound(_))
        ));
    }

    #[test]
    fn test_move_inverse_swaps_source_and_destination() {
        let registry = ToolRegistry::with_default_tools();
        let step = Step::new("FileOps", "move", 1)
            .with_arg("source", "/tmp/a")
            .with_arg("destination", "/tmp/b");

        let inverse = registry.inverse_hint(&step).unwrap();
        assert_eq!(inverse.arg_str("source").as_deref(), Some("/tmp/b"));
        assert_eq!(inverse.arg_str("destination").as_deref(), Some("/tmp/a"));
    }

    #[test]
    fn test_touch_and_mkdir_invert_to_remove() {
        let registry = ToolRegistry::with_default_tools();
        for action in ["touch", "mkdir"] {
            let step = Step::new("FileOps", action, 1).with_arg("path", "/tmp/x");
            let inverse = registry.inverse_hint(&step).unwrap();
            assert_eq!(inverse.action, "remove");
            assert_eq!(inverse.arg_str("path").as_deref(), Some("/tmp/x"));
        }
    }

    #[test]
    fn test_append_inverts_to_truncate_tail() {
        let registry = ToolRegistry::with_default_tools();
        let step = Step::new("TextOps", "append", 1)
            .with_arg("path", "/tmp/log.txt")
            .with_arg("content", "hello");

        let inverse = registry.inverse_hint(&step).unwrap();
        assert_eq!(inverse.action, "truncate_tail");
        assert_eq!(inverse.args.get("chars").and_then(Value::as_u64), Some(5));
    }

    #[test]
    fn test_destructive_actions_are_not_invertible() {
        let registry = ToolRegistry::with_default_tools();
        for (tool, action) in [
            ("FileOps", "remove"),
            ("FileOps", "write_file"),
            ("TextOps", "write"),
            ("ProcessOps", "kill"),
        ] {
            let step = Step::new(tool, action, 3).with_arg("path", "/tmp/x");
            assert!(registry.inverse_hint(&step).is_none(), "{}.{}", tool, action);
        }
    }

    #[test]
    fn test_expand_user_home() {
        let expanded = expand_user("~/notes.txt");
        assert!(!expanded.starts_with('~'));
        assert_eq!(expand_user("/abs/path"), "/abs/path");
    }
}
