//! ProcessOps — process inspection and termination
//!
//! find_by_name and info are read-only; kill is risk 3 and only runs
//! behind an acknowledged confirmation.

use crate::tools::{optional_bool, require_str, Tool, ToolError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use sysinfo::{Pid, Signal, System};

pub struct ProcessOps;

impl ProcessOps {
    pub fn new() -> Self {
        ProcessOps
    }

    fn find_by_name(&self, name: &str) -> String {
        let mut sys = System::new_all();
        sys.refresh_all();

        let needle = name.to_lowercase();
        let mut matches: Vec<String> = sys
            .processes()
            .values()
            .filter(|p| p.name().to_lowercase().contains(&needle))
            .map(|p| {
                let cmdline = p.cmd().join(" ");
                let shown: String = cmdline.chars().take(50).collect();
                format!("PID {}: {} ({})", p.pid(), p.name(), shown)
            })
            .collect();
        matches.sort();

        if matches.is_empty() {
            return format!("No processes found matching '{}'", name);
        }
        matches.join("\n")
    }

    fn info(&self, pid: u32) -> Result<String, ToolError> {
        let mut sys = System::new_all();
        sys.refresh_all();

        let process = sys
            .process(Pid::from_u32(pid))
            .ok_or_else(|| ToolError::Failed(format!("process {} not found", pid)))?;

        let total_memory = sys.total_memory().max(1);
        Ok(format!(
            "PID: {}\nName: {}\nStatus: {}\nCPU: {:.1}%\nMemory: {:.1}%\nCommand: {}",
            process.pid(),
            process.name(),
            process.status(),
            process.cpu_usage(),
            process.memory() as f64 / total_memory as f64 * 100.0,
            process.cmd().join(" ")
        ))
    }

    fn kill(&self, pid: u32, force: bool) -> Result<String, ToolError> {
        let mut sys = System::new_all();
        sys.refresh_all();

        let process = sys
            .process(Pid::from_u32(pid))
            .ok_or_else(|| ToolError::Failed(format!("process {} not found", pid)))?;
        let name = process.name().to_string();

        let delivered = if force {
            process.kill()
        } else {
            process
                .kill_with(Signal::Term)
                .unwrap_or_else(|| process.kill())
        };

        if !delivered {
            return Err(ToolError::Failed(format!(
                "failed to signal process {} ({})",
                pid, name
            )));
        }

        Ok(if force {
            format!("Force killed process {} ({})", pid, name)
        } else {
            format!("Terminated process {} ({})", pid, name)
        })
    }
}

impl Default for ProcessOps {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ProcessOps {
    fn name(&self) -> &'static str {
        "ProcessOps"
    }

    fn actions(&self) -> &'static [&'static str] {
        &["find_by_name", "info", "kill"]
    }

    async fn invoke(
        &self,
        action: &str,
        args: &HashMap<String, Value>,
    ) -> Result<String, ToolError> {
        match action {
            "find_by_name" => {
                let name = require_str("ProcessOps", action, args, "name")?;
                Ok(self.find_by_name(&name))
            }
            "info" => {
                let pid = require_pid(args, action)?;
                self.info(pid)
            }
            "kill" => {
                let pid = require_pid(args, action)?;
                let force = optional_bool(args, "force", false);
                self.kill(pid, force)
            }
            other => Err(ToolError::ActionNotFound {
                tool: "ProcessOps".to_string(),
                action: other.to_string(),
            }),
        }
    }
}

fn require_pid(args: &HashMap<String, Value>, action: &str) -> Result<u32, ToolError> {
    match args.get("pid") {
        Some(value) => value
            .as_u64()
            .map(|v| v as u32)
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| ToolError::InvalidArgument {
                tool: "ProcessOps".to_string(),
                action: action.to_string(),
                argument: "pid".to_string(),
                reason: "expected integer".to_string(),
            }),
        None => Err(ToolError::MissingArgument {
            tool: "ProcessOps".to_string(),
            action: action.to_string(),
            argument: "pid".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_find_by_name_handles_no_matches() {
        let mut args = HashMap::new();
        args.insert(
            "name".to_string(),
            json!("zz-definitely-not-a-real-process"),
        );
        let out = ProcessOps::new().invoke("find_by_name", &args).await.unwrap();
        assert!(out.contains("No processes found"));
    }

    #[tokio::test]
    async fn test_info_for_current_process() {
        let mut args = HashMap::new();
        args.insert("pid".to_string(), json!(std::process::id()));
        let out = ProcessOps::new().invoke("info", &args).await.unwrap();
        assert!(out.contains(&format!("PID: {}", std::process::id())));
    }

    #[tokio::test]
    async fn test_info_for_missing_process() {
        let mut args = HashMap::new();
        args.insert("pid".to_string(), json!(u32::MAX - 1));
        let result = ProcessOps::new().invoke("info", &args).await;
        assert!(matches!(result, Err(ToolError::Failed(_))));
    }

    #[tokio::test]
    async fn test_pid_argument_validation() {
        let mut args = HashMap::new();
        args.insert("pid".to_string(), json!("not-a-pid"));
        let result = ProcessOps::new().invoke("info", &args).await;
        assert!(matches!(result, Err(ToolError::InvalidArgument { .. })));

        let result = ProcessOps::new().invoke("kill", &HashMap::new()).await;
        assert!(matches!(result, Err(ToolError::MissingArgument { .. })));
    }
}
