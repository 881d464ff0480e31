//! SystemOps — system information
//!
//! disk_usage, memory_info, cpu_info, list_processes, uptime. All
//! read-only, backed by sysinfo.

use crate::tools::{expand_user, optional_u64, Tool, ToolError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use sysinfo::{Disks, System};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

pub struct SystemOps;

impl SystemOps {
    pub fn new() -> Self {
        SystemOps
    }

    fn disk_usage(&self, path: &str) -> Result<String, ToolError> {
        let target = expand_user(path);
        let disks = Disks::new_with_refreshed_list();

        // Longest mount point that prefixes the target path
        let disk = disks
            .iter()
            .filter(|d| Path::new(&target).starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .ok_or_else(|| ToolError::Failed(format!("no disk found for path: {}", path)))?;

        let total = disk.total_space() as f64 / GIB;
        let free = disk.available_space() as f64 / GIB;
        let used = total - free;
        let percent = if total > 0.0 { used / total * 100.0 } else { 0.0 };

        Ok(format!(
            "Disk {}: {:.1}GB used / {:.1}GB total ({:.1}% used, {:.1}GB free)",
            path, used, total, percent, free
        ))
    }

    fn memory_info(&self) -> String {
        let mut sys = System::new();
        sys.refresh_memory();

        let total = sys.total_memory() as f64 / GIB;
        let used = sys.used_memory() as f64 / GIB;
        let available = sys.available_memory() as f64 / GIB;
        let percent = if total > 0.0 { used / total * 100.0 } else { 0.0 };

        format!(
            "Memory: {:.1}GB used / {:.1}GB total ({:.1}% used, {:.1}GB available)",
            used, total, percent, available
        )
    }

    fn cpu_info(&self) -> String {
        let mut sys = System::new();
        sys.refresh_cpu();
        // Usage is measured between two refreshes
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu();

        let usage = sys.global_cpu_info().cpu_usage();
        format!("CPU: {:.1}% used ({} cores)", usage, sys.cpus().len())
    }

    fn list_processes(&self, limit: usize) -> String {
        let mut sys = System::new_all();
        sys.refresh_all();
        let total_memory = sys.total_memory().max(1);

        let mut processes: Vec<_> = sys.processes().values().collect();
        processes.sort_by(|a, b| b.memory().cmp(&a.memory()));

        processes
            .iter()
            .take(limit)
            .map(|p| {
                let percent = p.memory() as f64 / total_memory as f64 * 100.0;
                format!(
                    "PID {}: {} ({:.1}% mem)",
                    p.pid(),
                    p.name(),
                    percent
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn uptime(&self) -> String {
        let seconds = System::uptime();
        let days = seconds / 86_400;
        let hours = (seconds % 86_400) / 3_600;
        let minutes = (seconds % 3_600) / 60;
        format!("System uptime: {}d {}h {}m", days, hours, minutes)
    }
}

impl Default for SystemOps {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SystemOps {
    fn name(&self) -> &'static str {
        "SystemOps"
    }

    fn actions(&self) -> &'static [&'static str] {
        &[
            "disk_usage",
            "memory_info",
            "cpu_info",
            "list_processes",
            "uptime",
        ]
    }

    async fn invoke(
        &self,
        action: &str,
        args: &HashMap<String, Value>,
    ) -> Result<String, ToolError> {
        match action {
            "disk_usage" => {
                let path = args
                    .get("path")
                    .and_then(Value::as_str)
                    .unwrap_or("/")
                    .to_string();
                self.disk_usage(&path)
            }
            "memory_info" => Ok(self.memory_info()),
            "cpu_info" => Ok(self.cpu_info()),
            "list_processes" => {
                let limit = optional_u64(args, "limit", 10) as usize;
                Ok(self.list_processes(limit))
            }
            "uptime" => Ok(self.uptime()),
            other => Err(ToolError::ActionNotFound {
                tool: "SystemOps".to_string(),
                action: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_info_reports_totals() {
        let out = SystemOps::new()
            .invoke("memory_info", &HashMap::new())
            .await
            .unwrap();
        assert!(out.starts_with("Memory:"));
        assert!(out.contains("GB total"));
    }

    #[tokio::test]
    async fn test_uptime_format() {
        let out = SystemOps::new()
            .invoke("uptime", &HashMap::new())
            .await
            .unwrap();
        assert!(out.starts_with("System uptime:"));
        assert!(out.ends_with('m'));
    }

    #[tokio::test]
    async fn test_disk_usage_for_root() {
        let mut args = HashMap::new();
        args.insert("path".to_string(), serde_json::json!("/"));
        let out = SystemOps::new().invoke("disk_usage", &args).await.unwrap();
        assert!(out.starts_with("Disk /:"));
    }

    #[tokio::test]
    async fn test_list_processes_respects_limit() {
        let mut args = HashMap::new();
        args.insert("limit".to_string(), serde_json::json!(3));
        let out = SystemOps::new()
            .invoke("list_processes", &args)
            .await
            .unwrap();
        assert!(out.lines().count() <= 3);
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let result = SystemOps::new().invoke("reboot", &HashMap::new()).await;
        assert!(matches!(result, Err(ToolError::ActionNotFound { .. })));
    }
}
