//! World model
//!
//! Long-term memory about the user's environment, persisted as
//! `world_model.json`: frequently accessed paths with counters,
//! preferences, known applications, and recurring patterns.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApplicationInfo {
    path: String,
    category: Option<String>,
    registered: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PatternNote {
    description: String,
    first_seen: String,
    occurrences: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorldData {
    #[serde(default)]
    paths: HashMap<String, u64>,
    #[serde(default)]
    preferences: HashMap<String, String>,
    #[serde(default)]
    applications: HashMap<String, ApplicationInfo>,
    #[serde(default)]
    patterns: Vec<PatternNote>,
    #[serde(default)]
    last_updated: String,
}

/// Persistent world model
pub struct WorldModel {
    path: PathBuf,
    data: Mutex<WorldData>,
}

impl WorldModel {
    /// Load from `path`, falling back to an empty model
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(error = %err, "world model unreadable, starting fresh");
                WorldData::default()
            }),
            Err(_) => WorldData::default(),
        };
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Count one access to a path
    pub fn record_path_access(&self, path: &str) {
        {
            let mut data = self.data.lock().unwrap();
            *data.paths.entry(path.to_string()).or_insert(0) += 1;
        }
        self.save();
    }

    /// Most frequently accessed paths, most used first
    pub fn frequent_paths(&self, limit: usize) -> Vec<String> {
        let data = self.data.lock().unwrap();
        let mut entries: Vec<(&String, &u64)> = data.paths.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        entries
            .into_iter()
            .take(limit)
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// The full path counter set (rollback verification reads this)
    pub fn path_counters(&self) -> HashMap<String, u64> {
        self.data.lock().unwrap().paths.clone()
    }

    pub fn set_preference(&self, key: &str, value: &str) {
        self.data
            .lock()
            .unwrap()
            .preferences
            .insert(key.to_string(), value.to_string());
        self.save();
    }

    pub fn preference(&self, key: &str) -> Option<String> {
        self.data.lock().unwrap().preferences.get(key).cloned()
    }

    pub fn register_application(&self, name: &str, path: &str, category: Option<&str>) {
        self.data.lock().unwrap().applications.insert(
            name.to_string(),
            ApplicationInfo {
                path: path.to_string(),
                category: category.map(str::to_string),
                registered: Utc::now().to_rfc3339(),
            },
        );
        self.save();
    }

    pub fn find_application(&self, name: &str) -> Option<String> {
        self.data
            .lock()
            .unwrap()
            .applications
            .get(name)
            .map(|app| app.path.clone())
    }

    /// Record a recurring pattern; repeats bump the occurrence count
    pub fn add_pattern(&self, description: &str) {
        {
            let mut data = self.data.lock().unwrap();
            if let Some(existing) = data
                .patterns
                .iter_mut()
                .find(|p| p.description == description)
            {
                existing.occurrences += 1;
            } else {
                data.patterns.push(PatternNote {
                    description: description.to_string(),
                    first_seen: Utc::now().to_rfc3339(),
                    occurrences: 1,
                });
            }
        }
        self.save();
    }

    /// Human-readable summary for the `status` command
    pub fn summary(&self) -> String {
        let data = self.data.lock().unwrap();
        format!(
            "World model (updated: {})\nFrequent paths: {}\nPreferences: {}\nApplications: {}\nPatterns: {}",
            if data.last_updated.is_empty() {
                "never"
            } else {
                data.last_updated.as_str()
            },
            data.paths.len(),
            data.preferences.len(),
            data.applications.len(),
            data.patterns.len()
        )
    }

    fn save(&self) {
        let serialized = {
            let mut data = self.data.lock().unwrap();
            data.last_updated = Utc::now().to_rfc3339();
            serde_json::to_string_pretty(&*data)
        };
        match serialized {
            Ok(json) => {
                if let Some(parent) = self.path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                if let Err(err) = std::fs::write(&self.path, json) {
                    warn!(error = %err, "world model save failed");
                }
            }
            Err(err) => warn!(error = %err, "world model serialization failed"),
        }
    }
}
