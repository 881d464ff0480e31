//! Suggestion memory
//!
//! Remembers which pattern suggestions were already shown
//! (`pattern_suggestions.json`) so the same hint is not repeated at the
//! user on every failure.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Stored {
    #[serde(default)]
    suggested: Vec<String>,
}

/// Once-only suggestion tracker
pub struct SuggestionMemory {
    path: PathBuf,
    suggested: Mutex<HashSet<String>>,
}

impl SuggestionMemory {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let suggested = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Stored>(&raw).ok())
            .map(|stored| stored.suggested.into_iter().collect())
            .unwrap_or_default();

        Self {
            path,
            suggested: Mutex::new(suggested),
        }
    }

    pub fn has_suggested(&self, key: &str) -> bool {
        self.suggested.lock().unwrap().contains(key)
    }

    pub fn mark_suggested(&self, key: &str) {
        self.suggested.lock().unwrap().insert(key.to_string());
        self.save();
    }

    fn save(&self) {
        let stored = {
            let suggested = self.suggested.lock().unwrap();
            let mut keys: Vec<String> = suggested.iter().cloned().collect();
            keys.sort();
            Stored { suggested: keys }
        };
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&stored) {
            Ok(json) => {
                if let Err(err) = std::fs::write(&self.path, json) {
                    warn!(error = %err, "suggestion memory save failed");
                }
            }
            Err(err) => warn!(error = %err, "suggestion memory serialization failed"),
        }
    }
}
