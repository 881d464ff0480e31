//! Persistent memory
//!
//! Long-lived knowledge across sessions: the world model (paths,
//! preferences, applications, patterns), the executed-intent history,
//! and the once-only suggestion memory.

mod intent_history;
mod suggestions;
mod world_model;

pub use intent_history::{HistoryEntry, IntentHistory};
pub use suggestions::SuggestionMemory;
pub use world_model::WorldModel;
