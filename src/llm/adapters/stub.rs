//! Stub adapter
//!
//! Deterministic adapter without network calls. Used for integration
//! tests and when no real provider is configured. Responses can be
//! scripted in FIFO order; without a script it derives a minimal
//! read-only plan from the input.

use crate::intent::Intent;
use crate::llm::adapters::{AdapterError, LlmProvider};
use crate::llm::parse::parse_intent;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Stub provider for tests and offline use
#[derive(Debug, Default)]
pub struct StubAdapter {
    translations: Mutex<VecDeque<Result<String, String>>>,
    reflections: Mutex<VecDeque<Result<String, String>>>,
}

impl StubAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw translation response (parsed like real provider output)
    pub fn push_translation(&self, raw: &str) {
        self.translations
            .lock()
            .unwrap()
            .push_back(Ok(raw.to_string()));
    }

    /// Queue a translation failure (surfaces as a network error)
    pub fn push_translation_error(&self, msg: &str) {
        self.translations
            .lock()
            .unwrap()
            .push_back(Err(msg.to_string()));
    }

    /// Queue a reflection response
    pub fn push_reflection(&self, raw: &str) {
        self.reflections
            .lock()
            .unwrap()
            .push_back(Ok(raw.to_string()));
    }

    /// Queue a reflection failure
    pub fn push_reflection_error(&self, msg: &str) {
        self.reflections
            .lock()
            .unwrap()
            .push_back(Err(msg.to_string()));
    }

    fn next_translation(&self, user_input: &str) -> Result<String, AdapterError> {
        match self.translations.lock().unwrap().pop_front() {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(msg)) => Err(AdapterError::Network(msg)),
            None => Ok(default_plan(user_input)),
        }
    }

    fn next_reflection(&self) -> Result<String, AdapterError> {
        match self.reflections.lock().unwrap().pop_front() {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(msg)) => Err(AdapterError::Network(msg)),
            None => Ok("ACHIEVED: Yes\nCONFIDENCE: 0.9\nREASONING: Stub reflection.\nNEXT_STEPS: None".to_string()),
        }
    }
}

/// Derive a minimal read-only plan from the input
///
/// "list files in X" maps to FileOps.scan; anything else becomes a
/// zero-step plan that still round-trips through the pipeline.
fn default_plan(user_input: &str) -> String {
    let lowered = user_input.to_lowercase();
    if let Some(idx) = user_input.find(" in ") {
        if lowered.contains("list") || lowered.contains("scan") {
            let path = user_input[idx + 4..].trim();
            return serde_json::json!({
                "goal": "List files",
                "requires_confirmation": false,
                "steps": [{
                    "tool": "FileOps",
                    "action": "scan",
                    "args": {"path": path},
                    "risk": 0
                }]
            })
            .to_string();
        }
    }

    serde_json::json!({
        "goal": user_input,
        "requires_confirmation": false,
        "steps": []
    })
    .to_string()
}

impl LlmProvider for StubAdapter {
    fn translate(&self, user_input: &str) -> Result<Intent, AdapterError> {
        let raw = self.next_translation(user_input)?;
        Ok(parse_intent(&raw)?)
    }

    fn translate_streaming<F>(
        &self,
        user_input: &str,
        mut on_chunk: F,
    ) -> Result<Intent, AdapterError>
    where
        F: FnMut(&str),
    {
        let raw = self.next_translation(user_input)?;

        // Emit in small chunks for realism
        let mut chars = raw.chars().peekable();
        while chars.peek().is_some() {
            let chunk: String = chars.by_ref().take(20).collect();
            on_chunk(&chunk);
        }

        Ok(parse_intent(&raw)?)
    }

    fn reflect(&self, _prompt: &str) -> Result<String, AdapterError> {
        self.next_reflection()
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "stub"
    }
}
