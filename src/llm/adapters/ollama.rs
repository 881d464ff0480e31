//! Ollama adapter
//!
//! Local model support via the Ollama HTTP API. The generate endpoint is
//! asked for JSON-formatted output; streaming responses arrive as one
//! JSON object per line with a "response" fragment.

use crate::intent::Intent;
use crate::llm::adapters::transport::{SyncTransport, Transport};
use crate::llm::adapters::{AdapterError, LlmProvider};
use crate::llm::parse::parse_intent;
use crate::llm::prompts::{REFLECTION_SYSTEM_PROMPT, TRANSLATION_PROMPT};
use serde_json::Value as JsonValue;

/// Ollama adapter for local models
#[derive(Debug)]
pub struct OllamaAdapter {
    /// Base URL (default http://localhost:11434)
    base_url: String,
    /// Model name (e.g. phi3:mini)
    model: String,
    /// HTTP transport
    transport: Transport,
}

impl OllamaAdapter {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            transport: Transport::default(),
        }
    }

    /// Create adapter with custom transport (for testing)
    pub fn with_transport(base_url: String, model: String, transport: Transport) -> Self {
        Self {
            base_url,
            model,
            transport,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, system: &str, user: &str, stream: bool, force_json: bool) -> String {
        let mut request = serde_json::json!({
            "model": self.model,
            "prompt": format!("{}\n\nUser: {}\n", system, user),
            "stream": stream,
            "options": {
                "temperature": 0.1,
                "num_predict": 2048
            }
        });
        if force_json {
            request["format"] = JsonValue::String("json".to_string());
        }
        request.to_string()
    }

    fn generate(&self, system: &str, user: &str, force_json: bool) -> Result<String, AdapterError> {
        let body = self.build_request(system, user, false, force_json);
        let headers = [("Content-Type", "application/json")];

        let response = self.transport.post_json(&self.url(), &headers, &body)?;
        let json: JsonValue = serde_json::from_str(&response)
            .map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;

        json["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AdapterError::InvalidResponse("missing 'response' field".into()))
    }
}

impl LlmProvider for OllamaAdapter {
    fn translate(&self, user_input: &str) -> Result<Intent, AdapterError> {
        let content = self.generate(TRANSLATION_PROMPT, user_input, true)?;
        Ok(parse_intent(&content)?)
    }

    fn translate_streaming<F>(
        &self,
        user_input: &str,
        mut on_chunk: F,
    ) -> Result<Intent, AdapterError>
    where
        F: FnMut(&str),
    {
        let body = self.build_request(TRANSLATION_PROMPT, user_input, true, true);
        let headers = [("Content-Type", "application/json")];

        let mut buffer = String::new();
        self.transport.post_stream(&self.url(), &headers, &body, |line| {
            if let Ok(json) = serde_json::from_str::<JsonValue>(line) {
                if let Some(fragment) = json["response"].as_str() {
                    on_chunk(fragment);
                    buffer.push_str(fragment);
                }
            }
        })?;

        if buffer.is_empty() {
            return self.translate(user_input);
        }

        Ok(parse_intent(&buffer)?)
    }

    fn reflect(&self, prompt: &str) -> Result<String, AdapterError> {
        self.generate(REFLECTION_SYSTEM_PROMPT, prompt, false)
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
