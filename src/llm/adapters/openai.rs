//! OpenAI-compatible adapter
//!
//! Chat-completions HTTP API adapter. Serves both OpenAI and DeepSeek
//! (and any other endpoint speaking the same protocol) under the
//! provider name it was constructed with.

use crate::intent::Intent;
use crate::llm::adapters::transport::{SyncTransport, Transport};
use crate::llm::adapters::{AdapterError, LlmProvider};
use crate::llm::parse::parse_intent;
use crate::llm::prompts::{REFLECTION_SYSTEM_PROMPT, TRANSLATION_PROMPT};
use serde_json::Value as JsonValue;

/// OpenAI-compatible chat-completions adapter
#[derive(Debug)]
pub struct OpenAiCompatAdapter {
    /// Provider name ("openai", "deepseek", ...)
    provider: String,
    /// Base URL (e.g. https://api.openai.com/v1)
    base_url: String,
    /// Model name (e.g. gpt-4o-mini)
    model: String,
    /// API key
    api_key: String,
    /// HTTP transport
    transport: Transport,
}

impl OpenAiCompatAdapter {
    pub fn new(provider: String, base_url: String, model: String, api_key: String) -> Self {
        Self {
            provider,
            base_url,
            model,
            api_key,
            transport: Transport::default(),
        }
    }

    /// Create adapter with custom transport (for testing)
    pub fn with_transport(
        provider: String,
        base_url: String,
        model: String,
        api_key: String,
        transport: Transport,
    ) -> Self {
        Self {
            provider,
            base_url,
            model,
            api_key,
            transport,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, system: &str, user: &str, stream: bool) -> String {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": 0.1,
            "stream": stream
        })
        .to_string()
    }

    fn post(&self, system: &str, user: &str) -> Result<String, AdapterError> {
        let body = self.build_request(system, user, false);
        let auth = format!("Bearer {}", self.api_key);
        let headers = [
            ("Authorization", auth.as_str()),
            ("Content-Type", "application/json"),
        ];

        let response = self.transport.post_json(&self.url(), &headers, &body)?;
        extract_content(&response)
    }
}

/// Extract `choices[0].message.content` from a chat-completions response
fn extract_content(response: &str) -> Result<String, AdapterError> {
    let json: JsonValue = serde_json::from_str(response)
        .map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;

    json["choices"]
        .get(0)
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| AdapterError::InvalidResponse("missing choices[0].message.content".into()))
}

/// Extract the delta fragment from one SSE line, if any
fn sse_delta(line: &str) -> Option<String> {
    let data = line.strip_prefix("data: ")?;
    if data == "[DONE]" {
        return None;
    }
    let json: JsonValue = serde_json::from_str(data).ok()?;
    json["choices"]
        .get(0)
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
}

impl LlmProvider for OpenAiCompatAdapter {
    fn translate(&self, user_input: &str) -> Result<Intent, AdapterError> {
        let content = self.post(TRANSLATION_PROMPT, user_input)?;
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
        let body = self.build_request(TRANSLATION_PROMPT, user_input, true);
        let auth = format!("Bearer {}", self.api_key);
        let headers = [
            ("Authorization", auth.as_str()),
            ("Content-Type", "application/json"),
        ];

        let mut buffer = String::new();
        self.transport.post_stream(&self.url(), &headers, &body, |line| {
            if let Some(text) = sse_delta(line) {
                on_chunk(&text);
                buffer.push_str(&text);
            }
        })?;

        // Empty stream: provider may not support SSE, fall back to one shot
        if buffer.is_empty() {
            return self.translate(user_input);
        }

        Ok(parse_intent(&buffer)?)
    }

    fn reflect(&self, prompt: &str) -> Result<String, AdapterError> {
        self.post(REFLECTION_SYSTEM_PROMPT, prompt)
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.provider
    }
}
