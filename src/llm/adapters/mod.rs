//! LLM adapters
//!
//! Provider-agnostic interface over LLM HTTP APIs. Supports any
//! OpenAI-compatible endpoint (OpenAI, DeepSeek), Ollama for local
//! models, and a deterministic stub for tests and offline use.

pub mod factory;
pub mod ollama;
pub mod openai;
pub mod stub;
pub mod transport;
pub mod transport_fake;
pub mod transport_types;
pub mod transport_ureq;

pub use factory::{create_provider, known_providers};
pub use transport::{FakeTransport, SyncTransport, Transport, UreqTransport};
pub use transport_types::AdapterError;

use crate::intent::Intent;

/// LLM provider trait
///
/// All providers implement this; the engine talks to providers only
/// through it. Translation returns a parsed, validated `Intent`;
/// reflection returns the raw structured text for the goal tracker.
pub trait LlmProvider: Send + Sync {
    /// Translate natural-language input into an intent
    fn translate(&self, user_input: &str) -> Result<Intent, AdapterError>;

    /// Translate with streaming output
    ///
    /// Calls `on_chunk` for each token fragment as it arrives; the
    /// accumulated buffer is parsed once the stream completes. Providers
    /// without native streaming call `on_chunk` once with the full text.
    fn translate_streaming<F>(&self, user_input: &str, on_chunk: F) -> Result<Intent, AdapterError>
    where
        F: FnMut(&str);

    /// Reflect on goal progress; returns the provider's structured text
    fn reflect(&self, prompt: &str) -> Result<String, AdapterError>;

    /// Whether the provider streams natively
    fn supports_streaming(&self) -> bool;

    /// Provider name for routing, circuits and logging
    fn name(&self) -> &str;
}

/// Concrete provider enum
///
/// `translate_streaming` is generic over its callback, so `LlmProvider`
/// is not dyn-compatible; this enum dispatches to the concrete types.
#[derive(Debug)]
pub enum Adapter {
    OpenAiCompat(openai::OpenAiCompatAdapter),
    Ollama(ollama::OllamaAdapter),
    Stub(stub::StubAdapter),
}

impl LlmProvider for Adapter {
    fn translate(&self, user_input: &str) -> Result<Intent, AdapterError> {
        match self {
            Adapter::OpenAiCompat(a) => a.translate(user_input),
            Adapter::Ollama(a) => a.translate(user_input),
            Adapter::Stub(a) => a.translate(user_input),
        }
    }

    fn translate_streaming<F>(&self, user_input: &str, on_chunk: F) -> Result<Intent, AdapterError>
    where
        F: FnMut(&str),
    {
        match self {
            Adapter::OpenAiCompat(a) => a.translate_streaming(user_input, on_chunk),
            Adapter::Ollama(a) => a.translate_streaming(user_input, on_chunk),
            Adapter::Stub(a) => a.translate_streaming(user_input, on_chunk),
        }
    }

    fn reflect(&self, prompt: &str) -> Result<String, AdapterError> {
        match self {
            Adapter::OpenAiCompat(a) => a.reflect(prompt),
            Adapter::Ollama(a) => a.reflect(prompt),
            Adapter::Stub(a) => a.reflect(prompt),
        }
    }

    fn supports_streaming(&self) -> bool {
        match self {
            Adapter::OpenAiCompat(a) => a.supports_streaming(),
            Adapter::Ollama(a) => a.supports_streaming(),
            Adapter::Stub(a) => a.supports_streaming(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Adapter::OpenAiCompat(a) => a.name(),
            Adapter::Ollama(a) => a.name(),
            Adapter::Stub(a) => a.name(),
        }
    }
}
