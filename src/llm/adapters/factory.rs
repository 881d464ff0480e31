//! Adapter factory
//!
//! Creates provider instances from the environment. `ZENUS_LLM` names the
//! default provider; per-provider keys and base URLs come from
//! `<PROVIDER>_API_KEY` / `<PROVIDER>_API_BASE_URL`, and `OLLAMA_MODEL`
//! selects the local model.

use crate::llm::adapters::ollama::OllamaAdapter;
use crate::llm::adapters::openai::OpenAiCompatAdapter;
use crate::llm::adapters::stub::StubAdapter;
use crate::llm::adapters::{Adapter, AdapterError};

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com/v1";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEEPSEEK_DEFAULT_BASE: &str = "https://api.deepseek.com/v1";
const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";
const OLLAMA_DEFAULT_BASE: &str = "http://localhost:11434";
const OLLAMA_DEFAULT_MODEL: &str = "phi3:mini";

/// Provider names the factory understands
pub fn known_providers() -> &'static [&'static str] {
    &["openai", "deepseek", "ollama", "stub"]
}

/// Create a provider by name from the environment
pub fn create_provider(name: &str) -> Result<Adapter, AdapterError> {
    match name {
        "openai" => {
            let api_key = require_env("OPENAI_API_KEY")?;
            let base_url =
                env_or("OPENAI_API_BASE_URL", OPENAI_DEFAULT_BASE);
            let model = env_or("OPENAI_MODEL", OPENAI_DEFAULT_MODEL);
            Ok(Adapter::OpenAiCompat(OpenAiCompatAdapter::new(
                "openai".to_string(),
                base_url,
                model,
                api_key,
            )))
        }
        "deepseek" => {
            let api_key = require_env("DEEPSEEK_API_KEY")?;
            let base_url =
                env_or("DEEPSEEK_API_BASE_URL", DEEPSEEK_DEFAULT_BASE);
            let model = env_or("DEEPSEEK_MODEL", DEEPSEEK_DEFAULT_MODEL);
            Ok(Adapter::OpenAiCompat(OpenAiCompatAdapter::new(
                "deepseek".to_string(),
                base_url,
                model,
                api_key,
            )))
        }
        "ollama" => {
            let base_url = env_or("OLLAMA_API_BASE_URL", OLLAMA_DEFAULT_BASE);
            let model = env_or("OLLAMA_MODEL", OLLAMA_DEFAULT_MODEL);
            Ok(Adapter::Ollama(OllamaAdapter::new(base_url, model)))
        }
        "stub" => Ok(Adapter::Stub(StubAdapter::new())),
        other => Err(AdapterError::Configuration(format!(
            "unknown provider: {}",
            other
        ))),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn require_env(key: &str) -> Result<String, AdapterError> {
    std::env::var(key)
        .map_err(|_| AdapterError::Configuration(format!("{} not set", key)))
}
