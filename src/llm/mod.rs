//! LLM layer — translation and reflection behind interchangeable providers
//!
//! Providers implement a uniform interface (`LlmProvider`), constructed by
//! a factory from configuration. The `Brain` composes providers with the
//! resilience layer: complexity routing, fallback chain, circuit breaking
//! and budgeted retry.

pub mod adapters;
pub mod brain;
pub mod complexity;
pub mod parse;
pub mod prompts;
pub mod router;

pub use adapters::{Adapter, AdapterError, LlmProvider};
pub use brain::{Brain, BrainError, Translated};
pub use complexity::{ComplexityScore, TaskComplexityAnalyzer};
pub use parse::{parse_intent, TranslationError};
pub use router::{ModelRouter, RouteChoice};
