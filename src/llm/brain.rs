//! Brain — resilient translate/reflect front door
//!
//! Composes the provider adapters with the resilience layer. A call
//! flows: complexity router → fallback chain → circuit breaker →
//! budgeted backoff retry → adapter. Open circuits are skipped without
//! consuming budget; every fallback attempt gets its own retry run.

use crate::intent::Intent;
use crate::llm::adapters::{Adapter, LlmProvider};
use crate::llm::complexity::ComplexityScore;
use crate::llm::prompts::build_reflection_prompt;
use crate::llm::router::ModelRouter;
use crate::resilience::{
    retry_with_budget, AllFallbacksFailed, AttemptError, CircuitBreaker, FallbackChain,
    RetryBudgets, RetryError, RetryPolicy,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Brain-level errors
#[derive(Debug, thiserror::Error)]
pub enum BrainError {
    #[error(transparent)]
    AllFallbacksFailed(#[from] AllFallbacksFailed),

    #[error("no providers configured")]
    NoProviders,
}

/// A successful translation with its provenance
#[derive(Debug)]
pub struct Translated {
    pub intent: Intent,
    /// Provider that produced the intent
    pub provider: String,
    /// Complexity assessment that drove routing
    pub complexity: ComplexityScore,
}

/// Resilient LLM front door
pub struct Brain {
    providers: HashMap<String, Adapter>,
    breakers: HashMap<String, CircuitBreaker>,
    chain: FallbackChain,
    router: ModelRouter,
    budgets: RetryBudgets,
    retry_policy: RetryPolicy,
}

impl Brain {
    /// Build a brain over the given adapters
    ///
    /// `chain_order` defines the fallback order; every named provider
    /// must be present in `providers`. The router's recommendation is
    /// honored by moving its pick to the front of the chain.
    pub fn new(providers: Vec<Adapter>, chain_order: Vec<String>, router: ModelRouter) -> Self {
        let breakers = providers
            .iter()
            .map(|p| (p.name().to_string(), CircuitBreaker::new(p.name())))
            .collect();
        let providers = providers
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();

        Self {
            providers,
            breakers,
            chain: FallbackChain::new(chain_order),
            router,
            budgets: RetryBudgets::default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy (tests use millisecond delays)
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Circuit snapshot for a provider, if it exists
    pub fn circuit(&self, provider: &str) -> Option<&CircuitBreaker> {
        self.breakers.get(provider)
    }

    /// Translate user input into an intent
    pub fn translate(&self, user_input: &str, iterative: bool) -> Result<Translated, BrainError> {
        self.translate_streaming(user_input, iterative, None, |_| {})
    }

    /// Translate with an explicit provider override
    ///
    /// The router's choice is advisory; an override pins the first
    /// provider tried while the rest of the chain still backs it up.
    pub fn translate_with_provider(
        &self,
        user_input: &str,
        iterative: bool,
        provider: &str,
    ) -> Result<Translated, BrainError> {
        self.translate_streaming(user_input, iterative, Some(provider), |_| {})
    }

    /// Translate, forwarding streamed chunks to `on_chunk`
    pub fn translate_streaming<F>(
        &self,
        user_input: &str,
        iterative: bool,
        override_provider: Option<&str>,
        mut on_chunk: F,
    ) -> Result<Translated, BrainError>
    where
        F: FnMut(&str),
    {
        if self.providers.is_empty() {
            return Err(BrainError::NoProviders);
        }

        let choice = self.router.route(user_input, iterative);
        let preferred = override_provider.unwrap_or(choice.provider.as_str());
        debug!(preferred = %preferred, score = choice.complexity.score, "translating input");

        let budget = self.budgets.for_operation("translate");
        let intent_and_provider = self.chain.run_preferring(preferred, |name| {
            let adapter = match self.providers.get(name) {
                Some(a) => a,
                None => return Err(AttemptError::Skipped("provider not configured".into())),
            };
            self.guard(name)?;

            let result = retry_with_budget(
                &self.retry_policy,
                &budget,
                || {
                    let outcome = adapter.translate_streaming(user_input, &mut on_chunk);
                    self.record(name, outcome.is_ok());
                    outcome
                },
                |err| err.is_transient(),
            );

            match result {
                Ok(intent) => Ok((intent, name.to_string())),
                Err(err) => Err(attempt_error(err)),
            }
        })?;

        let (intent, provider) = intent_and_provider;
        info!(provider = %provider, steps = intent.steps.len(), "translation complete");

        Ok(Translated {
            intent,
            provider,
            complexity: choice.complexity,
        })
    }

    /// Reflect on goal progress
    ///
    /// Reflection drives iterative mode, so the powerful provider leads;
    /// the chain still backs it up.
    pub fn reflect(
        &self,
        user_goal: &str,
        intent: &Intent,
        observations: &[String],
    ) -> Result<String, BrainError> {
        if self.providers.is_empty() {
            return Err(BrainError::NoProviders);
        }

        let prompt = build_reflection_prompt(user_goal, intent, observations);
        let budget = self.budgets.for_operation("reflect");
        let preferred = self.router.powerful_provider().to_string();

        let text = self.chain.run_preferring(&preferred, |name| {
            let adapter = match self.providers.get(name) {
                Some(a) => a,
                None => return Err(AttemptError::Skipped("provider not configured".into())),
            };
            self.guard(name)?;

            let result = retry_with_budget(
                &self.retry_policy,
                &budget,
                || {
                    let outcome = adapter.reflect(&prompt);
                    self.record(name, outcome.is_ok());
                    outcome
                },
                |err| err.is_transient(),
            );

            result.map_err(attempt_error)
        })?;

        Ok(text)
    }

    /// Skip providers whose circuit is open, without consuming budget
    fn guard(&self, name: &str) -> Result<(), AttemptError> {
        if let Some(breaker) = self.breakers.get(name) {
            breaker
                .check()
                .map_err(|e| AttemptError::Skipped(e.to_string()))?;
        }
        Ok(())
    }

    fn record(&self, name: &str, success: bool) {
        if let Some(breaker) = self.breakers.get(name) {
            if success {
                breaker.record_success();
            } else {
                breaker.record_failure();
            }
        }
    }
}

fn attempt_error<E: std::fmt::Display>(err: RetryError<E>) -> AttemptError {
    AttemptError::Failed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::adapters::stub::StubAdapter;
    use crate::resilience::CircuitState;
    use std::time::Duration;

    const PLAN: &str = r#"{"goal": "g", "requires_confirmation": false, "steps": []}"#;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            base: 2.0,
            jitter: false,
        }
    }

    fn brain_with(stubs: Vec<StubAdapter>, order: Vec<&str>) -> Brain {
        // Stub adapters all report the name "stub"; wrap them into the
        // chain via distinct OpenAiCompat-free map keys is not possible,
        // so single-stub brains are the common case here.
        let providers = stubs.into_iter().map(Adapter::Stub).collect();
        Brain::new(
            providers,
            order.into_iter().map(String::from).collect(),
            ModelRouter::new("stub", "stub"),
        )
        .with_retry_policy(fast_policy())
    }

    #[test]
    fn test_translate_via_stub() {
        let stub = StubAdapter::new();
        stub.push_translation(PLAN);
        let brain = brain_with(vec![stub], vec!["stub"]);

        let translated = brain.translate("anything", false).unwrap();
        assert_eq!(translated.intent.goal, "g");
        assert_eq!(translated.provider, "stub");
    }

    #[test]
    fn test_all_fallbacks_failed_carries_provider_errors() {
        let stub = StubAdapter::new();
        stub.push_translation_error("unreachable");
        let brain = brain_with(vec![stub], vec!["stub"]);

        let err = brain.translate("anything", false).unwrap_err();
        let BrainError::AllFallbacksFailed(failures) = err else {
            panic!("expected AllFallbacksFailed");
        };
        assert_eq!(failures.failures.len(), 1);
        assert_eq!(failures.failures[0].0, "stub");
        assert!(failures.failures[0].1.contains("unreachable"));
    }

    #[test]
    fn test_consecutive_failures_open_circuit_and_skip() {
        let stub = StubAdapter::new();
        for _ in 0..5 {
            stub.push_translation_error("down");
        }
        let brain = brain_with(vec![stub], vec!["stub"]);

        // Five failed translations trip the breaker (one attempt each)
        for _ in 0..5 {
            let _ = brain.translate("x", false);
        }
        assert_eq!(brain.circuit("stub").unwrap().state(), CircuitState::Open);

        // Sixth call is skipped without touching the adapter
        let err = brain.translate("x", false).unwrap_err();
        let BrainError::AllFallbacksFailed(failures) = err else {
            panic!("expected AllFallbacksFailed");
        };
        assert!(failures.failures[0].1.contains("skipped"));
    }

    #[test]
    fn test_unknown_provider_in_chain_is_skipped() {
        let stub = StubAdapter::new();
        stub.push_translation(PLAN);
        let brain = brain_with(vec![stub], vec!["ghost", "stub"]);

        let translated = brain.translate("anything", false).unwrap();
        assert_eq!(translated.provider, "stub");
    }

    #[test]
    fn test_reflect_returns_structured_text() {
        let stub = StubAdapter::new();
        let brain = brain_with(vec![stub], vec!["stub"]);
        let intent = Intent {
            goal: "g".to_string(),
            requires_confirmation: false,
            steps: vec![],
        };

        let text = brain.reflect("g", &intent, &[]).unwrap();
        assert!(text.contains("ACHIEVED"));
    }

    #[test]
    fn test_streaming_chunks_forwarded() {
        let stub = StubAdapter::new();
        stub.push_translation(PLAN);
        let brain = brain_with(vec![stub], vec!["stub"]);

        let mut chunks = Vec::new();
        let translated = brain
            .translate_streaming("anything", false, None, |c| chunks.push(c.to_string()))
            .unwrap();
        assert!(!chunks.is_empty());
        assert_eq!(translated.intent.goal, "g");
    }
}
