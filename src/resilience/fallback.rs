//! Provider fallback chain
//!
//! Ordered list of provider names tried in sequence. A provider whose
//! circuit is open is skipped without consuming retry budget; when every
//! provider fails or is skipped, `AllFallbacksFailed` carries the
//! per-provider error descriptions.

use std::fmt;
use tracing::warn;

/// Outcome of one provider attempt inside the chain
#[derive(Debug)]
pub enum AttemptError {
    /// Provider skipped (open circuit); no budget consumed
    Skipped(String),
    /// Provider tried and failed
    Failed(String),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Skipped(reason) => write!(f, "skipped: {}", reason),
            AttemptError::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Every provider in the chain failed or was skipped
#[derive(Debug, thiserror::Error)]
pub struct AllFallbacksFailed {
    /// (provider, error description) per attempted provider, in order
    pub failures: Vec<(String, String)>,
}

impl fmt::Display for AllFallbacksFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all providers failed:")?;
        for (provider, error) in &self.failures {
            write!(f, " [{}: {}]", provider, error)?;
        }
        Ok(())
    }
}

/// Ordered fallback chain over named providers
#[derive(Debug, Clone)]
pub struct FallbackChain {
    providers: Vec<String>,
}

impl FallbackChain {
    pub fn new(providers: Vec<String>) -> Self {
        Self { providers }
    }

    /// Providers in attempt order
    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// Reorder so `first` leads, keeping the rest in chain order
    ///
    /// Used to honor the router's advisory choice while preserving the
    /// configured fallback order behind it.
    pub fn preferring(&self, first: &str) -> Vec<String> {
        let mut ordered = Vec::with_capacity(self.providers.len());
        if self.providers.iter().any(|p| p == first) {
            ordered.push(first.to_string());
        }
        for provider in &self.providers {
            if provider != first {
                ordered.push(provider.clone());
            }
        }
        ordered
    }

    /// Try each provider in order until one succeeds
    pub fn run<T, F>(&self, mut attempt: F) -> Result<T, AllFallbacksFailed>
    where
        F: FnMut(&str) -> Result<T, AttemptError>,
    {
        self.run_ordered(&self.providers, &mut attempt)
    }

    /// Try an explicit provider order (e.g. router-preferred) until one succeeds
    pub fn run_preferring<T, F>(&self, first: &str, mut attempt: F) -> Result<T, AllFallbacksFailed>
    where
        F: FnMut(&str) -> Result<T, AttemptError>,
    {
        let ordered = self.preferring(first);
        self.run_ordered(&ordered, &mut attempt)
    }

    fn run_ordered<T, F>(&self, order: &[String], attempt: &mut F) -> Result<T, AllFallbacksFailed>
    where
        F: FnMut(&str) -> Result<T, AttemptError>,
    {
        let mut failures = Vec::new();
        for provider in order {
            match attempt(provider) {
                Ok(value) => return Ok(value),
                Err(outcome) => {
                    warn!(provider = %provider, error = %outcome, "provider attempt failed");
                    failures.push((provider.clone(), outcome.to_string()));
                }
            }
        }
        Err(AllFallbacksFailed { failures })
    }
}
