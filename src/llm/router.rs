//! Provider router
//!
//! Maps a complexity score onto a provider name: simple inputs go to the
//! cheap provider, complex ones to the powerful provider, and the middle
//! band prefers cheap. The choice is advisory; callers may override.

use crate::llm::complexity::{ComplexityScore, TaskComplexityAnalyzer};
use tracing::debug;

/// Routing decision with the assessment that produced it
#[derive(Debug, Clone)]
pub struct RouteChoice {
    /// Selected provider name
    pub provider: String,
    /// The complexity assessment behind the choice
    pub complexity: ComplexityScore,
}

/// Complexity-based provider router
pub struct ModelRouter {
    analyzer: TaskComplexityAnalyzer,
    cheap: String,
    powerful: String,
}

impl ModelRouter {
    pub fn new(cheap: impl Into<String>, powerful: impl Into<String>) -> Self {
        Self {
            analyzer: TaskComplexityAnalyzer::new(),
            cheap: cheap.into(),
            powerful: powerful.into(),
        }
    }

    pub fn cheap_provider(&self) -> &str {
        &self.cheap
    }

    pub fn powerful_provider(&self) -> &str {
        &self.powerful
    }

    /// Route an input; `iterative` marks explicit iterative mode
    pub fn route(&self, user_input: &str, iterative: bool) -> RouteChoice {
        let complexity = self.analyzer.analyze(user_input, iterative);

        // Ties (the middle band) prefer the cheap provider
        let provider = if complexity.is_complex() {
            self.powerful.clone()
        } else {
            self.cheap.clone()
        };

        debug!(
            score = complexity.score,
            provider = %provider,
            "routed input by complexity"
        );

        RouteChoice {
            provider,
            complexity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> ModelRouter {
        ModelRouter::new("deepseek", "openai")
    }

    #[test]
    fn test_simple_input_routes_cheap() {
        let choice = router().route("list files in /tmp", false);
        assert_eq!(choice.provider, "deepseek");
        assert!(choice.complexity.is_simple());
    }

    #[test]
    fn test_complex_input_routes_powerful() {
        let choice = router().route(
            "analyze the codebase, investigate the architecture, then refactor and \
             compare alternatives before recommending the best design",
            false,
        );
        assert_eq!(choice.provider, "openai");
    }

    #[test]
    fn test_middle_band_prefers_cheap() {
        let choice = router().route(
            "move the reports into the archive folder and then clean up the names",
            false,
        );
        assert_eq!(choice.provider, "deepseek");
    }

    #[test]
    fn test_iterative_complex_goal_routes_powerful() {
        let choice = router().route("read the project and suggest refactors across the codebase", true);
        assert_eq!(choice.provider, "openai");
    }
}
