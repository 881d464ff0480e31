//! Task complexity classifier
//!
//! Heuristic scorer in [0, 1] used to route simple inputs to a cheap
//! provider and complex ones to a powerful provider. Advisory only — the
//! caller may override the recommendation.

use regex::Regex;

/// Inputs scoring below this are simple enough for the cheap provider
pub const SIMPLE_THRESHOLD: f64 = 0.3;
/// Inputs scoring above this need the powerful provider
pub const COMPLEX_THRESHOLD: f64 = 0.7;

/// Keywords that indicate complexity
const COMPLEX_KEYWORDS: &[&str] = &[
    "analyze", "refactor", "optimize", "design", "architecture", "explain", "debug",
    "troubleshoot", "investigate", "research", "compare", "evaluate", "recommend",
    "suggest improvements", "best practices", "review", "audit", "assess", "plan",
    "strategy", "approach", "solution", "alternatives",
];

/// Keywords that indicate simplicity
const SIMPLE_KEYWORDS: &[&str] = &[
    "list", "show", "display", "get", "check", "status", "info", "view", "read",
    "print", "cat", "ls", "pwd", "echo", "which", "whereis", "find file", "locate",
];

/// Operations that are always simple
const SIMPLE_OPERATIONS: &[&str] = &[
    "list files", "show status", "check status", "pwd", "whoami", "date", "uptime",
    "df", "du", "free", "ps", "top", "ls", "cat file",
];

/// Markers for operating on a large scope
const SCOPE_MARKERS: &[&str] = &["codebase", "repository", "project", "database"];

/// Task complexity assessment
#[derive(Debug, Clone)]
pub struct ComplexityScore {
    /// 0.0 (simple) to 1.0 (complex)
    pub score: f64,
    /// Human-readable factors that contributed
    pub reasons: Vec<String>,
    /// Confidence in the assessment, grows with factor count
    pub confidence: f64,
}

impl ComplexityScore {
    /// Simple enough for the cheap provider
    pub fn is_simple(&self) -> bool {
        self.score < SIMPLE_THRESHOLD
    }

    /// Requires the powerful provider
    pub fn is_complex(&self) -> bool {
        self.score > COMPLEX_THRESHOLD
    }
}

/// Heuristic task-complexity analyzer
///
/// Factors: input length, complex/simple keyword sets, multi-step
/// connectors, scope markers, explicit iterative mode (+0.4).
pub struct TaskComplexityAnalyzer {
    multi_step_patterns: Vec<Regex>,
}

impl TaskComplexityAnalyzer {
    pub fn new() -> Self {
        let multi_step_patterns = [
            r"\band\b",
            r"\bthen\b",
            r"\bafter\b",
            r"\bnext\b",
            r"\bfirst\b.*\bsecond\b",
            r"\bstep \d+",
            r"\d+\)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect();

        Self {
            multi_step_patterns,
        }
    }

    /// Score an input; `iterative` is the explicit iterative-mode flag
    pub fn analyze(&self, user_input: &str, iterative: bool) -> ComplexityScore {
        let normalized = user_input.to_lowercase();
        let normalized = normalized.trim();
        let mut score: f64 = 0.0;
        let mut reasons = Vec::new();

        // Iterative mode is a strong complexity signal
        if iterative {
            score += 0.4;
            reasons.push("iterative mode requested".to_string());
        }

        // Length
        let word_count = normalized.split_whitespace().count();
        if word_count > 30 {
            score += 0.3;
            reasons.push(format!("long command ({} words)", word_count));
        } else if word_count > 15 {
            score += 0.15;
            reasons.push(format!("medium-length command ({} words)", word_count));
        }

        // Known-simple operations pull the score down hard
        if let Some(op) = SIMPLE_OPERATIONS.iter().find(|op| normalized.contains(**op)) {
            score = (score - 0.3).max(0.1);
            reasons.push(format!("simple operation: '{}'", op));
        }

        // Complex keywords
        let complex_found: Vec<&str> = COMPLEX_KEYWORDS
            .iter()
            .filter(|kw| normalized.contains(**kw))
            .copied()
            .collect();
        if !complex_found.is_empty() {
            score += (complex_found.len() as f64 * 0.15).min(0.4);
            reasons.push(format!(
                "complex keywords: {}",
                complex_found[..complex_found.len().min(3)].join(", ")
            ));
        }

        // Simple keywords only count when no complex keyword is present
        let simple_found: Vec<&str> = SIMPLE_KEYWORDS
            .iter()
            .filter(|kw| normalized.contains(**kw))
            .copied()
            .collect();
        if !simple_found.is_empty() && complex_found.is_empty() {
            score = (score - 0.2).max(0.0);
            reasons.push(format!(
                "simple keywords: {}",
                simple_found[..simple_found.len().min(2)].join(", ")
            ));
        }

        // Multi-step connectors
        let multi_step_count = self
            .multi_step_patterns
            .iter()
            .filter(|p| p.is_match(normalized))
            .count();
        if multi_step_count >= 2 {
            score += 0.2;
            reasons.push("multi-step task detected".to_string());
        }

        // Large scope
        if SCOPE_MARKERS.iter().any(|m| normalized.contains(m)) {
            score += 0.2;
            reasons.push("operating on large scope".to_string());
        }

        let score = score.clamp(0.0, 1.0);
        let confidence = (0.5 + reasons.len() as f64 * 0.1).min(0.95);

        ComplexityScore {
            score,
            reasons,
            confidence,
        }
    }
}

impl Default for TaskComplexityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> TaskComplexityAnalyzer {
        TaskComplexityAnalyzer::new()
    }

    #[test]
    fn test_simple_commands_score_low() {
        let simple = [
            "list files in ~/Documents",
            "show status",
            "uptime",
            "check status of the service",
        ];
        for input in simple {
            let result = analyzer().analyze(input, false);
            assert!(result.is_simple(), "'{}' scored {}", input, result.score);
        }
    }

    #[test]
    fn test_complex_commands_score_high() {
        let input = "analyze the codebase, investigate the failing tests, then refactor the \
                     error handling and compare the alternatives before recommending a design";
        let result = analyzer().analyze(input, false);
        assert!(result.is_complex(), "scored {}", result.score);
    }

    #[test]
    fn test_iterative_flag_adds_weight() {
        let base = analyzer().analyze("organize my downloads folder", false);
        let iterative = analyzer().analyze("organize my downloads folder", true);
        assert!(iterative.score >= base.score + 0.39);
    }

    #[test]
    fn test_iterative_complex_input_crosses_threshold() {
        let result = analyzer().analyze("read the project and suggest refactors across the codebase", true);
        assert!(result.is_complex(), "scored {}", result.score);
    }

    #[test]
    fn test_scope_marker_raises_score() {
        let plain = analyzer().analyze("tidy my notes", false);
        let scoped = analyzer().analyze("tidy my notes across the project", false);
        assert!(scoped.score > plain.score);
    }

    #[test]
    fn test_score_is_clamped() {
        let input = "analyze refactor optimize debug investigate compare evaluate audit the \
                     entire codebase and repository and database, first do one thing, second \
                     another, then continue after that with step 3 and more and more work";
        let result = analyzer().analyze(input, true);
        assert!(result.score <= 1.0);
        assert!(result.confidence <= 0.95);
    }

    #[test]
    fn test_reasons_are_reported() {
        let result = analyzer().analyze("analyze the project", false);
        assert!(!result.reasons.is_empty());
    }

    #[test]
    fn test_middle_band_is_neither() {
        // Medium-weight input: a couple of signals, not enough to cross 0.7
        let result = analyzer().analyze(
            "move the reports into the archive folder and then clean up the names",
            false,
        );
        assert!(!result.is_complex());
    }
}
