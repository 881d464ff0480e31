//! Reflection parsing
//!
//! The LLM answers reflection prompts with line-oriented fields:
//! ACHIEVED, CONFIDENCE, REASONING, NEXT_STEPS. Parsing is tolerant —
//! missing fields fall back to `achieved=false, confidence=0.5`.

/// Parsed reflection on goal progress
#[derive(Debug, Clone, PartialEq)]
pub struct Reflection {
    pub achieved: bool,
    /// Clamped to [0, 1]
    pub confidence: f64,
    pub reasoning: String,
    pub next_steps: Vec<String>,
}

impl Default for Reflection {
    fn default() -> Self {
        Self {
            achieved: false,
            confidence: 0.5,
            reasoning: "Unknown".to_string(),
            next_steps: Vec::new(),
        }
    }
}

impl Reflection {
    /// Parse structured reflection text, tolerating missing fields
    pub fn parse(text: &str) -> Self {
        let mut reflection = Reflection::default();

        for line in text.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("ACHIEVED:") {
                reflection.achieved = rest.trim().to_lowercase().contains("yes");
            } else if let Some(rest) = line.strip_prefix("CONFIDENCE:") {
                if let Ok(value) = rest.trim().parse::<f64>() {
                    reflection.confidence = value.clamp(0.0, 1.0);
                }
            } else if let Some(rest) = line.strip_prefix("REASONING:") {
                reflection.reasoning = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("NEXT_STEPS:") {
                let rest = rest.trim();
                if !rest.eq_ignore_ascii_case("none") {
                    reflection.next_steps = rest
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                }
            }
        }

        reflection
    }
}
