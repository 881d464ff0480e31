//! Intent parser
//!
//! Turns raw provider output into a validated `Intent`. Providers that
//! return free-form text get markdown fences stripped and the outermost
//! JSON object extracted; anything that still fails to parse is a
//! `TranslationError`.

use crate::intent::{Intent, ValidationError};

/// Errors from intent parsing
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("model output is not a valid intent: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("intent failed validation: {0}")]
    Invalid(#[from] ValidationError),
}

/// Parse provider output into a validated `Intent`
///
/// Normalizes the confirmation flag on the way out: an intent carrying
/// any destructive step leaves translation with
/// `requires_confirmation == true`.
pub fn parse_intent(raw: &str) -> Result<Intent, TranslationError> {
    let body = strip_markdown_fences(raw.trim());
    let json = extract_outer_json(body).ok_or(TranslationError::NoJsonObject)?;

    let mut intent: Intent = serde_json::from_str(json)?;
    intent.validate()?;

    if intent.has_destructive_step() {
        intent.requires_confirmation = true;
    }

    Ok(intent)
}

/// Strip a surrounding ``` or ```json fence if present
fn strip_markdown_fences(text: &str) -> &str {
    let Some(start) = text.find("```") else {
        return text;
    };
    let after_fence = &text[start + 3..];
    let Some(end) = after_fence.find("```") else {
        return text;
    };
    let inner = after_fence[..end].trim_start();
    // Skip the language identifier line ("json")
    match inner.find('\n') {
        Some(nl) if !inner[..nl].contains('{') => &inner[nl + 1..],
        _ => inner,
    }
}

/// Extract the outermost `{ ... }` object from text
///
/// First `{` to last `}`; returns None when no braces bound an object.
fn extract_outer_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
