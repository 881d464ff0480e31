//! Failure signatures
//!
//! Deterministic keys for grouping similar failures: the message is
//! lowercased, absolute paths collapse to `<path>`, numeric runs
//! collapse to `<num>`, and the tool/action prefix is kept.

use regex::Regex;
use std::sync::OnceLock;

fn path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:~|/)[\w./-]+").expect("static pattern"))
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("static pattern"))
}

/// Normalize an error message into a signature key
///
/// `FileOps.move: no files match source: /home/u/x.txt` and
/// `FileOps.move: no files match source: /tmp/other.txt` share one
/// signature.
pub fn normalize_signature(tool: &str, action: &str, message: &str) -> String {
    let lowered = message.to_lowercase();
    let without_paths = path_pattern().replace_all(&lowered, "<path>");
    let without_numbers = number_pattern().replace_all(&without_paths, "<num>");
    format!("{}.{}: {}", tool, action, without_numbers.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_redacted() {
        let sig = normalize_signature("FileOps", "scan", "No such directory: /home/user/Documents");
        assert_eq!(sig, "FileOps.scan: no such directory: <path>");
    }

    #[test]
    fn test_home_relative_paths_are_redacted() {
        let sig = normalize_signature("FileOps", "scan", "cannot read ~/Downloads/report.pdf");
        assert!(sig.contains("<path>"));
        assert!(!sig.contains("Downloads"));
    }

    #[test]
    fn test_numbers_are_redacted() {
        let sig = normalize_signature("TextOps", "read", "Error on line 42, column 7");
        assert_eq!(sig, "TextOps.read: error on line <num>, column <num>");
    }

    #[test]
    fn test_message_is_lowercased() {
        let sig = normalize_signature("ProcessOps", "kill", "ACCESS DENIED");
        assert_eq!(sig, "ProcessOps.kill: access denied");
    }

    #[test]
    fn test_equal_shapes_share_a_signature() {
        let a = normalize_signature("FileOps", "move", "no files match source: /tmp/a/*.pdf");
        let b = normalize_signature("FileOps", "move", "No files match source: /var/b/*.pdf");
        assert_eq!(a, b);
    }

    #[test]
    fn test_tool_action_prefix_kept() {
        let sig = normalize_signature("FileOps", "move", "boom");
        assert!(sig.starts_with("FileOps.move: "));
    }
}
