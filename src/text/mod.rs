//! Plain-text helpers shared by the extractors and the fetcher.

pub mod entities;
pub mod redact;

pub use entities::decode_entities;
pub use redact::{redact, redact_all, REDACTED};

/// Collapse every run of whitespace (including non-breaking spaces) to a
/// single space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize and drop the result when nothing is left.
pub fn non_empty(text: &str) -> Option<String> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a   b  "), "a b");
        assert_eq!(normalize_whitespace("line\none\ttwo"), "line one two");
        assert_eq!(normalize_whitespace("nbsp\u{a0}\u{a0}here"), "nbsp here");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_whitespace(" x \n\n y ");
        assert_eq!(normalize_whitespace(&once), once);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(" \n "), None);
        assert_eq!(non_empty(" hi "), Some("hi".to_string()));
    }
}
