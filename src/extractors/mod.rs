use serde::{Deserialize, Serialize};

pub mod html;
pub mod json;
pub mod timedtext;

use crate::text::non_empty;

/// Shape of a response body, as far as transcript extraction is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    /// `<transcript><text ...>` style caption XML
    TimedText,
    /// JSON object or array
    Json,
    /// HTML page
    Html,
    /// Anything else, taken as already-plain text
    PlainText,
}

impl ContentKind {
    /// Classify a body from its declared content type, sniffing the body when
    /// the header is missing or too generic to be trusted. `text/plain` counts
    /// as generic: servers routinely send JSON and caption XML with it.
    pub fn classify(body: &str, content_type: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();
        let head = body.trim_start();

        if content_type.contains("json") {
            return ContentKind::Json;
        }
        if content_type.contains("xml") && !content_type.contains("xhtml") && has_text_elements(head) {
            return ContentKind::TimedText;
        }
        if content_type.contains("html") {
            return ContentKind::Html;
        }
        // text/plain or no header at all: the body shape decides
        if looks_like_timed_text(head) {
            return ContentKind::TimedText;
        }
        if head.starts_with('{') || head.starts_with('[') {
            return ContentKind::Json;
        }
        if head.starts_with('<') {
            return ContentKind::Html;
        }
        ContentKind::PlainText
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::TimedText => "timed-text",
            ContentKind::Json => "json",
            ContentKind::Html => "html",
            ContentKind::PlainText => "text",
        }
    }

    /// Run the extraction strategy for this kind.
    fn extract(&self, body: &str) -> Option<String> {
        match self {
            ContentKind::TimedText => timedtext::extract(body),
            ContentKind::Json => json::extract(body),
            ContentKind::Html => html::extract(body),
            ContentKind::PlainText => non_empty(body),
        }
    }
}

fn has_text_elements(body: &str) -> bool {
    body.contains("<text>") || body.contains("<text ")
}

fn looks_like_timed_text(head: &str) -> bool {
    let root = ["<?xml", "<transcript", "<timedtext", "<text>", "<text "]
        .iter()
        .any(|prefix| head.starts_with(prefix));
    root && has_text_elements(head)
}

/// Turn a raw response body into normalized transcript text.
///
/// Returns an empty string when no transcript can be recovered; callers treat
/// that as an unusable body even if the request itself succeeded.
pub fn extract_transcript(body: &str, content_type: &str) -> String {
    let kind = ContentKind::classify(body, content_type);
    let text = kind.extract(body).unwrap_or_default();
    tracing::debug!(
        kind = kind.as_str(),
        chars = text.len(),
        "Extracted transcript text from response body"
    );
    text
}
