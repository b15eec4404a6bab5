use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::{decode_entities, non_empty};

static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break pattern"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

const OPEN: &str = "<text";
const CLOSE: &str = "</text>";

/// Extract caption text from a timed-text XML document.
///
/// This is a structural scan over `<text>` elements rather than a full XML
/// parse, so truncated or slightly malformed documents still yield what they
/// contain.
pub fn extract(body: &str) -> Option<String> {
    let fragments = text_elements(body)
        .into_iter()
        .map(element_text)
        .filter(|fragment| !fragment.trim().is_empty())
        .collect::<Vec<_>>();

    non_empty(&fragments.join(" "))
}

/// Inner contents of every non-empty `<text>` element, in document order.
fn text_elements(body: &str) -> Vec<&str> {
    let mut elements = Vec::new();
    let mut rest = body;

    while let Some(start) = rest.find(OPEN) {
        let after_name = &rest[start + OPEN.len()..];

        // `<textarea>` and friends are not caption elements
        if !after_name.starts_with(|c: char| c == '>' || c == '/' || c.is_whitespace()) {
            rest = after_name;
            continue;
        }

        let Some(tag_end) = after_name.find('>') else {
            break;
        };

        if after_name[..tag_end].ends_with('/') {
            rest = &after_name[tag_end + 1..];
            continue;
        }

        let content = &after_name[tag_end + 1..];
        match content.find(CLOSE) {
            Some(close) => {
                elements.push(&content[..close]);
                rest = &content[close + CLOSE.len()..];
            }
            None => {
                elements.push(content);
                break;
            }
        }
    }

    elements
}

fn element_text(inner: &str) -> String {
    let with_breaks = LINE_BREAK.replace_all(inner, "\n");
    let without_tags = TAG.replace_all(&with_breaks, "");
    decode_entities(&without_tags)
}
