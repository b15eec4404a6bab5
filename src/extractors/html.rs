use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::text::non_empty;

/// Containers that hold the whole transcript, most specific first.
const CONTAINER_SELECTORS: &[&str] = &[
    "textarea#transcript",
    "#transcript",
    ".transcript",
    "[data-transcript]",
    "#captions",
    ".captions",
    ".caption-text",
    "pre",
];

/// Individual timed cues, used when no container matched.
const CUE_SELECTORS: &str = "[data-start], [data-time], [data-timestamp], [data-offset], \
     .cue, .segment, .transcript-segment, .caption-line, [class*=\"cue\"], [class*=\"segment\"]";

static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTAINER_SELECTORS
        .iter()
        .map(|selector| Selector::parse(selector).expect("valid container selector"))
        .collect()
});

static CUES: Lazy<Selector> =
    Lazy::new(|| Selector::parse(CUE_SELECTORS).expect("valid cue selector"));

/// Extract transcript text from an HTML page.
///
/// Known containers are tried in order, reading a form control's value or the
/// element's text (the parser has already decoded character references).
/// When none of them has text, elements that look like timed
/// cues are concatenated instead.
pub fn extract(body: &str) -> Option<String> {
    let document = Html::parse_document(body);

    CONTAINERS
        .iter()
        .find_map(|selector| document.select(selector).find_map(|el| container_text(&el)))
        .or_else(|| cue_text(&document))
}

fn container_text(element: &ElementRef<'_>) -> Option<String> {
    let value = element.value();
    let is_form_control = matches!(value.name(), "input" | "textarea");

    if is_form_control {
        if let Some(text) = value.attr("value").and_then(non_empty) {
            return Some(text);
        }
    }

    if let Some(text) = value.attr("data-transcript").and_then(non_empty) {
        return Some(text);
    }

    non_empty(&element.text().collect::<Vec<_>>().join(" "))
}

fn cue_text(document: &Html) -> Option<String> {
    let parts = document
        .select(&CUES)
        // nested matches would repeat the same text
        .filter(|el| !el.ancestors().filter_map(ElementRef::wrap).any(|a| CUES.matches(&a)))
        .filter_map(|el| non_empty(&el.text().collect::<Vec<_>>().join(" ")))
        .collect::<Vec<_>>();

    non_empty(&parts.join(" "))
}
