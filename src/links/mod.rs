//! Finding video references on a page or on the command line.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::http::{HttpClient, HttpRequest};
use crate::sources::watch_url;
use crate::utils::extract_domain;
use crate::SummarizerError;

const UNTITLED: &str = "Untitled Video";

static VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:v=|/embed/|youtu\.be/|/shorts/)([A-Za-z0-9_-]{11})").expect("valid video id pattern")
});
static BARE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid bare id pattern"));

static ANCHORS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[href*="youtube.com"], a[href*="youtu.be"]"#).expect("valid anchor selector")
});
static IFRAMES: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"iframe[src*="youtube.com"]"#).expect("valid iframe selector"));

/// One video to summarize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoReference {
    pub id: String,
    pub title: String,
}

impl VideoReference {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    pub fn watch_url(&self) -> String {
        watch_url(&self.id)
    }
}

/// Pull the 11-character identifier out of a watch, embed, short or
/// `youtu.be` URL, or accept a bare identifier.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if BARE_ID.is_match(input) {
        return Some(input.to_string());
    }
    VIDEO_ID.captures(input).map(|caps| caps[1].to_string())
}

/// Build references from command-line arguments. Anything that is not a
/// recognizable video is reported back as an error.
pub fn references_from_args(inputs: &[String]) -> crate::Result<Vec<VideoReference>> {
    let mut references = Vec::with_capacity(inputs.len());
    for input in inputs {
        let id = extract_video_id(input)
            .ok_or_else(|| SummarizerError::UnsupportedUrl(input.clone()))?;
        references.push(VideoReference::new(id, UNTITLED));
    }
    Ok(dedupe(references))
}

/// Scan page markup for linked and embedded videos.
///
/// Anchors come first, then iframes, each in document order. Duplicates are
/// dropped, keeping the first title seen.
pub fn scan_page(html: &str) -> Vec<VideoReference> {
    let document = Html::parse_document(html);
    let mut found = Vec::new();

    for anchor in document.select(&ANCHORS) {
        let Some(id) = anchor.value().attr("href").and_then(extract_video_id) else {
            continue;
        };
        let title = anchor.text().collect::<String>();
        found.push(VideoReference::new(id, title_or_default(&title)));
    }

    for iframe in document.select(&IFRAMES) {
        let Some(id) = iframe.value().attr("src").and_then(extract_video_id) else {
            continue;
        };
        let title = iframe.value().attr("title").unwrap_or("");
        found.push(VideoReference::new(id, title_or_default(title)));
    }

    let references = dedupe(found);
    tracing::debug!(count = references.len(), "Scanned page for video references");
    references
}

/// Read page markup from a local file or an http(s) URL.
pub async fn load_page(client: &dyn HttpClient, location: &str) -> crate::Result<String> {
    if !(location.starts_with("http://") || location.starts_with("https://")) {
        return Ok(fs_err::read_to_string(location)?);
    }

    tracing::info!(
        "Fetching page from {}",
        extract_domain(location).unwrap_or_else(|| location.to_string())
    );
    let response = client
        .send(HttpRequest::get(location))
        .await
        .map_err(|err| SummarizerError::PageUnavailable(location.to_string(), err.to_string()))?;

    if !response.is_success() {
        return Err(SummarizerError::PageUnavailable(location.to_string(), format!("HTTP {}", response.status)).into());
    }
    Ok(response.body)
}

fn title_or_default(title: &str) -> String {
    let title = crate::text::normalize_whitespace(title);
    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

fn dedupe(references: Vec<VideoReference>) -> Vec<VideoReference> {
    let mut seen = std::collections::HashSet::new();
    references
        .into_iter()
        .filter(|reference| seen.insert(reference.id.clone()))
        .collect()
}
