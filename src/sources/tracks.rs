use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::http::{HttpClient, HttpRequest};
use crate::text::decode_entities;
use crate::transcript::{DiagnosticTrail, FetchAttempt};
use crate::Result;

static TRACK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<track\b([^>]*)>").expect("valid track pattern"));
static ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*"([^"]*)""#).expect("valid attribute pattern"));

/// A caption track advertised by the timed-text listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub language_code: String,
    pub name: String,
}

/// The official timed-text endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedTextSource {
    pub base_url: String,
    /// Language requested by the default query and preferred during discovery
    pub language: String,
}

impl Default for TimedTextSource {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            language: "en".to_string(),
        }
    }
}

impl TimedTextSource {
    fn endpoint(&self) -> Result<Url> {
        let base = Url::parse(&self.base_url)
            .map_err(|_| anyhow::anyhow!("Invalid timed-text base URL: {}", self.base_url))?;
        Ok(base.join("/api/timedtext")?)
    }

    /// The default query: configured language, no track name.
    pub fn default_url(&self, video_id: &str) -> Result<String> {
        let mut url = self.endpoint()?;
        url.query_pairs_mut()
            .append_pair("lang", &self.language)
            .append_pair("v", video_id);
        Ok(url.to_string())
    }

    /// Listing of the caption tracks available for a video.
    pub fn track_list_url(&self, video_id: &str) -> Result<String> {
        let mut url = self.endpoint()?;
        url.query_pairs_mut()
            .append_pair("type", "list")
            .append_pair("v", video_id);
        Ok(url.to_string())
    }

    /// Timed-text URL for one specific track.
    pub fn track_url(&self, video_id: &str, track: &CaptionTrack) -> Result<String> {
        let mut url = self.endpoint()?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("lang", &track.language_code)
                .append_pair("v", video_id);
            if !track.name.is_empty() {
                query.append_pair("name", &track.name);
            }
        }
        Ok(url.to_string())
    }

    /// Prefer the first track in the configured language, else the first track.
    pub fn select_track<'a>(&self, tracks: &'a [CaptionTrack]) -> Option<&'a CaptionTrack> {
        tracks
            .iter()
            .find(|track| track.language_code == self.language)
            .or_else(|| tracks.first())
    }

    /// Fetch the track listing and build a timed-text URL for the selected
    /// track. The listing request is recorded in `trail`.
    ///
    /// Returns `None` when the listing failed or advertised no usable track.
    pub async fn discover_track_url(
        &self,
        client: &dyn HttpClient,
        video_id: &str,
        trail: &mut DiagnosticTrail,
    ) -> Option<String> {
        let list_url = match self.track_list_url(video_id) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!("Could not build track listing URL: {}", err);
                return None;
            }
        };

        let response = match client.send(HttpRequest::get(&list_url)).await {
            Ok(response) => response,
            Err(err) => {
                trail.push(FetchAttempt::transport_failure(&list_url, &err));
                return None;
            }
        };
        trail.push(FetchAttempt::from_response(&list_url, &response));

        if !response.is_success() {
            return None;
        }

        let tracks = parse_tracks(&response.body);
        tracing::debug!(video_id, tracks = tracks.len(), "Parsed caption track listing");

        let track = self.select_track(&tracks)?;
        match self.track_url(video_id, track) {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!("Could not build track URL: {}", err);
                None
            }
        }
    }
}

/// Parse `(lang_code, name)` pairs from a track listing, in document order.
/// Tracks without a language code are skipped.
pub fn parse_tracks(body: &str) -> Vec<CaptionTrack> {
    TRACK_TAG
        .captures_iter(body)
        .filter_map(|tag| {
            let mut language_code = None;
            let mut name = String::new();

            for attr in ATTRIBUTE.captures_iter(&tag[1]) {
                match &attr[1] {
                    "lang_code" => language_code = Some(decode_entities(&attr[2])),
                    "name" => name = decode_entities(&attr[2]),
                    _ => {}
                }
            }

            language_code
                .filter(|code| !code.is_empty())
                .map(|language_code| CaptionTrack { language_code, name })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<transcript_list docid="123">
<track id="0" name="Deutsch" lang_code="de" lang_original="Deutsch" lang_translated="German"/>
<track id="1" name="" lang_code="en" lang_original="English" lang_translated="English" lang_default="true"/>
<track id="2" name="Tom &amp; Jerry" lang_code="en" lang_original="English"/>
</transcript_list>"#;

    fn track(code: &str, name: &str) -> CaptionTrack {
        CaptionTrack {
            language_code: code.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_parse_tracks() {
        let tracks = parse_tracks(LISTING);
        assert_eq!(
            tracks,
            vec![track("de", "Deutsch"), track("en", ""), track("en", "Tom & Jerry")]
        );
    }

    #[test]
    fn test_parse_tracks_skips_missing_language() {
        assert!(parse_tracks(r#"<track id="0" name="x"/>"#).is_empty());
        assert!(parse_tracks("<transcript_list></transcript_list>").is_empty());
    }

    #[test]
    fn test_select_prefers_target_language() {
        let source = TimedTextSource::default();
        let tracks = parse_tracks(LISTING);
        assert_eq!(source.select_track(&tracks), Some(&track("en", "")));
    }

    #[test]
    fn test_select_falls_back_to_first() {
        let source = TimedTextSource::default();
        let tracks = vec![track("fr", "a"), track("de", "b")];
        assert_eq!(source.select_track(&tracks), Some(&track("fr", "a")));
        assert_eq!(source.select_track(&[]), None);
    }

    #[test]
    fn test_urls() {
        let source = TimedTextSource::default();
        assert_eq!(
            source.default_url("abc12345678").unwrap(),
            "https://www.youtube.com/api/timedtext?lang=en&v=abc12345678"
        );
        assert_eq!(
            source.track_list_url("abc12345678").unwrap(),
            "https://www.youtube.com/api/timedtext?type=list&v=abc12345678"
        );
        assert_eq!(
            source.track_url("abc12345678", &track("de", "Deutsch Auto")).unwrap(),
            "https://www.youtube.com/api/timedtext?lang=de&v=abc12345678&name=Deutsch+Auto"
        );
        assert_eq!(
            source.track_url("abc12345678", &track("en", "")).unwrap(),
            "https://www.youtube.com/api/timedtext?lang=en&v=abc12345678"
        );
    }
}
