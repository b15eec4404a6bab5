//! Static descriptions of the transcript sources and the URLs they are probed with.

use serde::{Deserialize, Serialize};
use url::Url;

pub mod tracks;
pub mod variants;

pub use tracks::{CaptionTrack, TimedTextSource};
pub use variants::candidate_urls;

use crate::Result;

/// Which value a query parameter carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    /// The bare video identifier
    VideoId,
    /// `https://www.youtube.com/watch?v=<id>`
    WatchUrl,
}

impl ParamValue {
    pub fn render(&self, video_id: &str) -> String {
        match self {
            ParamValue::VideoId => video_id.to_string(),
            ParamValue::WatchUrl => watch_url(video_id),
        }
    }
}

/// One `key=value` pair of a parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub key: String,
    pub value: ParamValue,
}

impl ParamSpec {
    pub fn video_id(key: &str) -> Self {
        Self {
            key: key.to_string(),
            value: ParamValue::VideoId,
        }
    }

    pub fn watch_url(key: &str) -> Self {
        Self {
            key: key.to_string(),
            value: ParamValue::WatchUrl,
        }
    }
}

/// A transcript source whose exact endpoint and parameter contract is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub base_url: String,
    pub endpoint_paths: Vec<String>,
    pub param_sets: Vec<Vec<ParamSpec>>,
}

impl SourceDescriptor {
    /// The third-party transcript service.
    pub fn transcript_service() -> Self {
        Self {
            name: "youtubetotranscript".to_string(),
            base_url: "https://youtubetotranscript.com".to_string(),
            endpoint_paths: ["/", "/api/transcript", "/api/v1/transcript", "/api/transcripts"]
                .iter()
                .map(|path| path.to_string())
                .collect(),
            param_sets: vec![
                vec![ParamSpec::video_id("v")],
                vec![ParamSpec::video_id("video_id")],
                vec![ParamSpec::video_id("videoId")],
                vec![ParamSpec::video_id("id")],
                vec![ParamSpec::watch_url("url")],
            ],
        }
    }

    /// Reject descriptors that cannot produce a single candidate.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .map_err(|_| anyhow::anyhow!("Invalid base URL for source '{}': {}", self.name, self.base_url))?;

        if self.endpoint_paths.is_empty() {
            anyhow::bail!("Source '{}' has no endpoint paths", self.name);
        }
        if self.param_sets.is_empty() {
            anyhow::bail!("Source '{}' has no parameter sets", self.name);
        }
        Ok(())
    }
}

impl Default for SourceDescriptor {
    fn default() -> Self {
        Self::transcript_service()
    }
}

/// Canonical watch page URL for a video identifier.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}
