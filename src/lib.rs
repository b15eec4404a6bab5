//! Video Summarizer - fetch a transcript for a video from unreliable sources and summarize it
//!
//! The transcript is looked up through a fallback chain (a third-party transcript service,
//! then the official timed-text captions) and handed to a chat-completion API behind a
//! classifying retry loop. Videos are processed strictly one at a time.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod http;
pub mod links;
pub mod output;
pub mod pipeline;
pub mod sources;
pub mod summarize;
pub mod text;
pub mod transcript;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::{Config, CredentialSet, CredentialStore};
pub use links::VideoReference;
pub use pipeline::{ResultsSink, SummaryPipeline, VideoOutcome};
pub use summarize::{Summarizer, Summary};
pub use transcript::{Transcript, TranscriptError, TranscriptFetcher};

use serde::{Deserialize, Serialize};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the summarizer
#[derive(thiserror::Error, Debug)]
pub enum SummarizerError {
    #[error("Not a recognizable video URL or id: {0}")]
    UnsupportedUrl(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Failed to read page {0}: {1}")]
    PageUnavailable(String, String),
}

/// Why a transcript or summary could not be produced.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No response was obtained at all
    #[error("network failure")]
    NetworkFailure,

    #[error("http failure {0}")]
    HttpFailure(u16),

    /// A body arrived but had no recognizable shape
    #[error("unrecognized response")]
    ParseFailure,

    /// Every source and candidate was exhausted
    #[error("transcript unavailable")]
    TranscriptUnavailable,

    /// Billing-related 429, retrying cannot help
    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("rate limited")]
    RateLimited,

    #[error("transient server error")]
    TransientServerError,
}

impl FailureKind {
    /// Whether waiting and trying again can help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureKind::NetworkFailure | FailureKind::RateLimited | FailureKind::TransientServerError
        )
    }
}
