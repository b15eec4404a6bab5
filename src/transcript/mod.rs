use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

use crate::config::CredentialSet;
use crate::extractors::extract_transcript;
use crate::http::{HttpClient, HttpRequest, HttpResponse, TransportError};
use crate::links::VideoReference;
use crate::sources::{candidate_urls, SourceDescriptor, TimedTextSource};
use crate::text::redact;
use crate::FailureKind;

/// One request made while looking for a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchAttempt {
    /// Request URL with secrets already removed
    pub url: String,
    /// `None` when no response was obtained
    pub status: Option<u16>,
    pub content_type: String,
    /// The request got a 2xx response
    pub ok: bool,
    pub note: Option<String>,
}

impl FetchAttempt {
    /// `url` must already be redacted.
    pub fn from_response(url: &str, response: &HttpResponse) -> Self {
        Self {
            url: url.to_string(),
            status: Some(response.status),
            content_type: response.content_type().to_string(),
            ok: response.is_success(),
            note: None,
        }
    }

    /// `url` must already be redacted.
    pub fn transport_failure(url: &str, err: &TransportError) -> Self {
        Self {
            url: url.to_string(),
            status: None,
            content_type: String::new(),
            ok: false,
            note: Some(err.to_string()),
        }
    }

    fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }
}

impl fmt::Display for FetchAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "[{}] {}", status, self.url)?,
            None => write!(f, "[---] {}", self.url)?,
        }
        if !self.content_type.is_empty() {
            write!(f, " ({})", self.content_type)?;
        }
        if let Some(note) = &self.note {
            write!(f, " - {}", note)?;
        }
        Ok(())
    }
}

/// Ordered record of every request made for one video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticTrail(Vec<FetchAttempt>);

impl DiagnosticTrail {
    pub fn push(&mut self, attempt: FetchAttempt) {
        tracing::debug!("{}", attempt);
        self.0.push(attempt);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FetchAttempt> {
        self.0.iter()
    }

    fn mark_last(&mut self, note: &str) {
        if let Some(last) = self.0.pop() {
            self.0.push(last.with_note(note));
        }
    }
}

impl fmt::Display for DiagnosticTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, attempt) in self.0.iter().enumerate() {
            writeln!(f, "{:>3}. {}", index + 1, attempt)?;
        }
        Ok(())
    }
}

/// Which source produced the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    /// Official timed-text captions
    Primary,
    /// Third-party transcript service (queried first)
    Fallback,
}

impl fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptSource::Primary => write!(f, "timed-text captions"),
            TranscriptSource::Fallback => write!(f, "transcript service"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub source: TranscriptSource,
    pub trail: DiagnosticTrail,
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum TranscriptError {
    #[error("Transcript not recoverable for {video_id} ({} requests tried)", .trail.len())]
    Unavailable {
        video_id: String,
        trail: DiagnosticTrail,
    },
}

impl TranscriptError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TranscriptError::Unavailable { .. } => FailureKind::TranscriptUnavailable,
        }
    }

    pub fn trail(&self) -> &DiagnosticTrail {
        match self {
            TranscriptError::Unavailable { trail, .. } => trail,
        }
    }
}

const NO_TRANSCRIPT_NOTE: &str = "no transcript in body";

/// Fallback chain over the transcript service and the timed-text captions.
pub struct TranscriptFetcher {
    client: Arc<dyn HttpClient>,
    service: SourceDescriptor,
    timed_text: TimedTextSource,
}

impl TranscriptFetcher {
    pub fn new(client: Arc<dyn HttpClient>, service: SourceDescriptor, timed_text: TimedTextSource) -> Self {
        Self {
            client,
            service,
            timed_text,
        }
    }

    /// Produce a transcript for `video`, or the full trail of what was tried.
    ///
    /// The transcript service goes first since it usually holds a full
    /// transcript in any language; the timed-text default query and then
    /// track discovery follow.
    #[instrument(skip_all, fields(video_id = %video.id))]
    pub async fn fetch(
        &self,
        video: &VideoReference,
        credentials: &CredentialSet,
    ) -> Result<Transcript, TranscriptError> {
        let mut trail = DiagnosticTrail::default();
        let api_key = credentials.transcript_api_key();

        if let Some(text) = self.try_service(&video.id, api_key, &mut trail).await {
            tracing::info!(chars = text.len(), "Transcript found via {}", self.service.name);
            return Ok(Transcript {
                text,
                source: TranscriptSource::Fallback,
                trail,
            });
        }

        if let Some(text) = self.try_timed_text(&video.id, &mut trail).await {
            tracing::info!(chars = text.len(), "Transcript found via timed-text captions");
            return Ok(Transcript {
                text,
                source: TranscriptSource::Primary,
                trail,
            });
        }

        tracing::warn!(attempts = trail.len(), "No transcript source produced text");
        Err(TranscriptError::Unavailable {
            video_id: video.id.clone(),
            trail,
        })
    }

    async fn try_service(&self, video_id: &str, api_key: Option<&str>, trail: &mut DiagnosticTrail) -> Option<String> {
        let candidates = match candidate_urls(&self.service, video_id, api_key) {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::warn!("Skipping {}: {}", self.service.name, err);
                return None;
            }
        };
        let secret = api_key.unwrap_or("");

        for url in candidates {
            let mut request = HttpRequest::get(&url);
            if !secret.is_empty() {
                request = request
                    .header("x-api-key", secret)
                    .header("Authorization", format!("Bearer {}", secret));
            }

            if let Some(text) = self.probe(request, secret, trail).await {
                return Some(text);
            }
        }

        None
    }

    async fn try_timed_text(&self, video_id: &str, trail: &mut DiagnosticTrail) -> Option<String> {
        match self.timed_text.default_url(video_id) {
            Ok(url) => {
                if let Some(text) = self.probe(HttpRequest::get(url), "", trail).await {
                    return Some(text);
                }
            }
            Err(err) => tracing::warn!("Skipping timed-text default query: {}", err),
        }

        let track_url = self
            .timed_text
            .discover_track_url(self.client.as_ref(), video_id, trail)
            .await?;

        self.probe(HttpRequest::get(track_url), "", trail).await
    }

    /// Issue one request, record it, and extract text from a 2xx body.
    async fn probe(&self, request: HttpRequest, secret: &str, trail: &mut DiagnosticTrail) -> Option<String> {
        let display_url = redact(&request.url, secret);
        tracing::debug!(url = %display_url, "Requesting transcript candidate");

        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(err) => {
                let message = redact(&err.to_string(), secret);
                trail.push(FetchAttempt {
                    note: Some(message),
                    ..FetchAttempt::transport_failure(&display_url, &err)
                });
                return None;
            }
        };

        trail.push(FetchAttempt::from_response(&display_url, &response));
        if !response.is_success() {
            return None;
        }

        let text = extract_transcript(&response.body, response.content_type());
        if text.is_empty() {
            trail.mark_last(NO_TRANSCRIPT_NOTE);
            None
        } else {
            Some(text)
        }
    }
}
