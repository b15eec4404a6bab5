use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CredentialSet;
use crate::links::VideoReference;
use crate::summarize::{Sleeper, Summarizer, Summary};
use crate::transcript::{DiagnosticTrail, TranscriptFetcher, TranscriptSource};
use crate::text::redact_all;
use crate::utils::preview;
use crate::FailureKind;

const PREVIEW_CHARS: usize = 200;

/// What happened to one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VideoOutcome {
    Success { summary: String },
    Failure { kind: FailureKind, error: String },
}

impl VideoOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, VideoOutcome::Success { .. })
    }
}

/// Everything the sink receives for one video.
#[derive(Debug, Clone, Serialize)]
pub struct VideoResult {
    /// 1-based position in the run
    pub index: usize,
    pub video: VideoReference,
    pub source: Option<TranscriptSource>,
    pub transcript_preview: Option<String>,
    pub outcome: VideoOutcome,
    pub trail: DiagnosticTrail,
}

/// Consumer of per-video results.
pub trait ResultsSink {
    fn started(&mut self, _index: usize, _total: usize, _video: &VideoReference) {}

    /// Live diagnostic output while a video is in progress.
    fn log(&mut self, _line: &str) {}

    fn finished(&mut self, result: VideoResult);
}

/// Counts for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Fetches and summarizes videos one at a time.
pub struct SummaryPipeline {
    fetcher: TranscriptFetcher,
    summarizer: Summarizer,
    sleeper: Arc<dyn Sleeper>,
    pacing: Duration,
}

impl SummaryPipeline {
    pub fn new(fetcher: TranscriptFetcher, summarizer: Summarizer, sleeper: Arc<dyn Sleeper>, pacing: Duration) -> Self {
        Self {
            fetcher,
            summarizer,
            sleeper,
            pacing,
        }
    }

    /// Process `videos` sequentially, never with two requests in flight.
    ///
    /// A pacing delay follows every summarization call except the one for the
    /// last video.
    pub async fn run(
        &self,
        videos: &[VideoReference],
        credentials: &CredentialSet,
        sink: &mut dyn ResultsSink,
    ) -> RunReport {
        let mut report = RunReport::default();
        let total = videos.len();

        for (position, video) in videos.iter().enumerate() {
            let index = position + 1;
            sink.started(index, total, video);
            tracing::info!("Processing video {} of {}: {} ({})", index, total, video.title, video.id);

            let (result, summarized) = self.process(index, video, credentials, sink).await;

            if result.outcome.is_success() {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
            sink.finished(result);

            if summarized && index < total && !self.pacing.is_zero() {
                self.sleeper.sleep(self.pacing).await;
            }
        }

        report
    }

    /// Returns the result and whether the summarizer was called.
    async fn process(
        &self,
        index: usize,
        video: &VideoReference,
        credentials: &CredentialSet,
        sink: &mut dyn ResultsSink,
    ) -> (VideoResult, bool) {
        let transcript = match self.fetcher.fetch(video, credentials).await {
            Ok(transcript) => transcript,
            Err(err) => {
                let result = VideoResult {
                    index,
                    video: video.clone(),
                    source: None,
                    transcript_preview: None,
                    outcome: failure(err.kind(), &format!("Failed to fetch transcript: {}", err), credentials),
                    trail: err.trail().clone(),
                };
                return (result, false);
            }
        };

        sink.log(&format!("Transcript from {} ({} chars)", transcript.source, transcript.text.len()));

        let request = self.summarizer.request_for(&transcript.text, &video.title);
        let summary = self
            .summarizer
            .summarize_observed(&request, credentials, &mut |notice| sink.log(&notice.to_string()))
            .await;

        let outcome = match summary {
            Summary::Completed { text } => VideoOutcome::Success { summary: text },
            Summary::Failed { kind, message } => failure(kind, &message, credentials),
        };

        let result = VideoResult {
            index,
            video: video.clone(),
            source: Some(transcript.source),
            transcript_preview: Some(preview(&transcript.text, PREVIEW_CHARS)),
            outcome,
            trail: transcript.trail,
        };
        (result, true)
    }
}

/// Failure outcome with every secret scrubbed from the message.
fn failure(kind: FailureKind, message: &str, credentials: &CredentialSet) -> VideoOutcome {
    tracing::warn!(%kind, retryable = kind.is_retryable(), "Video failed");
    VideoOutcome::Failure {
        kind,
        error: redact_all(message, credentials.secrets()),
    }
}
