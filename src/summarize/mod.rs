use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub mod backoff;

pub use backoff::{exponential_backoff, retry_after, Sleeper, TokioSleeper};

use crate::config::{CredentialSet, SummarizerConfig};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::utils::{format_wait, truncate_chars};
use crate::FailureKind;

/// Returned when the API answered but produced no choice text.
pub const NO_SUMMARY: &str = "No summary returned.";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that creates concise, educational summaries of video \
     transcripts. Focus on key concepts, main points, and important details.";

/// Outcome of one summarization. Both arms carry human-readable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Summary {
    Completed { text: String },
    Failed { kind: FailureKind, message: String },
}

impl Summary {
    fn completed(text: impl Into<String>) -> Self {
        Summary::Completed { text: text.into() }
    }

    fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Summary::Failed {
            kind,
            message: message.into(),
        }
    }

    /// The summary, or the failure explanation.
    pub fn text(&self) -> &str {
        match self {
            Summary::Completed { text } => text,
            Summary::Failed { message, .. } => message,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Summary::Completed { .. })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// What gets sent for one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizationRequest {
    pub transcript_text: String,
    pub video_title: String,
}

impl SummarizationRequest {
    /// Truncates the transcript to `max_chars` characters.
    pub fn new(transcript: &str, title: &str, max_chars: usize) -> Self {
        Self {
            transcript_text: truncate_chars(transcript, max_chars).to_string(),
            video_title: title.to_string(),
        }
    }

    fn user_prompt(&self) -> String {
        format!(
            "Summarize the following transcript from a video titled \"{}\". \
             Return 5-10 bullet points and a short 1-2 sentence takeaway at the end.\n\n{}",
            self.video_title, self.transcript_text
        )
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// Attempt counter and last error of one retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub last_error: String,
}

impl RetryState {
    fn new() -> Self {
        Self {
            attempt: 1,
            last_error: String::new(),
        }
    }
}

/// Emitted before each backoff wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryNotice {
    pub kind: FailureKind,
    pub attempt: u32,
    pub wait: Duration,
    pub message: String,
}

impl fmt::Display for RetryNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wait = format_wait(self.wait.as_millis() as u64);
        match self.kind {
            FailureKind::RateLimited => write!(f, "Rate-limited (429). Waiting {} then retrying...", wait),
            FailureKind::NetworkFailure => write!(f, "Network error talking to OpenAI. Retrying in {}...", wait),
            _ => write!(f, "OpenAI temporary error ({}). Retrying in {}...", self.message, wait),
        }
    }
}

enum Step {
    Done(Summary),
    Retry {
        kind: FailureKind,
        wait: Duration,
        message: String,
    },
}

/// Chat-completion client with a classifying retry loop.
pub struct Summarizer {
    client: Arc<dyn HttpClient>,
    sleeper: Arc<dyn Sleeper>,
    config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(client: Arc<dyn HttpClient>, sleeper: Arc<dyn Sleeper>, config: SummarizerConfig) -> Self {
        Self {
            client,
            sleeper,
            config,
        }
    }

    pub fn request_for(&self, transcript: &str, title: &str) -> SummarizationRequest {
        SummarizationRequest::new(transcript, title, self.config.max_transcript_chars)
    }

    pub async fn summarize(&self, request: &SummarizationRequest, credentials: &CredentialSet) -> Summary {
        self.summarize_observed(request, credentials, &mut |_| {}).await
    }

    /// Run the retry loop, reporting every backoff to `on_retry`.
    ///
    /// Never fails: every outcome, including exhausted retries, comes back as
    /// a [`Summary`].
    #[instrument(skip_all, fields(title = %request.video_title))]
    pub async fn summarize_observed(
        &self,
        request: &SummarizationRequest,
        credentials: &CredentialSet,
        on_retry: &mut dyn FnMut(&RetryNotice),
    ) -> Summary {
        let http_request = match self.build_request(request, credentials) {
            Ok(http_request) => http_request,
            Err(err) => return Summary::failed(FailureKind::ParseFailure, format!("Error generating summary: {}", err)),
        };

        let mut state = RetryState::new();
        loop {
            tracing::debug!(attempt = state.attempt, "Requesting summary");

            let step = match self.client.send(http_request.clone()).await {
                Ok(response) => {
                    if !response.is_success() {
                        state.last_error = error_message(&response);
                    }
                    self.on_response(&response, &state)
                }
                Err(err) => {
                    state.last_error = err.to_string();
                    self.on_transport_error(&state)
                }
            };

            match step {
                Step::Done(summary) => {
                    if let Summary::Failed { kind, message } = &summary {
                        tracing::warn!(attempt = state.attempt, %kind, "Summarization failed: {}", message);
                    }
                    return summary;
                }
                Step::Retry { kind, wait, message } => {
                    let notice = RetryNotice {
                        kind,
                        attempt: state.attempt,
                        wait,
                        message,
                    };
                    tracing::warn!(attempt = state.attempt, wait_ms = wait.as_millis() as u64, "{}", notice);
                    on_retry(&notice);

                    self.sleeper.sleep(wait).await;
                    state.attempt += 1;
                }
            }
        }
    }

    fn build_request(
        &self,
        request: &SummarizationRequest,
        credentials: &CredentialSet,
    ) -> Result<HttpRequest, serde_json::Error> {
        let user_prompt = request.user_prompt();
        let payload = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        Ok(HttpRequest::post(&self.config.endpoint, serde_json::to_string(&payload)?)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", credentials.openai_api_key())))
    }

    fn attempts_remain(&self, state: &RetryState) -> bool {
        state.attempt < self.config.max_attempts
    }

    fn on_response(&self, response: &HttpResponse, state: &RetryState) -> Step {
        if response.is_success() {
            return Step::Done(Summary::completed(first_choice(&response.body).unwrap_or_else(|| NO_SUMMARY.to_string())));
        }

        let status = response.status;
        let message = state.last_error.clone();

        match status {
            429 => {
                let lower = message.to_lowercase();
                if lower.contains("quota") || lower.contains("insufficient") {
                    return Step::Done(Summary::failed(
                        FailureKind::QuotaExceeded,
                        format!(
                            "OpenAI API error 429 (quota). {} Fix: add billing / credits in your OpenAI account, then retry.",
                            message
                        ),
                    ));
                }

                if !self.attempts_remain(state) {
                    return Step::Done(Summary::failed(
                        FailureKind::RateLimited,
                        format!(
                            "OpenAI API error 429 (rate limited after {} attempts): {}",
                            state.attempt, message
                        ),
                    ));
                }

                let wait = retry_after(response)
                    .unwrap_or_else(|| exponential_backoff(self.config.rate_limit_base_ms, state.attempt));
                Step::Retry {
                    kind: FailureKind::RateLimited,
                    wait,
                    message,
                }
            }
            500 | 502 | 503 | 504 if self.attempts_remain(state) => Step::Retry {
                kind: FailureKind::TransientServerError,
                wait: exponential_backoff(self.config.transient_base_ms, state.attempt),
                message: status.to_string(),
            },
            500 | 502 | 503 | 504 => Step::Done(Summary::failed(
                FailureKind::TransientServerError,
                format!("OpenAI API error {}: {}", status, message),
            )),
            _ => Step::Done(Summary::failed(
                FailureKind::HttpFailure(status),
                format!("OpenAI API error {}: {}", status, message),
            )),
        }
    }

    /// `state.last_error` holds the transport failure of this attempt.
    fn on_transport_error(&self, state: &RetryState) -> Step {
        if self.attempts_remain(state) {
            Step::Retry {
                kind: FailureKind::NetworkFailure,
                wait: exponential_backoff(self.config.transient_base_ms, state.attempt),
                message: state.last_error.clone(),
            }
        } else {
            Step::Done(Summary::failed(
                FailureKind::NetworkFailure,
                format!("Error generating summary: {}", state.last_error),
            ))
        }
    }
}

/// `choices[0].message.content`, if the body has one.
fn first_choice(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|content| !content.trim().is_empty())
        .map(str::to_string)
}

/// Best human-readable message from an error response.
fn error_message(response: &HttpResponse) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(&response.body) {
        return json
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| json.to_string());
    }

    let body = response.body.trim();
    if body.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::backoff::MockSleeper;
    use super::*;
    use crate::http::{MockHttpClient, TransportError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn ok_body(content: &str) -> String {
        serde_json::json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
    }

    fn error_body(message: &str) -> String {
        serde_json::json!({"error": {"message": message, "type": "error"}}).to_string()
    }

    fn recording_sleeper() -> (MockSleeper, Arc<Mutex<Vec<Duration>>>) {
        let waits = Arc::new(Mutex::new(Vec::new()));
        let log = waits.clone();
        let mut sleeper = MockSleeper::new();
        sleeper.expect_sleep().returning(move |duration| log.lock().unwrap().push(duration));
        (sleeper, waits)
    }

    /// Client answering from `script` in order, repeating the last entry.
    fn scripted(script: Vec<Result<HttpResponse, TransportError>>) -> (MockHttpClient, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut client = MockHttpClient::new();
        client.expect_send().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            script[n.min(script.len() - 1)].clone()
        });
        (client, calls)
    }

    fn summarizer(client: MockHttpClient, sleeper: MockSleeper) -> Summarizer {
        Summarizer::new(Arc::new(client), Arc::new(sleeper), SummarizerConfig::default())
    }

    fn request() -> SummarizationRequest {
        SummarizationRequest::new("some transcript", "Lecture 1", 6000)
    }

    fn credentials() -> CredentialSet {
        CredentialSet::new("sk-test", "")
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let (client, calls) = scripted(vec![Ok(HttpResponse::new(200, ok_body("- point one")))]);
        let (sleeper, waits) = recording_sleeper();

        let summary = summarizer(client, sleeper).summarize(&request(), &credentials()).await;

        assert_eq!(summary, Summary::completed("- point one"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_choice_is_sentinel() {
        let (client, _) = scripted(vec![Ok(HttpResponse::new(200, r#"{"choices":[]}"#))]);
        let (sleeper, _) = recording_sleeper();

        let summary = summarizer(client, sleeper).summarize(&request(), &credentials()).await;
        assert_eq!(summary, Summary::completed(NO_SUMMARY));
    }

    #[tokio::test]
    async fn test_quota_is_terminal_without_backoff() {
        let (client, calls) = scripted(vec![Ok(HttpResponse::new(
            429,
            error_body("You exceeded your current quota, please check your plan and billing details."),
        ))]);
        let (sleeper, waits) = recording_sleeper();

        let summary = summarizer(client, sleeper).summarize(&request(), &credentials()).await;

        match &summary {
            Summary::Failed { kind, message } => {
                assert_eq!(*kind, FailureKind::QuotaExceeded);
                assert!(message.contains("add billing / credits"));
            }
            other => panic!("expected quota failure, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transient_errors_then_success() {
        let (client, calls) = scripted(vec![
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::new(200, ok_body("recovered"))),
        ]);
        let (sleeper, waits) = recording_sleeper();

        let summary = summarizer(client, sleeper).summarize(&request(), &credentials()).await;

        assert_eq!(summary.text(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let waits = waits.lock().unwrap();
        assert_eq!(waits.len(), 3);
        assert!(waits.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(waits[0], Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_rate_limit_uses_retry_after() {
        let (client, _) = scripted(vec![
            Ok(HttpResponse::new(429, error_body("Rate limit reached")).with_header("retry-after", "2")),
            Ok(HttpResponse::new(429, error_body("Rate limit reached"))),
            Ok(HttpResponse::new(200, ok_body("done"))),
        ]);
        let (sleeper, waits) = recording_sleeper();

        let summary = summarizer(client, sleeper).summarize(&request(), &credentials()).await;

        assert!(summary.is_completed());
        assert_eq!(
            *waits.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_millis(4000)]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_budget() {
        let (client, calls) = scripted(vec![Ok(HttpResponse::new(429, error_body("slow down")))]);
        let (sleeper, waits) = recording_sleeper();

        let summary = summarizer(client, sleeper).summarize(&request(), &credentials()).await;

        match summary {
            Summary::Failed { kind, message } => {
                assert_eq!(kind, FailureKind::RateLimited);
                assert!(message.contains("slow down"));
            }
            other => panic!("expected rate limit failure, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(waits.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_other_status_is_terminal() {
        let (client, calls) = scripted(vec![Ok(HttpResponse::new(401, error_body("Incorrect API key provided")))]);
        let (sleeper, _) = recording_sleeper();

        let summary = summarizer(client, sleeper).summarize(&request(), &credentials()).await;

        assert_eq!(
            summary,
            Summary::failed(FailureKind::HttpFailure(401), "OpenAI API error 401: Incorrect API key provided")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_budget() {
        let (client, calls) = scripted(vec![Ok(HttpResponse::new(502, "Bad Gateway"))]);
        let (sleeper, waits) = recording_sleeper();

        let summary = summarizer(client, sleeper).summarize(&request(), &credentials()).await;

        assert_eq!(
            summary,
            Summary::failed(FailureKind::TransientServerError, "OpenAI API error 502: Bad Gateway")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(waits.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_network_failures_exhaust_budget() {
        let (client, calls) = scripted(vec![Err(TransportError::Connect("connection refused".to_string()))]);
        let (sleeper, waits) = recording_sleeper();
        let mut notices = Vec::new();

        let summary = summarizer(client, sleeper)
            .summarize_observed(&request(), &credentials(), &mut |notice| notices.push(notice.to_string()))
            .await;

        assert_eq!(
            summary,
            Summary::failed(
                FailureKind::NetworkFailure,
                "Error generating summary: connection failed: connection refused"
            )
        );
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(waits.lock().unwrap().len(), 4);
        assert_eq!(notices.len(), 4);
        assert_eq!(notices[0], "Network error talking to OpenAI. Retrying in 1.5s...");
    }

    #[tokio::test]
    async fn test_terminal_message_uses_latest_error() {
        let (client, calls) = scripted(vec![
            Ok(HttpResponse::new(503, error_body("overloaded"))),
            Err(TransportError::Timeout),
        ]);
        let (sleeper, waits) = recording_sleeper();

        let summary = summarizer(client, sleeper).summarize(&request(), &credentials()).await;

        assert_eq!(
            summary,
            Summary::failed(FailureKind::NetworkFailure, "Error generating summary: request timed out")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(waits.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let mut client = MockHttpClient::new();
        client
            .expect_send()
            .withf(|request| {
                let body: Value = serde_json::from_str(request.body.as_deref().unwrap_or("")).unwrap();
                request.url == "https://api.openai.com/v1/chat/completions"
                    && request.headers.contains(&("Authorization".to_string(), "Bearer sk-test".to_string()))
                    && body["model"] == "gpt-4o-mini"
                    && body["max_tokens"] == 450
                    && body["messages"][1]["content"]
                        .as_str()
                        .unwrap()
                        .contains("titled \"Lecture 1\"")
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, ok_body("ok"))));
        let (sleeper, _) = recording_sleeper();

        let summary = summarizer(client, sleeper).summarize(&request(), &credentials()).await;
        assert_eq!(summary.text(), "ok");
    }

    #[test]
    fn test_request_truncates_by_chars() {
        let request = SummarizationRequest::new("héllo wörld", "t", 4);
        assert_eq!(request.transcript_text, "héll");
    }

    #[test]
    fn test_error_message_variants() {
        assert_eq!(error_message(&HttpResponse::new(400, error_body("bad"))), "bad");
        assert_eq!(error_message(&HttpResponse::new(400, r#"{"detail":"x"}"#)), r#"{"detail":"x"}"#);
        assert_eq!(error_message(&HttpResponse::new(400, " oops ")), "oops");
        assert_eq!(error_message(&HttpResponse::new(418, "")), "HTTP 418");
    }
}
