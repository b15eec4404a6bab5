use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::sources::{SourceDescriptor, TimedTextSource};

const MASK: &str = "••••••••";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stored API keys
    pub credentials: StoredCredentials,

    /// Transcript sources
    pub sources: SourcesConfig,

    /// Chat-completion settings
    pub summarizer: SummarizerConfig,

    /// Processing loop settings
    pub pipeline: PipelineConfig,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredCredentials {
    pub openai_api_key: Option<String>,
    pub transcript_api_key: Option<String>,
}

impl fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("openai_api_key", &mask(self.openai_api_key.as_deref()))
            .field("transcript_api_key", &mask(self.transcript_api_key.as_deref()))
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Third-party transcript service, probed first
    pub transcript_service: SourceDescriptor,

    /// Official timed-text captions
    pub timed_text: TimedTextSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Chat-completions endpoint
    pub endpoint: String,

    pub model: String,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Transcript characters sent per request
    pub max_transcript_chars: usize,

    /// Total attempts per summary, including the first
    pub max_attempts: u32,

    /// Backoff base for 429 responses without a retry-after hint
    pub rate_limit_base_ms: u64,

    /// Backoff base for 5xx responses and network failures
    pub transient_base_ms: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.4,
            max_tokens: 450,
            max_transcript_chars: 6000,
            max_attempts: 5,
            rate_limit_base_ms: 1000,
            transient_base_ms: 750,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Delay between summarizing one video and starting the next
    pub pacing_ms: u64,

    /// Per-request timeout; the transport default applies when unset
    pub request_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 750,
            request_timeout_secs: None,
        }
    }
}

impl PipelineConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// The two secrets the pipeline reads, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialName {
    OpenAiApiKey,
    TranscriptApiKey,
}

impl CredentialName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialName::OpenAiApiKey => "openai_api_key",
            CredentialName::TranscriptApiKey => "transcript_api_key",
        }
    }
}

/// Get/set access to stored secrets.
pub trait CredentialStore {
    fn get(&self, name: CredentialName) -> Option<String>;

    fn set(&mut self, name: CredentialName, value: String);

    /// Snapshot both secrets for one run.
    fn credential_set(&self) -> CredentialSet {
        CredentialSet::new(
            self.get(CredentialName::OpenAiApiKey).unwrap_or_default(),
            self.get(CredentialName::TranscriptApiKey).unwrap_or_default(),
        )
    }
}

impl CredentialStore for Config {
    fn get(&self, name: CredentialName) -> Option<String> {
        let value = match name {
            CredentialName::OpenAiApiKey => &self.credentials.openai_api_key,
            CredentialName::TranscriptApiKey => &self.credentials.transcript_api_key,
        };
        value.clone().filter(|value| !value.is_empty())
    }

    fn set(&mut self, name: CredentialName, value: String) {
        let value = Some(value).filter(|value| !value.is_empty());
        match name {
            CredentialName::OpenAiApiKey => self.credentials.openai_api_key = value,
            CredentialName::TranscriptApiKey => self.credentials.transcript_api_key = value,
        }
    }
}

/// Read-only secrets handed to the fetcher and the summarizer.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    openai_api_key: String,
    transcript_api_key: String,
}

impl CredentialSet {
    pub fn new(openai_api_key: impl Into<String>, transcript_api_key: impl Into<String>) -> Self {
        Self {
            openai_api_key: openai_api_key.into(),
            transcript_api_key: transcript_api_key.into(),
        }
    }

    /// Replace either secret when an override is given.
    pub fn with_overrides(mut self, openai_api_key: Option<String>, transcript_api_key: Option<String>) -> Self {
        if let Some(key) = openai_api_key.filter(|key| !key.is_empty()) {
            self.openai_api_key = key;
        }
        if let Some(key) = transcript_api_key.filter(|key| !key.is_empty()) {
            self.transcript_api_key = key;
        }
        self
    }

    pub fn openai_api_key(&self) -> &str {
        &self.openai_api_key
    }

    pub fn transcript_api_key(&self) -> Option<&str> {
        Some(self.transcript_api_key.as_str()).filter(|key| !key.is_empty())
    }

    pub fn has_openai_api_key(&self) -> bool {
        !self.openai_api_key.is_empty()
    }

    /// Every non-empty secret, for redaction.
    pub fn secrets(&self) -> impl Iterator<Item = &str> {
        [self.openai_api_key.as_str(), self.transcript_api_key.as_str()]
            .into_iter()
            .filter(|secret| !secret.is_empty())
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("openai_api_key", &mask(Some(self.openai_api_key.as_str())))
            .field("transcript_api_key", &mask(Some(self.transcript_api_key.as_str())))
            .finish()
    }
}

fn mask(value: Option<&str>) -> &'static str {
    match value {
        Some(value) if !value.is_empty() => MASK,
        _ => "(not set)",
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let config = Self::load_from(&config_path)?;
            tracing::debug!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            Ok(config)
        }
    }

    /// Parse and validate a specific file.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("video-summarizer").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        self.sources.transcript_service.validate()?;

        url::Url::parse(&self.sources.timed_text.base_url)
            .with_context(|| format!("Invalid timed-text base URL: {}", self.sources.timed_text.base_url))?;

        url::Url::parse(&self.summarizer.endpoint)
            .with_context(|| format!("Invalid summarizer endpoint: {}", self.summarizer.endpoint))?;

        if self.summarizer.max_attempts == 0 {
            anyhow::bail!("summarizer.max_attempts must be at least 1");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  OpenAI API Key: {}", mask(self.credentials.openai_api_key.as_deref()));
        println!("  Transcript API Key: {}", mask(self.credentials.transcript_api_key.as_deref()));
        println!("  Transcript Service: {}", self.sources.transcript_service.base_url);
        println!(
            "    {} endpoints x {} parameter sets",
            self.sources.transcript_service.endpoint_paths.len(),
            self.sources.transcript_service.param_sets.len()
        );
        println!(
            "  Timed Text: {} (lang={})",
            self.sources.timed_text.base_url, self.sources.timed_text.language
        );
        println!("  Model: {} via {}", self.summarizer.model, self.summarizer.endpoint);
        println!("  Max Attempts: {}", self.summarizer.max_attempts);
        println!("  Pacing: {}ms", self.pipeline.pacing_ms);
    }
}
