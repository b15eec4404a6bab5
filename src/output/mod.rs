use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use crate::cli::OutputFormat;
use crate::links::VideoReference;
use crate::pipeline::{ResultsSink, VideoOutcome, VideoResult};

/// Results of a run, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    pub videos: Vec<VideoResult>,
}

impl Report {
    pub fn new(videos: Vec<VideoResult>) -> Self {
        let succeeded = videos.iter().filter(|result| result.outcome.is_success()).count();
        Self {
            generated_at: Utc::now(),
            succeeded,
            failed: videos.len() - succeeded,
            videos,
        }
    }
}

/// Sink for the command line: a spinner while working, results kept for
/// rendering at the end.
pub struct ConsoleSink {
    progress: Option<ProgressBar>,
    show_trail: bool,
    results: Vec<VideoResult>,
}

impl ConsoleSink {
    pub fn new(quiet: bool, show_trail: bool) -> Self {
        let progress = (!quiet).then(|| {
            let progress = ProgressBar::new_spinner();
            if let Ok(spinner) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
                progress.set_style(spinner);
            }
            progress.enable_steady_tick(Duration::from_millis(120));
            progress
        });

        Self {
            progress,
            show_trail,
            results: Vec::new(),
        }
    }

    pub fn into_report(self) -> Report {
        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }
        Report::new(self.results)
    }

    fn print_line(&self, line: &str) {
        match &self.progress {
            Some(progress) => progress.println(line),
            None => eprintln!("{}", line),
        }
    }
}

impl ResultsSink for ConsoleSink {
    fn started(&mut self, index: usize, total: usize, video: &VideoReference) {
        if let Some(progress) = &self.progress {
            progress.set_message(format!("[{}/{}] {} ({})", index, total, video.title, video.id));
        }
    }

    fn log(&mut self, line: &str) {
        self.print_line(&format!("    {}", style(line).dim()));
    }

    fn finished(&mut self, result: VideoResult) {
        let marker = match &result.outcome {
            VideoOutcome::Success { .. } => style("✓").green(),
            VideoOutcome::Failure { .. } => style("✗").red(),
        };
        self.print_line(&format!("{} [{}] {}", marker, result.index, result.video.title));

        if self.show_trail || !result.outcome.is_success() {
            for attempt in result.trail.iter() {
                self.print_line(&format!("    {}", style(attempt).dim()));
            }
        }

        self.results.push(result);
    }
}

pub fn render(report: &Report, format: OutputFormat, show_trail: bool) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(report, show_trail)),
        OutputFormat::Markdown => Ok(format_as_markdown(report, show_trail)),
        OutputFormat::Json => format_as_json(report),
    }
}

pub fn format_as_text(report: &Report, show_trail: bool) -> String {
    let mut out = String::new();

    for result in &report.videos {
        let _ = writeln!(out, "{}. {} ({})", result.index, result.video.title, result.video.id);
        let _ = writeln!(out, "   {}", result.video.watch_url());
        if let (Some(source), Some(preview)) = (&result.source, &result.transcript_preview) {
            let _ = writeln!(out, "   Transcript ({}): {}", source, preview);
        }
        match &result.outcome {
            VideoOutcome::Success { summary } => {
                let _ = writeln!(out, "   Summary:");
                for line in summary.lines() {
                    let _ = writeln!(out, "   {}", line);
                }
            }
            VideoOutcome::Failure { error, .. } => {
                let _ = writeln!(out, "   Error: {}", error);
            }
        }
        if show_trail && !result.trail.is_empty() {
            let _ = writeln!(out, "   Trail:");
            for line in result.trail.to_string().lines() {
                let _ = writeln!(out, "   {}", line);
            }
        }
        out.push('\n');
    }

    let _ = write!(out, "{} succeeded, {} failed", report.succeeded, report.failed);
    out
}

pub fn format_as_markdown(report: &Report, show_trail: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Video Summaries\n");
    let _ = writeln!(out, "_Generated {}_\n", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));

    for result in &report.videos {
        let _ = writeln!(
            out,
            "## {}. [{}]({})\n",
            result.index,
            result.video.title,
            result.video.watch_url()
        );
        if let (Some(source), Some(preview)) = (&result.source, &result.transcript_preview) {
            let _ = writeln!(out, "> Transcript from {}: {}\n", source, preview);
        }
        match &result.outcome {
            VideoOutcome::Success { summary } => {
                let _ = writeln!(out, "{}\n", summary.trim());
            }
            VideoOutcome::Failure { kind, error } => {
                let _ = writeln!(out, "**Failed** ({}): {}\n", kind, error);
            }
        }
        if show_trail && !result.trail.is_empty() {
            let _ = writeln!(out, "```text\n{}\n```\n", result.trail);
        }
    }

    let _ = write!(out, "**{} succeeded, {} failed**", report.succeeded, report.failed);
    out
}

pub fn format_as_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

/// Save rendered output to file
pub fn save_to_file(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path, content)?;
    Ok(())
}

pub fn print_to_console(content: &str) {
    println!("{}", content);
}
