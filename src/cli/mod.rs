use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vidsum",
    about = "Video Summarizer - Fetch transcripts for videos and summarize them",
    version,
    long_about = "Fetches a transcript for each video through a fallback chain of a third-party transcript service and the official timed-text captions, then summarizes it with a chat-completion API. Videos are processed one at a time."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize one or more videos
    Summarize {
        /// Video ids or URLs (watch, embed, shorts or youtu.be)
        #[arg(value_name = "ID_OR_URL")]
        inputs: Vec<String>,

        /// Scan a page (file path or URL) for linked and embedded videos
        #[arg(short, long, value_name = "FILE_OR_URL")]
        page: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Include the fetch diagnostic trail for every video
        #[arg(long)]
        show_trail: bool,

        /// OpenAI API key (overrides the stored key)
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        openai_key: Option<String>,

        /// Transcript service API key (overrides the stored key)
        #[arg(long, env = "TRANSCRIPT_API_KEY", hide_env_values = true)]
        transcript_key: Option<String>,
    },

    /// Fetch and print the transcript of a single video
    Transcript {
        #[arg(value_name = "ID_OR_URL")]
        input: String,

        /// Print the fetch diagnostic trail
        #[arg(long)]
        show_trail: bool,

        /// Transcript service API key (overrides the stored key)
        #[arg(long, env = "TRANSCRIPT_API_KEY", hide_env_values = true)]
        transcript_key: Option<String>,
    },

    /// List the videos linked or embedded on a page
    Links {
        #[arg(value_name = "FILE_OR_URL")]
        page: String,
    },

    /// Show or update stored settings
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Store the OpenAI API key
        #[arg(long, value_name = "KEY")]
        set_openai_key: Option<String>,

        /// Store the transcript service API key
        #[arg(long, value_name = "KEY")]
        set_transcript_key: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON report with per-video trails
    Json,
    /// Markdown report
    Markdown,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_summarize() {
        let cli = Cli::try_parse_from([
            "vidsum",
            "summarize",
            "dQw4w9WgXcQ",
            "--page",
            "course.html",
            "--format",
            "markdown",
            "--openai-key",
            "sk-flag",
        ])
        .unwrap();

        match cli.command {
            Commands::Summarize {
                inputs,
                page,
                format,
                openai_key,
                ..
            } => {
                assert_eq!(inputs, vec!["dQw4w9WgXcQ".to_string()]);
                assert_eq!(page.as_deref(), Some("course.html"));
                assert_eq!(format, OutputFormat::Markdown);
                assert_eq!(openai_key.as_deref(), Some("sk-flag"));
            }
            _ => panic!("expected summarize"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["vidsum", "links", "page.html", "--verbose", "--quiet"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.quiet);
        assert!(!cli.log_json);
    }
}
