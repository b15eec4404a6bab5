use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_summarizer::config::CredentialName;
use video_summarizer::http::{HttpClient, ReqwestClient};
use video_summarizer::output::{self, ConsoleSink};
use video_summarizer::summarize::TokioSleeper;
use video_summarizer::{
    links, Cli, Commands, Config, CredentialStore, Summarizer, SummarizerError, SummaryPipeline, TranscriptFetcher,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let mut config = Config::load().await?;

    match cli.command {
        Commands::Summarize {
            inputs,
            page,
            format,
            output,
            show_trail,
            openai_key,
            transcript_key,
        } => {
            let credentials = config.credential_set().with_overrides(openai_key, transcript_key);
            if !credentials.has_openai_api_key() {
                return Err(SummarizerError::MissingCredential(CredentialName::OpenAiApiKey.as_str()).into());
            }

            let client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(config.pipeline.request_timeout())?);

            let mut videos = links::references_from_args(&inputs)?;
            if let Some(page) = page {
                let markup = links::load_page(client.as_ref(), &page).await?;
                let found = links::scan_page(&markup);
                tracing::info!("Found {} videos on {}", found.len(), page);
                for video in found {
                    if !videos.iter().any(|known| known.id == video.id) {
                        videos.push(video);
                    }
                }
            }
            if videos.is_empty() {
                anyhow::bail!("No videos to summarize. Pass ids or URLs, or --page with a page that links videos.");
            }

            let sleeper = Arc::new(TokioSleeper);
            let fetcher = TranscriptFetcher::new(
                client.clone(),
                config.sources.transcript_service.clone(),
                config.sources.timed_text.clone(),
            );
            let summarizer = Summarizer::new(client, sleeper.clone(), config.summarizer.clone());
            let pipeline = SummaryPipeline::new(fetcher, summarizer, sleeper, config.pipeline.pacing());

            tracing::info!("Summarizing {} videos", videos.len());
            let mut sink = ConsoleSink::new(cli.quiet, show_trail);
            let run = pipeline.run(&videos, &credentials, &mut sink).await;
            let report = sink.into_report();
            let content = output::render(&report, format, show_trail)?;

            match output {
                Some(path) => {
                    output::save_to_file(&content, &path)?;
                    println!("Summaries saved to: {}", path.display());
                }
                None => output::print_to_console(&content),
            }

            if run.succeeded == 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Transcript {
            input,
            show_trail,
            transcript_key,
        } => {
            let credentials = config.credential_set().with_overrides(None, transcript_key);
            let video = links::references_from_args(std::slice::from_ref(&input))?
                .into_iter()
                .next()
                .ok_or_else(|| SummarizerError::UnsupportedUrl(input.clone()))?;

            let client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(config.pipeline.request_timeout())?);
            let fetcher = TranscriptFetcher::new(
                client,
                config.sources.transcript_service.clone(),
                config.sources.timed_text.clone(),
            );

            match fetcher.fetch(&video, &credentials).await {
                Ok(transcript) => {
                    println!("Source: {}", transcript.source);
                    println!();
                    println!("{}", transcript.text);
                    if show_trail {
                        eprintln!("\nTrail:\n{}", transcript.trail);
                    }
                }
                Err(err) => {
                    eprintln!("{}", err);
                    eprintln!("\nTrail:\n{}", err.trail());
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Links { page } => {
            let client = ReqwestClient::new(config.pipeline.request_timeout())?;
            let markup = links::load_page(&client, &page).await?;
            let found = links::scan_page(&markup);

            if found.is_empty() {
                println!("No videos found.");
            }
            for video in found {
                println!("{}\t{}\t{}", video.id, video.title, video.watch_url());
            }
        }
        Commands::Config {
            show,
            set_openai_key,
            set_transcript_key,
        } => {
            let mut changed = false;
            if let Some(key) = set_openai_key {
                config.set(CredentialName::OpenAiApiKey, key);
                changed = true;
            }
            if let Some(key) = set_transcript_key {
                config.set(CredentialName::TranscriptApiKey, key);
                changed = true;
            }
            if changed {
                config.save().await?;
                println!("Configuration saved to: {}", Config::config_path()?.display());
            }
            if show || !changed {
                config.display();
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "video_summarizer=debug"
    } else {
        "video_summarizer=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
