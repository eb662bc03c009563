//! Summarize a local file from the command line.
//!
//! Runs the same extraction and pipeline as the HTTP server, using the provider configured in
//! the environment (or `.env`). Flags override the chunking tunables for one run.
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use rustydigest::{config::Config, extraction, logging, processing, summarization};

#[derive(Parser)]
#[command(
    name = "digest-file",
    about = "Summarize a pdf, xlsx, xml or csv file with the configured LLM provider"
)]
struct Cli {
    /// File to summarize; the format is taken from its extension.
    path: PathBuf,
    /// Maximum characters per chunk.
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Characters shared between consecutive chunks.
    #[arg(long)]
    overlap: Option<usize>,
    /// Joined length above which a single reduction pass runs.
    #[arg(long)]
    reduce_threshold: Option<usize>,
    /// Maximum concurrent provider calls.
    #[arg(long)]
    concurrency: Option<usize>,
    /// Language of the summary.
    #[arg(long)]
    language: Option<String>,
    /// Print chunk and reduction statistics to stderr.
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_cli_tracing();
    dotenvy::dotenv().ok();

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(overlap) = cli.overlap {
        config.chunk_overlap = overlap;
    }
    if let Some(threshold) = cli.reduce_threshold {
        config.reduce_threshold = threshold;
    }
    if let Some(concurrency) = cli.concurrency {
        config.max_concurrency = concurrency;
    }
    if let Some(language) = cli.language {
        config.summary_language = language;
    }
    config.validate().context("invalid chunking options")?;

    let filename = cli
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .context("path has no file name")?;
    let format = extraction::DocumentFormat::from_filename(filename)?;
    let bytes = tokio::fs::read(&cli.path)
        .await
        .with_context(|| format!("failed to read {}", cli.path.display()))?;
    let text = tokio::task::spawn_blocking(move || extraction::extract_as(&bytes, format))
        .await
        .context("extraction task failed")??;
    if text.trim().is_empty() {
        bail!("no text could be extracted from {}", cli.path.display());
    }

    let client = summarization::build_summarization_client(&config)?;
    let options = processing::PipelineOptions::from(&config);
    let outcome = processing::summarize_document(&text, client.as_ref(), &options).await?;

    if cli.stats {
        eprintln!(
            "chunks={} intermediate_chars={} reduced={}",
            outcome.chunk_count, outcome.intermediate_chars, outcome.reduced
        );
    }
    println!("{}", outcome.summary);
    Ok(())
}
