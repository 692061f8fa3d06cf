//! CLI entry point for the firmgrab tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use firmgrab_core::{ScrapeConfig, ScrapeEngine, StreamFetcher, analyze};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs).
    // A bare URL is shorthand for the fetch subcommand.
    let args = Args::parse_from(cli::normalize_args(std::env::args_os()));

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr; stdout carries only the JSON result record.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    match args.command {
        Command::Fetch {
            url,
            output_dir,
            headful,
            chrome,
        } => {
            let mut config = ScrapeConfig::new(output_dir);
            config.headless = !headful;
            config.chrome_executable = chrome;

            let progress = byte_progress_bar(args.quiet);
            let fetcher = {
                let bar = progress.clone();
                StreamFetcher::new(config.user_agent.clone()).with_progress(Arc::new(
                    move |bytes, total| {
                        if let Some(total) = total {
                            bar.set_length(total);
                        }
                        bar.set_position(bytes);
                    },
                ))
            };

            let engine = ScrapeEngine::new(config).with_fetcher(fetcher);
            let result = engine.scrape(&url).await;
            progress.finish_and_clear();

            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_success() {
                std::process::exit(1);
            }
        }
        Command::Analyze { file } => {
            let content = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let report = analyze(&content);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Byte progress bar for direct streaming fetches (hidden in quiet mode).
fn byte_progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::no_length();
    bar.set_style(
        ProgressStyle::with_template("{bytes}/{total_bytes} [{bar:30}] {bytes_per_sec}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}
