//! CLI entry point for the web archiver.

use std::io::{self, IsTerminal, Read};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use webarchiver::{ArchiveRequest, FetcherConfig, HttpClient, archive_remote_urls};

mod app_config;
mod cli;

use app_config::{RunSettings, load_default_file_config};
use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

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

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = if args.no_config {
        None
    } else {
        load_default_file_config()?
    };
    let settings = RunSettings::resolve(&args, file_config.as_ref());
    debug!(?settings, "settings resolved");

    let urls = if !args.urls.is_empty() {
        args.urls.clone()
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        parse_url_lines(&buffer)
    } else {
        Vec::new()
    };

    if urls.is_empty() {
        info!("No input provided. Pipe URLs via stdin or pass as arguments.");
        info!("Example: echo 'https://example.com/page1.png' | webarchiver --title 'My Album'");
        return Ok(());
    }

    let client = HttpClient::with_config(&FetcherConfig {
        connect_timeout_secs: settings.connect_timeout_secs,
        read_timeout_secs: settings.read_timeout_secs,
        user_agent: settings.user_agent,
        proxy: settings.proxy,
    })
    .context("Failed to build HTTP client")?;

    let request = ArchiveRequest::new(&settings.output_dir, &args.title, urls)
        .with_format(settings.format)
        .with_cleanup(settings.cleanup)
        .with_delay(settings.delay);

    info!(
        title = %request.title,
        urls = request.urls.len(),
        format = %request.format,
        "Archiving collection"
    );

    let outcome = archive_remote_urls(&client, &request)
        .await
        .with_context(|| format!("Failed to archive '{}'", request.title))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to encode outcome")?
        );
    } else {
        let produced = outcome.archive_path.as_ref().unwrap_or(&outcome.staging_dir);
        println!("{}", produced.display());
    }

    Ok(())
}

/// One URL per line; blank lines and `#` comments are skipped.
fn parse_url_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_lines_skips_blank_and_comments() {
        let urls = parse_url_lines(
            "# album\nhttps://example.com/1.png\n\n   https://example.com/2.png  \n#skip\n",
        );
        assert_eq!(urls, ["https://example.com/1.png", "https://example.com/2.png"]);
    }

    #[test]
    fn test_parse_url_lines_empty_input() {
        assert!(parse_url_lines("\n \n").is_empty());
    }
}
