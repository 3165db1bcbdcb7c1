//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use webarchiver::{ArchiveFormat, UserAgent};

/// Longest accepted pause between two fetches, in seconds.
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Fetch a list of URLs into a titled directory and pack it as an archive.
///
/// Each URL is saved as a numbered file (01.png, 02.jpg, ...) under a
/// directory named after the sanitized title, which is then packed into
/// `<title>.tar.gz` or `<title>.zip`.
#[derive(Parser, Debug)]
#[command(name = "webarchiver")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Collection title; sanitized into the directory and archive name
    #[arg(short, long)]
    pub title: String,

    /// Parent directory for the staging directory and the archive [default: .]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Archive format: tar.gz, zip or none [default: tar.gz]
    #[arg(short, long)]
    pub format: Option<ArchiveFormat>,

    /// Keep the staging directory after archiving
    #[arg(long)]
    pub keep_staging: bool,

    /// Seconds to wait between two fetches, fractions allowed (0-3600) [default: 0]
    #[arg(short, long, value_parser = parse_delay_secs)]
    pub delay: Option<f64>,

    /// Browser identity sent as User-Agent: chrome, firefox, edge or ie11
    #[arg(long)]
    pub user_agent: Option<UserAgent>,

    /// Connect timeout in seconds (1-3600) [default: 30]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// Whole-request timeout in seconds (1-3600) [default: 300]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// Proxy URL used for every request, e.g. http://127.0.0.1:8080
    #[arg(long)]
    pub proxy: Option<String>,

    /// Print the outcome as JSON instead of the archive path
    #[arg(long)]
    pub json: bool,

    /// Ignore the config file
    #[arg(long)]
    pub no_config: bool,

    /// URLs to fetch, in output order. Read from stdin when omitted.
    pub urls: Vec<String>,
}

/// Whether `secs` is a usable delay: finite and within `0..=MAX_DELAY_SECS`.
#[must_use]
pub fn is_valid_delay(secs: f64) -> bool {
    secs.is_finite() && (0.0..=MAX_DELAY_SECS).contains(&secs)
}

fn parse_delay_secs(raw: &str) -> Result<f64, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number of seconds"))?;
    if !is_valid_delay(secs) {
        return Err(format!("{raw} is outside 0..={MAX_DELAY_SECS}"));
    }
    Ok(secs)
}
