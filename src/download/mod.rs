//! Resource fetching and collection staging.
//!
//! This module fetches remote resources with browser-like headers and stages
//! whole collections into numbered files on disk.
//!
//! # Features
//!
//! - Streaming fetches into a file path or a caller-owned writer
//! - Default `User-Agent` from a table of real browser strings
//! - Configurable timeouts (30s connect, 5min read by default) and proxy
//! - Sequential staging with an inter-fetch delay
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use webarchiver::download::{CollectionStager, HttpClient};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let staged = CollectionStager::new(&client)
//!     .with_delay(Duration::from_secs(1))
//!     .stage(Path::new("./downloads"), "Episode 1", &["https://example.com/a.png"])
//!     .await?;
//! println!("Staged into: {}", staged.dir.display());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
pub mod filename;
mod stager;

pub use client::{FetchOptions, FetcherConfig, HttpClient, Sink};
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::{DownloadError, StageError};
pub use filename::{extension_from_url, sanitize_title, staged_file_name};
pub use stager::{CollectionStager, StagedCollection, StagedEntry};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
