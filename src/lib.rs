//! Web Archiver Library
//!
//! Fetches an ordered list of remote resources into a directory named after
//! a collection title and packs that directory into a `.tar.gz` or `.zip`.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - Streaming HTTP fetches and collection staging
//! - [`archive`] - Tarball and zip writers with deterministic member order
//! - [`pipeline`] - Stage, archive and clean up in one call
//! - [`connector`] - Request and scripted-browser connectors
//! - [`auth`] - Netscape cookie file persistence for the shared cookie store
//! - [`user_agent`] - Browser `User-Agent` presets

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod auth;
pub mod connector;
pub mod download;
pub mod pipeline;
pub mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use archive::{ArchiveError, ArchiveFormat, ArchiveMember, archive, list_members};
pub use connector::{
    BrowserConnector, BrowserDriver, Connector, ConnectorError, Locator, LocatorStrategy,
    RequestConnector, RequestConnectorConfig, WaitCondition, create_get_url,
};
pub use download::{
    CollectionStager, DownloadError, FetchOptions, FetcherConfig, HttpClient, Sink, StageError,
    StagedCollection, StagedEntry, sanitize_title,
};
pub use pipeline::{ArchiveOutcome, ArchiveRequest, PipelineError, archive_remote_urls};
pub use user_agent::UserAgent;
