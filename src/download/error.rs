//! Error types for the download module.
//!
//! `DownloadError` covers a single fetch; `StageError` covers staging a whole
//! collection and records which entry failed.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching one resource.
///
/// HTTP error statuses are not represented here: the response body is written
/// to the sink whatever the status.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// File system error while writing the sink.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred (`<stream>` for writer sinks).
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be built from the supplied configuration.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error, mapping timeouts to [`DownloadError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.into() };
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

/// Errors that can occur while staging a collection.
///
/// None of these roll back: entries written before the failure stay on disk.
#[derive(Debug, Error)]
pub enum StageError {
    /// The staging directory could not be created, or is still missing afterwards.
    #[error("failed to create staging directory {path}")]
    DirectoryCreate {
        /// The staging directory path.
        path: PathBuf,
        /// The underlying IO error, if creation itself reported one.
        #[source]
        source: Option<std::io::Error>,
    },

    /// Fetching entry `index` (zero-based) failed.
    #[error("failed to fetch entry {} ({url}): {source}", .index + 1)]
    Fetch {
        /// Zero-based position of the URL in the input list.
        index: usize,
        /// The URL that failed.
        url: String,
        /// The underlying fetch error.
        #[source]
        source: DownloadError,
    },

    /// A fetch reported success but the destination file does not exist.
    #[error("staged file missing after fetch: {path}")]
    Write {
        /// The destination that should have been written.
        path: PathBuf,
    },
}

impl StageError {
    /// Creates a directory-creation error.
    pub fn directory_create(path: impl Into<PathBuf>, source: Option<std::io::Error>) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a fetch error for the entry at zero-based `index`.
    pub fn fetch(index: usize, url: impl Into<String>, source: DownloadError) -> Self {
        Self::Fetch {
            index,
            url: url.into(),
            source,
        }
    }

    /// Creates a missing-output error.
    pub fn write(path: impl Into<PathBuf>) -> Self {
        Self::Write { path: path.into() }
    }
}

// Note on From trait implementations:
// Neither enum implements `From<reqwest::Error>` or `From<std::io::Error>`.
// Every variant carries the url or path the source error lacks, so callers go
// through the helper constructors instead.
