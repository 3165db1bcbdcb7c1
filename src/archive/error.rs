//! Error types for the archive module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while packing or reading an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The directory to archive does not exist or is not a directory.
    #[error("archive target must be an existing directory: {path}")]
    InvalidTarget {
        /// The rejected target path.
        path: PathBuf,
    },

    /// The archive format selector is not one of `tar.gz`, `zip` or `none`.
    #[error("unsupported archive format: '{format}'")]
    UnsupportedFormat {
        /// The rejected selector as given.
        format: String,
    },

    /// File system error while reading members or writing the archive.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("failed to walk {path}: {source}")]
    Walk {
        /// The directory being walked.
        path: PathBuf,
        /// The underlying walk error.
        #[source]
        source: walkdir::Error,
    },

    /// The zip writer or reader rejected an operation.
    #[error("zip error on {path}: {source}")]
    Zip {
        /// The archive path.
        path: PathBuf,
        /// The underlying zip error.
        #[source]
        source: ::zip::result::ZipError,
    },

    /// The archive was written without error but does not exist afterwards.
    #[error("archive missing after write: {path}")]
    Missing {
        /// The expected archive path.
        path: PathBuf,
    },
}

impl ArchiveError {
    /// Creates an invalid-target error.
    pub fn invalid_target(path: impl Into<PathBuf>) -> Self {
        Self::InvalidTarget { path: path.into() }
    }

    /// Creates an unsupported-format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a zip error.
    pub fn zip(path: impl Into<PathBuf>, source: ::zip::result::ZipError) -> Self {
        Self::Zip {
            path: path.into(),
            source,
        }
    }
}
