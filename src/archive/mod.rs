//! Packing a staged directory into a single archive file.
//!
//! Both formats name members relative to the parent of the staging directory,
//! so extracting an archive recreates `SafeName/NN.ext`. Traversal is sorted
//! and tar headers are deterministic.
//!
//! | Format   | Members                               | Compression   |
//! |----------|---------------------------------------|---------------|
//! | `tar.gz` | `SafeName` directory plus every file  | gzip, fastest |
//! | `zip`    | every file, no directory entries      | stored        |
//!
//! Archiving is blocking file IO. Async callers should run [`archive`] on
//! the blocking pool.

mod error;
mod members;
mod targz;
mod zipfile;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

pub use error::ArchiveError;

/// Output container selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball, `.tar.gz`.
    #[default]
    #[serde(rename = "tar.gz")]
    TarGz,
    /// Zip with stored members, `.zip`.
    Zip,
    /// Stage only, produce no archive.
    None,
}

impl ArchiveFormat {
    /// File extension including the leading dot, or `None` when no archive is produced.
    #[must_use]
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::TarGz => Some(".tar.gz"),
            Self::Zip => Some(".zip"),
            Self::None => None,
        }
    }

    /// Archive path for a staged collection: `<root>/<safe_name><ext>`.
    #[must_use]
    pub fn archive_path(self, root: &Path, safe_name: &str) -> Option<std::path::PathBuf> {
        self.extension()
            .map(|ext| root.join(format!("{safe_name}{ext}")))
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
            Self::None => "none",
        })
    }
}

impl FromStr for ArchiveFormat {
    type Err = ArchiveError;

    /// Accepts `.tar.gz`, `tar.gz`, `.zip`, `zip`, `none` and the empty string,
    /// ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            ".tar.gz" | "tar.gz" => Ok(Self::TarGz),
            ".zip" | "zip" => Ok(Self::Zip),
            "" | "none" => Ok(Self::None),
            _ => Err(ArchiveError::unsupported_format(s)),
        }
    }
}

/// One entry read back from an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveMember {
    /// Member path without a trailing `/`.
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    pub is_dir: bool,
}

/// Packs `staging_dir` into `archive_path`.
///
/// Members are named relative to the parent of `staging_dir`. The process
/// working directory is never changed. With [`ArchiveFormat::None`] this is
/// a no-op.
///
/// # Errors
///
/// - [`ArchiveError::InvalidTarget`] if `staging_dir` is not an existing directory
/// - [`ArchiveError::Io`] / [`ArchiveError::Zip`] if reading a member or writing fails
/// - [`ArchiveError::Missing`] if the archive does not exist after writing
#[instrument(skip_all, fields(dir = %staging_dir.display(), archive = %archive_path.display(), %format))]
pub fn archive(
    staging_dir: &Path,
    archive_path: &Path,
    format: ArchiveFormat,
) -> Result<(), ArchiveError> {
    if format == ArchiveFormat::None {
        debug!("archive format is none, nothing to write");
        return Ok(());
    }

    let members = members::collect_members(staging_dir)?;
    debug!(members = members.len(), "collected archive members");

    match format {
        ArchiveFormat::TarGz => targz::write(archive_path, &members)?,
        ArchiveFormat::Zip => zipfile::write(archive_path, &members)?,
        ArchiveFormat::None => return Ok(()),
    }

    if !archive_path.is_file() {
        return Err(ArchiveError::Missing {
            path: archive_path.to_path_buf(),
        });
    }

    info!(members = members.len(), "archive written");
    Ok(())
}

/// Lists the entries of an archive in stored order.
///
/// # Errors
///
/// Returns [`ArchiveError::UnsupportedFormat`] for [`ArchiveFormat::None`],
/// and IO or zip errors if the archive cannot be read.
pub fn list_members(
    archive_path: &Path,
    format: ArchiveFormat,
) -> Result<Vec<ArchiveMember>, ArchiveError> {
    match format {
        ArchiveFormat::TarGz => targz::list(archive_path),
        ArchiveFormat::Zip => zipfile::list(archive_path),
        ArchiveFormat::None => Err(ArchiveError::unsupported_format(format.to_string())),
    }
}
