//! `.tar.gz` writer and reader.

use std::fs::File;
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Builder, HeaderMode};

use super::ArchiveMember;
use super::error::ArchiveError;
use super::members::Member;

/// Writes `members` in order. Gzip runs at the fastest level and headers are
/// deterministic, so the same staging directory always yields the same bytes.
pub(crate) fn write(archive_path: &Path, members: &[Member]) -> Result<(), ArchiveError> {
    let file = File::create(archive_path).map_err(|e| ArchiveError::io(archive_path, e))?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::fast()));
    builder.mode(HeaderMode::Deterministic);

    for member in members {
        let appended = if member.is_dir {
            builder.append_dir(&member.name, &member.source)
        } else {
            builder.append_path_with_name(&member.source, &member.name)
        };
        appended.map_err(|e| ArchiveError::io(&member.source, e))?;
    }

    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .map_err(|e| ArchiveError::io(archive_path, e))?;
    Ok(())
}

pub(crate) fn list(archive_path: &Path) -> Result<Vec<ArchiveMember>, ArchiveError> {
    let file = File::open(archive_path).map_err(|e| ArchiveError::io(archive_path, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let entries = archive
        .entries()
        .map_err(|e| ArchiveError::io(archive_path, e))?;

    let mut members = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ArchiveError::io(archive_path, e))?;
        let name = entry
            .path()
            .map_err(|e| ArchiveError::io(archive_path, e))?
            .to_string_lossy()
            .trim_end_matches('/')
            .to_string();
        members.push(ArchiveMember {
            name,
            size: entry.size(),
            is_dir: entry.header().entry_type().is_dir(),
        });
    }
    Ok(members)
}
