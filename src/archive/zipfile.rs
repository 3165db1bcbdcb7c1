//! `.zip` writer and reader.

use std::fs::File;
use std::io;
use std::path::Path;

use ::zip::write::FileOptions;
use ::zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::ArchiveMember;
use super::error::ArchiveError;
use super::members::Member;

/// Writes one stored (uncompressed) entry per file member. Directory members
/// are skipped: the zip carries no directory entries.
pub(crate) fn write(archive_path: &Path, members: &[Member]) -> Result<(), ArchiveError> {
    let file = File::create(archive_path).map_err(|e| ArchiveError::io(archive_path, e))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);

    for member in members.iter().filter(|m| !m.is_dir) {
        writer
            .start_file(member.name.as_str(), options)
            .map_err(|e| ArchiveError::zip(archive_path, e))?;
        let mut source = File::open(&member.source).map_err(|e| ArchiveError::io(&member.source, e))?;
        io::copy(&mut source, &mut writer).map_err(|e| ArchiveError::io(&member.source, e))?;
    }

    writer
        .finish()
        .map_err(|e| ArchiveError::zip(archive_path, e))?;
    Ok(())
}

pub(crate) fn list(archive_path: &Path) -> Result<Vec<ArchiveMember>, ArchiveError> {
    let file = File::open(archive_path).map_err(|e| ArchiveError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| ArchiveError::zip(archive_path, e))?;

    let mut members = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| ArchiveError::zip(archive_path, e))?;
        members.push(ArchiveMember {
            name: entry.name().trim_end_matches('/').to_string(),
            size: entry.size(),
            is_dir: entry.is_dir(),
        });
    }
    Ok(members)
}
