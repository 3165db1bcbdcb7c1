//! Member collection for archive writers.
//!
//! Members are named relative to the parent of the staging directory, so the
//! staging directory's own name is the first path component of every member.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::error::ArchiveError;

/// A file or directory to pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Member {
    /// Location on disk.
    pub source: PathBuf,
    /// Archive path, `/`-separated, relative to the staging directory's parent.
    pub name: String,
    pub is_dir: bool,
}

/// Walks `staging_dir` and returns every entry, the directory itself first,
/// siblings sorted by file name.
pub(crate) fn collect_members(staging_dir: &Path) -> Result<Vec<Member>, ArchiveError> {
    let root = std::fs::canonicalize(staging_dir)
        .map_err(|_| ArchiveError::invalid_target(staging_dir))?;
    if !root.is_dir() {
        return Err(ArchiveError::invalid_target(staging_dir));
    }
    let base = root
        .parent()
        .ok_or_else(|| ArchiveError::invalid_target(staging_dir))?;

    let mut members = Vec::new();
    for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|source| ArchiveError::Walk {
            path: root.clone(),
            source,
        })?;
        let relative = entry
            .path()
            .strip_prefix(base)
            .map_err(|_| ArchiveError::invalid_target(entry.path()))?;
        members.push(Member {
            source: entry.path().to_path_buf(),
            name: member_name(relative),
            is_dir: entry.file_type().is_dir(),
        });
    }
    Ok(members)
}

/// Joins the normal components of `relative` with `/`, whatever the platform separator.
fn member_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
