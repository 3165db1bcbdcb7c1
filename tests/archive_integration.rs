//! Integration tests for the archive module.
//!
//! These tests pack real directories and unpack them again with the codec
//! crates directly, independent of `list_members`.

use std::fs;
use std::fs::File;
use std::path::Path;

use flate2::read::GzDecoder;
use tempfile::TempDir;
use webarchiver::{ArchiveError, ArchiveFormat, archive, list_members};

fn staged_dir(root: &Path, name: &str) -> std::path::PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).expect("create staging dir");
    fs::write(dir.join("01.png"), b"first image").expect("write 01");
    fs::write(dir.join("02.jpg"), b"second").expect("write 02");
    fs::write(dir.join("03"), b"<html></html>").expect("write 03");
    dir
}

#[test]
fn test_tar_gz_unpacks_to_identical_tree() {
    let temp = TempDir::new().expect("temp dir");
    let dir = staged_dir(temp.path(), "Album");
    let target = temp.path().join("Album.tar.gz");

    archive(&dir, &target, ArchiveFormat::TarGz).expect("archive should succeed");

    let out = TempDir::new().expect("temp dir");
    let mut unpacker = tar::Archive::new(GzDecoder::new(File::open(&target).expect("open")));
    unpacker.unpack(out.path()).expect("unpack");

    assert_eq!(fs::read(out.path().join("Album/01.png")).unwrap(), b"first image");
    assert_eq!(fs::read(out.path().join("Album/02.jpg")).unwrap(), b"second");
    assert_eq!(fs::read(out.path().join("Album/03")).unwrap(), b"<html></html>");
}

#[test]
fn test_zip_extracts_to_identical_tree() {
    let temp = TempDir::new().expect("temp dir");
    let dir = staged_dir(temp.path(), "Album");
    let target = temp.path().join("Album.zip");

    archive(&dir, &target, ArchiveFormat::Zip).expect("archive should succeed");

    let out = TempDir::new().expect("temp dir");
    let mut reader = zip::ZipArchive::new(File::open(&target).expect("open")).expect("zip");
    reader.extract(out.path()).expect("extract");

    assert_eq!(fs::read(out.path().join("Album/01.png")).unwrap(), b"first image");
    assert_eq!(fs::read(out.path().join("Album/03")).unwrap(), b"<html></html>");
}

#[test]
fn test_members_are_sorted_and_relative() {
    let temp = TempDir::new().expect("temp dir");
    let dir = staged_dir(temp.path(), "Sorted");
    let target = temp.path().join("Sorted.zip");

    archive(&dir, &target, ArchiveFormat::Zip).unwrap();

    let names: Vec<String> = list_members(&target, ArchiveFormat::Zip)
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, ["Sorted/01.png", "Sorted/02.jpg", "Sorted/03"]);
    assert!(names.iter().all(|n| !n.starts_with('/')));
}

#[test]
fn test_archiving_same_tree_twice_is_reproducible() {
    let temp = TempDir::new().expect("temp dir");
    let dir = staged_dir(temp.path(), "Repro");
    let first = temp.path().join("first.tar.gz");
    let second = temp.path().join("second.tar.gz");

    archive(&dir, &first, ArchiveFormat::TarGz).unwrap();
    archive(&dir, &second, ArchiveFormat::TarGz).unwrap();

    assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
}

#[test]
fn test_missing_staging_dir_is_invalid_target() {
    let temp = TempDir::new().expect("temp dir");
    let target = temp.path().join("nothing.zip");

    let result = archive(&temp.path().join("absent"), &target, ArchiveFormat::Zip);

    assert!(matches!(result, Err(ArchiveError::InvalidTarget { .. })));
    assert!(!target.exists());
}

#[test]
fn test_file_as_staging_dir_is_invalid_target() {
    let temp = TempDir::new().expect("temp dir");
    let file = temp.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();

    let result = archive(&file, &temp.path().join("plain.tar.gz"), ArchiveFormat::TarGz);

    assert!(matches!(result, Err(ArchiveError::InvalidTarget { .. })));
}

#[test]
fn test_none_format_writes_nothing() {
    let temp = TempDir::new().expect("temp dir");
    let dir = staged_dir(temp.path(), "Skip");
    let target = temp.path().join("Skip.none");

    archive(&dir, &target, ArchiveFormat::None).unwrap();

    assert!(!target.exists());
    assert!(dir.join("01.png").is_file());
}
