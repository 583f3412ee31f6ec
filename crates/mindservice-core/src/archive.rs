// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Zip archive handling.
//!
//! Inputs arrive as a zip archive from which only the requested entries are
//! extracted. Each logical name `X` maps to the entry `X` + suffix. Results
//! leave as a zip archive built from the run's output files.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Errors from archive operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchiveError {
    /// The archive could not be read as a zip file.
    #[error("Failed to read archive: {0}")]
    Read(#[from] ZipError),

    /// The archive could not be written.
    #[error("Failed to write archive: {0}")]
    Write(ZipError),

    /// Requested entries are absent from the archive.
    #[error("Missing files in zip: {}", .0.join(", "))]
    MissingEntries(Vec<String>),

    /// An entry name would escape the destination directory.
    #[error("Unsafe entry path in archive: {0}")]
    UnsafeEntry(String),

    /// There is nothing to put in the archive.
    #[error("No files to archive")]
    Empty,

    /// File I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Map a logical name to its archive entry name.
pub fn entry_name(logical_name: &str, suffix: &str) -> String {
    format!("{}{}", logical_name, suffix)
}

/// Extract the entries for `logical_names` from `archive_path` into `destination`.
///
/// Every entry is attempted before failing, so a missing-entries error lists
/// all absent names at once. On success the extracted paths are returned in
/// the order of `logical_names`. Files in `destination` other than the
/// extracted ones are left alone.
pub fn extract_entries(
    archive_path: &Path,
    destination: &Path,
    logical_names: &[String],
    suffix: &str,
) -> Result<Vec<PathBuf>> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    let mut extracted = Vec::with_capacity(logical_names.len());
    let mut missing = Vec::new();

    for name in logical_names {
        let entry = entry_name(name, suffix);
        let mut file = match archive.by_name(&entry) {
            Ok(file) if !file.is_dir() => file,
            Ok(_) | Err(ZipError::FileNotFound) => {
                missing.push(entry);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let relative = file
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafeEntry(entry.clone()))?;
        let target = destination.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&target)?;
        io::copy(&mut file, &mut out)?;
        extracted.push(target);
    }

    if !missing.is_empty() {
        return Err(ArchiveError::MissingEntries(missing));
    }

    Ok(extracted)
}

/// Write `files` into a deflate-compressed zip archive at `destination`.
///
/// Each file is stored under its bare file name.
pub fn create_archive(files: &[PathBuf], destination: &Path) -> Result<u64> {
    if files.is_empty() {
        return Err(ArchiveError::Empty);
    }

    let mut zip = ZipWriter::new(File::create(destination)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ArchiveError::UnsafeEntry(path.display().to_string()))?;

        zip.start_file(name, options).map_err(ArchiveError::Write)?;
        let mut input = File::open(path)?;
        io::copy(&mut input, &mut zip)?;
    }

    let file = zip.finish().map_err(ArchiveError::Write)?;
    Ok(file.metadata()?.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_entry_name() {
        assert_eq!(entry_name("matrix", ".csv"), "matrix.csv");
    }

    #[test]
    fn test_extract_requested_entries_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("input.zip");
        write_zip(
            &archive,
            &[("a.csv", "1;2\n"), ("b.csv", "3;4\n"), ("c.csv", "5;6\n")],
        );

        let extracted =
            extract_entries(&archive, temp_dir.path(), &names(&["b", "a"]), ".csv").unwrap();

        assert_eq!(
            extracted,
            vec![temp_dir.path().join("b.csv"), temp_dir.path().join("a.csv")]
        );
        assert_eq!(std::fs::read_to_string(&extracted[0]).unwrap(), "3;4\n");
        assert!(!temp_dir.path().join("c.csv").exists());
    }

    #[test]
    fn test_extract_reports_all_missing_entries() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("input.zip");
        write_zip(&archive, &[("a.csv", "1;2\n")]);

        let err = extract_entries(
            &archive,
            temp_dir.path(),
            &names(&["x", "a", "y"]),
            ".csv",
        )
        .unwrap_err();

        match err {
            ArchiveError::MissingEntries(missing) => {
                assert_eq!(missing, vec!["x.csv".to_string(), "y.csv".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extract_keeps_unrelated_files() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("input.zip");
        write_zip(&archive, &[("a.csv", "1;2\n")]);
        std::fs::write(temp_dir.path().join("notes.txt"), "keep me").unwrap();

        extract_entries(&archive, temp_dir.path(), &names(&["a"]), ".csv").unwrap();

        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("notes.txt")).unwrap(),
            "keep me"
        );
        assert!(archive.exists());
    }

    #[test]
    fn test_extract_nested_entry() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("input.zip");
        write_zip(&archive, &[("data/a.csv", "1;2\n")]);
        let destination = temp_dir.path().join("run");
        std::fs::create_dir_all(&destination).unwrap();

        let extracted = extract_entries(&archive, &destination, &names(&["data/a"]), ".csv").unwrap();
        assert_eq!(extracted, vec![destination.join("data").join("a.csv")]);
    }

    #[test]
    fn test_extract_not_a_zip() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("input.zip");
        std::fs::write(&archive, "definitely not a zip").unwrap();

        let err = extract_entries(&archive, temp_dir.path(), &names(&["a"]), ".csv").unwrap_err();
        assert!(matches!(err, ArchiveError::Read(_)));
    }

    #[test]
    fn test_create_archive_uses_bare_names() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("out");
        std::fs::create_dir_all(&out_dir).unwrap();
        let first = out_dir.join("x.csv");
        let second = out_dir.join("y.csv");
        std::fs::write(&first, "2;4\n").unwrap();
        std::fs::write(&second, "6;8\n").unwrap();

        let destination = temp_dir.path().join("results.zip");
        let size = create_archive(&[first, second], &destination).unwrap();
        assert!(size > 0);

        let mut archive = ZipArchive::new(File::open(&destination).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("y.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "6;8\n");
    }

    #[test]
    fn test_create_archive_empty_files_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = create_archive(&[], &temp_dir.path().join("results.zip")).unwrap_err();
        assert!(matches!(err, ArchiveError::Empty));
    }
}
