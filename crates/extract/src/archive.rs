// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unpacks a deposited source archive into the job's read-only source tree
//! (spec §6 `/data/source/<job>`), the step that precedes the Indexer and
//! corresponds to `JobStatus::Extracting`.

use crate::ExtractError;
use std::fs;
use std::path::Path;
use zip::ZipArchive;

/// Extract every entry of the zip archive at `archive_path` into
/// `dest_root`, which is created if missing. Zip-slip (entries whose
/// resolved path escapes `dest_root`) is rejected rather than silently
/// clamped.
pub fn unpack(archive_path: &Path, dest_root: &Path) -> Result<u64, ExtractError> {
    let file = fs::File::open(archive_path).map_err(|e| ExtractError::io(archive_path, e))?;
    let mut zip =
        ZipArchive::new(file).map_err(|e| ExtractError::corrupt(archive_path, e.to_string()))?;
    fs::create_dir_all(dest_root).map_err(|e| ExtractError::io(dest_root, e))?;

    let mut extracted = 0u64;
    for i in 0..zip.len() {
        let mut entry =
            zip.by_index(i).map_err(|e| ExtractError::corrupt(archive_path, e.to_string()))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(ExtractError::corrupt(
                archive_path,
                format!("entry {} escapes the destination root", entry.name()),
            ));
        };
        let target = dest_root.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| ExtractError::io(&target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
        }
        let mut out = fs::File::create(&target).map_err(|e| ExtractError::io(&target, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| ExtractError::io(&target, e))?;
        extracted += 1;
    }
    Ok(extracted)
}

/// Best-effort inventory of a zip archive's top-level directory names,
/// used to skip hidden top-level directories (spec §4.5) before the full
/// unpack runs.
pub fn top_level_entries(archive_path: &Path) -> Result<Vec<String>, ExtractError> {
    let file = fs::File::open(archive_path).map_err(|e| ExtractError::io(archive_path, e))?;
    let mut zip =
        ZipArchive::new(file).map_err(|e| ExtractError::corrupt(archive_path, e.to_string()))?;
    let mut seen = std::collections::HashSet::new();
    for i in 0..zip.len() {
        let entry = zip.by_index(i).map_err(|e| ExtractError::corrupt(archive_path, e.to_string()))?;
        let Some(relative) = entry.enclosed_name() else { continue };
        if let Some(first) = relative.components().next() {
            seen.insert(first.as_os_str().to_string_lossy().to_string());
        }
    }
    Ok(seen.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sample_zip(path: &Path) {
        let file = fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options: zip::write::FileOptions<()> = zip::write::FileOptions::default();
        zip.start_file("docs/report.txt", options).unwrap();
        zip.write_all(b"hello").unwrap();
        zip.start_file(".hidden/note.txt", options).unwrap();
        zip.write_all(b"shh").unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn unpack_recreates_directory_structure() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("a.zip");
        write_sample_zip(&archive_path);
        let dest = dir.path().join("source");

        let count = unpack(&archive_path, &dest).unwrap();
        assert_eq!(count, 2);
        assert_eq!(fs::read_to_string(dest.join("docs/report.txt")).unwrap(), "hello");
        assert_eq!(fs::read_to_string(dest.join(".hidden/note.txt")).unwrap(), "shh");
    }

    #[test]
    fn top_level_entries_lists_both_visible_and_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("a.zip");
        write_sample_zip(&archive_path);
        let mut names = top_level_entries(&archive_path).unwrap();
        names.sort();
        assert_eq!(names, vec![".hidden".to_string(), "docs".to_string()]);
    }
}
