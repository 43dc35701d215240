// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content hashing and MIME classification (spec §4.1).

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::ExtractError;

/// Chunk size for streaming hash reads so large files don't balloon memory.
const HASH_CHUNK_BYTES: usize = 64 * 1024;

/// Extension-to-MIME overrides for formats `mime_guess` gets wrong or
/// doesn't know about, checked before falling back to its table (spec §4.1).
const MIME_OVERRIDES: &[(&str, &str)] = &[
    ("md", "text/markdown"),
    ("eml", "message/rfc822"),
    ("heic", "image/heic"),
    ("numbers", "application/x-iwork-numbers-sffnumbers"),
    ("pages", "application/x-iwork-pages-sffpages"),
];

/// Stream-hash a file's content with SHA-256, reading in fixed-size chunks
/// so the process never holds the whole file in memory (spec §4.1).
pub fn hash_file(path: &Path) -> Result<String, ExtractError> {
    let mut file = std::fs::File::open(path).map_err(|e| ExtractError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_BYTES];
    loop {
        let n = file.read(&mut buf).map_err(|e| ExtractError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Hash an in-memory byte slice (used by extractors that already hold
/// the bytes, e.g. after unzipping an Office document part).
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Classify a file's MIME type from its extension and, for ambiguous or
/// extensionless files, a short content sniff (spec §4.1).
pub fn classify_mime(path: &Path, sniff: &[u8]) -> String {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let lower = ext.to_ascii_lowercase();
        if let Some((_, mime)) = MIME_OVERRIDES.iter().find(|(e, _)| *e == lower) {
            return (*mime).to_string();
        }
    }
    if let Some(guess) = mime_guess::from_path(path).first() {
        return guess.essence_str().to_string();
    }
    if sniff.iter().take(512).all(|b| b.is_ascii() && (*b >= 0x09 && *b != 0x7f)) {
        "text/plain".to_string()
    } else {
        "application/octet-stream".to_string()
    }
}

/// Read up to `n` leading bytes of a file for MIME sniffing, tolerating
/// files shorter than `n`.
pub fn read_sniff(path: &Path, n: usize) -> Result<Vec<u8>, ExtractError> {
    let mut file = std::fs::File::open(path).map_err(|e| ExtractError::io(path, e))?;
    let mut buf = vec![0u8; n];
    let mut total = 0;
    loop {
        let read = file.read(&mut buf[total..]).map_err(|e| ExtractError::io(path, e))?;
        if read == 0 {
            break;
        }
        total += read;
        if total == buf.len() {
            break;
        }
    }
    buf.truncate(total);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hash_file_matches_hash_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello world").unwrap();
        assert_eq!(hash_file(&path).unwrap(), hash_bytes(b"hello world"));
    }

    #[test]
    fn hash_file_handles_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::File::create(&path).unwrap();
        assert_eq!(hash_file(&path).unwrap(), hash_bytes(b""));
    }

    #[test]
    fn extension_override_wins_over_generic_guess() {
        let path = Path::new("notes.md");
        assert_eq!(classify_mime(path, b"# hi"), "text/markdown");
    }

    #[test]
    fn known_extension_uses_mime_guess_table() {
        let path = Path::new("report.pdf");
        assert_eq!(classify_mime(path, b"%PDF-1.4"), "application/pdf");
    }

    #[test]
    fn extensionless_text_file_sniffs_as_plain_text() {
        let path = Path::new("README");
        assert_eq!(classify_mime(path, b"hello, this is plain text"), "text/plain");
    }

    #[test]
    fn read_sniff_truncates_to_file_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"abc").unwrap();
        let sniff = read_sniff(&path, 512).unwrap();
        assert_eq!(sniff, b"abc");
    }
}
