// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text and markup extractors: read bytes, decode lossily, truncate
//! to budget (spec §4.2).

use crate::text::{ExtractedText, TextExtractor};
use crate::ExtractError;
use std::io::Read;
use std::path::Path;

pub struct PlainTextExtractor {
    extensions: Vec<&'static str>,
}

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self { extensions: vec!["txt", "md", "markdown", "csv", "json", "yaml", "yml", "toml", "log", "rtf"] }
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extensions(&self) -> &[&str] {
        &self.extensions
    }

    fn extract(&self, path: &Path, budget_bytes: u64) -> Result<ExtractedText, ExtractError> {
        let mut file = std::fs::File::open(path).map_err(|e| ExtractError::io(path, e))?;
        // Read at most one budget's worth plus a little slack for multi-byte
        // boundary trimming, rather than loading arbitrarily large files.
        let cap = (budget_bytes as usize).saturating_add(4);
        let mut buf = Vec::with_capacity(cap.min(1 << 20));
        file.by_ref().take(cap as u64).read_to_end(&mut buf).map_err(|e| ExtractError::io(path, e))?;
        let text = String::from_utf8_lossy(&buf).into_owned();
        Ok(ExtractedText::from_raw(text, budget_bytes))
    }
}
