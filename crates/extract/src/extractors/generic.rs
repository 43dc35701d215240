// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fallback extractor for binary formats nothing else claims. Returns an
//! empty summary rather than failing the phase (spec §4.2 "unsupported
//! formats degrade to filename/metadata-only classification").

use crate::text::{ExtractedText, TextExtractor};
use crate::ExtractError;
use std::path::Path;

pub struct GenericBinaryExtractor;

impl TextExtractor for GenericBinaryExtractor {
    fn extensions(&self) -> &[&str] {
        &[]
    }

    fn extract(&self, _path: &Path, _budget_bytes: u64) -> Result<ExtractedText, ExtractError> {
        Ok(ExtractedText::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_extractor_never_fails() {
        let extractor = GenericBinaryExtractor;
        let result = extractor.extract(Path::new("anything.bin"), 100).unwrap();
        assert!(result.text.is_empty());
        assert!(!result.truncated);
    }
}
