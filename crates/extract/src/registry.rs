// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extension-keyed dispatch table over registered [`TextExtractor`]s
//! (spec §4.2).

use crate::extractors::generic::GenericBinaryExtractor;
use crate::extractors::office::{DocxExtractor, PdfExtractor, PptxExtractor, XlsxExtractor};
use crate::extractors::plain_text::PlainTextExtractor;
use crate::text::{ExtractedText, TextExtractor};
use crate::ExtractError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub struct ExtractorRegistry {
    by_extension: HashMap<String, Arc<dyn TextExtractor>>,
    fallback: Arc<dyn TextExtractor>,
}

impl ExtractorRegistry {
    /// The built-in registry covering every format family named in spec §4.2.
    pub fn with_defaults() -> Self {
        let mut registry = Self { by_extension: HashMap::new(), fallback: Arc::new(GenericBinaryExtractor) };
        registry.register(Arc::new(PlainTextExtractor::new()));
        registry.register(Arc::new(PdfExtractor));
        registry.register(Arc::new(DocxExtractor));
        registry.register(Arc::new(XlsxExtractor));
        registry.register(Arc::new(PptxExtractor));
        registry
    }

    pub fn register(&mut self, extractor: Arc<dyn TextExtractor>) {
        for ext in extractor.extensions() {
            self.by_extension.insert(ext.to_string(), extractor.clone());
        }
    }

    fn extractor_for(&self, path: &Path) -> &Arc<dyn TextExtractor> {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .and_then(|ext| self.by_extension.get(&ext))
            .unwrap_or(&self.fallback)
    }

    /// Extract text for one file, degrading to the generic (empty-text)
    /// extractor on an unsupported extension rather than failing the phase
    /// (spec §4.2).
    pub fn extract(&self, path: &Path, budget_bytes: u64) -> Result<ExtractedText, ExtractError> {
        let extractor = self.extractor_for(path);
        tracing::debug!(path = %path.display(), budget_bytes, "extracting text");
        extractor.extract(path, budget_bytes)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_falls_back_to_generic() {
        let registry = ExtractorRegistry::with_defaults();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.xyz");
        std::fs::write(&path, b"\x00\x01\x02").unwrap();
        let result = registry.extract(&path, 1024).unwrap();
        assert!(result.text.is_empty());
    }

    #[test]
    fn txt_extension_routes_to_plain_text_extractor() {
        let registry = ExtractorRegistry::with_defaults();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain content").unwrap();
        let result = registry.extract(&path, 1024).unwrap();
        assert_eq!(result.text, "plain content");
    }
}
