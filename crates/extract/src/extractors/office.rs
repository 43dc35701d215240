// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extractors for the common office and document formats: PDF via
//! `pdf-extract`, and the Office Open XML family (docx/xlsx/pptx) by
//! unzipping the package and pulling text runs out of its XML parts with
//! `quick-xml` (spec §4.2).

use crate::text::{ExtractedText, TextExtractor};
use crate::ExtractError;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn extract(&self, path: &Path, budget_bytes: u64) -> Result<ExtractedText, ExtractError> {
        let bytes = std::fs::read(path).map_err(|e| ExtractError::io(path, e))?;
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| ExtractError::corrupt(path, e.to_string()))?;
        Ok(ExtractedText::from_raw(text, budget_bytes))
    }
}

/// Extract every text node under any of `tag_names` from one XML document,
/// concatenated with single spaces (shared logic for the three OOXML formats).
fn extract_tagged_text(xml: &[u8], tag_names: &[&str]) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut inside = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = e.local_name();
                let local = std::str::from_utf8(name.as_ref()).unwrap_or("");
                inside = tag_names.contains(&local);
            }
            Event::Text(e) => {
                if inside {
                    if let Ok(text) = e.unescape() {
                        if !out.is_empty() {
                            out.push(' ');
                        }
                        out.push_str(&text);
                    }
                }
            }
            Event::End(_) => inside = false,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Read every zip entry whose name matches `predicate` and concatenate the
/// text extracted from each with `tag_names`.
fn extract_from_zip_parts(
    path: &Path,
    tag_names: &[&str],
    predicate: impl Fn(&str) -> bool,
) -> Result<String, ExtractError> {
    let file = std::fs::File::open(path).map_err(|e| ExtractError::io(path, e))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| ExtractError::corrupt(path, e.to_string()))?;

    let mut names: Vec<String> = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| ExtractError::corrupt(path, e.to_string()))?;
        if predicate(entry.name()) {
            names.push(entry.name().to_string());
        }
    }
    names.sort();

    let mut combined = String::new();
    for name in names {
        let mut entry =
            archive.by_name(&name).map_err(|e| ExtractError::corrupt(path, e.to_string()))?;
        let mut xml = Vec::new();
        entry.read_to_end(&mut xml).map_err(|e| ExtractError::io(path, e))?;
        let part_text = extract_tagged_text(&xml, tag_names)
            .map_err(|e| ExtractError::corrupt(path, e.to_string()))?;
        if !combined.is_empty() && !part_text.is_empty() {
            combined.push(' ');
        }
        combined.push_str(&part_text);
    }
    Ok(combined)
}

pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn extensions(&self) -> &[&str] {
        &["docx"]
    }

    fn extract(&self, path: &Path, budget_bytes: u64) -> Result<ExtractedText, ExtractError> {
        let text =
            extract_from_zip_parts(path, &["t"], |name| name == "word/document.xml")?;
        Ok(ExtractedText::from_raw(text, budget_bytes))
    }
}

pub struct XlsxExtractor;

impl TextExtractor for XlsxExtractor {
    fn extensions(&self) -> &[&str] {
        &["xlsx"]
    }

    fn extract(&self, path: &Path, budget_bytes: u64) -> Result<ExtractedText, ExtractError> {
        let text = extract_from_zip_parts(path, &["t"], |name| {
            name == "xl/sharedStrings.xml" || name.starts_with("xl/worksheets/")
        })?;
        Ok(ExtractedText::from_raw(text, budget_bytes))
    }
}

pub struct PptxExtractor;

impl TextExtractor for PptxExtractor {
    fn extensions(&self) -> &[&str] {
        &["pptx"]
    }

    fn extract(&self, path: &Path, budget_bytes: u64) -> Result<ExtractedText, ExtractError> {
        let text = extract_from_zip_parts(path, &["t"], |name| {
            name.starts_with("ppt/slides/slide") && name.ends_with(".xml")
        })?;
        Ok(ExtractedText::from_raw(text, budget_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_docx(path: &Path, paragraph_xml_body: &str) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options: zip::write::FileOptions<()> = zip::write::FileOptions::default();
        zip.start_file("word/document.xml", options).unwrap();
        let xml = format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="ns"><w:body>{paragraph_xml_body}</w:body></w:document>"#
        );
        std::io::Write::write_all(&mut zip, xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn docx_extractor_pulls_text_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.docx");
        write_docx(&path, r#"<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t>World</w:t></w:r></w:p>"#);
        let extractor = DocxExtractor;
        let result = extractor.extract(&path, 1024).unwrap();
        assert_eq!(result.text, "Hello World");
    }

    #[test]
    fn extract_tagged_text_ignores_unrelated_tags() {
        let xml = br#"<root><meta><t>skip</t></meta><w:t>keep</w:t></root>"#;
        let out = extract_tagged_text(xml, &["t"]).unwrap();
        assert_eq!(out, "skip keep");
    }
}
