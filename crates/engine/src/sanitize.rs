// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem-safe name sanitization for the Executor's plan validation step
//! (spec §4.9 step 1).

const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const RESERVED_BASE_NAMES: &[&str] =
    &["con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "lpt1", "lpt2", "lpt3", "lpt4"];
const MAX_COMPONENT_LEN: usize = 255;

/// Sanitize one path component (a file or directory name): strip forbidden
/// characters, trailing dots/spaces, rename reserved base names, and clamp
/// length.
pub fn sanitize_component(name: &str) -> String {
    let mut out: String = name.chars().filter(|c| !FORBIDDEN_CHARS.contains(c)).collect();
    out = out.trim_end_matches(['.', ' ']).to_string();
    if out.is_empty() {
        out = "_".to_string();
    }
    let stem_lower = out.split('.').next().unwrap_or(&out).to_ascii_lowercase();
    if RESERVED_BASE_NAMES.contains(&stem_lower.as_str()) {
        out = format!("_{out}");
    }
    if out.len() > MAX_COMPONENT_LEN {
        out.truncate(MAX_COMPONENT_LEN);
    }
    out
}

/// Sanitize every component of a slash-separated relative path, preserving
/// directory structure.
pub fn sanitize_path(path: &str) -> String {
    path.split('/').filter(|s| !s.is_empty()).map(sanitize_component).collect::<Vec<_>>().join("/")
}
