// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Three-stage best-effort JSON extraction from LLM prose (spec §4.4
//! `deliberate_json`): models rarely return bare JSON, so this tries the
//! whole body, then fenced code blocks, then a balanced-brace scan, before
//! giving up.

use crate::LlmError;
use serde::de::DeserializeOwned;

pub fn extract_json<T: DeserializeOwned>(body: &str) -> Result<T, LlmError> {
    if let Ok(value) = serde_json::from_str::<T>(body.trim()) {
        return Ok(value);
    }
    for block in fenced_json_blocks(body) {
        if let Ok(value) = serde_json::from_str::<T>(block.trim()) {
            return Ok(value);
        }
    }
    for candidate in balanced_brace_slices(body) {
        if let Ok(value) = serde_json::from_str::<T>(candidate) {
            return Ok(value);
        }
    }
    Err(LlmError::Malformed(format!("no valid JSON object found in response: {}", truncate_for_error(body))))
}

fn truncate_for_error(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        body.to_string()
    } else {
        format!("{}...", &body[..MAX])
    }
}

/// Scan for ```json ... ``` or plain ``` ... ``` fenced blocks.
fn fenced_json_blocks(body: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find("```") {
        let after_fence = &rest[start + 3..];
        let after_lang = after_fence.strip_prefix("json").unwrap_or(after_fence);
        let after_lang = after_lang.strip_prefix('\n').unwrap_or(after_lang);
        if let Some(end) = after_lang.find("```") {
            blocks.push(&after_lang[..end]);
            rest = &after_lang[end + 3..];
        } else {
            break;
        }
    }
    blocks
}

/// Scan for every outermost `{ ... }` slice by brace-depth tracking,
/// ignoring braces inside string literals.
fn balanced_brace_slices(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut slices = Vec::new();
    let mut depth: i32 = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i] as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if b == '\\' {
                escaped = true;
            } else if b == '"' {
                in_string = false;
            }
        } else {
            match b {
                '"' => in_string = true,
                '{' => {
                    if depth == 0 {
                        start = Some(i);
                    }
                    depth += 1;
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start.take() {
                            if let Ok(slice) = std::str::from_utf8(&bytes[s..=i]) {
                                slices.push(slice);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Plan {
        name: String,
        count: u32,
    }

    #[test]
    fn parses_bare_json_body() {
        let body = r#"{"name": "finance", "count": 3}"#;
        let parsed: Plan = extract_json(body).unwrap();
        assert_eq!(parsed, Plan { name: "finance".into(), count: 3 });
    }

    #[test]
    fn parses_fenced_json_block_with_surrounding_prose() {
        let body = "Sure, here is the plan:\n```json\n{\"name\": \"legal\", \"count\": 7}\n```\nLet me know!";
        let parsed: Plan = extract_json(body).unwrap();
        assert_eq!(parsed, Plan { name: "legal".into(), count: 7 });
    }

    #[test]
    fn parses_balanced_braces_without_fencing() {
        let body = "The result is {\"name\": \"ops\", \"count\": 1} as requested.";
        let parsed: Plan = extract_json(body).unwrap();
        assert_eq!(parsed, Plan { name: "ops".into(), count: 1 });
    }

    #[test]
    fn brace_inside_string_literal_does_not_confuse_depth_tracking() {
        let body = r#"{"name": "uses a { brace", "count": 9}"#;
        let parsed: Plan = extract_json(body).unwrap();
        assert_eq!(parsed, Plan { name: "uses a { brace".into(), count: 9 });
    }

    #[test]
    fn no_json_anywhere_is_malformed() {
        let result: Result<Plan, _> = extract_json("I cannot help with that.");
        assert!(result.is_err());
    }
}
