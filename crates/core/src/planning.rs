// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `NamingSchema`, `TagTaxonomy`, `DirectoryStructure` (spec §3, §4.8).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum directory nesting depth the Organization Planner may propose (spec §4.8).
pub const MAX_DIRECTORY_DEPTH: u32 = 4;
/// Maximum tag taxonomy tree depth (spec §3, §4.8).
pub const MAX_TAXONOMY_DEPTH: u32 = 3;
/// Fallback directory for unclassifiable or under-specified files (spec §4.8).
pub const UNCATEGORIZED_PATH: &str = "/_Uncategorized";
pub const UNCATEGORIZED_TAG: &str = "uncategorized";

/// A file-naming convention scoped to one `document_type` (spec §3 `NamingSchema`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingSchema {
    pub planning_batch_id: String,
    pub document_type: String,
    pub naming_pattern: String,
    pub example: String,
    pub description: String,
    pub placeholder_definitions: HashMap<String, String>,
    pub schema_version: u32,
}

/// One node of the tag taxonomy forest (spec §3 `TagTaxonomy`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagTaxonomyNode {
    pub planning_batch_id: String,
    pub tag_name: String,
    pub parent: Option<String>,
    pub description: String,
    pub usage_count: u64,
}

/// One node of the proposed directory layout (spec §3 `DirectoryStructure`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryStructureEntry {
    pub planning_batch_id: String,
    pub path: String,
    pub folder_name: String,
    pub parent_path: Option<String>,
    pub depth: u32,
    pub purpose: String,
    pub expected_tags: Vec<String>,
    pub expected_document_types: Vec<String>,
}

/// Validate the tag taxonomy is acyclic and within depth (spec §3 invariant,
/// §9 "insert parents before children and forbid cycles at write time").
pub fn validate_taxonomy_acyclic(nodes: &[TagTaxonomyNode]) -> bool {
    let by_name: HashMap<&str, &TagTaxonomyNode> = nodes.iter().map(|n| (n.tag_name.as_str(), n)).collect();
    for node in nodes {
        let mut seen = std::collections::HashSet::new();
        let mut cur = node;
        seen.insert(cur.tag_name.as_str());
        let mut depth = 0u32;
        while let Some(parent_name) = cur.parent.as_deref() {
            depth += 1;
            if depth > MAX_TAXONOMY_DEPTH {
                return false;
            }
            let Some(parent) = by_name.get(parent_name) else {
                // Dangling parent reference: caller should drop/reject, not accept as valid.
                return false;
            };
            if !seen.insert(parent.tag_name.as_str()) {
                return false; // cycle
            }
            cur = parent;
        }
    }
    true
}

/// Topologically order taxonomy nodes so parents are inserted before
/// children (spec §4.8 persistence rule, §9).
pub fn topo_sort_taxonomy(nodes: &[TagTaxonomyNode]) -> Vec<TagTaxonomyNode> {
    let mut remaining: Vec<TagTaxonomyNode> = nodes.to_vec();
    let mut inserted: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut ordered = Vec::with_capacity(nodes.len());
    while !remaining.is_empty() {
        let mut progressed = false;
        remaining.retain(|n| {
            let ready = match &n.parent {
                None => true,
                Some(p) => inserted.contains(p),
            };
            if ready {
                inserted.insert(n.tag_name.clone());
                ordered.push(n.clone());
                progressed = true;
                false
            } else {
                true
            }
        });
        if !progressed {
            // Dangling/cyclic remainder: append as-is rather than looping forever.
            ordered.extend(remaining.drain(..));
            break;
        }
    }
    ordered
}
