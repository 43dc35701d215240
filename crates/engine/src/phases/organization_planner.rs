// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Organization Planner: selects the planning set, asks the remote LLM for a
//! naming/tagging/directory scheme, and validates the plan before persisting
//! it (spec §4.8).

use crate::error::EngineError;
use crate::phases::PhaseContext;
use arc_core::document_item::{DocumentItem, DocumentItemId, DocumentStatus};
use arc_core::duplicate::DuplicateAction;
use arc_core::job::JobId;
use arc_core::planning::{
    DirectoryStructureEntry, NamingSchema, TagTaxonomyNode, MAX_DIRECTORY_DEPTH, MAX_TAXONOMY_DEPTH,
    UNCATEGORIZED_PATH, UNCATEGORIZED_TAG,
};
use arc_core::version::VersionMemberStatus;
use arc_core::Clock;
use arc_llm::types::DeliberateRequest;
use arc_llm::RemoteLlmClient;
use arc_store::document_items;
use arc_store::duplicates;
use arc_store::planning;
use arc_store::versions;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Planning-set items lack assignments beyond this fraction before the
/// whole plan is rejected (spec §4.8 rule 4).
const MAX_UNASSIGNED_FRACTION: f64 = 0.10;
/// Directory histogram is capped at the most-populated entries (spec §4.8).
const MAX_DIRECTORY_HISTOGRAM_ENTRIES: usize = 50;
/// Summaries sent to the planner are truncated to this many characters (spec §4.8).
const SUMMARY_PROMPT_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "You are organizing a document archive. You will receive a list of files, a \
    directory histogram, and an extension histogram. Propose a naming convention per document type, a tag \
    taxonomy tree (at most 3 levels), a directory structure (at most 4 levels deep), and an assignment for \
    every file. Every file must be assigned. Binary or unrecognized files should be organized by filename. \
    Files you cannot classify go to \"/_Uncategorized\" keeping their original name, tagged \"uncategorized\". \
    Tags must be lowercase and hyphenated. Respond as JSON: {\"naming_schemas\": [{\"document_type\": string, \
    \"naming_pattern\": string, \"example\": string, \"description\": string}], \"tag_taxonomy\": [{\"tag_name\": \
    string, \"parent\": string|null, \"description\": string}], \"directory_structure\": [{\"path\": string, \
    \"folder_name\": string, \"parent_path\": string|null, \"purpose\": string, \"expected_tags\": [string], \
    \"expected_document_types\": [string]}], \"file_assignments\": [{\"document_id\": string, \"proposed_name\": \
    string|null, \"proposed_path\": string|null, \"proposed_tags\": [string], \"reasoning\": string}]}.";

#[derive(Debug, Deserialize)]
struct PlanResponse {
    naming_schemas: Vec<PlanNamingSchema>,
    tag_taxonomy: Vec<PlanTaxonomyNode>,
    directory_structure: Vec<PlanDirectoryEntry>,
    file_assignments: Vec<PlanAssignment>,
}

#[derive(Debug, Deserialize)]
struct PlanNamingSchema {
    document_type: String,
    naming_pattern: String,
    example: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct PlanTaxonomyNode {
    tag_name: String,
    parent: Option<String>,
    description: String,
}

#[derive(Debug, Deserialize)]
struct PlanDirectoryEntry {
    path: String,
    folder_name: String,
    parent_path: Option<String>,
    purpose: String,
    #[serde(default)]
    expected_tags: Vec<String>,
    #[serde(default)]
    expected_document_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlanAssignment {
    document_id: String,
    proposed_name: Option<String>,
    proposed_path: Option<String>,
    #[serde(default)]
    proposed_tags: Vec<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Debug, Serialize)]
struct InputFileRecord {
    id: String,
    current_name: String,
    current_path: String,
    extension: String,
    size: u64,
    mime_type: String,
    document_type: String,
    summary: String,
    key_topics: Vec<String>,
    mtime_ms: u64,
    is_current_version: bool,
    chain_name: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OrganizationPlannerOutcome {
    pub files_assigned: u64,
    pub directories_proposed: u64,
    pub tags_proposed: u64,
}

/// Run the planner for `job_id`, persisting a new plan under a fresh
/// `planning_batch_id` (spec §4.8).
pub async fn run<C: Clock>(
    ctx: &PhaseContext<C>,
    job_id: JobId,
    llm: &dyn RemoteLlmClient,
) -> Result<OrganizationPlannerOutcome, EngineError> {
    let planning_batch_id = job_id.as_str().to_string();
    let planning_set = select_planning_set(ctx, &job_id)?;
    if planning_set.is_empty() {
        return Ok(OrganizationPlannerOutcome::default());
    }

    let chain_names = current_version_chain_names(ctx, &job_id)?;
    let records = build_input_records(&planning_set, &chain_names);
    let directory_histogram = directory_histogram(&planning_set);
    let extension_histogram = extension_histogram(&planning_set);

    let prompt = serde_json::json!({
        "files": records,
        "directory_histogram": directory_histogram,
        "extension_histogram": extension_histogram,
    })
    .to_string();

    let request = DeliberateRequest { system_prompt: SYSTEM_PROMPT.to_string(), prompt, max_tokens: 4096 };
    let response = llm.deliberate(request).await?;
    let plan: PlanResponse = arc_llm::json_extract::extract_json(&response.text)?;

    let (naming_schemas, taxonomy, mut directories) = lower_plan_sections(&planning_batch_id, plan.naming_schemas, plan.tag_taxonomy, plan.directory_structure);
    let known_tags: HashSet<&str> = taxonomy.iter().map(|n| n.tag_name.as_str()).collect();

    let mut by_id: HashMap<DocumentItemId, DocumentItem> =
        planning_set.into_iter().map(|item| (item.id, item)).collect();

    let mut assigned_ids: HashSet<DocumentItemId> = HashSet::new();
    let mut known_paths: HashSet<String> = directories.iter().map(|d| d.path.clone()).collect();
    ensure_uncategorized_directory(&mut directories, &mut known_paths);

    for assignment in plan.file_assignments {
        let Some(doc_id) = by_id.keys().find(|id| id.as_str() == assignment.document_id).copied() else {
            continue;
        };
        let item = by_id.get_mut(&doc_id).expect("doc_id sourced from by_id keys");
        apply_assignment(item, assignment, &known_tags, &mut directories, &mut known_paths);
        assigned_ids.insert(doc_id);
    }

    let total = by_id.len();
    let unassigned = total - assigned_ids.len();
    if total > 0 && (unassigned as f64 / total as f64) > MAX_UNASSIGNED_FRACTION {
        return Err(EngineError::PlanningIncomplete {
            message: format!("{unassigned} of {total} planning-set items received no assignment"),
        });
    }

    for (doc_id, item) in by_id.iter_mut() {
        if !assigned_ids.contains(doc_id) {
            item.proposed_path = Some(UNCATEGORIZED_PATH.to_string());
            item.proposed_name = Some(item.current_name.clone());
            item.proposed_tags = vec![UNCATEGORIZED_TAG.to_string()];
            item.organization_reasoning = Some("no plan assignment returned; routed to uncategorized".into());
        }
        item.status = DocumentStatus::Organized;
    }

    let outcome = OrganizationPlannerOutcome {
        files_assigned: by_id.len() as u64,
        directories_proposed: directories.len() as u64,
        tags_proposed: taxonomy.len() as u64,
    };

    ctx.store.with_transaction(|tx| {
        for schema in &naming_schemas {
            planning::put_naming_schema(tx, schema)?;
        }
        planning::put_taxonomy(tx, &taxonomy)?;
        let mut ordered = directories;
        ordered.sort_by_key(|d| d.depth);
        for directory in &ordered {
            planning::put_directory(tx, directory)?;
        }
        for item in by_id.values() {
            document_items::upsert(tx, item)?;
        }
        Ok(())
    })?;

    Ok(outcome)
}

fn select_planning_set<C: Clock>(ctx: &PhaseContext<C>, job_id: &JobId) -> Result<Vec<DocumentItem>, EngineError> {
    let shortcut_ids = shortcut_document_ids(ctx, job_id)?;
    let superseded_ids = superseded_document_ids(ctx, job_id)?;
    let items = ctx.store.with_read_only(|tx| document_items::list_by_job(tx, job_id))?;
    Ok(items
        .into_iter()
        .filter(|item| {
            item.status == DocumentStatus::Processed
                && !item.is_deleted
                && !shortcut_ids.contains(&item.id)
                && !superseded_ids.contains(&item.id)
        })
        .collect())
}

fn shortcut_document_ids<C: Clock>(ctx: &PhaseContext<C>, job_id: &JobId) -> Result<HashSet<DocumentItemId>, EngineError> {
    let groups = ctx.store.with_read_only(|tx| duplicates::list_groups(tx, job_id))?;
    let mut ids = HashSet::new();
    for group in groups {
        let members = ctx.store.with_read_only(|tx| duplicates::list_members(tx, &group.id))?;
        ids.extend(members.into_iter().filter(|m| m.action == DuplicateAction::Shortcut).map(|m| m.document_id));
    }
    Ok(ids)
}

fn superseded_document_ids<C: Clock>(ctx: &PhaseContext<C>, job_id: &JobId) -> Result<HashSet<DocumentItemId>, EngineError> {
    let chains = ctx.store.with_read_only(|tx| versions::list_chains(tx, job_id))?;
    let mut ids = HashSet::new();
    for chain in chains {
        let members = ctx.store.with_read_only(|tx| versions::list_members(tx, &chain.id))?;
        ids.extend(members.into_iter().filter(|m| m.status == VersionMemberStatus::Superseded).map(|m| m.document_id));
    }
    Ok(ids)
}

fn current_version_chain_names<C: Clock>(
    ctx: &PhaseContext<C>,
    job_id: &JobId,
) -> Result<HashMap<DocumentItemId, String>, EngineError> {
    let chains = ctx.store.with_read_only(|tx| versions::list_chains(tx, job_id))?;
    let mut names = HashMap::new();
    for chain in chains {
        names.insert(chain.current_document_id, chain.chain_name.clone());
    }
    Ok(names)
}

fn build_input_records(
    items: &[DocumentItem],
    chain_names: &HashMap<DocumentItemId, String>,
) -> Vec<InputFileRecord> {
    items
        .iter()
        .map(|item| {
            let chain_name = chain_names.get(&item.id).cloned();
            InputFileRecord {
                id: item.id.as_str().to_string(),
                current_name: item.current_name.clone(),
                current_path: item.current_path.clone(),
                extension: item.extension.clone(),
                size: item.file_size,
                mime_type: item.mime_type.clone(),
                document_type: item.document_type.clone(),
                summary: truncate_chars(&item.content_summary, SUMMARY_PROMPT_CHARS),
                key_topics: item.key_topics.clone(),
                mtime_ms: item.source_mtime_ms,
                is_current_version: chain_name.is_some(),
                chain_name,
            }
        })
        .collect()
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn directory_of(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

fn directory_histogram(items: &[DocumentItem]) -> Vec<(String, u64)> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for item in items {
        *counts.entry(directory_of(&item.current_path)).or_insert(0) += 1;
    }
    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(MAX_DIRECTORY_HISTOGRAM_ENTRIES);
    entries
}

fn extension_histogram(items: &[DocumentItem]) -> Vec<(String, u64)> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for item in items {
        *counts.entry(item.extension.clone()).or_insert(0) += 1;
    }
    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

#[allow(clippy::type_complexity)]
fn lower_plan_sections(
    planning_batch_id: &str,
    naming_schemas: Vec<PlanNamingSchema>,
    taxonomy: Vec<PlanTaxonomyNode>,
    directories: Vec<PlanDirectoryEntry>,
) -> (Vec<NamingSchema>, Vec<TagTaxonomyNode>, Vec<DirectoryStructureEntry>) {
    let schemas = naming_schemas
        .into_iter()
        .map(|s| NamingSchema {
            planning_batch_id: planning_batch_id.to_string(),
            document_type: s.document_type,
            naming_pattern: s.naming_pattern,
            example: s.example,
            description: s.description,
            placeholder_definitions: HashMap::new(),
            schema_version: 1,
        })
        .collect();

    let taxonomy = taxonomy
        .into_iter()
        .map(|n| TagTaxonomyNode {
            planning_batch_id: planning_batch_id.to_string(),
            tag_name: n.tag_name,
            parent: n.parent,
            description: n.description,
            usage_count: 0,
        })
        .collect();

    let directories = directories
        .into_iter()
        .map(|d| {
            let depth = d.path.trim_matches('/').split('/').filter(|s| !s.is_empty()).count() as u32;
            DirectoryStructureEntry {
                planning_batch_id: planning_batch_id.to_string(),
                path: d.path,
                folder_name: d.folder_name,
                parent_path: d.parent_path,
                depth: depth.min(MAX_DIRECTORY_DEPTH),
                purpose: d.purpose,
                expected_tags: d.expected_tags,
                expected_document_types: d.expected_document_types,
            }
        })
        .collect();

    (schemas, taxonomy, directories)
}

fn ensure_uncategorized_directory(directories: &mut Vec<DirectoryStructureEntry>, known_paths: &mut HashSet<String>) {
    if known_paths.contains(UNCATEGORIZED_PATH) {
        return;
    }
    let batch_id = directories.first().map(|d| d.planning_batch_id.clone()).unwrap_or_default();
    directories.push(DirectoryStructureEntry {
        planning_batch_id: batch_id,
        path: UNCATEGORIZED_PATH.to_string(),
        folder_name: "_Uncategorized".to_string(),
        parent_path: None,
        depth: 1,
        purpose: "files the planner could not classify".to_string(),
        expected_tags: vec![UNCATEGORIZED_TAG.to_string()],
        expected_document_types: Vec::new(),
    });
    known_paths.insert(UNCATEGORIZED_PATH.to_string());
}

/// Validate and apply one assignment (spec §4.8 rules 2, 3, 5). An unknown
/// `proposed_path` is redirected to a synthetic `_Uncategorized` child
/// rather than inferring a parent; unknown tags are dropped.
fn apply_assignment(
    item: &mut DocumentItem,
    assignment: PlanAssignment,
    known_tags: &HashSet<&str>,
    directories: &mut Vec<DirectoryStructureEntry>,
    known_paths: &mut HashSet<String>,
) {
    let batch_id = directories.first().map(|d| d.planning_batch_id.clone()).unwrap_or_default();

    let proposed_path = match (assignment.proposed_name.as_deref(), assignment.proposed_path.as_deref()) {
        (None, None) => None,
        (_, Some(path)) => {
            if known_paths.contains(path) {
                Some(path.to_string())
            } else {
                let synthetic_path = format!("{UNCATEGORIZED_PATH}/{}", sanitize_segment(path));
                directories.push(DirectoryStructureEntry {
                    planning_batch_id: batch_id,
                    path: synthetic_path.clone(),
                    folder_name: sanitize_segment(path),
                    parent_path: Some(UNCATEGORIZED_PATH.to_string()),
                    depth: 2,
                    purpose: "synthetic directory for an unresolvable proposed path".to_string(),
                    expected_tags: Vec::new(),
                    expected_document_types: Vec::new(),
                });
                known_paths.insert(synthetic_path.clone());
                tracing::warn!(path, "proposed_path not in directory_structure; routed under _Uncategorized");
                Some(synthetic_path)
            }
        }
        (Some(_), None) => None,
    };

    item.proposed_name = assignment.proposed_name;
    item.proposed_path = proposed_path;
    item.proposed_tags = assignment
        .proposed_tags
        .into_iter()
        .filter(|tag| {
            let keep = known_tags.contains(tag.as_str());
            if !keep {
                tracing::warn!(tag, "proposed_tag not in tag_taxonomy, dropping");
            }
            keep
        })
        .collect();
    item.organization_reasoning = assignment.reasoning;
}

fn sanitize_segment(raw: &str) -> String {
    let trimmed = raw.trim_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let cleaned: String = last
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    if cleaned.is_empty() {
        "misc".to_string()
    } else {
        cleaned
    }
}
