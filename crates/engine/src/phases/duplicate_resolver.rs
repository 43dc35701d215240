// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duplicate Resolver: groups `DocumentItem`s by content hash and elects a
//! primary per group (spec §4.6).

use crate::error::EngineError;
use crate::phases::PhaseContext;
use arc_core::document_item::DocumentItem;
use arc_core::duplicate::{DecidedBy, DuplicateAction, DuplicateGroup, DuplicateGroupId, DuplicateMember};
use arc_core::job::JobId;
use arc_core::Clock;
use arc_llm::json_extract::extract_json;
use arc_llm::types::DeliberateRequest;
use arc_llm::{LlmError, LocalLlmClient};
use arc_store::document_items;
use arc_store::duplicates;
use serde::Deserialize;

/// Whole-segment markers that, in a path component, push a group into LLM
/// arbitration (spec §4.6).
const BACKUP_MARKERS: &[&str] = &["backup", "old", "archive"];

const SYSTEM_PROMPT: &str = "You are arbitrating a group of duplicate files. Respond as JSON: \
     {\"primary_index\": integer, \"actions\": [\"shortcut\"|\"keep_both\"|\"delete\", ...]} \
     where actions has one entry per member in the order given, and the primary's own entry is ignored.";

#[derive(Debug, Deserialize)]
struct DuplicateVerdict {
    primary_index: usize,
    actions: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DuplicateResolverOutcome {
    pub groups_resolved: u64,
    pub groups_arbitrated_by_llm: u64,
    pub groups_fell_back_to_default: u64,
}

/// Resolve every duplicate-content group for `job_id` (spec §4.6). Each
/// group is persisted independently; a failure arbitrating one group falls
/// back to the default rule for that group and does not affect others.
pub async fn run<C: Clock>(
    ctx: &PhaseContext<C>,
    job_id: JobId,
    allow_deletes: bool,
    llm: &dyn LocalLlmClient,
) -> Result<DuplicateResolverOutcome, EngineError> {
    let groups = ctx.store.with_read_only(|tx| document_items::group_by_content_hash(tx, &job_id))?;
    let mut outcome = DuplicateResolverOutcome::default();

    for (content_hash, member_ids) in groups {
        if ctx.is_cancelled() {
            break;
        }
        let members: Vec<DocumentItem> = member_ids
            .iter()
            .filter_map(|id| ctx.store.with_read_only(|tx| document_items::get(tx, id)).ok().flatten())
            .collect();
        if members.len() < 2 {
            continue;
        }

        let needs_llm = needs_llm_arbitration(&members);
        let (group, decided_members) = if needs_llm {
            match resolve_with_llm(job_id, &content_hash, &members, allow_deletes, llm).await {
                Ok(result) => {
                    outcome.groups_arbitrated_by_llm += 1;
                    result
                }
                Err(error) => {
                    tracing::warn!(%content_hash, %error, "llm arbitration failed, falling back to default rule");
                    outcome.groups_fell_back_to_default += 1;
                    resolve_with_default_rule(job_id, &content_hash, &members)
                }
            }
        } else {
            resolve_with_default_rule(job_id, &content_hash, &members)
        };

        ctx.store.with_transaction(|tx| duplicates::put_group(tx, &group, &decided_members))?;
        outcome.groups_resolved += 1;
    }

    Ok(outcome)
}

fn needs_llm_arbitration(members: &[DocumentItem]) -> bool {
    if members.len() >= 3 {
        return true;
    }
    let top_levels: std::collections::HashSet<&str> =
        members.iter().filter_map(|m| m.current_path.split('/').next()).collect();
    if top_levels.len() >= 2 {
        return true;
    }
    members.iter().any(|m| path_has_backup_marker(&m.current_path))
}

fn path_has_backup_marker(path: &str) -> bool {
    path.split('/').any(|segment| {
        let lower = segment.to_ascii_lowercase();
        BACKUP_MARKERS.contains(&lower.as_str())
    })
}

fn resolve_with_default_rule(
    job_id: JobId,
    content_hash: &str,
    members: &[DocumentItem],
) -> (DuplicateGroup, Vec<DuplicateMember>) {
    let primary_index = elect_primary_by_default_rule(members);
    build_group(job_id, content_hash, members, primary_index, DecidedBy::Auto, None, |_| DuplicateAction::Shortcut)
}

/// Shortest path wins; ties by earliest mtime, then lexicographic path (spec §4.6).
fn elect_primary_by_default_rule(members: &[DocumentItem]) -> usize {
    let mut best = 0;
    for (i, candidate) in members.iter().enumerate().skip(1) {
        let current = &members[best];
        let shorter = candidate.current_path.len() < current.current_path.len();
        let tie_len = candidate.current_path.len() == current.current_path.len();
        let earlier_mtime = candidate.source_mtime_ms < current.source_mtime_ms;
        let tie_mtime = candidate.source_mtime_ms == current.source_mtime_ms;
        let lexicographically_smaller = candidate.current_path < current.current_path;
        if shorter || (tie_len && earlier_mtime) || (tie_len && tie_mtime && lexicographically_smaller) {
            best = i;
        }
    }
    best
}

async fn resolve_with_llm(
    job_id: JobId,
    content_hash: &str,
    members: &[DocumentItem],
    allow_deletes: bool,
    llm: &dyn LocalLlmClient,
) -> Result<(DuplicateGroup, Vec<DuplicateMember>), LlmError> {
    let listing: Vec<String> = members
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{i}. path={} mtime={} summary={}", m.current_path, m.source_mtime_ms, m.content_summary))
        .collect();
    let request = DeliberateRequest {
        system_prompt: SYSTEM_PROMPT.to_string(),
        prompt: format!("Duplicate members:\n{}", listing.join("\n")),
        max_tokens: 512,
    };
    let response = llm.arbitrate(request).await?;
    let verdict: DuplicateVerdict = extract_json(&response.text)?;

    if verdict.primary_index >= members.len() || verdict.actions.len() != members.len() {
        return Err(LlmError::Malformed("verdict indices out of range for member count".into()));
    }

    let (group, decided) = build_group(
        job_id,
        content_hash,
        members,
        verdict.primary_index,
        DecidedBy::Llm,
        Some("arbitrated by local LLM".to_string()),
        |i| parse_action(&verdict.actions[i], allow_deletes),
    );
    Ok((group, decided))
}

fn parse_action(s: &str, allow_deletes: bool) -> DuplicateAction {
    match s {
        "keep_both" => DuplicateAction::KeepBoth,
        "delete" if allow_deletes => DuplicateAction::Delete,
        "delete" => DuplicateAction::Shortcut,
        _ => DuplicateAction::Shortcut,
    }
}

fn build_group(
    job_id: JobId,
    content_hash: &str,
    members: &[DocumentItem],
    primary_index: usize,
    decided_by: DecidedBy,
    decision_reasoning: Option<String>,
    mut action_for: impl FnMut(usize) -> DuplicateAction,
) -> (DuplicateGroup, Vec<DuplicateMember>) {
    let group_id = DuplicateGroupId::new();
    let total_size = members.iter().map(|m| m.file_size).sum();
    let primary_document_id = members[primary_index].id;

    let decided_members: Vec<DuplicateMember> = members
        .iter()
        .enumerate()
        .map(|(i, m)| {
            if i == primary_index {
                DuplicateMember::primary(group_id, m.id)
            } else {
                let action = action_for(i);
                DuplicateMember {
                    group_id,
                    document_id: m.id,
                    is_primary: false,
                    action,
                    action_reasoning: None,
                    shortcut_target_path: if action == DuplicateAction::Shortcut {
                        Some(members[primary_index].current_path.clone())
                    } else {
                        None
                    },
                }
            }
        })
        .collect();

    let group = DuplicateGroup {
        id: group_id,
        job_id,
        content_hash: content_hash.to_string(),
        file_count: members.len() as u32,
        total_size,
        primary_document_id,
        decision_reasoning,
        decided_by,
    };
    (group, decided_members)
}
