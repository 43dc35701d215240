// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version Resolver: detects version chains via explicit markers and name
//! similarity, confirms ambiguous groups with the local LLM, and orders
//! members oldest-to-newest (spec §4.7).

use crate::error::EngineError;
use crate::phases::PhaseContext;
use arc_core::config::{PipelineConfig, VersionArchiveStrategy};
use arc_core::document_item::DocumentItem;
use arc_core::duplicate::DuplicateAction;
use arc_core::job::JobId;
use arc_core::version::{
    DetectionMethod, VersionChain, VersionChainId, VersionChainMember, VersionMemberStatus,
};
use arc_core::Clock;
use arc_llm::types::DeliberateRequest;
use arc_llm::LocalLlmClient;
use arc_store::document_items;
use arc_store::duplicates;
use arc_store::versions;
use serde::Deserialize;
use std::collections::HashMap;

const SYSTEM_PROMPT: &str = "You are confirming whether a set of files are successive versions of the \
    same document. Respond as JSON: {\"confirmed\": boolean, \"current_index\": integer, \
    \"ordering\": [integer, ...]} where ordering lists every member index oldest-to-newest.";

#[derive(Debug, Deserialize)]
struct VersionVerdict {
    confirmed: bool,
    current_index: usize,
    ordering: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MarkerKind {
    Numeric(u32),
    Date(String),
    Status(u8),
}

struct ExplicitMarker {
    base_name: String,
    kind: MarkerKind,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VersionResolverOutcome {
    pub chains_created: u64,
    pub chains_confirmed_by_llm: u64,
    pub candidates_discarded: u64,
}

/// Detect and persist version chains for `job_id` (spec §4.7).
pub async fn run<C: Clock>(
    ctx: &PhaseContext<C>,
    job_id: JobId,
    config: &PipelineConfig,
    llm: &dyn LocalLlmClient,
) -> Result<VersionResolverOutcome, EngineError> {
    let items = ctx.store.with_read_only(|tx| document_items::list_by_job(tx, &job_id))?;
    let already_shortcut = shortcut_document_ids(ctx, &job_id)?;
    let eligible: Vec<DocumentItem> = items.into_iter().filter(|i| !already_shortcut.contains(&i.id)).collect();

    let mut outcome = VersionResolverOutcome::default();
    let mut consumed = std::collections::HashSet::new();

    for group in explicit_marker_groups(&eligible) {
        if ctx.is_cancelled() {
            break;
        }
        if group.len() < 2 {
            continue;
        }
        persist_candidate(ctx, job_id, group, DetectionMethod::ExplicitMarker, config, llm, &mut consumed, &mut outcome)
            .await?;
    }

    for group in similarity_groups(&eligible, &consumed, config.similarity_threshold) {
        if ctx.is_cancelled() {
            break;
        }
        persist_candidate(ctx, job_id, group, DetectionMethod::NameSimilarity, config, llm, &mut consumed, &mut outcome)
            .await?;
    }

    Ok(outcome)
}

fn shortcut_document_ids(
    ctx: &PhaseContext<impl Clock>,
    job_id: &JobId,
) -> Result<std::collections::HashSet<arc_core::document_item::DocumentItemId>, EngineError> {
    let groups = ctx.store.with_read_only(|tx| duplicates::list_groups(tx, job_id))?;
    let mut ids = std::collections::HashSet::new();
    for group in groups {
        let members = ctx.store.with_read_only(|tx| duplicates::list_members(tx, &group.id))?;
        for member in members {
            if member.action == DuplicateAction::Shortcut && !member.is_primary {
                ids.insert(member.document_id);
            }
        }
    }
    Ok(ids)
}

fn directory_of(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

fn status_rank(word: &str) -> Option<u8> {
    match word.to_ascii_lowercase().as_str() {
        "draft" => Some(0),
        "wip" => Some(1),
        "review" => Some(2),
        "approved" => Some(3),
        "final" => Some(4),
        _ => None,
    }
}

/// Extract an explicit version marker from a file stem, trying each pattern
/// in the fixed order spec §4.7 defines.
fn extract_explicit_marker(stem: &str) -> Option<ExplicitMarker> {
    if let Some(captured) = match_suffix(stem, &["_v", "_rev", "_version"]) {
        let (prefix, digits) = captured;
        if let Ok(n) = digits.parse::<u32>() {
            return Some(ExplicitMarker { base_name: prefix.to_string(), kind: MarkerKind::Numeric(n) });
        }
    }
    if let Some(base) = stem.strip_suffix(')') {
        if let Some(open) = base.rfind(" (") {
            let digits = &base[open + 2..];
            if let Ok(n) = digits.parse::<u32>() {
                return Some(ExplicitMarker { base_name: base[..open].to_string(), kind: MarkerKind::Numeric(n) });
            }
        }
    }
    for tail_len in [11usize, 9usize] {
        if stem.len() <= tail_len {
            continue;
        }
        let tail = &stem[stem.len() - tail_len..];
        if let Some(date) = parse_date_marker(tail) {
            let prefix = stem[..stem.len() - tail_len].trim_end_matches('_');
            return Some(ExplicitMarker { base_name: prefix.to_string(), kind: MarkerKind::Date(date) });
        }
    }
    for word in ["_draft", "_wip", "_review", "_approved", "_final"] {
        if let Some(prefix) = stem.strip_suffix(word) {
            if let Some(rank) = status_rank(&word[1..]) {
                return Some(ExplicitMarker { base_name: prefix.to_string(), kind: MarkerKind::Status(rank) });
            }
        }
    }
    None
}

fn match_suffix<'a>(stem: &'a str, markers: &[&str]) -> Option<(&'a str, &'a str)> {
    for marker in markers {
        if let Some(pos) = stem.rfind(marker) {
            let prefix = &stem[..pos];
            let digits = &stem[pos + marker.len()..];
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return Some((prefix, digits));
            }
        }
    }
    None
}

/// Accepts `_YYYY-MM-DD` (11 chars incl. underscore) or `_YYYYMMDD` (9 chars).
fn parse_date_marker(tail: &str) -> Option<String> {
    let digits_only: String = tail.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits_only.len() == 8 && (tail.len() == 9 || tail.len() == 11) {
        Some(digits_only)
    } else {
        None
    }
}

fn explicit_marker_groups(items: &[DocumentItem]) -> Vec<Vec<(DocumentItem, ExplicitMarker)>> {
    let mut buckets: HashMap<(String, String, String), Vec<(DocumentItem, ExplicitMarker)>> = HashMap::new();
    for item in items {
        let stem = item.current_name.rsplit_once('.').map(|(s, _)| s).unwrap_or(&item.current_name);
        if let Some(marker) = extract_explicit_marker(stem) {
            let key = (marker.base_name.clone(), directory_of(&item.current_path).to_string(), item.extension.clone());
            buckets.entry(key).or_default().push((item.clone(), marker));
        }
    }
    buckets.into_values().filter(|g| g.len() >= 2).collect()
}

fn similarity_groups(
    items: &[DocumentItem],
    consumed: &std::collections::HashSet<arc_core::document_item::DocumentItemId>,
    threshold: f64,
) -> Vec<Vec<(DocumentItem, ExplicitMarker)>> {
    let remaining: Vec<&DocumentItem> = items.iter().filter(|i| !consumed.contains(&i.id)).collect();
    let mut buckets: HashMap<(String, String), Vec<&DocumentItem>> = HashMap::new();
    for item in &remaining {
        buckets.entry((directory_of(&item.current_path).to_string(), item.extension.clone())).or_default().push(item);
    }

    let mut groups = Vec::new();
    for bucket in buckets.into_values() {
        if bucket.len() < 2 {
            continue;
        }
        let mut parent: Vec<usize> = (0..bucket.len()).collect();
        fn find(parent: &mut [usize], i: usize) -> usize {
            if parent[i] != i {
                parent[i] = find(parent, parent[i]);
            }
            parent[i]
        }
        for i in 0..bucket.len() {
            for j in (i + 1)..bucket.len() {
                let same_hash = bucket[i].content_hash.is_some() && bucket[i].content_hash == bucket[j].content_hash;
                if same_hash {
                    continue;
                }
                let similarity = strsim::normalized_levenshtein(&bucket[i].current_name, &bucket[j].current_name);
                if similarity >= threshold {
                    let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                    if ri != rj {
                        parent[ri] = rj;
                    }
                }
            }
        }
        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..bucket.len() {
            let root = find(&mut parent, i);
            components.entry(root).or_default().push(i);
        }
        for (_, indices) in components {
            if indices.len() < 2 {
                continue;
            }
            let members: Vec<(DocumentItem, ExplicitMarker)> = indices
                .into_iter()
                .map(|i| {
                    let item = bucket[i].clone();
                    (item, ExplicitMarker { base_name: String::new(), kind: MarkerKind::Numeric(0) })
                })
                .collect();
            groups.push(members);
        }
    }
    groups
}

/// Fallback ordering when the LLM isn't consulted: numeric asc, then date
/// asc, then status rank, then source_mtime asc (spec §4.7).
fn fallback_order(group: &[(DocumentItem, ExplicitMarker)]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..group.len()).collect();
    indices.sort_by(|&a, &b| {
        let (item_a, marker_a) = &group[a];
        let (item_b, marker_b) = &group[b];
        rank_key(marker_a, item_a).cmp(&rank_key(marker_b, item_b))
    });
    indices
}

fn rank_key(marker: &ExplicitMarker, item: &DocumentItem) -> (u8, u32, String, u8, u64) {
    match &marker.kind {
        MarkerKind::Numeric(n) => (0, *n, String::new(), 0, item.source_mtime_ms),
        MarkerKind::Date(ref d) => (1, 0, d.clone(), 0, item.source_mtime_ms),
        MarkerKind::Status(rank) => (2, 0, String::new(), *rank, item.source_mtime_ms),
    }
}

#[allow(clippy::too_many_arguments)]
async fn persist_candidate<C: Clock>(
    ctx: &PhaseContext<C>,
    job_id: JobId,
    group: Vec<(DocumentItem, ExplicitMarker)>,
    method: DetectionMethod,
    config: &PipelineConfig,
    llm: &dyn LocalLlmClient,
    consumed: &mut std::collections::HashSet<arc_core::document_item::DocumentItemId>,
    outcome: &mut VersionResolverOutcome,
) -> Result<(), EngineError> {
    let needs_confirmation = method == DetectionMethod::NameSimilarity || markers_disagree(&group);

    let (confirmed, order, confidence, reasoning) = if needs_confirmation {
        match confirm_with_llm(&group, llm).await {
            Ok((confirmed, order, reasoning)) => {
                outcome.chains_confirmed_by_llm += 1;
                (confirmed, order, 0.9, reasoning)
            }
            Err(error) => {
                tracing::warn!(%error, "version confirmation failed, discarding candidate");
                (false, fallback_order(&group), 0.0, None)
            }
        }
    } else {
        (true, fallback_order(&group), 0.75, None)
    };

    if !confirmed {
        outcome.candidates_discarded += 1;
        return Ok(());
    }

    for (item, _) in &group {
        consumed.insert(item.id);
    }

    let chain_id = VersionChainId::new();
    let chain = build_chain(chain_id, job_id, &group, &order, method, confidence, reasoning, config);
    let members = build_members(chain_id, &group, &order, config);
    ctx.store.with_transaction(|tx| versions::put_chain(tx, &chain, &members))?;
    outcome.chains_created += 1;
    Ok(())
}

fn markers_disagree(group: &[(DocumentItem, ExplicitMarker)]) -> bool {
    let kinds: std::collections::HashSet<_> = group.iter().map(|(_, m)| std::mem::discriminant(&m.kind)).collect();
    kinds.len() > 1
}

async fn confirm_with_llm(
    group: &[(DocumentItem, ExplicitMarker)],
    llm: &dyn LocalLlmClient,
) -> Result<(bool, Vec<usize>, Option<String>), arc_llm::LlmError> {
    let listing: Vec<String> = group
        .iter()
        .enumerate()
        .map(|(i, (item, _))| {
            format!(
                "{i}. name={} size={} mtime={} summary={}",
                item.current_name, item.file_size, item.source_mtime_ms, item.content_summary
            )
        })
        .collect();
    let request = DeliberateRequest {
        system_prompt: SYSTEM_PROMPT.to_string(),
        prompt: format!("Candidate version members:\n{}", listing.join("\n")),
        max_tokens: 512,
    };
    let response = llm.arbitrate(request).await?;
    let verdict: VersionVerdict = arc_llm::json_extract::extract_json(&response.text)?;
    if verdict.ordering.len() != group.len() || verdict.current_index >= group.len() {
        return Err(arc_llm::LlmError::Malformed("verdict ordering does not cover every member".into()));
    }
    Ok((verdict.confirmed, verdict.ordering, Some("confirmed by local LLM".to_string())))
}

fn build_chain(
    chain_id: VersionChainId,
    job_id: JobId,
    group: &[(DocumentItem, ExplicitMarker)],
    order: &[usize],
    method: DetectionMethod,
    confidence: f64,
    reasoning: Option<String>,
    config: &PipelineConfig,
) -> VersionChain {
    let current_index = *order.last().unwrap();
    let (current_item, _) = &group[current_index];
    let chain_name = base_chain_name(&current_item.current_name);
    let base_path = directory_of(&current_item.current_path).to_string();
    let archive_path = match config.version_archive_strategy {
        VersionArchiveStrategy::Subfolder => Some(format!("{base_path}/{}/{chain_name}", config.version_folder_name)),
        VersionArchiveStrategy::Inline => None,
        VersionArchiveStrategy::SeparateArchive => Some(format!("/Archive/Versions/{chain_name}")),
    };
    VersionChain {
        id: chain_id,
        job_id,
        chain_name,
        base_path,
        current_document_id: current_item.id,
        current_version_number: (order.len()) as u32,
        detection_method: method,
        detection_confidence: confidence,
        llm_reasoning: reasoning,
        version_order_confirmed: method == DetectionMethod::NameSimilarity || confidence >= 0.9,
        archive_strategy: config.version_archive_strategy,
        archive_path,
    }
}

fn base_chain_name(current_name: &str) -> String {
    current_name.rsplit_once('.').map(|(s, _)| s.to_string()).unwrap_or_else(|| current_name.to_string())
}

fn build_members(
    chain_id: VersionChainId,
    group: &[(DocumentItem, ExplicitMarker)],
    order: &[usize],
    config: &PipelineConfig,
) -> Vec<VersionChainMember> {
    let current_position = order.len() - 1;
    order
        .iter()
        .enumerate()
        .map(|(position, &index)| {
            let (item, marker) = &group[index];
            let is_current = position == current_position;
            let version_number = (position + 1) as u32;
            let (name, path) = proposed_version_location(item, version_number, is_current, config);
            VersionChainMember {
                chain_id,
                document_id: item.id,
                version_number,
                version_label: marker_label(marker),
                version_date: marker_date(marker),
                is_current,
                status: if is_current { VersionMemberStatus::Active } else { VersionMemberStatus::Superseded },
                proposed_version_name: Some(name),
                proposed_version_path: Some(path),
            }
        })
        .collect()
}

fn marker_label(marker: &ExplicitMarker) -> Option<String> {
    match &marker.kind {
        MarkerKind::Numeric(n) => Some(format!("v{n}")),
        MarkerKind::Status(rank) => {
            ["draft", "wip", "review", "approved", "final"].get(*rank as usize).map(|s| s.to_string())
        }
        MarkerKind::Date(_) => None,
    }
}

fn marker_date(marker: &ExplicitMarker) -> Option<String> {
    match &marker.kind {
        MarkerKind::Date(d) => Some(d.clone()),
        _ => None,
    }
}

fn proposed_version_location(
    item: &DocumentItem,
    version_number: u32,
    is_current: bool,
    config: &PipelineConfig,
) -> (String, String) {
    let base_path = directory_of(&item.current_path);
    let base_name = base_chain_name(&item.current_name);
    let ext = &item.extension;
    if is_current {
        return (item.current_name.clone(), format!("{base_path}/{base_name}.{ext}"));
    }
    match config.version_archive_strategy {
        VersionArchiveStrategy::Subfolder => {
            let name = format!("{base_name}_v{version_number}.{ext}");
            (name.clone(), format!("{base_path}/{}/{base_name}/{name}", config.version_folder_name))
        }
        VersionArchiveStrategy::Inline => {
            let name = format!("{base_name}_v{version_number}.{ext}");
            (name.clone(), format!("{base_path}/{name}"))
        }
        VersionArchiveStrategy::SeparateArchive => {
            let name = format!("{base_name}_v{version_number}.{ext}");
            (name.clone(), format!("/Archive/Versions/{base_name}/{name}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_core::job::Job;
    use arc_llm::types::SummarizeResponse;
    use arc_llm::MockLocalLlmClient;
    use arc_store::jobs;
    use arc_store::Store;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn seeded_job(store: &Store) -> JobId {
        let job = Job::new(PathBuf::from("/in"), PathBuf::from("/out"), false, 0);
        let id = job.id;
        store.with_transaction(|tx| jobs::upsert(tx, &job)).unwrap();
        id
    }

    fn make_item(job_id: JobId, path: &str, mtime: u64, hash: &str) -> DocumentItem {
        let mut item = DocumentItem::new_discovered(
            job_id,
            path.to_string(),
            path.rsplit('/').next().unwrap().to_string(),
            path.to_string(),
            "pdf".into(),
            10,
            "application/pdf".into(),
            mtime,
        );
        item.content_hash = Some(hash.to_string());
        item
    }

    #[tokio::test]
    async fn explicit_numeric_markers_form_a_chain_without_llm() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let job_id = seeded_job(&store);
        let a = make_item(job_id, "Docs/budget_v1.pdf", 100, "hash-a");
        let b = make_item(job_id, "Docs/budget_v2.pdf", 200, "hash-b");
        store.with_transaction(|tx| document_items::upsert(tx, &a)).unwrap();
        store.with_transaction(|tx| document_items::upsert(tx, &b)).unwrap();

        let ctx = PhaseContext::new(store.clone(), arc_core::SystemClock, tokio_util::sync::CancellationToken::new());
        let config = PipelineConfig::default();
        let llm = MockLocalLlmClient::new(vec![]);
        let outcome = run(&ctx, job_id, &config, &llm).await.unwrap();

        assert_eq!(outcome.chains_created, 1);
        assert_eq!(outcome.chains_confirmed_by_llm, 0);
        let chains = store.with_read_only(|tx| versions::list_chains(tx, &job_id)).unwrap();
        assert_eq!(chains.len(), 1);
        let members = store.with_read_only(|tx| versions::list_members(tx, &chains[0].id)).unwrap();
        let current = members.iter().find(|m| m.is_current).unwrap();
        assert_eq!(current.document_id, b.id);
    }

    #[tokio::test]
    async fn name_similarity_group_requires_llm_confirmation() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let job_id = seeded_job(&store);
        let a = make_item(job_id, "Docs/quarterly_report.pdf", 100, "hash-a");
        let b = make_item(job_id, "Docs/quarterly_report_final.pdf", 200, "hash-b");
        store.with_transaction(|tx| document_items::upsert(tx, &a)).unwrap();
        store.with_transaction(|tx| document_items::upsert(tx, &b)).unwrap();

        let ctx = PhaseContext::new(store.clone(), arc_core::SystemClock, tokio_util::sync::CancellationToken::new());
        let config = PipelineConfig::default();
        let llm = MockLocalLlmClient::with_arbitrations(
            vec![SummarizeResponse { summary: String::new(), document_type: String::new(), key_topics: vec![] }],
            vec!["{\"confirmed\": true, \"current_index\": 1, \"ordering\": [0, 1]}".to_string()],
        );
        let outcome = run(&ctx, job_id, &config, &llm).await.unwrap();

        assert_eq!(outcome.chains_created, 1);
        assert_eq!(outcome.chains_confirmed_by_llm, 1);
    }

    #[tokio::test]
    async fn unconfirmed_candidate_is_discarded() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let job_id = seeded_job(&store);
        let a = make_item(job_id, "Docs/alpha.pdf", 100, "hash-a");
        let b = make_item(job_id, "Docs/omega.pdf", 200, "hash-b");
        store.with_transaction(|tx| document_items::upsert(tx, &a)).unwrap();
        store.with_transaction(|tx| document_items::upsert(tx, &b)).unwrap();

        let ctx = PhaseContext::new(store.clone(), arc_core::SystemClock, tokio_util::sync::CancellationToken::new());
        let mut config = PipelineConfig::default();
        config.similarity_threshold = 0.0;
        let llm = MockLocalLlmClient::with_arbitrations(
            vec![],
            vec!["{\"confirmed\": false, \"current_index\": 0, \"ordering\": [0, 1]}".to_string()],
        );
        let outcome = run(&ctx, job_id, &config, &llm).await.unwrap();

        assert_eq!(outcome.candidates_discarded, 1);
        assert_eq!(outcome.chains_created, 0);
    }

    #[test]
    fn fallback_order_sorts_numeric_ascending() {
        let job_id = JobId::new();
        let group = vec![
            (make_item(job_id, "a_v3.pdf", 10, "h1"), ExplicitMarker { base_name: "a".into(), kind: MarkerKind::Numeric(3) }),
            (make_item(job_id, "a_v1.pdf", 20, "h2"), ExplicitMarker { base_name: "a".into(), kind: MarkerKind::Numeric(1) }),
            (make_item(job_id, "a_v2.pdf", 30, "h3"), ExplicitMarker { base_name: "a".into(), kind: MarkerKind::Numeric(2) }),
        ];
        let order = fallback_order(&group);
        assert_eq!(order, vec![1, 2, 0]);
    }
}
