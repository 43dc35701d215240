// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Indexer: walks the source tree and produces one `DocumentItem` per file
//! (spec §4.5).

use crate::error::EngineError;
use crate::phases::PhaseContext;
use crate::progress::ProgressSink;
use arc_core::config::PipelineConfig;
use arc_core::document_item::DocumentItem;
use arc_core::job::JobId;
use arc_core::Clock;
use arc_extract::{classify_mime, hash_file, read_sniff, ExtractorRegistry};
use arc_llm::local::LocalLlmClient;
use arc_llm::types::SummarizeRequest;
use arc_store::document_items;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::WalkDir;

/// Per-run outcome of the Indexer phase (spec §4.5's counters).
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexerOutcome {
    pub files_discovered: u64,
    pub files_processed: u64,
    pub files_errored: u64,
    pub cancelled: bool,
}

/// Text budget cap in characters sent to the summarizer prompt (spec §4.8
/// "truncated summary ≤ 200 chars" reused here for the prompt itself).
const SUMMARY_SYSTEM_PROMPT: &str =
    "Summarize the following document in at most two sentences. Respond as JSON: \
     {\"summary\": string, \"document_type\": string, \"key_topics\": [string]}.";

/// Walk `source_root`, fingerprint and summarize each file, and upsert a
/// `DocumentItem` per file (spec §4.5). Per-file failures are recorded on
/// the item and never abort the phase; only a missing source root or a
/// store outage fails the whole phase.
pub async fn run<C: Clock>(
    ctx: &PhaseContext<C>,
    source_root: &Path,
    job_id: JobId,
    config: &PipelineConfig,
    extractors: Arc<ExtractorRegistry>,
    llm: Arc<dyn LocalLlmClient>,
    progress: &dyn ProgressSink,
) -> Result<IndexerOutcome, EngineError> {
    if !source_root.is_dir() {
        return Err(EngineError::io(
            source_root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "source root missing"),
        ));
    }

    let paths = discover_files(source_root, config.skip_hidden_top_level_dirs);
    let total = paths.len() as u64;

    let cpu_permits = Arc::new(Semaphore::new(config.worker_pool_size.cpu.max(1)));
    let net_permits = Arc::new(Semaphore::new(config.worker_pool_size.net.max(1)));
    let processed = Arc::new(AtomicU64::new(0));
    let errored = Arc::new(AtomicU64::new(0));

    let mut join_set: JoinSet<()> = JoinSet::new();
    let mut cancelled = false;

    for (idx, path) in paths.into_iter().enumerate() {
        if idx % config.batch_size.max(1) as usize == 0 && ctx.is_cancelled() {
            cancelled = true;
            break;
        }

        let store = ctx.store.clone();
        let extractors = extractors.clone();
        let llm = llm.clone();
        let cpu_permits = cpu_permits.clone();
        let net_permits = net_permits.clone();
        let processed = processed.clone();
        let errored = errored.clone();
        let source_root = source_root.to_path_buf();
        let budget = config.text_extraction_budget_bytes;
        let skip_above = config.skip_extraction_above_bytes();
        let epoch_ms = ctx.clock.epoch_ms();

        join_set.spawn(async move {
            let outcome = index_one_file(
                &store, &extractors, llm.as_ref(), &cpu_permits, &net_permits, job_id, &source_root, &path,
                budget, skip_above, epoch_ms,
            )
            .await;
            match outcome {
                Ok(()) => {
                    processed.fetch_add(1, Ordering::Relaxed);
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "indexer: per-file failure");
                    errored.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
    }

    let interval_ms = config.progress_interval_secs.saturating_mul(1000);
    let mut last_report_ms = ctx.clock.epoch_ms();
    while join_set.join_next().await.is_some() {
        let done = processed.load(Ordering::Relaxed) + errored.load(Ordering::Relaxed);
        let now_ms = ctx.clock.epoch_ms();
        if should_report(done, config.batch_size.max(1) as u64, now_ms, last_report_ms, interval_ms) {
            progress.on_progress(done, total);
            last_report_ms = now_ms;
        }
    }
    progress.on_progress(processed.load(Ordering::Relaxed) + errored.load(Ordering::Relaxed), total);

    Ok(IndexerOutcome {
        files_discovered: total,
        files_processed: processed.load(Ordering::Relaxed),
        files_errored: errored.load(Ordering::Relaxed),
        cancelled,
    })
}

/// A report is due when `done` lands on a `batch_size` boundary, or when
/// `progress_interval_secs` have elapsed since the last one, whichever
/// comes first (spec §4.5 "at least every P items or every T seconds").
fn should_report(done: u64, batch_size: u64, now_ms: u64, last_report_ms: u64, interval_ms: u64) -> bool {
    let due_by_count = done % batch_size == 0;
    let due_by_time = interval_ms > 0 && now_ms.saturating_sub(last_report_ms) >= interval_ms;
    due_by_count || due_by_time
}

fn discover_files(source_root: &Path, skip_hidden_top_level: bool) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(source_root).into_iter().filter_entry(|e| {
        if !skip_hidden_top_level {
            return true;
        }
        let is_top_level_hidden = e.depth() == 1
            && e.file_type().is_dir()
            && e.file_name().to_str().map(|n| n.starts_with('.')).unwrap_or(false);
        !is_top_level_hidden
    }) {
        let Ok(entry) = entry else { continue };
        if entry.file_type().is_file() {
            paths.push(entry.path().to_path_buf());
        }
    }
    paths.sort();
    paths
}

#[allow(clippy::too_many_arguments)]
async fn index_one_file(
    store: &arc_store::Store,
    extractors: &ExtractorRegistry,
    llm: &dyn LocalLlmClient,
    cpu_permits: &Semaphore,
    net_permits: &Semaphore,
    job_id: JobId,
    source_root: &Path,
    path: &Path,
    budget_bytes: u64,
    skip_extraction_above_bytes: u64,
    epoch_ms: u64,
) -> Result<(), EngineError> {
    let relative_path = path
        .strip_prefix(source_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/");
    let file_id = arc_extract::hash_bytes(relative_path.as_bytes());
    let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let extension =
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).unwrap_or_default();

    let permit = cpu_permits.acquire().await.map_err(|_| EngineError::Cancelled)?;
    let metadata = std::fs::metadata(path).map_err(|e| EngineError::io(path, e))?;
    let file_size = metadata.len();
    let source_mtime_ms = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let mut item = DocumentItem::new_discovered(
        job_id,
        file_id.clone(),
        file_name,
        relative_path.clone(),
        extension,
        file_size,
        String::new(),
        source_mtime_ms,
    );

    let hash_result = hash_file(path);
    let sniff = read_sniff(path, 512).unwrap_or_default();
    item.mime_type = classify_mime(path, &sniff);

    match hash_result {
        Ok(hash) => item.content_hash = Some(hash),
        Err(error) => {
            item.mark_error(error.to_string());
            drop(permit);
            store.with_transaction(|tx| document_items::upsert(tx, &item))?;
            return Ok(());
        }
    }

    let extracted = if file_size <= skip_extraction_above_bytes {
        extractors.extract(path, budget_bytes).unwrap_or_else(|error| {
            tracing::debug!(path = %path.display(), %error, "text extraction skipped");
            arc_extract::ExtractedText::empty()
        })
    } else {
        arc_extract::ExtractedText::empty()
    };
    drop(permit);

    if !extracted.text.is_empty() {
        let _net_permit = net_permits.acquire().await.map_err(|_| EngineError::Cancelled)?;
        let request = SummarizeRequest {
            system_prompt: SUMMARY_SYSTEM_PROMPT.to_string(),
            content: extracted.text,
            max_tokens: 512,
        };
        match llm.summarize(request).await {
            Ok(response) => {
                item.content_summary = response.summary;
                item.document_type = response.document_type;
                item.key_topics = response.key_topics;
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "summarization failed, indexing without summary");
            }
        }
    }

    item.status = arc_core::document_item::DocumentStatus::Processed;
    let _ = epoch_ms;
    store.with_transaction(|tx| document_items::upsert(tx, &item))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::PhaseContext;
    use arc_core::job::{Job, JobId};
    use arc_core::FakeClock;
    use arc_llm::local::MockLocalLlmClient;
    use arc_llm::types::SummarizeResponse;
    use arc_store::jobs;
    use arc_store::Store;

    fn make_source_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.txt"), "quarterly results are strong").unwrap();
        std::fs::write(dir.path().join("image.bin"), [0u8, 1, 2, 3]).unwrap();
        let hidden = dir.path().join(".git");
        std::fs::create_dir(&hidden).unwrap();
        std::fs::write(hidden.join("HEAD"), "ref: refs/heads/main").unwrap();
        dir
    }

    #[tokio::test]
    async fn indexes_visible_files_and_skips_hidden_top_level_dir() {
        let dir = make_source_tree();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let job = Job::new(dir.path().to_path_buf(), dir.path().to_path_buf(), false, 0);
        let job_id: JobId = job.id;
        store.with_transaction(|tx| jobs::upsert(tx, &job)).unwrap();

        let ctx = PhaseContext::new(store.clone(), arc_core::SystemClock, tokio_util::sync::CancellationToken::new());
        let extractors = Arc::new(ExtractorRegistry::with_defaults());
        let llm: Arc<dyn LocalLlmClient> = Arc::new(MockLocalLlmClient::new(vec![SummarizeResponse {
            summary: "quarterly results".into(),
            document_type: "report".into(),
            key_topics: vec!["finance".into()],
        }]));
        let mut config = PipelineConfig::default();
        config.worker_pool_size.cpu = 2;
        config.worker_pool_size.net = 2;

        let outcome =
            run(&ctx, dir.path(), job_id, &config, extractors, llm, &crate::progress::NoopProgressSink).await.unwrap();

        assert_eq!(outcome.files_discovered, 2);
        assert_eq!(outcome.files_processed, 2);
        assert_eq!(outcome.files_errored, 0);

        let items = store.with_read_only(|tx| document_items::list_by_job(tx, &job_id)).unwrap();
        assert_eq!(items.len(), 2);
        let report = items.iter().find(|i| i.current_name == "report.txt").unwrap();
        assert_eq!(report.content_summary, "quarterly results");
        assert!(report.content_hash.is_some());
    }

    #[tokio::test]
    async fn rerunning_indexer_does_not_duplicate_items() {
        let dir = make_source_tree();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let job = Job::new(dir.path().to_path_buf(), dir.path().to_path_buf(), false, 0);
        let job_id: JobId = job.id;
        store.with_transaction(|tx| jobs::upsert(tx, &job)).unwrap();
        let ctx = PhaseContext::new(store.clone(), arc_core::SystemClock, tokio_util::sync::CancellationToken::new());
        let extractors = Arc::new(ExtractorRegistry::with_defaults());
        let config = PipelineConfig::default();

        for _ in 0..2 {
            let llm: Arc<dyn LocalLlmClient> = Arc::new(MockLocalLlmClient::new(vec![SummarizeResponse {
                summary: "quarterly results".into(),
                document_type: "report".into(),
                key_topics: vec![],
            }]));
            run(&ctx, dir.path(), job_id, &config, extractors.clone(), llm, &crate::progress::NoopProgressSink)
                .await
                .unwrap();
        }

        let items = store.with_read_only(|tx| document_items::list_by_job(tx, &job_id)).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn should_report_fires_on_batch_boundary_even_with_no_elapsed_time() {
        assert!(should_report(50, 50, 1_000, 1_000, 5_000));
        assert!(!should_report(51, 50, 1_000, 1_000, 5_000));
    }

    #[test]
    fn should_report_fires_once_the_interval_elapses_regardless_of_batch_position() {
        assert!(!should_report(51, 50, 4_999, 0, 5_000));
        assert!(should_report(51, 50, 5_000, 0, 5_000));
    }

    #[test]
    fn should_report_never_fires_on_time_when_interval_is_zero() {
        assert!(!should_report(51, 50, 1_000_000, 0, 0));
    }
}
