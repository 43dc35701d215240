// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `arcd`: the long-running process that owns the store, drives the job
//! controller, and serves `arc-wire` requests over a Unix domain socket
//! (spec §6, §3.8).

mod env;
mod error;
mod listener;
mod report;

use std::sync::Arc;

use arc_adapters::{ConfigStore, FileConfigStore};
use arc_core::SystemClock;
use arc_engine::{ControllerDeps, JobController};
use arc_extract::ExtractorRegistry;
use arc_llm::{HttpLocalLlmClient, HttpRemoteLlmClient};
use arc_store::Store;
use error::DaemonError;
use listener::{ListenCtx, Listener};
use tokio::net::UnixListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "arcd exited with an error");
        return Err(Box::new(e));
    }
    Ok(())
}

async fn run() -> Result<(), DaemonError> {
    let state_dir = env::state_dir()?;
    std::fs::create_dir_all(&state_dir).map_err(|e| DaemonError::io(&state_dir, e))?;

    let mut config_store = FileConfigStore::new(env::config_path(&state_dir));
    if let Some(override_path) = env::config_override_path() {
        config_store = config_store.with_override(override_path);
    }
    let config = config_store.load().await?;
    tracing::info!(
        source_root = %config.source_root.display(),
        working_root = %config.working_root.display(),
        reports_root = %config.reports_root.display(),
        "loaded pipeline config"
    );

    let store = Arc::new(Store::open(&state_dir.join("arc.sqlite3"))?);

    let deps = ControllerDeps {
        extractors: Arc::new(ExtractorRegistry::with_defaults()),
        local_llm: Arc::new(HttpLocalLlmClient::new(&config.local_llm)?),
        remote_llm: Arc::new(HttpRemoteLlmClient::new(&config.remote_llm)?),
        config: config.clone(),
    };
    let controller = Arc::new(JobController::new(store.clone(), SystemClock, deps));

    resume_incomplete_jobs(&store, &controller);

    let socket_path = env::socket_path(&state_dir);
    if socket_path.exists() {
        std::fs::remove_file(&socket_path).map_err(|e| DaemonError::io(&socket_path, e))?;
    }
    let unix = UnixListener::bind(&socket_path).map_err(|e| DaemonError::io(&socket_path, e))?;
    tracing::info!(socket = %socket_path.display(), "arcd listening");

    let ctx = Arc::new(ListenCtx { controller, store, config });
    let listener = Listener::new(unix, ctx);

    tokio::select! {
        _ = listener.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
    }

    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}

/// Re-enter every job left mid-pipeline by a previous crash, per spec
/// §4.10's resumption guarantee: idempotent upserts mean re-running the
/// current phase against a partially-advanced job is safe.
fn resume_incomplete_jobs(store: &Arc<Store>, controller: &Arc<JobController<SystemClock>>) {
    let jobs = match store.with_read_only(arc_store::jobs::list) {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::warn!(error = %e, "could not list jobs for resumption");
            return;
        }
    };
    for job in jobs {
        if job.status.is_terminal() || job.status == arc_core::job::JobStatus::ReviewRequired {
            continue;
        }
        let job_id = job.id;
        let controller = Arc::clone(controller);
        tracing::info!(%job_id, status = %job.status, "resuming job from previous run");
        tokio::spawn(async move {
            if let Err(e) = controller.resume(job_id).await {
                tracing::warn!(%job_id, error = %e, "resumed job ended with an error");
            }
        });
    }
}
