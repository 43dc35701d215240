// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and handing
//! each off to its own task so a slow or stuck client never blocks others.

use std::sync::Arc;

use arc_core::config::PipelineConfig;
use arc_core::job::JobId;
use arc_core::SystemClock;
use arc_engine::JobController;
use arc_store::{jobs, Store};
use arc_wire::{ProtocolError, Request, Response};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::report;

/// Shared daemon context for all request handlers.
pub(crate) struct ListenCtx {
    pub controller: Arc<JobController<SystemClock>>,
    pub store: Arc<Store>,
    pub config: PipelineConfig,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Accepts connections on the daemon's Unix socket, spawning one task per
/// connection (mirrors the teacher's `Listener::run_unix_only`).
pub(crate) struct Listener {
    unix: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { unix, ctx }
    }

    pub async fn run(self) {
        loop {
            match self.unix.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        if let Err(e) = handle_connection(reader, writer, &ctx).await {
                            log_connection_error(e);
                        }
                    });
                }
                Err(e) => error!("unix accept error: {}", e),
            }
        }
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::Io(ref io))
            if io.kind() == std::io::ErrorKind::UnexpectedEof =>
        {
            debug!("client disconnected");
        }
        _ => error!("connection error: {}", e),
    }
}

async fn handle_connection<R, W>(mut reader: R, mut writer: W, ctx: &ListenCtx) -> Result<(), ConnectionError>
where
    R: AsyncRead + AsyncReadExt + Unpin + Send + 'static,
    W: AsyncWrite + AsyncWriteExt + Unpin + Send + 'static,
{
    let request = arc_wire::read_request(&mut reader).await?;

    if matches!(request, Request::Ping) {
        debug!(?request, "received request");
    } else {
        info!(?request, "received request");
    }

    let response = handle_request(request, ctx).await;
    debug!(?response, "sending response");
    arc_wire::write_response(&mut writer, &response).await?;
    Ok(())
}

async fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::SubmitJob { source_archive_path, callback_url: _, review_required } => {
            handle_submit_job(ctx, source_archive_path, review_required)
        }

        Request::GetStatus { job_id } => handle_get_status(ctx, &job_id),

        Request::GetReport { job_id } => handle_get_report(ctx, &job_id),

        Request::Approve { job_id } => handle_approve(ctx, &job_id).await,

        Request::Cancel { job_id } => handle_cancel(ctx, &job_id),

        Request::ListJobs => handle_list_jobs(ctx),
    }
}

fn parse_job_id(raw: &str) -> Option<JobId> {
    if raw.is_empty() || !raw.starts_with(JobId::PREFIX) {
        return None;
    }
    Some(JobId::from_string(raw))
}

fn handle_submit_job(
    ctx: &ListenCtx,
    source_archive_path: std::path::PathBuf,
    review_required: Option<bool>,
) -> Response {
    let stem = source_archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "job".to_string());
    let output_archive_path = ctx.config.output_root.join(format!("{stem}_organized.zip"));
    let review_required = review_required.unwrap_or(ctx.config.review_required);

    match ctx.controller.submit(source_archive_path, output_archive_path, review_required) {
        Ok(job_id) => {
            let controller = Arc::clone(&ctx.controller);
            tokio::spawn(async move {
                if let Err(e) = controller.run_to_completion(job_id).await {
                    warn!(%job_id, error = %e, "job run ended with an error");
                }
            });
            Response::JobSubmitted { job_id: job_id.to_string() }
        }
        Err(e) => Response::Error { message: e.to_string() },
    }
}

fn handle_get_status(ctx: &ListenCtx, raw_job_id: &str) -> Response {
    let Some(job_id) = parse_job_id(raw_job_id) else {
        return Response::Error { message: format!("invalid job id: {raw_job_id}") };
    };
    match ctx.store.with_read_only(|tx| jobs::get(tx, &job_id)) {
        Ok(Some(job)) => Response::Status { job: Box::new(job) },
        Ok(None) => Response::Error { message: format!("unknown job {job_id}") },
        Err(e) => Response::Error { message: e.to_string() },
    }
}

fn handle_get_report(ctx: &ListenCtx, raw_job_id: &str) -> Response {
    let Some(job_id) = parse_job_id(raw_job_id) else {
        return Response::Error { message: format!("invalid job id: {raw_job_id}") };
    };
    match report::build(&ctx.config, job_id) {
        Ok(report) => Response::Report { report: Box::new(report) },
        Err(e) => Response::Error { message: e.to_string() },
    }
}

async fn handle_approve(ctx: &ListenCtx, raw_job_id: &str) -> Response {
    let Some(job_id) = parse_job_id(raw_job_id) else {
        return Response::Error { message: format!("invalid job id: {raw_job_id}") };
    };
    match ctx.controller.approve(job_id).await {
        Ok(status) => {
            let controller = Arc::clone(&ctx.controller);
            tokio::spawn(async move {
                if let Err(e) = controller.run_to_completion(job_id).await {
                    warn!(%job_id, error = %e, "job run ended with an error");
                }
            });
            Response::Approved { job_id: job_id.to_string(), status: status.to_string() }
        }
        Err(e) => Response::Error { message: e.to_string() },
    }
}

fn handle_cancel(ctx: &ListenCtx, raw_job_id: &str) -> Response {
    let Some(job_id) = parse_job_id(raw_job_id) else {
        return Response::Error { message: format!("invalid job id: {raw_job_id}") };
    };
    match ctx.controller.cancel(job_id) {
        Ok(()) => {
            let status = ctx
                .store
                .with_read_only(|tx| jobs::get(tx, &job_id))
                .ok()
                .flatten()
                .map(|job| job.status.to_string())
                .unwrap_or_else(|| "cancelled".to_string());
            Response::Cancelled { job_id: job_id.to_string(), status }
        }
        Err(e) => Response::Error { message: e.to_string() },
    }
}

fn handle_list_jobs(ctx: &ListenCtx) -> Response {
    match ctx.store.with_read_only(jobs::list) {
        Ok(mut jobs) => {
            jobs.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
            Response::Jobs { jobs }
        }
        Err(e) => Response::Error { message: e.to_string() },
    }
}
