// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin client for `arcd`'s Unix socket (spec §6, §3.9): one connection per
//! request, no retained state. Each command opens a fresh stream, sends one
//! `Request`, reads back one `Response`.

use std::path::PathBuf;

use arc_wire::{ProtocolError, Request, Response};
use thiserror::Error;
use tokio::net::UnixStream;

use crate::env;
use crate::exit_error::ExitError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to arcd at {path}: {source}")]
    Connect { path: PathBuf, source: std::io::Error },
    #[error("protocol error talking to arcd: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("arcd rejected the request: {0}")]
    Rejected(String),
    #[error("unexpected response from arcd: {0:?}")]
    Unexpected(Response),
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Resolve the socket path. Does not connect yet; connection failures
    /// surface per-request so a `status` call after the daemon has gone away
    /// produces the same error as any other command.
    pub fn connect() -> Result<Self, ExitError> {
        Ok(Self { socket_path: env::socket_path()? })
    }

    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| ClientError::Connect { path: self.socket_path.clone(), source: e })?;
        let payload = arc_wire::encode(request)?;
        arc_wire::write_message(&mut stream, &payload).await?;
        let bytes = arc_wire::read_message(&mut stream).await?;
        let response: Response = arc_wire::decode(&bytes)?;
        Ok(response)
    }

    fn reject<T>(response: Response) -> Result<T, ClientError> {
        match response {
            Response::Error { message } => Err(ClientError::Rejected(message)),
            other => Err(ClientError::Unexpected(other)),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn submit_job(
        &self,
        source_archive_path: PathBuf,
        review_required: Option<bool>,
    ) -> Result<String, ClientError> {
        let request = Request::SubmitJob { source_archive_path, callback_url: None, review_required };
        match self.send(&request).await? {
            Response::JobSubmitted { job_id } => Ok(job_id),
            other => Self::reject(other),
        }
    }

    pub async fn get_status(&self, job_id: &str) -> Result<arc_core::job::Job, ClientError> {
        let request = Request::GetStatus { job_id: job_id.to_string() };
        match self.send(&request).await? {
            Response::Status { job } => Ok(*job),
            other => Self::reject(other),
        }
    }

    pub async fn get_report(&self, job_id: &str) -> Result<arc_wire::JobReport, ClientError> {
        let request = Request::GetReport { job_id: job_id.to_string() };
        match self.send(&request).await? {
            Response::Report { report } => Ok(*report),
            other => Self::reject(other),
        }
    }

    pub async fn approve(&self, job_id: &str) -> Result<String, ClientError> {
        let request = Request::Approve { job_id: job_id.to_string() };
        match self.send(&request).await? {
            Response::Approved { status, .. } => Ok(status),
            other => Self::reject(other),
        }
    }

    pub async fn cancel(&self, job_id: &str) -> Result<String, ClientError> {
        let request = Request::Cancel { job_id: job_id.to_string() };
        match self.send(&request).await? {
            Response::Cancelled { status, .. } => Ok(status),
            other => Self::reject(other),
        }
    }

    pub async fn list_jobs(&self) -> Result<Vec<arc_core::job::Job>, ClientError> {
        match self.send(&Request::ListJobs).await? {
            Response::Jobs { jobs } => Ok(jobs),
            other => Self::reject(other),
        }
    }
}
