// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use arc_core::job::Job;
use serde::{Deserialize, Serialize};

use crate::manifest::{ExecutionManifest, VersionChainManifest};

/// `get_report(job_id)`'s payload: the execution manifest plus every
/// version-chain manifest written alongside it (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobReport {
    pub manifest: ExecutionManifest,
    #[serde(default)]
    pub version_chains: Vec<VersionChainManifest>,
}

/// Responses sent from `arcd` to `arc-cli` over the wire protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Reply to [`crate::Request::Ping`].
    Pong,

    /// Reply to [`crate::Request::SubmitJob`].
    JobSubmitted { job_id: String },

    /// Reply to [`crate::Request::GetStatus`].
    Status { job: Box<Job> },

    /// Reply to [`crate::Request::ListJobs`].
    Jobs { jobs: Vec<Job> },

    /// Reply to [`crate::Request::GetReport`].
    Report { report: Box<JobReport> },

    /// Reply to [`crate::Request::Approve`].
    Approved { job_id: String, status: String },

    /// Reply to [`crate::Request::Cancel`].
    Cancelled { job_id: String, status: String },

    /// Request rejected or failed.
    Error { message: String },
}
