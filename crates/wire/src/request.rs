// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Requests sent from `arc-cli` to `arcd` over the wire protocol (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check.
    Ping,

    /// `submit_job(source_archive_path, callback_url?)` (spec §6).
    SubmitJob {
        source_archive_path: PathBuf,
        #[serde(default)]
        callback_url: Option<String>,
        #[serde(default)]
        review_required: Option<bool>,
    },

    /// `get_status(job_id)`.
    GetStatus { job_id: String },

    /// `get_report(job_id)`: the execution manifest plus any version-chain manifests.
    GetReport { job_id: String },

    /// `approve(job_id)`: unblock a job parked at `review_required`.
    Approve { job_id: String },

    /// Cooperatively cancel a job.
    Cancel { job_id: String },

    /// List every known job, most recently created first.
    ListJobs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_job_round_trips_through_json() {
        let request = Request::SubmitJob {
            source_archive_path: PathBuf::from("/data/input/a.zip"),
            callback_url: None,
            review_required: Some(true),
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
    }

    #[test]
    fn get_status_tags_on_type_field() {
        let request = Request::GetStatus { job_id: "job-abc".into() };
        let value: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], "GetStatus");
    }
}
