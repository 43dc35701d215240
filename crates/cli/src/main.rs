// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `arc`: thin client binary for `arcd` (spec §3.9). Deposits archives and
//! calls `submit_job`/`get_status`/`get_report`/`approve`/`cancel` against
//! the daemon over its Unix socket. No business logic lives here.

mod client;
mod env;
mod exit_error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use client::DaemonClient;
use exit_error::{ExitError, EXIT_CANCELLED, EXIT_JOB_FAILED};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "arc", version, about = "Client for the archive-organization daemon")]
struct Cli {
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a source archive for organization.
    Submit {
        source_archive_path: PathBuf,
        /// Override the daemon's configured default for the review gate.
        #[arg(long)]
        review_required: Option<bool>,
    },
    /// Print a job's current status.
    Status { job_id: String },
    /// Print every known job.
    List,
    /// Print a completed job's execution report.
    Report { job_id: String },
    /// Unblock a job parked at `review_required`.
    Approve { job_id: String },
    /// Cooperatively cancel a running job.
    Cancel { job_id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.code as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), ExitError> {
    let client = DaemonClient::connect()?;
    let format = cli.format;

    match cli.command {
        Command::Submit { source_archive_path, review_required } => {
            let job_id = client.submit_job(source_archive_path, review_required).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "job_id": job_id }));
                }
                OutputFormat::Text => println!("submitted {job_id}"),
            }
        }
        Command::Status { job_id } => {
            let job = client.get_status(&job_id).await?;
            output::print_job(&job, format).map_err(|e| ExitError::setup(e.to_string()))?;
        }
        Command::List => {
            let jobs = client.list_jobs().await?;
            output::print_jobs(&jobs, format).map_err(|e| ExitError::setup(e.to_string()))?;
        }
        Command::Report { job_id } => {
            let report = client.get_report(&job_id).await?;
            output::print_report(&report, format).map_err(|e| ExitError::setup(e.to_string()))?;
        }
        Command::Approve { job_id } => {
            let status = client.approve(&job_id).await?;
            println!("{job_id} approved, now {status}");
        }
        Command::Cancel { job_id } => {
            let status = client.cancel(&job_id).await?;
            println!("{job_id} cancelled, now {status}");
        }
    }

    Ok(())
}

impl From<client::ClientError> for ExitError {
    fn from(e: client::ClientError) -> Self {
        match &e {
            client::ClientError::Rejected(message) if message.contains("cancelled") => {
                ExitError::new(EXIT_CANCELLED, message.clone())
            }
            client::ClientError::Rejected(_) => ExitError::new(EXIT_JOB_FAILED, e.to_string()),
            _ => ExitError::setup(e.to_string()),
        }
    }
}
