// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text/JSON rendering for command output. No business logic: every helper
//! here just formats values the daemon already computed.

use arc_core::job::Job;
use arc_wire::JobReport;
use clap::ValueEnum;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn print_job(job: &Job, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(job)?),
        OutputFormat::Text => {
            println!("job {}", job.id);
            println!("  status: {}", job.status);
            if let Some(phase) = &job.current_phase {
                println!("  phase: {phase}");
            }
            println!("  progress: {}%", job.progress);
            println!("  source: {}", job.source_archive_path.display());
            println!("  output: {}", job.output_archive_path.display());
            if let Some(err) = &job.error_message {
                println!("  error: {err}");
            }
            let c = &job.counters;
            println!(
                "  counters: files={} duplicates={} shortcuts={} chains={} renamed={} moved={}",
                c.files_processed,
                c.duplicates_found,
                c.shortcuts_created,
                c.version_chains_found,
                c.files_renamed,
                c.files_moved
            );
        }
    }
    Ok(())
}

pub fn print_jobs(jobs: &[Job], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(jobs)?),
        OutputFormat::Text => {
            if jobs.is_empty() {
                println!("no jobs");
                return Ok(());
            }
            for job in jobs {
                println!("{}  {:<16}  {:>3}%  {}", job.id, job.status, job.progress, job.source_archive_path.display());
            }
        }
    }
    Ok(())
}

pub fn print_report(report: &JobReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            let m = &report.manifest;
            println!("operations: {}", m.operations.len());
            println!("shortcuts: {}", m.shortcuts.len());
            println!(
                "statistics: moved={} renamed={} shortcuts={} errors={}",
                m.statistics.files_moved, m.statistics.files_renamed, m.statistics.shortcuts_created, m.statistics.errors
            );
            if !report.version_chains.is_empty() {
                println!("version chains: {}", report.version_chains.len());
                for chain in &report.version_chains {
                    println!("  {} ({} versions)", chain.document_name, chain.versions.len());
                }
            }
        }
    }
    Ok(())
}
