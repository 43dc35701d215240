// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level black-box specs for the `arc` CLI binary (spec §8).
//!
//! This package has no path dependency on any workspace crate — it only
//! drives the compiled `arc` binary via `assert_cmd`, the same boundary the
//! teacher's own root `specs` package tests across. Standing up a live
//! `arcd` backed by real local/remote LLM endpoints is out of reach here
//! (no HTTP-mocking or async-runtime dev-dependency at this level), so the
//! scenarios below cover what's genuinely exercisable at the binary
//! boundary: CLI surface/help, exit-code discrimination (spec §6 "0
//! success; non-zero distinguishes setup error, job failure, cancellation")
//! against an unreachable daemon, and the exact archive shapes spec §8's
//! S1/S2/S5 scenarios describe. The pipeline semantics those scenarios
//! actually test (duplicate resolution, version chains, mixed binary/text
//! classification, cancellation mid-run, resumption) are covered in
//! `arc-engine`'s own test suite (`controller.rs`, `phases/*.rs`), which can
//! drive `JobController` directly against an in-memory store and canned
//! LLM clients.

use std::io::Write;
use std::path::Path;

use assert_cmd::Command;
use serial_test::serial;

const EXIT_SETUP: i32 = 2;

fn arc() -> Command {
    Command::cargo_bin("arc").expect("arc binary should build as a workspace member")
}

/// Points `ARC_SOCKET_PATH` at a socket that can never exist, so every
/// command fails at the connect step the same way a dead or never-started
/// daemon would.
fn arc_with_unreachable_daemon(tmp: &Path) -> Command {
    let mut cmd = arc();
    cmd.env("ARC_SOCKET_PATH", tmp.join("nonexistent.sock"));
    cmd
}

#[test]
fn arc_help_lists_every_subcommand() {
    let output = arc().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["submit", "status", "report", "approve", "cancel", "list"] {
        assert!(stdout.contains(name), "expected --help output to mention `{name}`:\n{stdout}");
    }
}

#[test]
fn arc_with_no_subcommand_is_a_usage_error() {
    arc().assert().failure();
}

#[test]
#[serial]
fn status_against_unreachable_daemon_exits_with_setup_code() {
    let tmp = tempfile::tempdir().unwrap();
    let output = arc_with_unreachable_daemon(tmp.path()).args(["status", "job-doesnotexist"]).output().unwrap();
    assert_eq!(output.status.code(), Some(EXIT_SETUP));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "expected an `error:` line on stderr, got:\n{stderr}");
}

#[test]
#[serial]
fn submit_against_unreachable_daemon_exits_with_setup_code() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("source.zip");
    write_zip(&archive, &[("a.txt", "hello")]);

    arc_with_unreachable_daemon(tmp.path())
        .args(["submit", archive.to_str().unwrap()])
        .assert()
        .failure()
        .code(EXIT_SETUP);
}

#[test]
#[serial]
fn report_approve_cancel_list_all_fail_setup_against_unreachable_daemon() {
    let tmp = tempfile::tempdir().unwrap();

    for args in [
        vec!["report", "job-abc"],
        vec!["approve", "job-abc"],
        vec!["cancel", "job-abc"],
        vec!["list"],
    ] {
        arc_with_unreachable_daemon(tmp.path()).args(&args).assert().failure().code(EXIT_SETUP);
    }
}

/// Writes a zip archive with the given `(entry name, contents)` pairs.
fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options: zip::write::FileOptions<()> = zip::write::FileOptions::default();
    for (name, body) in entries {
        zip.start_file(*name, options.clone()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn entry_names(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    names
}

/// Spec §8 S1: two identical-byte copies of the same document under
/// different directories — the shape the Duplicate Resolver must collapse
/// into one `DuplicateGroup`.
#[test]
fn s1_pure_duplicates_fixture_has_two_identical_members() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("s1.zip");
    let body = "Q3 report body, identical in both copies.";
    write_zip(&archive, &[("A/report.pdf", body), ("B/report.pdf", body)]);

    let names = entry_names(&archive);
    similar_asserts::assert_eq!(names, vec!["A/report.pdf".to_string(), "B/report.pdf".to_string()]);

    let file = std::fs::File::open(&archive).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let mut a = String::new();
    std::io::Read::read_to_string(&mut zip.by_name("A/report.pdf").unwrap(), &mut a).unwrap();
    let mut b = String::new();
    std::io::Read::read_to_string(&mut zip.by_name("B/report.pdf").unwrap(), &mut b).unwrap();
    assert_eq!(a, b, "S1 requires byte-identical members");
}

/// Spec §8 S2: three distinct-byte versions of the same logical document,
/// named so the Version Resolver's filename-based grouping picks them up.
#[test]
fn s2_explicit_versions_fixture_has_three_distinct_members() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("s2.zip");
    write_zip(
        &archive,
        &[
            ("plans/budget_v1.xlsx", "version one"),
            ("plans/budget_v2.xlsx", "version two"),
            ("plans/budget_v3.xlsx", "version three"),
        ],
    );

    let names = entry_names(&archive);
    assert_eq!(names.len(), 3);
    assert!(names.iter().all(|n| n.starts_with("plans/budget_v")));
}

/// Spec §8 S5: one PDF, one JPEG, one file with an unrecognized extension —
/// the Indexer only assigns a content summary to the PDF.
#[test]
fn s5_mixed_binary_and_text_fixture_has_three_distinct_extensions() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("s5.zip");
    write_zip(&archive, &[("memo.pdf", "pdf body"), ("photo.jpg", "jpeg body"), ("blob.xyz", "opaque body")]);

    let names = entry_names(&archive);
    let extensions: Vec<&str> = names.iter().map(|n| n.rsplit('.').next().unwrap()).collect();
    similar_asserts::assert_eq!(extensions, vec!["xyz", "jpg", "pdf"]);
}
