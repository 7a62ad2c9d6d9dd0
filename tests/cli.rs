//! End-to-end smoke tests that drive the built `bulkup` binary as a
//! subprocess, grounded in the teacher's `tests/uploader.rs` /
//! `tests/helpers/cli.rs` process-driving idiom. Each test gets its own
//! `HOME` so the `.bulkup/` history database and config never collide.

#[macro_use]
extern crate bulkup_macros;

mod helpers;

use helpers::cli::run_and_wait;
use tempfile::tempdir;

#[test]
fn no_subcommand_prints_help_and_exits_nonzero() {
    let home = tempdir().unwrap();
    let (status, _output) = run_and_wait(home.path(), Vec::<&str>::new());
    assert!(!status.success());
}

#[test]
fn config_example_prints_a_scaffold() {
    let home = tempdir().unwrap();
    let (status, output) = run_and_wait(home.path(), &["config", "example"]);
    assert!(status.success());
    assert!(output.contains("[upload]"));
    assert!(output.contains("chunk_size"));
}

#[test]
fn history_list_on_a_fresh_home_reports_no_rows() {
    let home = tempdir().unwrap();
    let (status, _output) = run_and_wait(home.path(), &["history", "list"]);
    assert!(status.success());
}

#[test]
fn upload_on_an_empty_directory_reports_nothing_found() {
    let home = tempdir().unwrap();
    let empty_dir = tempdir().unwrap();
    let (status, output) = run_and_wait(
        home.path(),
        &["upload", empty_dir.path().to_str().unwrap()],
    );
    assert!(status.success());
    assert!(output.contains("no recognized video files"));
}

#[test]
fn upload_dry_run_previews_without_writing_history() {
    let home = tempdir().unwrap();
    let source_dir = tempdir().unwrap();
    std::fs::write(source_dir.path().join("clip01.mp4"), vec![0u8; 1024]).unwrap();

    let (status, output) = run_and_wait(
        home.path(),
        &["upload", "--dry-run", source_dir.path().to_str().unwrap()],
    );
    assert!(status.success());
    assert!(output.contains("clip01.mp4"));

    let (status, output) = run_and_wait(home.path(), &["history", "list"]);
    assert!(status.success());
    // A dry run never writes a history row (spec.md S5): the history table
    // has no data rows beyond its header/border.
    assert!(!output.contains("clip01"));
}
