//! End-to-end tests against the built `more` binary, covering the parts of
//! its CLI surface that don't require a real terminal (spec.md §6): usage,
//! license, and argument-error exit codes. The interactive loop itself
//! needs a console to enter raw mode against, so it's exercised through
//! `app.rs`'s own unit tests instead, the same way `terminal.rs`/`app.rs`
//! substitute a `ConsoleSink` test double rather than a real tty.

use std::process::Command;

fn binary() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_more"))
}

#[test]
fn help_flag_prints_usage_and_exits_zero() {
    let out = Command::new(binary()).arg("-?").output().expect("spawn more");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("usage: more"));
}

#[test]
fn license_flag_prints_license_and_exits_zero() {
    let out = Command::new(binary()).arg("-license").output().expect("spawn more");
    assert!(out.status.success());
    assert!(!out.stdout.is_empty());
}

#[test]
fn unknown_flag_is_rejected_with_nonzero_exit() {
    let out = Command::new(binary()).arg("-z").output().expect("spawn more");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("illegal option"));
}

#[test]
fn help_flag_takes_priority_over_paths() {
    // `-?` together with a nonexistent file should still just print usage,
    // never attempt to open the file.
    let out = Command::new(binary()).args(["-?", "/no/such/file"]).output().expect("spawn more");
    assert!(out.status.success());
}
