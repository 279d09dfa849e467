//! Real-process tests for `TokioCommandRunner`.

#![cfg(unix)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::{Duration, Instant};

use agentify_cli::application::ports::{CommandRunner, CommandSpec, RunOutcome};
use agentify_cli::infra::command_runner::TokioCommandRunner;
use tokio::sync::{mpsc, watch};

#[tokio::test]
async fn test_run_with_timeout_captures_output() {
    let out = TokioCommandRunner::new()
        .run_with_timeout("echo", &["hello"], Duration::from_secs(5))
        .await
        .expect("echo");
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
}

#[tokio::test]
async fn test_run_with_timeout_kills_slow_process() {
    let start = Instant::now();
    let err = TokioCommandRunner::new()
        .run_with_timeout("sleep", &["10"], Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timed out"), "got: {err}");
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_missing_program_is_spawn_error() {
    let err = TokioCommandRunner::new()
        .run_with_timeout("agentify-no-such-binary", &[], Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("failed to spawn"), "got: {err}");
}

#[tokio::test]
async fn test_streaming_forwards_lines_in_order() {
    let spec = CommandSpec::new("sh", ["-c", "echo one; echo two; echo three"]);
    let (_tx, cancel) = watch::channel(false);
    let (lines_tx, mut lines_rx) = mpsc::unbounded_channel();

    let outcome = TokioCommandRunner::new()
        .run_streaming(&spec, Duration::from_secs(5), cancel, lines_tx)
        .await
        .expect("run");

    assert_eq!(outcome, RunOutcome::Exited { code: Some(0), success: true });
    let mut seen = Vec::new();
    while let Ok(line) = lines_rx.try_recv() {
        seen.push(line);
    }
    assert_eq!(seen, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_streaming_reports_exit_code() {
    let spec = CommandSpec::new("sh", ["-c", "exit 3"]);
    let (_tx, cancel) = watch::channel(false);
    let (lines_tx, _lines_rx) = mpsc::unbounded_channel();

    let outcome = TokioCommandRunner::new()
        .run_streaming(&spec, Duration::from_secs(5), cancel, lines_tx)
        .await
        .expect("run");

    assert_eq!(outcome, RunOutcome::Exited { code: Some(3), success: false });
}

#[tokio::test]
async fn test_streaming_timeout_kills_process() {
    let spec = CommandSpec::new("sleep", ["10"]);
    let (_tx, cancel) = watch::channel(false);
    let (lines_tx, _lines_rx) = mpsc::unbounded_channel();
    let start = Instant::now();

    let outcome = TokioCommandRunner::new()
        .run_streaming(&spec, Duration::from_secs(1), cancel, lines_tx)
        .await
        .expect("run");

    assert_eq!(outcome, RunOutcome::TimedOut);
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_streaming_cancel_kills_process() {
    let spec = CommandSpec::new("sleep", ["10"]);
    let (tx, cancel) = watch::channel(false);
    let (lines_tx, _lines_rx) = mpsc::unbounded_channel();
    let start = Instant::now();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = tx.send(true);
    });
    let outcome = TokioCommandRunner::new()
        .run_streaming(&spec, Duration::from_secs(30), cancel, lines_tx)
        .await
        .expect("run");

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(3));
}

/// Whether `pid` is a live (non-zombie) process.
#[cfg(target_os = "linux")]
fn alive(pid: &str) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .map(|stat| {
            let state = stat.rsplit(')').next().unwrap_or("").trim_start();
            !state.starts_with('Z')
        })
        .unwrap_or(false)
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_timeout_kills_grandchildren() {
    let spec = CommandSpec::new("sh", ["-c", "sleep 30 & echo $!; wait"]);
    let (_tx, cancel) = watch::channel(false);
    let (lines_tx, mut lines_rx) = mpsc::unbounded_channel();

    let run = tokio::spawn(async move {
        TokioCommandRunner::new()
            .run_streaming(&spec, Duration::from_secs(1), cancel, lines_tx)
            .await
    });
    let grandchild = lines_rx.recv().await.expect("grandchild pid");
    let outcome = run.await.expect("join").expect("run");

    assert_eq!(outcome, RunOutcome::TimedOut);
    let deadline = Instant::now() + Duration::from_secs(2);
    while alive(&grandchild) && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!alive(&grandchild), "sleep {grandchild} outlived the build");
}
